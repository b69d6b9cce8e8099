//! Dense backend: flat row-major storage with shape and strides.

use crate::dtype::DType;
use crate::ops::{scalar_binary, scalar_unary, BinOp, OpError, UnaryOp};
use crate::scalar::Scalar;
use crate::shape::{Shape, ShapeError};

/// The element dtype an operator produces for a given input dtype.
fn result_dtype(op: BinOp, input: DType) -> DType {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => input,
        _ => DType::Bool,
    }
}

/// A multi-dimensional array stored as a flat C-contiguous buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    /// Flat storage in row-major order.
    data: Vec<Scalar>,
    /// Shape of the array.
    shape: Shape,
    /// Strides for indexing into flat storage.
    strides: Vec<usize>,
    /// Element data type; every entry of `data` carries it.
    dtype: DType,
}

impl DenseTensor {
    /// Create an array filled with the dtype's zero.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let n = shape.numel();
        let strides = shape.strides();
        DenseTensor {
            data: vec![Scalar::zero(dtype); n],
            shape,
            strides,
            dtype,
        }
    }

    /// Create an array filled with the dtype's one.
    pub fn ones(shape: Shape, dtype: DType) -> Self {
        let n = shape.numel();
        let strides = shape.strides();
        DenseTensor {
            data: vec![Scalar::one(dtype); n],
            shape,
            strides,
            dtype,
        }
    }

    /// Create an array from flat row-major data and a shape.
    ///
    /// Fails if the element count does not match the shape or the elements
    /// are not dtype-homogeneous.
    pub fn from_vec(data: Vec<Scalar>, shape: Shape) -> Result<Self, OpError> {
        if data.len() != shape.numel() {
            return Err(OpError::Shape(ShapeError::ElementCount {
                have: data.len(),
                want: shape.numel(),
            }));
        }
        let dtype = match data.first() {
            Some(s) => s.dtype(),
            None => {
                return Err(OpError::InvalidOperation(
                    "cannot build an array from zero elements".into(),
                ))
            }
        };
        if let Some(bad) = data.iter().find(|s| s.dtype() != dtype) {
            return Err(OpError::DTypeMismatch {
                left: dtype,
                right: bad.dtype(),
            });
        }
        let strides = shape.strides();
        Ok(DenseTensor {
            data,
            shape,
            strides,
            dtype,
        })
    }

    /// Create a 0-dimensional array holding one scalar.
    pub fn scalar(value: Scalar) -> Self {
        DenseTensor {
            dtype: value.dtype(),
            data: vec![value],
            shape: Shape::scalar(),
            strides: vec![],
        }
    }

    /// Stack equally-shaped arrays of one dtype along a new leading axis.
    pub fn stack(parts: Vec<DenseTensor>) -> Result<Self, OpError> {
        let first = parts.first().ok_or_else(|| {
            OpError::InvalidOperation("cannot stack zero arrays".into())
        })?;
        let elem_shape = first.shape.clone();
        let dtype = first.dtype;
        let mut dims = vec![parts.len()];
        dims.extend_from_slice(elem_shape.dims());

        let mut data = Vec::with_capacity(parts.len() * elem_shape.numel());
        for part in &parts {
            if part.shape != elem_shape {
                return Err(OpError::Shape(ShapeError::Broadcast {
                    left: elem_shape.dims().to_vec(),
                    right: part.shape.dims().to_vec(),
                }));
            }
            if part.dtype != dtype {
                return Err(OpError::DTypeMismatch {
                    left: dtype,
                    right: part.dtype,
                });
            }
            data.extend_from_slice(&part.data);
        }
        DenseTensor::from_vec(data, Shape::new(dims))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[Scalar] {
        &self.data
    }

    /// Return the scalar value of a 0-dimensional array.
    pub fn to_scalar(&self) -> Option<Scalar> {
        if self.shape.is_scalar() {
            Some(self.data[0])
        } else {
            None
        }
    }

    // ── Indexing ────────────────────────────────────────────────────────

    /// Convert multi-dimensional indices to a flat offset.
    fn flat_index(&self, indices: &[usize]) -> Result<usize, ShapeError> {
        let dims = self.shape.dims();
        if indices.len() != dims.len() {
            return Err(ShapeError::RankMismatch {
                expected: dims.len(),
                got: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(dims.iter()) {
            if idx >= dim {
                return Err(ShapeError::OutOfBounds {
                    index: indices.to_vec(),
                    dims: dims.to_vec(),
                });
            }
        }
        Ok(indices
            .iter()
            .zip(self.strides.iter())
            .map(|(&i, &s)| i * s)
            .sum())
    }

    /// Get the element at a full multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> Result<Scalar, ShapeError> {
        if self.shape.is_scalar() && indices.is_empty() {
            return Ok(self.data[0]);
        }
        let offset = self.flat_index(indices)?;
        Ok(self.data[offset])
    }

    /// Index along the leading axis, producing a rank-1 array (or a scalar
    /// array when `self` is 1-D).
    pub fn index_axis(&self, i: usize) -> Result<DenseTensor, ShapeError> {
        let dims = self.shape.dims();
        let lead = *dims.first().ok_or(ShapeError::RankMismatch {
            expected: 1,
            got: 0,
        })?;
        if i >= lead {
            return Err(ShapeError::OutOfBounds {
                index: vec![i],
                dims: dims.to_vec(),
            });
        }
        let tail = self.shape.tail();
        let chunk = tail.numel();
        let data = self.data[i * chunk..(i + 1) * chunk].to_vec();
        let strides = tail.strides();
        Ok(DenseTensor {
            data,
            shape: tail,
            strides,
            dtype: self.dtype,
        })
    }

    // ── Element-wise ops ────────────────────────────────────────────────

    /// Apply a binary operator element-wise with NumPy-style broadcasting.
    pub fn binary(&self, op: BinOp, other: &DenseTensor) -> Result<DenseTensor, OpError> {
        let out_shape = self.shape.broadcast_with(&other.shape)?;
        let n = out_shape.numel();
        let out_dims = out_shape.dims();
        let ndim = out_dims.len();

        let mut data = Vec::with_capacity(n);
        let mut out_idx = vec![0usize; ndim];

        for flat in 0..n {
            // Convert flat index to a multi-dim index in the output shape.
            let mut remaining = flat;
            for d in (0..ndim).rev() {
                if out_dims[d] > 0 {
                    out_idx[d] = remaining % out_dims[d];
                    remaining /= out_dims[d];
                }
            }
            let va = self.broadcast_fetch(&out_idx, ndim);
            let vb = other.broadcast_fetch(&out_idx, ndim);
            data.push(scalar_binary(op, va, vb)?);
        }

        let dtype = match data.first() {
            Some(s) => s.dtype(),
            // Zero-size output: derive the dtype from the operator.
            None => result_dtype(op, self.dtype),
        };
        let strides = out_shape.strides();
        Ok(DenseTensor {
            data,
            shape: out_shape,
            strides,
            dtype,
        })
    }

    /// Fetch the element this array contributes at an output index, mapping
    /// broadcast (size-1 or missing) axes to offset 0.
    fn broadcast_fetch(&self, out_idx: &[usize], out_ndim: usize) -> Scalar {
        if self.shape.is_scalar() {
            return self.data[0];
        }
        let dims = self.shape.dims();
        let offset_ndim = out_ndim - dims.len();
        let mut flat = 0usize;
        for d in 0..dims.len() {
            let idx = if dims[d] == 1 {
                0
            } else {
                out_idx[d + offset_ndim]
            };
            flat += idx * self.strides[d];
        }
        self.data[flat]
    }

    /// Apply a unary operator element-wise.
    pub fn unary(&self, op: UnaryOp) -> Result<DenseTensor, OpError> {
        let mut data = Vec::with_capacity(self.data.len());
        for &s in &self.data {
            data.push(scalar_unary(op, s)?);
        }
        Ok(DenseTensor {
            data,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            dtype: self.dtype,
        })
    }

    // ── Matrix product ──────────────────────────────────────────────────

    /// Matrix multiplication with shape validation.
    ///
    /// Supports (k,)@(k,), (m,k)@(k,), (k,)@(k,n) and (m,k)@(k,n). Elements
    /// must be numeric and of the same dtype.
    pub fn matmul(&self, other: &DenseTensor) -> Result<DenseTensor, OpError> {
        if self.dtype != other.dtype {
            return Err(OpError::DTypeMismatch {
                left: self.dtype,
                right: other.dtype,
            });
        }
        if !self.dtype.is_numeric() {
            return Err(OpError::UnsupportedOp {
                op: "@",
                dtype: self.dtype,
            });
        }
        let out_shape = Shape::matmul_shape(&self.shape, &other.shape)?;

        let (m, k, n) = match (self.ndim(), other.ndim()) {
            (1, 1) => (1, self.shape.dims()[0], 1),
            (2, 1) => (self.shape.dims()[0], self.shape.dims()[1], 1),
            (1, 2) => (1, other.shape.dims()[0], other.shape.dims()[1]),
            (2, 2) => (
                self.shape.dims()[0],
                self.shape.dims()[1],
                other.shape.dims()[1],
            ),
            // matmul_shape has already rejected anything else
            _ => unreachable!(),
        };

        let mut data = Vec::with_capacity(m * n);
        for i in 0..m {
            for j in 0..n {
                let mut acc = Scalar::zero(self.dtype);
                for p in 0..k {
                    let a = self.data[i * k + p];
                    let b = other.data[p * n + j];
                    acc = scalar_binary(BinOp::Add, acc, scalar_binary(BinOp::Mul, a, b)?)?;
                }
                data.push(acc);
            }
        }
        DenseTensor::from_vec(data, out_shape)
    }
}
