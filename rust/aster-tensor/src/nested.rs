//! Nested-sequence backend: arrays as recursively nested vectors.
//!
//! Slower than the dense backend but free of stride bookkeeping; it exists
//! as the fallback engine and as an independent implementation of the same
//! observable contract, which the test suite holds both backends to.

use crate::dtype::DType;
use crate::ops::{scalar_binary, scalar_unary, BinOp, OpError, UnaryOp};
use crate::scalar::Scalar;
use crate::shape::{Shape, ShapeError};

/// A multi-dimensional array stored as nested sequences.
///
/// A rank-0 array is a `Leaf`; a rank-n array is a `Seq` of rank-(n-1)
/// arrays that all share one shape and dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedTensor {
    Leaf(Scalar),
    Seq(Vec<NestedTensor>),
}

impl NestedTensor {
    /// Create an array filled with the dtype's zero.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        Self::fill(shape.dims(), Scalar::zero(dtype))
    }

    /// Create an array filled with the dtype's one.
    pub fn ones(shape: Shape, dtype: DType) -> Self {
        Self::fill(shape.dims(), Scalar::one(dtype))
    }

    fn fill(dims: &[usize], value: Scalar) -> Self {
        match dims.split_first() {
            None => NestedTensor::Leaf(value),
            Some((&head, tail)) => {
                NestedTensor::Seq((0..head).map(|_| Self::fill(tail, value)).collect())
            }
        }
    }

    /// Create a 0-dimensional array holding one scalar.
    pub fn scalar(value: Scalar) -> Self {
        NestedTensor::Leaf(value)
    }

    /// Create an array from flat row-major data and a shape.
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
        Ok(Self::split(&data, shape.dims()))
    }

    fn split(data: &[Scalar], dims: &[usize]) -> Self {
        match dims.split_first() {
            None => NestedTensor::Leaf(data[0]),
            Some((&head, tail)) => {
                let chunk = tail.iter().product::<usize>().max(1);
                NestedTensor::Seq(
                    (0..head)
                        .map(|i| Self::split(&data[i * chunk..(i + 1) * chunk], tail))
                        .collect(),
                )
            }
        }
    }

    /// Stack equally-shaped arrays of one dtype along a new leading axis.
    pub fn stack(parts: Vec<NestedTensor>) -> Result<Self, OpError> {
        let first = parts.first().ok_or_else(|| {
            OpError::InvalidOperation("cannot stack zero arrays".into())
        })?;
        let elem_shape = first.shape();
        let dtype = first.dtype();
        for part in &parts[1..] {
            if part.shape() != elem_shape {
                return Err(OpError::Shape(ShapeError::Broadcast {
                    left: elem_shape.dims().to_vec(),
                    right: part.shape().dims().to_vec(),
                }));
            }
            if part.dtype() != dtype {
                return Err(OpError::DTypeMismatch {
                    left: dtype,
                    right: part.dtype(),
                });
            }
        }
        Ok(NestedTensor::Seq(parts))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The shape, read off the nesting structure (first-child descent).
    pub fn shape(&self) -> Shape {
        let mut dims = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                NestedTensor::Leaf(_) => break,
                NestedTensor::Seq(items) => {
                    dims.push(items.len());
                    match items.first() {
                        Some(next) => cur = next,
                        None => break,
                    }
                }
            }
        }
        Shape::new(dims)
    }

    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    /// The element dtype (first-leaf descent; zero-size arrays report Int).
    pub fn dtype(&self) -> DType {
        let mut cur = self;
        loop {
            match cur {
                NestedTensor::Leaf(s) => return s.dtype(),
                NestedTensor::Seq(items) => match items.first() {
                    Some(next) => cur = next,
                    None => return DType::Int,
                },
            }
        }
    }

    /// Flatten into row-major order.
    pub fn to_flat(&self) -> Vec<Scalar> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Scalar>) {
        match self {
            NestedTensor::Leaf(s) => out.push(*s),
            NestedTensor::Seq(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }

    /// Return the scalar value of a 0-dimensional array.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            NestedTensor::Leaf(s) => Some(*s),
            NestedTensor::Seq(_) => None,
        }
    }

    // ── Indexing ────────────────────────────────────────────────────────

    /// Get the element at a full multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> Result<Scalar, ShapeError> {
        match (self, indices.split_first()) {
            (NestedTensor::Leaf(s), None) => Ok(*s),
            (NestedTensor::Seq(items), Some((&i, rest))) => {
                let item = items.get(i).ok_or_else(|| ShapeError::OutOfBounds {
                    index: indices.to_vec(),
                    dims: self.shape().dims().to_vec(),
                })?;
                item.get(rest)
            }
            (NestedTensor::Leaf(_), Some(_)) => Err(ShapeError::RankMismatch {
                expected: 0,
                got: indices.len(),
            }),
            (NestedTensor::Seq(_), None) => Err(ShapeError::RankMismatch {
                expected: self.ndim(),
                got: 0,
            }),
        }
    }

    /// Index along the leading axis.
    pub fn index_axis(&self, i: usize) -> Result<NestedTensor, ShapeError> {
        match self {
            NestedTensor::Leaf(_) => Err(ShapeError::RankMismatch {
                expected: 1,
                got: 0,
            }),
            NestedTensor::Seq(items) => {
                items.get(i).cloned().ok_or_else(|| ShapeError::OutOfBounds {
                    index: vec![i],
                    dims: self.shape().dims().to_vec(),
                })
            }
        }
    }

    // ── Element-wise ops ────────────────────────────────────────────────

    /// Apply a binary operator element-wise with NumPy-style broadcasting.
    pub fn binary(&self, op: BinOp, other: &NestedTensor) -> Result<NestedTensor, OpError> {
        // Validate shapes up front so recursion only sees compatible pairs.
        self.shape().broadcast_with(&other.shape())?;
        binary_rec(op, self, other)
    }

    /// Apply a unary operator element-wise.
    pub fn unary(&self, op: UnaryOp) -> Result<NestedTensor, OpError> {
        match self {
            NestedTensor::Leaf(s) => Ok(NestedTensor::Leaf(scalar_unary(op, *s)?)),
            NestedTensor::Seq(items) => Ok(NestedTensor::Seq(
                items
                    .iter()
                    .map(|item| item.unary(op))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }

    // ── Matrix product ──────────────────────────────────────────────────

    /// Matrix multiplication with shape validation.
    pub fn matmul(&self, other: &NestedTensor) -> Result<NestedTensor, OpError> {
        if self.dtype() != other.dtype() {
            return Err(OpError::DTypeMismatch {
                left: self.dtype(),
                right: other.dtype(),
            });
        }
        if !self.dtype().is_numeric() {
            return Err(OpError::UnsupportedOp {
                op: "@",
                dtype: self.dtype(),
            });
        }
        let a_shape = self.shape();
        let b_shape = other.shape();
        let out_shape = Shape::matmul_shape(&a_shape, &b_shape)?;

        let (m, k, n) = match (a_shape.ndim(), b_shape.ndim()) {
            (1, 1) => (1, a_shape.dims()[0], 1),
            (2, 1) => (a_shape.dims()[0], a_shape.dims()[1], 1),
            (1, 2) => (1, b_shape.dims()[0], b_shape.dims()[1]),
            (2, 2) => (a_shape.dims()[0], a_shape.dims()[1], b_shape.dims()[1]),
            _ => unreachable!("matmul_shape rejects other ranks"),
        };

        let a = self.to_flat();
        let b = other.to_flat();
        let mut data = Vec::with_capacity(m * n);
        for i in 0..m {
            for j in 0..n {
                let mut acc = Scalar::zero(self.dtype());
                for p in 0..k {
                    let prod = scalar_binary(BinOp::Mul, a[i * k + p], b[p * n + j])?;
                    acc = scalar_binary(BinOp::Add, acc, prod)?;
                }
                data.push(acc);
            }
        }
        NestedTensor::from_vec(data, out_shape)
    }
}

fn binary_rec(op: BinOp, a: &NestedTensor, b: &NestedTensor) -> Result<NestedTensor, OpError> {
    match (a, b) {
        (NestedTensor::Leaf(x), NestedTensor::Leaf(y)) => {
            Ok(NestedTensor::Leaf(scalar_binary(op, *x, *y)?))
        }
        // Lower-rank operand broadcasts across the higher-rank one.
        (NestedTensor::Leaf(_), NestedTensor::Seq(items)) => Ok(NestedTensor::Seq(
            items
                .iter()
                .map(|item| binary_rec(op, a, item))
                .collect::<Result<_, _>>()?,
        )),
        (NestedTensor::Seq(items), NestedTensor::Leaf(_)) => Ok(NestedTensor::Seq(
            items
                .iter()
                .map(|item| binary_rec(op, item, b))
                .collect::<Result<_, _>>()?,
        )),
        (NestedTensor::Seq(xs), NestedTensor::Seq(ys)) => {
            let ra = a.ndim();
            let rb = b.ndim();
            if ra > rb {
                return Ok(NestedTensor::Seq(
                    xs.iter()
                        .map(|x| binary_rec(op, x, b))
                        .collect::<Result<_, _>>()?,
                ));
            }
            if rb > ra {
                return Ok(NestedTensor::Seq(
                    ys.iter()
                        .map(|y| binary_rec(op, a, y))
                        .collect::<Result<_, _>>()?,
                ));
            }
            // Equal rank: equal lengths zip; a length-1 axis repeats.
            if xs.len() == ys.len() {
                Ok(NestedTensor::Seq(
                    xs.iter()
                        .zip(ys.iter())
                        .map(|(x, y)| binary_rec(op, x, y))
                        .collect::<Result<_, _>>()?,
                ))
            } else if xs.len() == 1 {
                Ok(NestedTensor::Seq(
                    ys.iter()
                        .map(|y| binary_rec(op, &xs[0], y))
                        .collect::<Result<_, _>>()?,
                ))
            } else if ys.len() == 1 {
                Ok(NestedTensor::Seq(
                    xs.iter()
                        .map(|x| binary_rec(op, x, &ys[0]))
                        .collect::<Result<_, _>>()?,
                ))
            } else {
                Err(OpError::Shape(ShapeError::Broadcast {
                    left: a.shape().dims().to_vec(),
                    right: b.shape().dims().to_vec(),
                }))
            }
        }
    }
}
