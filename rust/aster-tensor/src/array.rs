//! The engine's public array type: one value, two interchangeable backends.

use crate::dense::DenseTensor;
use crate::dtype::DType;
use crate::nested::NestedTensor;
use crate::ops::{BinOp, OpError, UnaryOp};
use crate::scalar::Scalar;
use crate::shape::{Shape, ShapeError};
use std::fmt;

/// Which storage implementation backs an array.
///
/// Chosen at construction time; both backends satisfy the same observable
/// contract (shapes, values, errors), which the test suite enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Dense,
    Nested,
}

/// An n-dimensional array of `int`, `float` or `bool` elements.
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray {
    Dense(DenseTensor),
    Nested(NestedTensor),
}

impl NdArray {
    // ── Constructors ────────────────────────────────────────────────────

    /// An array filled with the dtype's zero.
    pub fn zeros(backend: Backend, shape: Shape, dtype: DType) -> Self {
        match backend {
            Backend::Dense => NdArray::Dense(DenseTensor::zeros(shape, dtype)),
            Backend::Nested => NdArray::Nested(NestedTensor::zeros(shape, dtype)),
        }
    }

    /// An array filled with the dtype's one.
    pub fn ones(backend: Backend, shape: Shape, dtype: DType) -> Self {
        match backend {
            Backend::Dense => NdArray::Dense(DenseTensor::ones(shape, dtype)),
            Backend::Nested => NdArray::Nested(NestedTensor::ones(shape, dtype)),
        }
    }

    /// A 0-dimensional array holding one scalar.
    pub fn scalar(backend: Backend, value: Scalar) -> Self {
        match backend {
            Backend::Dense => NdArray::Dense(DenseTensor::scalar(value)),
            Backend::Nested => NdArray::Nested(NestedTensor::scalar(value)),
        }
    }

    /// Build from flat row-major data and a shape.
    pub fn from_vec(backend: Backend, data: Vec<Scalar>, shape: Shape) -> Result<Self, OpError> {
        match backend {
            Backend::Dense => Ok(NdArray::Dense(DenseTensor::from_vec(data, shape)?)),
            Backend::Nested => Ok(NdArray::Nested(NestedTensor::from_vec(data, shape)?)),
        }
    }

    /// A 1-D int vector, the `shape` builtin's return representation.
    /// A scalar's shape is the empty vector, so zero length is allowed.
    pub fn int_vector(backend: Backend, values: &[i64]) -> Result<Self, OpError> {
        if values.is_empty() {
            return Ok(NdArray::zeros(backend, Shape::new(vec![0]), DType::Int));
        }
        let data: Vec<Scalar> = values.iter().map(|&n| Scalar::Int(n)).collect();
        let len = data.len();
        NdArray::from_vec(backend, data, Shape::new(vec![len]))
    }

    /// Stack equally-shaped arrays along a new leading axis (array-literal
    /// packing). All parts must share one backend, shape and dtype.
    pub fn stack(parts: Vec<NdArray>) -> Result<Self, OpError> {
        let backend = parts
            .first()
            .ok_or_else(|| OpError::InvalidOperation("cannot stack zero arrays".into()))?
            .backend();
        match backend {
            Backend::Dense => {
                let inner = parts
                    .into_iter()
                    .map(|p| p.into_dense())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NdArray::Dense(DenseTensor::stack(inner)?))
            }
            Backend::Nested => {
                let inner = parts
                    .into_iter()
                    .map(|p| p.into_nested())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NdArray::Nested(NestedTensor::stack(inner)?))
            }
        }
    }

    // ── Backend plumbing ────────────────────────────────────────────────

    pub fn backend(&self) -> Backend {
        match self {
            NdArray::Dense(_) => Backend::Dense,
            NdArray::Nested(_) => Backend::Nested,
        }
    }

    fn into_dense(self) -> Result<DenseTensor, OpError> {
        match self {
            NdArray::Dense(t) => Ok(t),
            NdArray::Nested(t) => {
                let shape = t.shape();
                DenseTensor::from_vec(t.to_flat(), shape)
            }
        }
    }

    fn into_nested(self) -> Result<NestedTensor, OpError> {
        match self {
            NdArray::Nested(t) => Ok(t),
            NdArray::Dense(t) => {
                let shape = t.shape().clone();
                NestedTensor::from_vec(t.data().to_vec(), shape)
            }
        }
    }

    /// Re-home `other` onto `self`'s backend if the two differ.
    fn align(&self, other: &NdArray) -> Result<NdArray, OpError> {
        if self.backend() == other.backend() {
            return Ok(other.clone());
        }
        match self.backend() {
            Backend::Dense => Ok(NdArray::Dense(other.clone().into_dense()?)),
            Backend::Nested => Ok(NdArray::Nested(other.clone().into_nested()?)),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn shape(&self) -> Shape {
        match self {
            NdArray::Dense(t) => t.shape().clone(),
            NdArray::Nested(t) => t.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        match self {
            NdArray::Dense(t) => t.ndim(),
            NdArray::Nested(t) => t.ndim(),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            NdArray::Dense(t) => t.dtype(),
            NdArray::Nested(t) => t.dtype(),
        }
    }

    /// Row-major element order, backend-independent.
    pub fn to_flat(&self) -> Vec<Scalar> {
        match self {
            NdArray::Dense(t) => t.data().to_vec(),
            NdArray::Nested(t) => t.to_flat(),
        }
    }

    /// The scalar inside a 0-dimensional array.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            NdArray::Dense(t) => t.to_scalar(),
            NdArray::Nested(t) => t.to_scalar(),
        }
    }

    /// Element at a full multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> Result<Scalar, ShapeError> {
        match self {
            NdArray::Dense(t) => t.get(indices),
            NdArray::Nested(t) => t.get(indices),
        }
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Index along the leading axis, dropping one rank.
    pub fn index_axis(&self, i: usize) -> Result<NdArray, ShapeError> {
        match self {
            NdArray::Dense(t) => Ok(NdArray::Dense(t.index_axis(i)?)),
            NdArray::Nested(t) => Ok(NdArray::Nested(t.index_axis(i)?)),
        }
    }

    /// Element-wise binary operation with broadcasting. The result lives on
    /// `self`'s backend; a mismatched operand is converted first.
    pub fn binary(&self, op: BinOp, other: &NdArray) -> Result<NdArray, OpError> {
        let rhs = self.align(other)?;
        match (self, &rhs) {
            (NdArray::Dense(a), NdArray::Dense(b)) => Ok(NdArray::Dense(a.binary(op, b)?)),
            (NdArray::Nested(a), NdArray::Nested(b)) => Ok(NdArray::Nested(a.binary(op, b)?)),
            _ => unreachable!("operands aligned above"),
        }
    }

    /// Element-wise unary operation.
    pub fn unary(&self, op: UnaryOp) -> Result<NdArray, OpError> {
        match self {
            NdArray::Dense(t) => Ok(NdArray::Dense(t.unary(op)?)),
            NdArray::Nested(t) => Ok(NdArray::Nested(t.unary(op)?)),
        }
    }

    /// Matrix product.
    pub fn matmul(&self, other: &NdArray) -> Result<NdArray, OpError> {
        let rhs = self.align(other)?;
        match (self, &rhs) {
            (NdArray::Dense(a), NdArray::Dense(b)) => Ok(NdArray::Dense(a.matmul(b)?)),
            (NdArray::Nested(a), NdArray::Nested(b)) => Ok(NdArray::Nested(a.matmul(b)?)),
            _ => unreachable!("operands aligned above"),
        }
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_rec(
            f: &mut fmt::Formatter<'_>,
            arr: &NdArray,
            idx: &mut Vec<usize>,
            dims: &[usize],
        ) -> fmt::Result {
            if idx.len() == dims.len() {
                match arr.get(idx) {
                    Ok(s) => write!(f, "{}", s),
                    Err(_) => write!(f, "?"),
                }
            } else {
                write!(f, "[")?;
                let axis = idx.len();
                for i in 0..dims[axis] {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    idx.push(i);
                    write_rec(f, arr, idx, dims)?;
                    idx.pop();
                }
                write!(f, "]")
            }
        }
        let shape = self.shape();
        write_rec(f, self, &mut Vec::new(), shape.dims())
    }
}
