//! Array dimensionality and the shape-level rules both backends share.

use std::fmt;
use thiserror::Error;

/// Error type for shape-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("cannot broadcast shape {left:?} against {right:?}")]
    Broadcast { left: Vec<usize>, right: Vec<usize> },
    #[error("no matrix product between shapes {left:?} and {right:?}")]
    MatMul { left: Vec<usize>, right: Vec<usize> },
    #[error("{have} elements cannot fill a shape of {want}")]
    ElementCount { have: usize, want: usize },
    #[error("index {index:?} lies outside shape {dims:?}")]
    OutOfBounds { index: Vec<usize>, dims: Vec<usize> },
    #[error("expected a rank-{expected} index, got rank {got}")]
    RankMismatch { expected: usize, got: usize },
}

/// The extent of each axis of an array. A scalar has no axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// The rank-0 shape.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Number of axes (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total element count; the empty product makes a scalar hold one.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// The shape left after removing the leading axis; indexing a rank-n
    /// array along axis 0 yields a value of this shape.
    pub fn tail(&self) -> Shape {
        Shape::new(self.dims.get(1..).unwrap_or(&[]).to_vec())
    }

    /// Row-major strides: each axis steps by the element count of the
    /// shape to its right.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.dims.len());
        let mut step = 1;
        for &d in self.dims.iter().rev() {
            strides.push(step);
            step *= d;
        }
        strides.reverse();
        strides
    }

    /// This shape's axes right-aligned to `rank`, with 1-sized axes filling
    /// the gap on the left.
    fn aligned(&self, rank: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::repeat(1)
            .take(rank - self.dims.len())
            .chain(self.dims.iter().copied())
    }

    /// The shape produced by broadcasting `self` with `other`.
    ///
    /// Axes are compared right-aligned; a pair is compatible when the
    /// extents match or one of them is 1, in which case the 1 stretches to
    /// the other extent.
    pub fn broadcast_with(&self, other: &Shape) -> Result<Shape, ShapeError> {
        let rank = self.ndim().max(other.ndim());
        let mut out = Vec::with_capacity(rank);
        for (a, b) in self.aligned(rank).zip(other.aligned(rank)) {
            match (a, b) {
                (a, b) if a == b => out.push(a),
                (1, b) => out.push(b),
                (a, 1) => out.push(a),
                _ => {
                    return Err(ShapeError::Broadcast {
                        left: self.dims.clone(),
                        right: other.dims.clone(),
                    })
                }
            }
        }
        Ok(Shape::new(out))
    }

    /// The shape of the matrix product `a @ b`.
    ///
    /// A 1-D left operand acts as a row vector and a 1-D right operand as
    /// a column vector; the vector axes are dropped from the result, so
    /// ranks combine as 1·1→0, 2·1→1, 1·2→1 and 2·2→2. The inner extents
    /// must agree.
    pub fn matmul_shape(a: &Shape, b: &Shape) -> Result<Shape, ShapeError> {
        let incompatible = || ShapeError::MatMul {
            left: a.dims.clone(),
            right: b.dims.clone(),
        };
        let (rows, k_left) = match a.dims[..] {
            [k] => (None, k),
            [m, k] => (Some(m), k),
            _ => return Err(incompatible()),
        };
        let (k_right, cols) = match b.dims[..] {
            [k] => (k, None),
            [k, n] => (k, Some(n)),
            _ => return Err(incompatible()),
        };
        if k_left != k_right {
            return Err(incompatible());
        }
        Ok(Shape::new(rows.into_iter().chain(cols).collect()))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
