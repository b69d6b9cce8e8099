//! Array engine for the Aster language.
//!
//! Exposes n-dimensional arrays of `int`, `float` or `bool` elements with
//! NumPy-style broadcasting, matrix product and leading-axis indexing.
//! Two interchangeable backends implement the same observable contract:
//! a dense flat-storage backend and a nested-sequence fallback.

pub mod array;
pub mod dense;
pub mod dtype;
pub mod nested;
pub mod ops;
pub mod scalar;
pub mod shape;

pub use array::{Backend, NdArray};
pub use dtype::DType;
pub use ops::{BinOp, OpError, UnaryOp};
pub use scalar::Scalar;
pub use shape::{Shape, ShapeError};
