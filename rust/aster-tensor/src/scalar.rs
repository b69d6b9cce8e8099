use crate::dtype::DType;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single array element.
///
/// Arrays are homogeneous: every element of one array carries the same
/// `DType`. The tagged representation keeps the int/float/bool distinction
/// structural instead of inspecting bit patterns at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Int(_) => DType::Int,
            Scalar::Float(_) => DType::Float,
            Scalar::Bool(_) => DType::Bool,
        }
    }

    /// The additive identity for a dtype (`zeros` fill value).
    pub fn zero(dtype: DType) -> Scalar {
        match dtype {
            DType::Int => Scalar::Int(i64::zero()),
            DType::Float => Scalar::Float(f64::zero()),
            DType::Bool => Scalar::Bool(false),
        }
    }

    /// The multiplicative identity for a dtype (`ones` fill value).
    pub fn one(dtype: DType) -> Scalar {
        match dtype {
            DType::Int => Scalar::Int(i64::one()),
            DType::Float => Scalar::Float(f64::one()),
            DType::Bool => Scalar::Bool(true),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}
