//! Scalar operation kernels shared by both array backends.

use crate::dtype::DType;
use crate::scalar::Scalar;
use crate::shape::ShapeError;
use thiserror::Error;

/// Error type for array operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("{0}")]
    Shape(#[from] ShapeError),
    #[error("operands have mismatched element types: {left} and {right}")]
    DTypeMismatch { left: DType, right: DType },
    #[error("operator '{op}' is not defined for {dtype} elements")]
    UnsupportedOp { op: &'static str, dtype: DType },
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Element-wise binary operators the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinOp {
    fn name(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Element-wise unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Apply a binary operator to two scalars of equal dtype.
///
/// Mixed dtypes are rejected rather than promoted: the language performs no
/// implicit numeric coercion, and the type checker has already required equal
/// base types, so a mismatch reaching this point is a runtime type error.
pub fn scalar_binary(op: BinOp, a: Scalar, b: Scalar) -> Result<Scalar, OpError> {
    if a.dtype() != b.dtype() {
        return Err(OpError::DTypeMismatch {
            left: a.dtype(),
            right: b.dtype(),
        });
    }
    match (a, b) {
        (Scalar::Int(x), Scalar::Int(y)) => int_binary(op, x, y),
        (Scalar::Float(x), Scalar::Float(y)) => float_binary(op, x, y),
        (Scalar::Bool(x), Scalar::Bool(y)) => bool_binary(op, x, y),
        _ => unreachable!("dtype equality checked above"),
    }
}

fn int_binary(op: BinOp, x: i64, y: i64) -> Result<Scalar, OpError> {
    let v = match op {
        BinOp::Add => Scalar::Int(x.wrapping_add(y)),
        BinOp::Sub => Scalar::Int(x.wrapping_sub(y)),
        BinOp::Mul => Scalar::Int(x.wrapping_mul(y)),
        BinOp::Div => {
            if y == 0 {
                return Err(OpError::DivisionByZero);
            }
            Scalar::Int(x.wrapping_div(y))
        }
        BinOp::Rem => {
            if y == 0 {
                return Err(OpError::DivisionByZero);
            }
            Scalar::Int(x.wrapping_rem(y))
        }
        BinOp::Eq => Scalar::Bool(x == y),
        BinOp::NotEq => Scalar::Bool(x != y),
        BinOp::Lt => Scalar::Bool(x < y),
        BinOp::LtEq => Scalar::Bool(x <= y),
        BinOp::Gt => Scalar::Bool(x > y),
        BinOp::GtEq => Scalar::Bool(x >= y),
        BinOp::And | BinOp::Or => {
            return Err(OpError::UnsupportedOp {
                op: op.name(),
                dtype: DType::Int,
            })
        }
    };
    Ok(v)
}

fn float_binary(op: BinOp, x: f64, y: f64) -> Result<Scalar, OpError> {
    let v = match op {
        BinOp::Add => Scalar::Float(x + y),
        BinOp::Sub => Scalar::Float(x - y),
        BinOp::Mul => Scalar::Float(x * y),
        BinOp::Div => {
            if y == 0.0 {
                return Err(OpError::DivisionByZero);
            }
            Scalar::Float(x / y)
        }
        BinOp::Rem => {
            if y == 0.0 {
                return Err(OpError::DivisionByZero);
            }
            Scalar::Float(x % y)
        }
        BinOp::Eq => Scalar::Bool(x == y),
        BinOp::NotEq => Scalar::Bool(x != y),
        BinOp::Lt => Scalar::Bool(x < y),
        BinOp::LtEq => Scalar::Bool(x <= y),
        BinOp::Gt => Scalar::Bool(x > y),
        BinOp::GtEq => Scalar::Bool(x >= y),
        BinOp::And | BinOp::Or => {
            return Err(OpError::UnsupportedOp {
                op: op.name(),
                dtype: DType::Float,
            })
        }
    };
    Ok(v)
}

fn bool_binary(op: BinOp, x: bool, y: bool) -> Result<Scalar, OpError> {
    let v = match op {
        BinOp::Eq => Scalar::Bool(x == y),
        BinOp::NotEq => Scalar::Bool(x != y),
        BinOp::And => Scalar::Bool(x && y),
        BinOp::Or => Scalar::Bool(x || y),
        _ => {
            return Err(OpError::UnsupportedOp {
                op: op.name(),
                dtype: DType::Bool,
            })
        }
    };
    Ok(v)
}

/// Apply a unary operator to a scalar.
pub fn scalar_unary(op: UnaryOp, a: Scalar) -> Result<Scalar, OpError> {
    match (op, a) {
        (UnaryOp::Neg, Scalar::Int(n)) => Ok(Scalar::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Scalar::Float(x)) => Ok(Scalar::Float(-x)),
        (UnaryOp::Neg, Scalar::Bool(_)) => Err(OpError::UnsupportedOp {
            op: "-",
            dtype: DType::Bool,
        }),
        (UnaryOp::Not, Scalar::Bool(b)) => Ok(Scalar::Bool(!b)),
        (UnaryOp::Not, s) => Err(OpError::UnsupportedOp {
            op: "not",
            dtype: s.dtype(),
        }),
    }
}
