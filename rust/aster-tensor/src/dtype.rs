use serde::{Deserialize, Serialize};

/// Element data types an Aster array can hold.
///
/// `char` and `unit` scalars exist in the language but never appear inside
/// arrays produced by the engine builtins, so the engine does not model them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Int,
    Float,
    Bool,
}

impl DType {
    /// Returns true if this dtype is numeric (int or float).
    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Int | DType::Float)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Int => write!(f, "int"),
            DType::Float => write!(f, "float"),
            DType::Bool => write!(f, "bool"),
        }
    }
}
