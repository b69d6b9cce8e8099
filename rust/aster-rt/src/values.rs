//! Runtime value representation for the Aster interpreter.

use crate::frame::FrameRef;
use aster_compiler::compiler::ast::{Expr, Param, Type};
use aster_tensor::NdArray;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime values.
///
/// Records are wrapped in `Rc<RefCell<...>>` so that field assignment
/// through one binding is visible through every alias, matching the
/// record-as-mutable-mapping semantics. Closures share their body and
/// captured frame by reference; cloning a value never copies a frame.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Array(NdArray),
    Record(Rc<RefCell<RecordValue>>),
    Closure(Rc<ClosureValue>),
    Builtin(Builtin),
}

/// A record instance: nominal type name plus fields in insertion order.
#[derive(Debug, Clone)]
pub struct RecordValue {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, field: &str, value: Value) -> bool {
        for (name, slot) in &mut self.fields {
            if name == field {
                *slot = value;
                return true;
            }
        }
        false
    }
}

/// A user function or lambda paired with the frame captured at its
/// construction (lexical scope).
#[derive(Debug)]
pub struct ClosureValue {
    /// Function name for named definitions; lambdas have none.
    pub name: Option<String>,
    pub params: Vec<Param>,
    /// Declared return type, enforced after the body evaluates.
    pub return_ty: Option<Type>,
    pub body: Expr,
    pub captured: FrameRef,
}

/// The fixed set of native functions pre-registered in the global frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Zeros,
    Ones,
    Shape,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Zeros => "zeros",
            Builtin::Ones => "ones",
            Builtin::Shape => "shape",
        }
    }

    pub fn all() -> [Builtin; 4] {
        [Builtin::Print, Builtin::Zeros, Builtin::Ones, Builtin::Shape]
    }
}

impl Value {
    /// A short tag for error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Unit => "unit".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Char(_) => "char".into(),
            Value::Str(_) => "string".into(),
            Value::Array(a) => format!("array{}", a.shape()),
            Value::Record(r) => r.borrow().type_name.clone(),
            Value::Closure(_) => "function".into(),
            Value::Builtin(b) => format!("builtin {}", b.name()),
        }
    }

    /// Truthiness for conditions evaluated without static checking.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Char(c) => *c != '\0',
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "unit"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(a) => write!(f, "{}", a),
            Value::Record(r) => {
                let r = r.borrow();
                write!(f, "{}(", r.type_name)?;
                for (i, (name, value)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, ")")
            }
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<lambda>"),
            },
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name()),
        }
    }
}
