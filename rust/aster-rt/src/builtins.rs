//! Native functions pre-registered in the global frame.

use crate::interpreter::RuntimeError;
use crate::values::{Builtin, Value};
use aster_tensor::{Backend, DType, NdArray, Shape};

/// Invoke a builtin on already-evaluated arguments.
pub fn call(backend: Backend, builtin: Builtin, args: &[Value]) -> Result<Value, RuntimeError> {
    match builtin {
        Builtin::Print => print(args),
        Builtin::Zeros => fill(backend, "zeros", args),
        Builtin::Ones => fill(backend, "ones", args),
        Builtin::Shape => shape(backend, args),
    }
}

/// `print(a, b, ...)` — space-separated values, one newline, unit result.
fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Unit)
}

/// Shared implementation of `zeros` and `ones`.
fn fill(backend: Backend, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.is_empty() || args.len() > 2 {
        return Err(RuntimeError::Builtin {
            name: name.into(),
            reason: format!("expected 1 or 2 arguments, got {}", args.len()),
        });
    }
    let dims = dims_argument(name, &args[0])?;
    let dtype = match args.get(1) {
        None => DType::Float,
        Some(tag) => element_tag(name, tag)?,
    };
    let array = match name {
        "zeros" => NdArray::zeros(backend, Shape::new(dims), dtype),
        _ => NdArray::ones(backend, Shape::new(dims), dtype),
    };
    Ok(Value::Array(array))
}

/// `shape(v)` — the dimensions of a value as a 1-D int vector; a scalar's
/// shape is the empty vector.
fn shape(backend: Backend, args: &[Value]) -> Result<Value, RuntimeError> {
    let [arg] = args else {
        return Err(RuntimeError::Builtin {
            name: "shape".into(),
            reason: format!("expected 1 argument, got {}", args.len()),
        });
    };
    let dims: Vec<i64> = match arg {
        Value::Array(a) => a.shape().dims().iter().map(|&d| d as i64).collect(),
        Value::Str(s) => vec![s.chars().count() as i64],
        _ => Vec::new(),
    };
    Ok(Value::Array(NdArray::int_vector(backend, &dims)?))
}

/// The dims argument: a 1-D sequence of non-negative ints.
fn dims_argument(name: &str, arg: &Value) -> Result<Vec<usize>, RuntimeError> {
    let Value::Array(a) = arg else {
        return Err(RuntimeError::Builtin {
            name: name.into(),
            reason: format!("dims must be an int sequence, got {}", arg.type_name()),
        });
    };
    if a.ndim() != 1 {
        return Err(RuntimeError::Builtin {
            name: name.into(),
            reason: format!("dims must be 1-dimensional, got rank {}", a.ndim()),
        });
    }
    let mut dims = Vec::new();
    for scalar in a.to_flat() {
        match scalar.as_int() {
            Some(n) if n >= 0 => dims.push(n as usize),
            _ => {
                return Err(RuntimeError::Builtin {
                    name: name.into(),
                    reason: format!("dims entries must be non-negative ints, got {}", scalar),
                })
            }
        }
    }
    Ok(dims)
}

/// The optional element type tag: `"int"` or `"float"`.
fn element_tag(name: &str, tag: &Value) -> Result<DType, RuntimeError> {
    match tag {
        Value::Str(s) if s == "int" => Ok(DType::Int),
        Value::Str(s) if s == "float" => Ok(DType::Float),
        other => Err(RuntimeError::Builtin {
            name: name.into(),
            reason: format!(
                "element type must be \"int\" or \"float\", got {}",
                other.type_name()
            ),
        }),
    }
}
