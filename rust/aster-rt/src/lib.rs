//! Aster runtime
//!
//! Tree-walking evaluation of (optionally typed) Aster programs:
//! runtime values, lexically scoped environment frames, the fixed builtin
//! set, and the interpreter itself.

pub mod builtins;
pub mod frame;
pub mod interpreter;
pub mod values;

pub use frame::{Frame, FrameRef};
pub use interpreter::{Interpreter, RuntimeError};
pub use values::{Builtin, ClosureValue, RecordValue, Value};
