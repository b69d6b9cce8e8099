//! The tree-walking interpreter: strict, single-threaded evaluation over
//! environment frames.

use crate::builtins;
use crate::frame::{Frame, FrameRef};
use crate::values::{Builtin, ClosureValue, RecordValue, Value};
use aster_compiler::compiler::ast::*;
use aster_tensor::ops::{scalar_binary, scalar_unary, BinOp, OpError, UnaryOp};
use aster_tensor::{Backend, DType, NdArray, Scalar};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("name '{name}' not found in environment")]
    NameNotFound { name: String },
    #[error("attempt to call non-function value of type {actual}")]
    NotCallable { actual: String },
    #[error("function '{name}' expected {expected} args, got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("field access on non-record value of type {actual}")]
    FieldOnNonRecord { actual: String },
    #[error("field '{field}' not found in record '{record}'")]
    UnknownField { field: String, record: String },
    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    OperandTypes {
        op: String,
        left: String,
        right: String,
    },
    #[error("operator '{op}' cannot be applied to {operand}")]
    UnaryOperand { op: String, operand: String },
    #[error("index must be an int, got {actual}")]
    BadIndex { actual: String },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("value of type {actual} cannot be an array element")]
    BadArrayElement { actual: String },
    #[error("{0}")]
    Array(#[from] OpError),
    #[error("builtin '{name}': {reason}")]
    Builtin { name: String, reason: String },
    #[error("unsupported statement or declaration: {what}")]
    Unsupported { what: String },
}

/// Evaluates programs against a global frame with pre-registered builtins.
pub struct Interpreter {
    globals: FrameRef,
    backend: Backend,
    /// Record name → declared field schema, registered by record
    /// declarations as they execute.
    records: RefCell<HashMap<String, Vec<(String, Type)>>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Backend::default())
    }
}

impl Interpreter {
    pub fn new(backend: Backend) -> Self {
        let globals = Frame::root();
        for builtin in Builtin::all() {
            Frame::define(&globals, builtin.name(), Value::Builtin(builtin));
        }
        Self {
            globals,
            backend,
            records: RefCell::new(HashMap::new()),
        }
    }

    pub fn globals(&self) -> &FrameRef {
        &self.globals
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The declared field schema of a registered record type.
    pub fn record_schema(&self, name: &str) -> Option<Vec<(String, Type)>> {
        self.records.borrow().get(name).cloned()
    }

    /// Execute the top-level declarations in order.
    pub fn run_program(&self, program: &Program) -> Result<(), RuntimeError> {
        for decl in &program.decls {
            self.exec_decl(decl, &self.globals)?;
        }
        Ok(())
    }

    /// Call a named function in the global frame (drivers synthesize the
    /// entry call; no `main` is invoked implicitly).
    pub fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let callee = Frame::lookup(&self.globals, name).ok_or_else(|| {
            RuntimeError::NameNotFound {
                name: name.to_string(),
            }
        })?;
        self.call_value(callee, args)
    }

    // ── Declarations ────────────────────────────────────────────────────

    fn exec_decl(&self, decl: &Decl, frame: &FrameRef) -> Result<(), RuntimeError> {
        match decl {
            Decl::Var(vd) => {
                let value = match &vd.init {
                    Some(init) => {
                        let v = self.eval_expr(init, frame)?;
                        if let Some(ty) = &vd.ty {
                            self.check_value_type(ty, &v)?;
                        }
                        v
                    }
                    // Uninitialized declarations bind the unit value.
                    None => Value::Unit,
                };
                Frame::define(frame, &vd.name, value);
                Ok(())
            }
            Decl::Func(fd) => {
                let closure = ClosureValue {
                    name: Some(fd.name.clone()),
                    params: fd.params.clone(),
                    return_ty: Some(fd.return_ty.clone()),
                    body: fd.body.clone(),
                    captured: Rc::clone(frame),
                };
                Frame::define(frame, &fd.name, Value::Closure(Rc::new(closure)));
                Ok(())
            }
            Decl::Record(rd) => {
                let schema = rd
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.ty.clone()))
                    .collect();
                self.records.borrow_mut().insert(rd.name.clone(), schema);
                Ok(())
            }
        }
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// Execute one statement; expression statements yield their value.
    pub fn exec_stmt(&self, stmt: &Stmt, frame: &FrameRef) -> Result<Option<Value>, RuntimeError> {
        match stmt {
            Stmt::Expr(es) => Ok(Some(self.eval_expr(&es.expr, frame)?)),
            Stmt::Assign(asgn) => {
                let value = self.eval_expr(&asgn.rvalue, frame)?;
                match &asgn.lvalue.kind {
                    ExprKind::Var(name) => {
                        // Write where the binding lives; fall back to a new
                        // local binding when the name is unbound anywhere.
                        if !Frame::assign(frame, name, value.clone()) {
                            Frame::define(frame, name, value);
                        }
                        Ok(None)
                    }
                    ExprKind::Field { object, field } => {
                        let record = match self.eval_expr(object, frame)? {
                            Value::Record(r) => r,
                            other => {
                                return Err(RuntimeError::FieldOnNonRecord {
                                    actual: other.type_name(),
                                })
                            }
                        };
                        let mut record = record.borrow_mut();
                        if !record.set(field, value) {
                            return Err(RuntimeError::UnknownField {
                                field: field.clone(),
                                record: record.type_name.clone(),
                            });
                        }
                        Ok(None)
                    }
                    _ => Err(RuntimeError::Unsupported {
                        what: "assignment target".into(),
                    }),
                }
            }
            Stmt::Decl(ds) => {
                self.exec_decl(&ds.decl, frame)?;
                Ok(None)
            }
            Stmt::While(ws) => {
                loop {
                    let cond = self.eval_expr(&ws.cond, frame)?;
                    if !cond.is_truthy() {
                        break;
                    }
                    self.exec_stmt(&ws.body, frame)?;
                }
                Ok(None)
            }
        }
    }

    // ── Expressions ─────────────────────────────────────────────────────

    pub fn eval_expr(&self, expr: &Expr, frame: &FrameRef) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Lit(lit) => Ok(match lit {
                Lit::Bool(b) => Value::Bool(*b),
                Lit::Int(n) => Value::Int(*n),
                Lit::Float(x) => Value::Float(*x),
                Lit::Char(c) => Value::Char(*c),
                Lit::Str(s) => Value::Str(s.clone()),
            }),
            ExprKind::Array(elems) => {
                let mut parts = Vec::with_capacity(elems.len());
                for elem in elems {
                    let v = self.eval_expr(elem, frame)?;
                    parts.push(self.value_to_array(v)?);
                }
                Ok(Value::Array(NdArray::stack(parts)?))
            }
            ExprKind::Record { name, fields } => {
                let mut values = Vec::with_capacity(fields.len());
                for (fname, fexpr) in fields {
                    values.push((fname.clone(), self.eval_expr(fexpr, frame)?));
                }
                Ok(Value::Record(Rc::new(RefCell::new(RecordValue {
                    type_name: name.clone(),
                    fields: values,
                }))))
            }
            ExprKind::Lambda { params, body } => Ok(Value::Closure(Rc::new(ClosureValue {
                name: None,
                params: params.clone(),
                return_ty: None,
                body: (**body).clone(),
                captured: Rc::clone(frame),
            }))),
            ExprKind::Var(name) => {
                Frame::lookup(frame, name).ok_or_else(|| RuntimeError::NameNotFound {
                    name: name.clone(),
                })
            }
            ExprKind::Field { object, field } => {
                let record = match self.eval_expr(object, frame)? {
                    Value::Record(r) => r,
                    other => {
                        return Err(RuntimeError::FieldOnNonRecord {
                            actual: other.type_name(),
                        })
                    }
                };
                let record = record.borrow();
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownField {
                        field: field.clone(),
                        record: record.type_name.clone(),
                    })
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval_expr(callee, frame)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, frame)?);
                }
                self.call_value(callee, arg_values)
            }
            ExprKind::OpCall { op, operands } => {
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    values.push(self.eval_expr(operand, frame)?);
                }
                self.eval_op(*op, values)
            }
            ExprKind::Block(stmts) => {
                let local = Frame::child(frame);
                let mut last = None;
                for stmt in stmts {
                    if let Some(v) = self.exec_stmt(stmt, &local)? {
                        last = Some(v);
                    }
                }
                Ok(last.unwrap_or(Value::Unit))
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval_expr(cond, frame)?;
                if cond.is_truthy() {
                    self.eval_expr(then_branch, frame)
                } else {
                    match else_branch {
                        Some(els) => self.eval_expr(els, frame),
                        None => Ok(Value::Unit),
                    }
                }
            }
        }
    }

    // ── Calls ───────────────────────────────────────────────────────────

    fn call_value(&self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => builtins::call(self.backend, builtin, &args),
            Value::Closure(closure) => {
                if args.len() != closure.params.len() {
                    return Err(RuntimeError::Arity {
                        name: closure.name.clone().unwrap_or_else(|| "<lambda>".into()),
                        expected: closure.params.len(),
                        actual: args.len(),
                    });
                }
                // The call frame's parent is the frame captured at the
                // closure's construction, never the caller's frame.
                let call_frame = Frame::child(&closure.captured);
                for (param, arg) in closure.params.iter().zip(args) {
                    self.check_value_type(&param.ty, &arg)?;
                    Frame::define(&call_frame, &param.name, arg);
                }
                let result = self.eval_expr(&closure.body, &call_frame)?;
                if let Some(ret_ty) = &closure.return_ty {
                    self.check_value_type(ret_ty, &result)?;
                }
                Ok(result)
            }
            other => Err(RuntimeError::NotCallable {
                actual: other.type_name(),
            }),
        }
    }

    /// Check a runtime value against a declared type, up to broadcasting:
    /// the value's rank may exceed the declared rank, mirroring the static
    /// rule that lifts arguments by an extra rank.
    fn check_value_type(&self, expected: &Type, value: &Value) -> Result<(), RuntimeError> {
        let mismatch = || RuntimeError::TypeMismatch {
            expected: expected.to_string(),
            actual: value.type_name(),
        };
        match &expected.base {
            BaseType::Prim(p) => {
                let (base_ok, rank) = match (p, value) {
                    (Prim::Int, Value::Int(_)) => (true, 0),
                    (Prim::Float, Value::Float(_)) => (true, 0),
                    (Prim::Bool, Value::Bool(_)) => (true, 0),
                    (Prim::Char, Value::Char(_)) => (true, 0),
                    (Prim::Char, Value::Str(_)) => (true, 1),
                    (Prim::Unit, Value::Unit) => (true, 0),
                    (_, Value::Array(a)) => {
                        let dtype_ok = matches!(
                            (p, a.dtype()),
                            (Prim::Int, DType::Int)
                                | (Prim::Float, DType::Float)
                                | (Prim::Bool, DType::Bool)
                        );
                        (dtype_ok, a.ndim())
                    }
                    _ => (false, 0),
                };
                if !base_ok || rank < expected.dim {
                    return Err(mismatch());
                }
                Ok(())
            }
            BaseType::Record(name) => match value {
                Value::Record(r) if r.borrow().type_name == *name => Ok(()),
                _ => Err(mismatch()),
            },
            BaseType::Fn(_) => match value {
                Value::Closure(_) | Value::Builtin(_) => Ok(()),
                _ => Err(mismatch()),
            },
        }
    }

    // ── Operators ───────────────────────────────────────────────────────

    fn eval_op(&self, op: Op, mut values: Vec<Value>) -> Result<Value, RuntimeError> {
        match (op, values.len()) {
            (Op::Neg | Op::Not, 1) => {
                let operand = values.remove(0);
                self.eval_unary(op, operand)
            }
            (Op::Index, 2) => {
                let index = values.remove(1);
                let target = values.remove(0);
                self.eval_index(target, index)
            }
            (Op::MatMul, 2) => {
                let rhs = values.remove(1);
                let lhs = values.remove(0);
                let a = self.value_to_array(lhs)?;
                let b = self.value_to_array(rhs)?;
                Ok(self.array_result(a.matmul(&b)?))
            }
            (_, 2) => {
                let rhs = values.remove(1);
                let lhs = values.remove(0);
                self.eval_binary(op, lhs, rhs)
            }
            (_, n) => Err(RuntimeError::Arity {
                name: format!("operator {}", op),
                expected: 2,
                actual: n,
            }),
        }
    }

    fn eval_unary(&self, op: Op, operand: Value) -> Result<Value, RuntimeError> {
        let unary = match op {
            Op::Neg => UnaryOp::Neg,
            _ => UnaryOp::Not,
        };
        match operand {
            Value::Array(a) => Ok(self.array_result(a.unary(unary)?)),
            other => match Self::value_to_scalar(&other) {
                Some(s) => Ok(Self::scalar_to_value(scalar_unary(unary, s)?)),
                None => Err(RuntimeError::UnaryOperand {
                    op: op.to_string(),
                    operand: other.type_name(),
                }),
            },
        }
    }

    fn eval_index(&self, target: Value, index: Value) -> Result<Value, RuntimeError> {
        let i = match index {
            Value::Int(i) => i,
            other => {
                return Err(RuntimeError::BadIndex {
                    actual: other.type_name(),
                })
            }
        };
        match target {
            Value::Array(a) => {
                let len = *a.shape().dims().first().unwrap_or(&0);
                let idx = Self::resolve_index(i, len)?;
                let sub = a
                    .index_axis(idx)
                    .map_err(|e| RuntimeError::Array(OpError::Shape(e)))?;
                Ok(self.array_result(sub))
            }
            // Strings index to chars, matching their char[] typing.
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = Self::resolve_index(i, chars.len())?;
                Ok(Value::Char(chars[idx]))
            }
            other => Err(RuntimeError::OperandTypes {
                op: "[]".into(),
                left: other.type_name(),
                right: "int".into(),
            }),
        }
    }

    /// Negative indices count from the end, as the array engine's host
    /// libraries do.
    fn resolve_index(i: i64, len: usize) -> Result<usize, RuntimeError> {
        let idx = if i < 0 { i + len as i64 } else { i };
        if idx < 0 || idx as usize >= len {
            return Err(RuntimeError::IndexOutOfBounds { index: i, len });
        }
        Ok(idx as usize)
    }

    fn eval_binary(&self, op: Op, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        let bin = match op {
            Op::Add => BinOp::Add,
            Op::Sub => BinOp::Sub,
            Op::Mul => BinOp::Mul,
            Op::Div => BinOp::Div,
            Op::Rem => BinOp::Rem,
            Op::Eq => BinOp::Eq,
            Op::NotEq => BinOp::NotEq,
            Op::Lt => BinOp::Lt,
            Op::LtEq => BinOp::LtEq,
            Op::Gt => BinOp::Gt,
            Op::GtEq => BinOp::GtEq,
            Op::And => BinOp::And,
            Op::Or => BinOp::Or,
            _ => {
                return Err(RuntimeError::OperandTypes {
                    op: op.to_string(),
                    left: lhs.type_name(),
                    right: rhs.type_name(),
                })
            }
        };

        // Array-aware dispatch: any array operand routes through the engine
        // with broadcasting; scalars are lifted to rank-0 arrays.
        if matches!(lhs, Value::Array(_)) || matches!(rhs, Value::Array(_)) {
            let a = self.value_to_array(lhs)?;
            let b = self.value_to_array(rhs)?;
            return Ok(self.array_result(a.binary(bin, &b)?));
        }

        // char and string comparisons stay outside the engine.
        match (&lhs, &rhs) {
            (Value::Char(a), Value::Char(b)) => {
                if let Some(v) = Self::compare(bin, a.cmp(b)) {
                    return Ok(v);
                }
            }
            (Value::Str(a), Value::Str(b)) => {
                if let Some(v) = Self::compare(bin, a.cmp(b)) {
                    return Ok(v);
                }
            }
            _ => {}
        }

        // Equality on values the scalar kernels do not model: unit,
        // records (name plus fields) and functions (identity).
        if matches!(bin, BinOp::Eq | BinOp::NotEq) {
            if let Some(equal) = Self::structural_eq(&lhs, &rhs) {
                let b = if bin == BinOp::Eq { equal } else { !equal };
                return Ok(Value::Bool(b));
            }
        }

        match (Self::value_to_scalar(&lhs), Self::value_to_scalar(&rhs)) {
            (Some(a), Some(b)) => Ok(Self::scalar_to_value(scalar_binary(bin, a, b)?)),
            _ => Err(RuntimeError::OperandTypes {
                op: op.to_string(),
                left: lhs.type_name(),
                right: rhs.type_name(),
            }),
        }
    }

    /// Equality for the value kinds the scalar kernels cannot compare.
    /// `None` means the pair is not one of them (or is mismatched) and the
    /// normal paths decide.
    fn structural_eq(lhs: &Value, rhs: &Value) -> Option<bool> {
        match (lhs, rhs) {
            (Value::Unit, Value::Unit) => Some(true),
            (Value::Record(a), Value::Record(b)) => Some(Self::records_equal(a, b)),
            (Value::Closure(a), Value::Closure(b)) => Some(Rc::ptr_eq(a, b)),
            (Value::Builtin(a), Value::Builtin(b)) => Some(a == b),
            _ => None,
        }
    }

    fn records_equal(a: &Rc<RefCell<RecordValue>>, b: &Rc<RefCell<RecordValue>>) -> bool {
        if Rc::ptr_eq(a, b) {
            return true;
        }
        let a = a.borrow();
        let b = b.borrow();
        a.type_name == b.type_name
            && a.fields.len() == b.fields.len()
            && a.fields
                .iter()
                .zip(b.fields.iter())
                .all(|((na, va), (nb, vb))| na == nb && Self::value_eq(va, vb))
    }

    /// Deep equality over runtime values, used for record fields.
    fn value_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Char(x), Value::Char(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Array(x), Value::Array(y)) => {
                x.shape() == y.shape() && x.to_flat() == y.to_flat()
            }
            _ => Self::structural_eq(a, b).unwrap_or(false),
        }
    }

    fn compare(op: BinOp, ordering: std::cmp::Ordering) -> Option<Value> {
        use std::cmp::Ordering::*;
        let b = match op {
            BinOp::Eq => ordering == Equal,
            BinOp::NotEq => ordering != Equal,
            BinOp::Lt => ordering == Less,
            BinOp::LtEq => ordering != Greater,
            BinOp::Gt => ordering == Greater,
            BinOp::GtEq => ordering != Less,
            _ => return None,
        };
        Some(Value::Bool(b))
    }

    // ── Array plumbing ──────────────────────────────────────────────────

    fn value_to_scalar(value: &Value) -> Option<Scalar> {
        match value {
            Value::Int(n) => Some(Scalar::Int(*n)),
            Value::Float(x) => Some(Scalar::Float(*x)),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            _ => None,
        }
    }

    fn scalar_to_value(scalar: Scalar) -> Value {
        match scalar {
            Scalar::Int(n) => Value::Int(n),
            Scalar::Float(x) => Value::Float(x),
            Scalar::Bool(b) => Value::Bool(b),
        }
    }

    fn value_to_array(&self, value: Value) -> Result<NdArray, RuntimeError> {
        match value {
            Value::Array(a) => Ok(a),
            other => match Self::value_to_scalar(&other) {
                Some(s) => Ok(NdArray::scalar(self.backend, s)),
                None => Err(RuntimeError::BadArrayElement {
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Rank-0 engine results come back to the scalar world.
    fn array_result(&self, array: NdArray) -> Value {
        match array.to_scalar() {
            Some(s) => Self::scalar_to_value(s),
            None => Value::Array(array),
        }
    }
}
