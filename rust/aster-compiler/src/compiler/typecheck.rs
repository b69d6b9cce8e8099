//! Type inference and annotation for Aster.
//!
//! A single post-order pass computes a `Type` for every expression and
//! writes it into the node. Array dimensions take part in inference through
//! the rank-broadcasting rule on calls and operators.

use crate::compiler::ast::*;
use crate::compiler::tokens::Span;
use std::collections::HashMap;
use thiserror::Error;

/// Builtin functions the interpreter pre-registers in the global frame.
/// They are not expressible in the type language (variadic or value-dependent
/// ranks), so the annotator special-cases calls to them.
pub const BUILTINS: [&str; 4] = ["print", "zeros", "ones", "shape"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("type mismatch at line {line}: expected {expected}, got {actual}")]
    Mismatch {
        expected: String,
        actual: String,
        line: usize,
    },
    #[error("undefined variable '{name}' at line {line}")]
    UndefinedVar { name: String, line: usize },
    #[error("value of type {actual} is not callable at line {line}")]
    NotCallable { actual: String, line: usize },
    #[error("wrong number of arguments at line {line}: expected {expected}, got {actual}")]
    ArgCount {
        expected: usize,
        actual: usize,
        line: usize,
    },
    #[error("array literal at line {line} is not homogeneous: {first} vs {other}")]
    HeterogeneousArray {
        first: String,
        other: String,
        line: usize,
    },
    #[error("cannot infer the element type of an empty array literal at line {line}")]
    EmptyArray { line: usize },
    #[error("unknown record type '{name}' at line {line}")]
    UnknownRecord { name: String, line: usize },
    #[error("unknown field '{field}' on record '{record}' at line {line}")]
    UnknownField {
        field: String,
        record: String,
        line: usize,
    },
    #[error("missing field '{field}' in literal of record '{record}' at line {line}")]
    MissingField {
        field: String,
        record: String,
        line: usize,
    },
    #[error("field access on non-record value of type {actual} at line {line}")]
    FieldOnNonRecord { actual: String, line: usize },
    #[error(
        "argument rank too low at line {line}: parameter expects rank {expected}, argument has rank {actual}"
    )]
    UnderRank {
        expected: usize,
        actual: usize,
        line: usize,
    },
    #[error("incompatible broadcast ranks at line {line}: extra ranks {left} and {right}")]
    RankConflict {
        left: usize,
        right: usize,
        line: usize,
    },
    #[error("operator '{op}' cannot be applied to {actual} at line {line}")]
    BadOperand {
        op: String,
        actual: String,
        line: usize,
    },
    #[error("condition at line {line} must be a bool scalar, got {actual}")]
    Condition { actual: String, line: usize },
    #[error("assignment to undeclared variable '{name}' at line {line}")]
    AssignUndeclared { name: String, line: usize },
    #[error("cannot determine the type of variable '{name}' at line {line}")]
    CannotInfer { name: String, line: usize },
    #[error("cannot index a scalar of type {actual} at line {line}")]
    IndexScalar { actual: String, line: usize },
    #[error("builtin '{name}' at line {line}: {reason}")]
    Builtin {
        name: String,
        reason: String,
        line: usize,
    },
}

/// Options for opt-in strictness.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotateOptions {
    /// Cross-check record literals against the declared field schema.
    pub strict_record_fields: bool,
}

/// Identifier types plus the record schema registry.
///
/// Entering a block, lambda or function body snapshots the environment;
/// snapshots never write back to the enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    vars: HashMap<String, Type>,
    records: HashMap<String, Vec<(String, Type)>>,
}

impl TypeEnv {
    pub fn bind_var(&mut self, name: &str, ty: Type) {
        self.vars.insert(name.to_string(), ty);
    }

    pub fn lookup_var(&self, name: &str) -> Option<&Type> {
        self.vars.get(name)
    }

    pub fn bind_record(&mut self, name: &str, fields: Vec<(String, Type)>) {
        self.records.insert(name.to_string(), fields);
    }

    pub fn record_schema(&self, name: &str) -> Option<&[(String, Type)]> {
        self.records.get(name).map(|f| f.as_slice())
    }
}

pub struct Annotator {
    options: AnnotateOptions,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(AnnotateOptions::default())
    }
}

impl Annotator {
    pub fn new(options: AnnotateOptions) -> Self {
        Self { options }
    }

    /// Annotate a whole program in declaration order.
    pub fn annotate_program(&self, program: &mut Program) -> Result<(), TypeError> {
        let mut env = TypeEnv::default();
        for decl in &mut program.decls {
            self.check_decl(decl, &mut env)?;
        }
        Ok(())
    }

    /// Annotate a single expression against an existing environment.
    /// Used by drivers (the REPL's `:type` command) and tests.
    pub fn annotate_expr(&self, expr: &mut Expr, env: &TypeEnv) -> Result<Type, TypeError> {
        self.infer_expr(expr, env)
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Annotate a single declaration, binding it into `env`. Used by the
    /// program pass and by incremental drivers (the REPL).
    pub fn annotate_decl(&self, decl: &mut Decl, env: &mut TypeEnv) -> Result<(), TypeError> {
        self.check_decl(decl, env)
    }

    /// Annotate a single statement against `env`. Returns the expression
    /// type for expression statements.
    pub fn annotate_stmt(
        &self,
        stmt: &mut Stmt,
        env: &mut TypeEnv,
    ) -> Result<Option<Type>, TypeError> {
        self.check_stmt(stmt, env)
    }

    fn check_decl(&self, decl: &mut Decl, env: &mut TypeEnv) -> Result<(), TypeError> {
        match decl {
            Decl::Var(vd) => {
                let init_ty = match &mut vd.init {
                    Some(init) => Some(self.infer_expr(init, env)?),
                    None => None,
                };
                let var_ty = match (&vd.ty, init_ty) {
                    (Some(declared), Some(inferred)) => {
                        if *declared != inferred {
                            return Err(TypeError::Mismatch {
                                expected: declared.to_string(),
                                actual: inferred.to_string(),
                                line: vd.span.line,
                            });
                        }
                        declared.clone()
                    }
                    (Some(declared), None) => declared.clone(),
                    (None, Some(inferred)) => inferred,
                    (None, None) => {
                        return Err(TypeError::CannotInfer {
                            name: vd.name.clone(),
                            line: vd.span.line,
                        })
                    }
                };
                env.bind_var(&vd.name, var_ty.clone());
                vd.ty = Some(var_ty);
                Ok(())
            }
            Decl::Func(fd) => {
                let fn_ty = Type::new(
                    BaseType::Fn(FnType {
                        params: fd.params.iter().map(|p| p.ty.clone()).collect(),
                        ret: Box::new(fd.return_ty.clone()),
                    }),
                    0,
                );
                // Bound before the body is annotated so recursion resolves.
                env.bind_var(&fd.name, fn_ty);

                let mut local = env.clone();
                for p in &fd.params {
                    local.bind_var(&p.name, p.ty.clone());
                }
                let body_ty = self.infer_expr(&mut fd.body, &local)?;

                // A unit function may discard its body value; any other
                // declared return type must match the inferred body type.
                if fd.return_ty != Type::unit() && body_ty != fd.return_ty {
                    return Err(TypeError::Mismatch {
                        expected: fd.return_ty.to_string(),
                        actual: body_ty.to_string(),
                        line: fd.span.line,
                    });
                }
                Ok(())
            }
            Decl::Record(rd) => {
                let schema = rd
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.ty.clone()))
                    .collect();
                env.bind_record(&rd.name, schema);
                Ok(())
            }
        }
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// Check one statement; returns the expression type for expression
    /// statements (the block rule tracks the last one).
    fn check_stmt(&self, stmt: &mut Stmt, env: &mut TypeEnv) -> Result<Option<Type>, TypeError> {
        match stmt {
            Stmt::Expr(es) => {
                let ty = self.infer_expr(&mut es.expr, env)?;
                Ok(Some(ty))
            }
            Stmt::Assign(asgn) => {
                let lty = match &mut asgn.lvalue.kind {
                    ExprKind::Var(name) => {
                        let ty = env.lookup_var(name).cloned().ok_or_else(|| {
                            TypeError::AssignUndeclared {
                                name: name.clone(),
                                line: asgn.span.line,
                            }
                        })?;
                        asgn.lvalue.ty = Some(ty.clone());
                        ty
                    }
                    ExprKind::Field { .. } => self.infer_expr(&mut asgn.lvalue, env)?,
                    _ => {
                        return Err(TypeError::Mismatch {
                            expected: "assignable place".into(),
                            actual: "expression".into(),
                            line: asgn.span.line,
                        })
                    }
                };
                let rty = self.infer_expr(&mut asgn.rvalue, env)?;
                if lty.base != rty.base || lty.dim != rty.dim {
                    return Err(TypeError::Mismatch {
                        expected: lty.to_string(),
                        actual: rty.to_string(),
                        line: asgn.span.line,
                    });
                }
                Ok(None)
            }
            Stmt::Decl(ds) => {
                self.check_decl(&mut ds.decl, env)?;
                Ok(None)
            }
            Stmt::While(ws) => {
                let cond_ty = self.infer_expr(&mut ws.cond, env)?;
                if !cond_ty.is_bool_scalar() {
                    return Err(TypeError::Condition {
                        actual: cond_ty.to_string(),
                        line: ws.span.line,
                    });
                }
                self.check_stmt(&mut ws.body, env)?;
                Ok(None)
            }
        }
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn infer_expr(&self, expr: &mut Expr, env: &TypeEnv) -> Result<Type, TypeError> {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Lit(lit) => self.infer_lit(lit),
            ExprKind::Array(elems) => self.infer_array(elems, span, env)?,
            ExprKind::Record { name, fields } => self.infer_record(name, fields, span, env)?,
            ExprKind::Lambda { params, body } => self.infer_lambda(params, body, env)?,
            ExprKind::Var(name) => env.lookup_var(name).cloned().ok_or_else(|| {
                TypeError::UndefinedVar {
                    name: name.clone(),
                    line: span.line,
                }
            })?,
            ExprKind::Field { object, field } => self.infer_field(object, field, span, env)?,
            ExprKind::Call { callee, args } => self.infer_call(callee, args, span, env)?,
            ExprKind::OpCall { op, operands } => self.infer_op(*op, operands, span, env)?,
            ExprKind::Block(stmts) => self.infer_block(stmts, env)?,
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.infer_if(cond, then_branch, else_branch.as_deref_mut(), span, env)?,
        };
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn infer_lit(&self, lit: &Lit) -> Type {
        match lit {
            Lit::Bool(_) => Type::prim(Prim::Bool),
            Lit::Int(_) => Type::prim(Prim::Int),
            Lit::Float(_) => Type::prim(Prim::Float),
            Lit::Char(_) => Type::prim(Prim::Char),
            // A string is a rank-1 char array.
            Lit::Str(_) => Type::new(BaseType::Prim(Prim::Char), 1),
        }
    }

    fn infer_array(
        &self,
        elems: &mut [Expr],
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        let (first, rest) = match elems.split_first_mut() {
            Some(split) => split,
            None => return Err(TypeError::EmptyArray { line: span.line }),
        };
        let first_ty = self.infer_expr(first, env)?;
        for elem in rest {
            let elem_ty = self.infer_expr(elem, env)?;
            if elem_ty != first_ty {
                return Err(TypeError::HeterogeneousArray {
                    first: first_ty.to_string(),
                    other: elem_ty.to_string(),
                    line: span.line,
                });
            }
        }
        Ok(Type::new(first_ty.base, first_ty.dim + 1))
    }

    fn infer_record(
        &self,
        name: &str,
        fields: &mut [(String, Expr)],
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        if self.options.strict_record_fields {
            let schema: Vec<(String, Type)> = env
                .record_schema(name)
                .ok_or_else(|| TypeError::UnknownRecord {
                    name: name.to_string(),
                    line: span.line,
                })?
                .to_vec();
            for (fname, fexpr) in fields.iter_mut() {
                let fty = self.infer_expr(fexpr, env)?;
                let declared = schema
                    .iter()
                    .find(|(n, _)| n == fname)
                    .map(|(_, t)| t)
                    .ok_or_else(|| TypeError::UnknownField {
                        field: fname.clone(),
                        record: name.to_string(),
                        line: span.line,
                    })?;
                if *declared != fty {
                    return Err(TypeError::Mismatch {
                        expected: declared.to_string(),
                        actual: fty.to_string(),
                        line: span.line,
                    });
                }
            }
            for (fname, _) in &schema {
                if !fields.iter().any(|(n, _)| n == fname) {
                    return Err(TypeError::MissingField {
                        field: fname.clone(),
                        record: name.to_string(),
                        line: span.line,
                    });
                }
            }
        } else {
            for (_, fexpr) in fields.iter_mut() {
                self.infer_expr(fexpr, env)?;
            }
        }
        Ok(Type::new(BaseType::Record(name.to_string()), 0))
    }

    fn infer_lambda(
        &self,
        params: &[Param],
        body: &mut Expr,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        let mut local = env.clone();
        for p in params {
            local.bind_var(&p.name, p.ty.clone());
        }
        let body_ty = self.infer_expr(body, &local)?;
        Ok(Type::new(
            BaseType::Fn(FnType {
                params: params.iter().map(|p| p.ty.clone()).collect(),
                ret: Box::new(body_ty),
            }),
            0,
        ))
    }

    fn infer_field(
        &self,
        object: &mut Expr,
        field: &str,
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        let obj_ty = self.infer_expr(object, env)?;
        let record_name = match &obj_ty.base {
            BaseType::Record(name) => name.clone(),
            _ => {
                return Err(TypeError::FieldOnNonRecord {
                    actual: obj_ty.to_string(),
                    line: span.line,
                })
            }
        };
        let schema = env
            .record_schema(&record_name)
            .ok_or_else(|| TypeError::UnknownRecord {
                name: record_name.clone(),
                line: span.line,
            })?;
        let field_ty = schema
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| TypeError::UnknownField {
                field: field.to_string(),
                record: record_name,
                line: span.line,
            })?;
        // A field read off an array of records lifts by the receiver's rank.
        Ok(Type::new(field_ty.base, field_ty.dim + obj_ty.dim))
    }

    fn infer_call(
        &self,
        callee: &mut Expr,
        args: &mut [Expr],
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        // Builtins are runtime values whose types the type language cannot
        // spell; direct calls to an unshadowed builtin name are special-cased.
        if let ExprKind::Var(name) = &callee.kind {
            if BUILTINS.contains(&name.as_str()) && env.lookup_var(name).is_none() {
                let name = name.clone();
                return self.infer_builtin_call(&name, callee, args, span, env);
            }
        }

        let fn_ty = self.infer_expr(callee, env)?;
        let ft = match &fn_ty.base {
            BaseType::Fn(ft) => ft.clone(),
            _ => {
                return Err(TypeError::NotCallable {
                    actual: fn_ty.to_string(),
                    line: span.line,
                })
            }
        };
        if args.len() != ft.params.len() {
            return Err(TypeError::ArgCount {
                expected: ft.params.len(),
                actual: args.len(),
                line: span.line,
            });
        }

        // Rank-polymorphic broadcasting: each argument may exceed its
        // parameter's declared rank by an extra rank δ ≥ 0. All positive
        // extras must agree; the call result is lifted by the largest.
        let mut extras: Vec<usize> = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter_mut().zip(ft.params.iter()) {
            let arg_ty = self.infer_expr(arg, env)?;
            if arg_ty.base != param_ty.base {
                return Err(TypeError::Mismatch {
                    expected: param_ty.base.to_string(),
                    actual: arg_ty.base.to_string(),
                    line: span.line,
                });
            }
            if arg_ty.dim < param_ty.dim {
                return Err(TypeError::UnderRank {
                    expected: param_ty.dim,
                    actual: arg_ty.dim,
                    line: span.line,
                });
            }
            extras.push(arg_ty.dim - param_ty.dim);
        }
        let delta = Self::reconcile_extras(&extras, span)?;

        Ok(Type::new(
            ft.ret.base.clone(),
            ft.ret.dim + delta + fn_ty.dim,
        ))
    }

    /// Verify pairwise compatibility of extra ranks (each pair compatible iff
    /// one is zero or both are equal) and return their maximum.
    fn reconcile_extras(extras: &[usize], span: Span) -> Result<usize, TypeError> {
        let mut delta = 0usize;
        for &extra in extras {
            if extra == 0 {
                continue;
            }
            if delta != 0 && delta != extra {
                return Err(TypeError::RankConflict {
                    left: delta,
                    right: extra,
                    line: span.line,
                });
            }
            delta = extra;
        }
        Ok(delta)
    }

    fn infer_builtin_call(
        &self,
        name: &str,
        callee: &mut Expr,
        args: &mut [Expr],
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_tys.push(self.infer_expr(arg, env)?);
        }
        let result = match name {
            "print" => Type::unit(),
            "shape" => {
                if args.len() != 1 {
                    return Err(TypeError::ArgCount {
                        expected: 1,
                        actual: args.len(),
                        line: span.line,
                    });
                }
                Type::new(BaseType::Prim(Prim::Int), 1)
            }
            "zeros" | "ones" => {
                if args.is_empty() || args.len() > 2 {
                    return Err(TypeError::ArgCount {
                        expected: 1,
                        actual: args.len(),
                        line: span.line,
                    });
                }
                // The result rank equals the length of the dims sequence,
                // which is static information only for a literal.
                let rank = match &args[0].kind {
                    ExprKind::Array(elems) => elems.len(),
                    _ => {
                        return Err(TypeError::Builtin {
                            name: name.to_string(),
                            reason: "dims must be an array literal for static typing".into(),
                            line: span.line,
                        })
                    }
                };
                if arg_tys[0] != Type::new(BaseType::Prim(Prim::Int), 1) {
                    return Err(TypeError::Mismatch {
                        expected: "int[]".into(),
                        actual: arg_tys[0].to_string(),
                        line: span.line,
                    });
                }
                let elem = match args.get(1).map(|a| &a.kind) {
                    None => Prim::Float,
                    Some(ExprKind::Lit(Lit::Str(tag))) if tag == "float" => Prim::Float,
                    Some(ExprKind::Lit(Lit::Str(tag))) if tag == "int" => Prim::Int,
                    Some(_) => {
                        return Err(TypeError::Builtin {
                            name: name.to_string(),
                            reason: "element type tag must be \"int\" or \"float\"".into(),
                            line: span.line,
                        })
                    }
                };
                Type::new(BaseType::Prim(elem), rank)
            }
            _ => unreachable!("BUILTINS is exhaustive"),
        };
        // The callee still needs a type; synthesize the per-call signature.
        callee.ty = Some(Type::new(
            BaseType::Fn(FnType {
                params: arg_tys,
                ret: Box::new(result.clone()),
            }),
            0,
        ));
        Ok(result)
    }

    fn infer_op(
        &self,
        op: Op,
        operands: &mut [Expr],
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        match op {
            Op::Neg | Op::Not => {
                let [operand] = operands else {
                    return Err(TypeError::ArgCount {
                        expected: 1,
                        actual: operands.len(),
                        line: span.line,
                    });
                };
                let ty = self.infer_expr(operand, env)?;
                let ok = match op {
                    Op::Neg => matches!(ty.base, BaseType::Prim(p) if p.is_numeric()),
                    _ => ty.base == BaseType::Prim(Prim::Bool),
                };
                if !ok {
                    return Err(TypeError::BadOperand {
                        op: op.to_string(),
                        actual: ty.to_string(),
                        line: span.line,
                    });
                }
                Ok(ty)
            }
            Op::Index => {
                let [target, index] = operands else {
                    return Err(TypeError::ArgCount {
                        expected: 2,
                        actual: operands.len(),
                        line: span.line,
                    });
                };
                let target_ty = self.infer_expr(target, env)?;
                let index_ty = self.infer_expr(index, env)?;
                if target_ty.dim == 0 {
                    return Err(TypeError::IndexScalar {
                        actual: target_ty.to_string(),
                        line: span.line,
                    });
                }
                if index_ty != Type::prim(Prim::Int) {
                    return Err(TypeError::Mismatch {
                        expected: "int".into(),
                        actual: index_ty.to_string(),
                        line: span.line,
                    });
                }
                Ok(Type::new(target_ty.base, target_ty.dim - 1))
            }
            Op::MatMul => {
                let [lhs, rhs] = operands else {
                    return Err(TypeError::ArgCount {
                        expected: 2,
                        actual: operands.len(),
                        line: span.line,
                    });
                };
                let lt = self.infer_expr(lhs, env)?;
                let rt = self.infer_expr(rhs, env)?;
                let numeric = matches!(lt.base, BaseType::Prim(p) if p.is_numeric());
                if !numeric || lt.base != rt.base {
                    return Err(TypeError::BadOperand {
                        op: op.to_string(),
                        actual: format!("{} and {}", lt, rt),
                        line: span.line,
                    });
                }
                // The result rank is fixed by the operand ranks alone.
                let dim = match (lt.dim, rt.dim) {
                    (1, 1) => 0,
                    (2, 1) | (1, 2) => 1,
                    (2, 2) => 2,
                    _ => {
                        return Err(TypeError::BadOperand {
                            op: op.to_string(),
                            actual: format!("ranks {} and {}", lt.dim, rt.dim),
                            line: span.line,
                        })
                    }
                };
                Ok(Type::new(lt.base, dim))
            }
            Op::And | Op::Or => {
                let [lhs, rhs] = operands else {
                    return Err(TypeError::ArgCount {
                        expected: 2,
                        actual: operands.len(),
                        line: span.line,
                    });
                };
                for operand in [lhs, rhs] {
                    let ty = self.infer_expr(operand, env)?;
                    if !ty.is_bool_scalar() {
                        return Err(TypeError::BadOperand {
                            op: op.to_string(),
                            actual: ty.to_string(),
                            line: span.line,
                        });
                    }
                }
                Ok(Type::prim(Prim::Bool))
            }
            _ => {
                let [lhs, rhs] = operands else {
                    return Err(TypeError::ArgCount {
                        expected: 2,
                        actual: operands.len(),
                        line: span.line,
                    });
                };
                let lt = self.infer_expr(lhs, env)?;
                let rt = self.infer_expr(rhs, env)?;
                if lt.base != rt.base {
                    return Err(TypeError::Mismatch {
                        expected: lt.base.to_string(),
                        actual: rt.base.to_string(),
                        line: span.line,
                    });
                }
                // Operators broadcast with implicit parameter rank 0: the
                // operand ranks themselves are the extras.
                let result_dim = Self::reconcile_extras(&[lt.dim, rt.dim], span)?;

                let prim = match &lt.base {
                    BaseType::Prim(p) => Some(*p),
                    _ => None,
                };
                if op.is_arithmetic() {
                    match prim {
                        Some(p) if p.is_numeric() => Ok(Type::new(lt.base, result_dim)),
                        _ => Err(TypeError::BadOperand {
                            op: op.to_string(),
                            actual: lt.to_string(),
                            line: span.line,
                        }),
                    }
                } else {
                    // Equality holds for any pair of equal bases (records
                    // nominally, functions structurally); ordering needs
                    // numeric or char operands.
                    if op.is_ordering()
                        && !matches!(prim, Some(p) if p.is_numeric() || p == Prim::Char)
                    {
                        return Err(TypeError::BadOperand {
                            op: op.to_string(),
                            actual: lt.to_string(),
                            line: span.line,
                        });
                    }
                    Ok(Type::new(BaseType::Prim(Prim::Bool), result_dim))
                }
            }
        }
    }

    fn infer_block(&self, stmts: &mut [Stmt], env: &TypeEnv) -> Result<Type, TypeError> {
        let mut block_env = env.clone();
        let mut last_ty = None;
        for stmt in stmts.iter_mut() {
            if let Some(ty) = self.check_stmt(stmt, &mut block_env)? {
                last_ty = Some(ty);
            }
        }
        Ok(last_ty.unwrap_or_else(Type::unit))
    }

    fn infer_if(
        &self,
        cond: &mut Expr,
        then_branch: &mut Expr,
        else_branch: Option<&mut Expr>,
        span: Span,
        env: &TypeEnv,
    ) -> Result<Type, TypeError> {
        let cond_ty = self.infer_expr(cond, env)?;
        if !cond_ty.is_bool_scalar() {
            return Err(TypeError::Condition {
                actual: cond_ty.to_string(),
                line: span.line,
            });
        }
        let then_ty = self.infer_expr(then_branch, env)?;
        match else_branch {
            Some(els) => {
                let else_ty = self.infer_expr(els, env)?;
                if then_ty.base != else_ty.base || then_ty.dim != else_ty.dim {
                    return Err(TypeError::Mismatch {
                        expected: then_ty.to_string(),
                        actual: else_ty.to_string(),
                        line: span.line,
                    });
                }
                Ok(then_ty)
            }
            // With no else branch the form cannot produce a value.
            None => Ok(Type::unit()),
        }
    }
}
