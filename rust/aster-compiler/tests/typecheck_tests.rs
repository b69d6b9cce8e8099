//! Type annotator tests: literal rules, array homogeneity, scope, the
//! rank-broadcasting call rule, and declaration/assignment checks.

use aster_compiler::compiler::ast::*;
use aster_compiler::compiler::tokens::Span;
use aster_compiler::compiler::typecheck::{
    AnnotateOptions, Annotator, TypeEnv, TypeError,
};
use aster_compiler::{check, parse_expr, FrontendError};

fn assert_checks(source: &str) -> Program {
    match check(source) {
        Ok(p) => p,
        Err(e) => panic!("expected source to check, got {}:\n{}", e, source),
    }
}

fn assert_type_error(source: &str) -> TypeError {
    match check(source) {
        Ok(_) => panic!("expected type error for:\n{}", source),
        Err(FrontendError::Type(e)) => e,
        Err(other) => panic!("expected type error, got {}", other),
    }
}

/// Infer the type of an expression under explicit bindings.
fn infer_with(env: &TypeEnv, source: &str) -> Result<Type, TypeError> {
    let mut expr = parse_expr(source).expect("expression parses");
    Annotator::default().annotate_expr(&mut expr, env)
}

fn infer(source: &str) -> Type {
    infer_with(&TypeEnv::default(), source).expect("expression types")
}

fn int_ty(dim: usize) -> Type {
    Type::new(BaseType::Prim(Prim::Int), dim)
}

fn fn_ty(params: Vec<Type>, ret: Type, dim: usize) -> Type {
    Type::new(
        BaseType::Fn(FnType {
            params,
            ret: Box::new(ret),
        }),
        dim,
    )
}

// ── Literals ────────────────────────────────────────────────────────────

#[test]
fn literal_types() {
    assert_eq!(infer("true"), Type::prim(Prim::Bool));
    assert_eq!(infer("42"), Type::prim(Prim::Int));
    assert_eq!(infer("3.14"), Type::prim(Prim::Float));
    assert_eq!(infer("1e3"), Type::prim(Prim::Float));
    assert_eq!(infer("'a'"), Type::prim(Prim::Char));
    // Strings are rank-1 char arrays.
    assert_eq!(infer("\"hi\""), Type::new(BaseType::Prim(Prim::Char), 1));
}

// ── Array literals ──────────────────────────────────────────────────────

#[test]
fn array_literal_lifts_dimension() {
    let program = assert_checks("int v[3] = {1, 2, 3};");
    let Decl::Var(v) = &program.decls[0] else { panic!() };
    assert_eq!(v.init.as_ref().unwrap().ty, Some(int_ty(1)));

    let program = assert_checks("int m[2][2] = {{1, 2}, {3, 4}};");
    let Decl::Var(v) = &program.decls[0] else { panic!() };
    assert_eq!(v.init.as_ref().unwrap().ty, Some(int_ty(2)));
}

#[test]
fn heterogeneous_array_is_an_error() {
    assert!(matches!(
        assert_type_error("float v[2] = {1, 2.0};"),
        TypeError::HeterogeneousArray { .. }
    ));
    // Mixed dimensions are heterogeneous too.
    let mut env = TypeEnv::default();
    env.bind_var("row", int_ty(1));
    assert!(matches!(
        infer_with(&env, "{row, 1}"),
        Err(TypeError::HeterogeneousArray { .. })
    ));
}

#[test]
fn empty_array_literal_is_an_error() {
    assert!(matches!(
        assert_type_error("int v[1] = {};"),
        TypeError::EmptyArray { .. }
    ));
}

// ── Declarations ────────────────────────────────────────────────────────

#[test]
fn scalar_arithmetic_declaration() {
    // S1: int x = 3 + 4; binds x at int rank 0.
    let program = assert_checks("int x = 3 + 4;");
    let Decl::Var(v) = &program.decls[0] else { panic!() };
    assert_eq!(v.ty, Some(int_ty(0)));
}

#[test]
fn declared_and_inferred_types_must_agree() {
    // S5: the mismatch is caught statically.
    assert!(matches!(
        assert_type_error("int z = 3.14;"),
        TypeError::Mismatch { .. }
    ));
    assert!(matches!(
        assert_type_error("int v = {1, 2};"),
        TypeError::Mismatch { .. }
    ));
}

#[test]
fn function_body_must_match_declared_return() {
    assert_checks("int f(int a) { return a + 1; }");
    assert!(matches!(
        assert_type_error("int f(int a) { return 1.5; }"),
        TypeError::Mismatch { .. }
    ));
    // Unit functions may discard their body value.
    assert_checks("unit f(int a) { a + 1; }");
}

#[test]
fn recursion_types_through_early_binding() {
    // S6's static half: the name is bound before the body is annotated.
    assert_checks(
        r#"
        int fact(int n) {
            if (n == 0) return 1; else return n * fact(n - 1);
        }
        "#,
    );
}

// ── Scope ───────────────────────────────────────────────────────────────

#[test]
fn block_bindings_do_not_escape() {
    assert!(matches!(
        assert_type_error("int main() { { int y = 1; } return y; }"),
        TypeError::UndefinedVar { .. }
    ));
}

#[test]
fn undefined_variable_is_reported() {
    let err = assert_type_error("int x = nope;");
    assert!(matches!(err, TypeError::UndefinedVar { ref name, .. } if name == "nope"));
}

#[test]
fn assignment_requires_prior_declaration() {
    assert!(matches!(
        assert_type_error("int main() { y = 1; }"),
        TypeError::AssignUndeclared { .. }
    ));
    assert!(matches!(
        assert_type_error("int main() { int y = 1; y = 2.0; }"),
        TypeError::Mismatch { .. }
    ));
    assert_checks("int main() { int y = 1; y = 2; return y; }");
}

// ── Broadcasting ────────────────────────────────────────────────────────

#[test]
fn broadcasting_identity() {
    // f : (int) -> int applied to rank-k arguments returns rank k.
    let mut env = TypeEnv::default();
    env.bind_var("f", fn_ty(vec![int_ty(0)], int_ty(0), 0));
    env.bind_var("xs", int_ty(2));

    assert_eq!(infer_with(&env, "f(1)").unwrap(), int_ty(0));
    assert_eq!(infer_with(&env, "f(xs)").unwrap(), int_ty(2));
}

#[test]
fn broadcasting_requires_compatible_extras() {
    let mut env = TypeEnv::default();
    env.bind_var("g", fn_ty(vec![int_ty(0), int_ty(0)], int_ty(0), 0));
    env.bind_var("v", int_ty(1));
    env.bind_var("m", int_ty(2));

    // Equal extras and scalar extras are fine.
    assert_eq!(infer_with(&env, "g(v, v)").unwrap(), int_ty(1));
    assert_eq!(infer_with(&env, "g(1, m)").unwrap(), int_ty(2));
    // Two distinct positive extras are not.
    assert!(matches!(
        infer_with(&env, "g(v, m)"),
        Err(TypeError::RankConflict { left: 1, right: 2, .. })
    ));
}

#[test]
fn under_rank_argument_is_an_error() {
    let mut env = TypeEnv::default();
    env.bind_var("sum", fn_ty(vec![int_ty(1)], int_ty(0), 0));
    assert!(matches!(
        infer_with(&env, "sum(3)"),
        Err(TypeError::UnderRank { expected: 1, actual: 0, .. })
    ));
}

#[test]
fn call_rank_adds_function_value_rank() {
    // A rank-1 function value lifts the call result by one more rank.
    let mut env = TypeEnv::default();
    env.bind_var("fs", fn_ty(vec![int_ty(0)], int_ty(0), 1));
    env.bind_var("xs", int_ty(1));
    assert_eq!(infer_with(&env, "fs(1)").unwrap(), int_ty(1));
    assert_eq!(infer_with(&env, "fs(xs)").unwrap(), int_ty(2));
}

#[test]
fn argument_base_types_must_match() {
    let mut env = TypeEnv::default();
    env.bind_var("f", fn_ty(vec![int_ty(0)], int_ty(0), 0));
    assert!(matches!(
        infer_with(&env, "f(1.5)"),
        Err(TypeError::Mismatch { .. })
    ));
    assert!(matches!(
        infer_with(&env, "f(1, 2)"),
        Err(TypeError::ArgCount { expected: 1, actual: 2, .. })
    ));
}

#[test]
fn calling_a_non_function_fails() {
    let mut env = TypeEnv::default();
    env.bind_var("x", int_ty(0));
    assert!(matches!(
        infer_with(&env, "x(1)"),
        Err(TypeError::NotCallable { .. })
    ));
}

// ── Operators ───────────────────────────────────────────────────────────

#[test]
fn operator_result_types() {
    assert_eq!(infer("1 + 2"), int_ty(0));
    assert_eq!(infer("1.0 / 2.0"), Type::prim(Prim::Float));
    assert_eq!(infer("1 < 2"), Type::prim(Prim::Bool));
    assert_eq!(infer("true and false"), Type::prim(Prim::Bool));
    assert_eq!(infer("!true"), Type::prim(Prim::Bool));
    assert_eq!(infer("-3"), int_ty(0));
    assert_eq!(infer("'a' == 'b'"), Type::prim(Prim::Bool));
}

#[test]
fn operator_broadcasting_uses_max_rank() {
    let mut env = TypeEnv::default();
    env.bind_var("v", int_ty(1));
    env.bind_var("m", int_ty(2));

    assert_eq!(infer_with(&env, "v + 1").unwrap(), int_ty(1));
    assert_eq!(infer_with(&env, "m * m").unwrap(), int_ty(2));
    // Comparisons go element-wise to bool arrays.
    assert_eq!(
        infer_with(&env, "m < m").unwrap(),
        Type::new(BaseType::Prim(Prim::Bool), 2)
    );
    // Distinct positive ranks conflict, as in calls.
    assert!(matches!(
        infer_with(&env, "v + m"),
        Err(TypeError::RankConflict { .. })
    ));
}

#[test]
fn operator_operand_restrictions() {
    let mut env = TypeEnv::default();
    env.bind_var("bs", Type::new(BaseType::Prim(Prim::Bool), 1));

    assert!(matches!(
        infer_with(&TypeEnv::default(), "1 + 2.0"),
        Err(TypeError::Mismatch { .. })
    ));
    assert!(matches!(
        infer_with(&env, "1 and 2"),
        Err(TypeError::BadOperand { .. })
    ));
    // Logical operators need bool *scalars*.
    assert!(matches!(
        infer_with(&env, "bs and bs"),
        Err(TypeError::BadOperand { .. })
    ));
    assert!(matches!(
        infer_with(&env, "true + false"),
        Err(TypeError::BadOperand { .. })
    ));
    assert!(matches!(
        infer_with(&env, "'a' < 1"),
        Err(TypeError::Mismatch { .. })
    ));
}

#[test]
fn equality_extends_to_records_and_functions() {
    let mut env = TypeEnv::default();
    env.bind_var("p", Type::new(BaseType::Record("Point".into()), 0));
    env.bind_var("q", Type::new(BaseType::Record("Point".into()), 0));
    env.bind_var("c", Type::new(BaseType::Record("Color".into()), 0));
    env.bind_var("f", fn_ty(vec![int_ty(0)], int_ty(0), 0));

    assert_eq!(infer_with(&env, "p == q").unwrap(), Type::prim(Prim::Bool));
    assert_eq!(infer_with(&env, "f != f").unwrap(), Type::prim(Prim::Bool));
    // Nominal typing: differently-named records do not share a base.
    assert!(matches!(
        infer_with(&env, "p == c"),
        Err(TypeError::Mismatch { .. })
    ));
    // Ordering stays restricted to numeric and char operands.
    assert!(matches!(
        infer_with(&env, "p < q"),
        Err(TypeError::BadOperand { .. })
    ));
}

#[test]
fn indexing_drops_one_rank() {
    let mut env = TypeEnv::default();
    env.bind_var("m", int_ty(2));

    assert_eq!(infer_with(&env, "m[0]").unwrap(), int_ty(1));
    assert_eq!(infer_with(&env, "m[0][1]").unwrap(), int_ty(0));
    assert!(matches!(
        infer_with(&env, "m[0][1][2]"),
        Err(TypeError::IndexScalar { .. })
    ));
    assert!(matches!(
        infer_with(&env, "m[1.5]"),
        Err(TypeError::Mismatch { .. })
    ));
}

#[test]
fn matmul_rank_table() {
    let mut env = TypeEnv::default();
    env.bind_var("v", int_ty(1));
    env.bind_var("m", int_ty(2));
    let annotator = Annotator::default();

    let cases = [("v", "v", 0), ("m", "v", 1), ("v", "m", 1), ("m", "m", 2)];
    for (l, r, dim) in cases {
        let mut expr = matmul_expr(l, r);
        assert_eq!(
            annotator.annotate_expr(&mut expr, &env).unwrap(),
            int_ty(dim)
        );
    }

    let mut bad = matmul_expr("v", "v");
    env.bind_var("v", int_ty(3));
    assert!(annotator.annotate_expr(&mut bad, &env).is_err());
}

fn matmul_expr(l: &str, r: &str) -> Expr {
    Expr::new(
        ExprKind::OpCall {
            op: Op::MatMul,
            operands: vec![
                Expr::new(ExprKind::Var(l.into()), Span::dummy()),
                Expr::new(ExprKind::Var(r.into()), Span::dummy()),
            ],
        },
        Span::dummy(),
    )
}

// ── Conditions and branches ─────────────────────────────────────────────

#[test]
fn if_branch_rules() {
    assert_checks("int main() { int x = 1; if (x < 2) return 1; else return 2; }");
    assert!(matches!(
        assert_type_error("int main() { if (1) return 1; else return 2; }"),
        TypeError::Condition { .. }
    ));
    assert!(matches!(
        assert_type_error("int main() { if (true) return 1; else return 2.0; }"),
        TypeError::Mismatch { .. }
    ));
}

#[test]
fn else_less_if_is_unit() {
    // The branch value is discarded, so the whole form is unit.
    assert_checks("unit main() { int x = 1; if (x < 2) { x = 2; } }");
}

#[test]
fn while_condition_must_be_bool_scalar() {
    assert_checks("unit main() { int i = 0; while (i < 3) { i = i + 1; } }");
    assert!(matches!(
        assert_type_error("unit main() { while (1) { } }"),
        TypeError::Condition { .. }
    ));
}

// ── Lambdas ─────────────────────────────────────────────────────────────

#[test]
fn lambda_infers_function_type() {
    let ty = infer("(int y) -> y + 1");
    assert_eq!(ty, fn_ty(vec![int_ty(0)], int_ty(0), 0));
}

#[test]
fn lambda_captures_enclosing_bindings() {
    let mut env = TypeEnv::default();
    env.bind_var("x", int_ty(0));
    let ty = infer_with(&env, "(int y) -> x + y").unwrap();
    assert_eq!(ty, fn_ty(vec![int_ty(0)], int_ty(0), 0));
    // The parameter does not leak out of the lambda.
    assert!(matches!(
        infer_with(&env, "((int y) -> x + y)(1) + y"),
        Err(TypeError::UndefinedVar { .. })
    ));
}

#[test]
fn immediately_invoked_lambda_broadcasts() {
    let mut env = TypeEnv::default();
    env.bind_var("xs", int_ty(1));
    assert_eq!(
        infer_with(&env, "((int y) -> y * 2)(xs)").unwrap(),
        int_ty(1)
    );
}

// ── Records ─────────────────────────────────────────────────────────────

fn point_decl() -> Decl {
    Decl::Record(RecordDecl {
        name: "Point".into(),
        fields: vec![
            FieldDecl {
                name: "x".into(),
                ty: int_ty(0),
                span: Span::dummy(),
            },
            FieldDecl {
                name: "y".into(),
                ty: int_ty(0),
                span: Span::dummy(),
            },
        ],
        span: Span::dummy(),
    })
}

fn point_literal(fields: Vec<(&str, Expr)>) -> Expr {
    Expr::new(
        ExprKind::Record {
            name: "Point".into(),
            fields: fields
                .into_iter()
                .map(|(n, e)| (n.to_string(), e))
                .collect(),
        },
        Span::dummy(),
    )
}

fn int_lit(n: i64) -> Expr {
    Expr::new(ExprKind::Lit(Lit::Int(n)), Span::dummy())
}

#[test]
fn record_literal_and_field_access() {
    let annotator = Annotator::default();
    let mut env = TypeEnv::default();
    let mut decl = point_decl();
    annotator.annotate_decl(&mut decl, &mut env).unwrap();

    let mut lit = point_literal(vec![("x", int_lit(1)), ("y", int_lit(2))]);
    let ty = annotator.annotate_expr(&mut lit, &env).unwrap();
    assert_eq!(ty, Type::new(BaseType::Record("Point".into()), 0));

    env.bind_var("p", ty);
    let mut access = Expr::new(
        ExprKind::Field {
            object: Box::new(Expr::new(ExprKind::Var("p".into()), Span::dummy())),
            field: "x".into(),
        },
        Span::dummy(),
    );
    assert_eq!(annotator.annotate_expr(&mut access, &env).unwrap(), int_ty(0));

    access = Expr::new(
        ExprKind::Field {
            object: Box::new(Expr::new(ExprKind::Var("p".into()), Span::dummy())),
            field: "z".into(),
        },
        Span::dummy(),
    );
    assert!(matches!(
        annotator.annotate_expr(&mut access, &env),
        Err(TypeError::UnknownField { .. })
    ));
}

#[test]
fn field_access_lifts_by_receiver_rank() {
    let annotator = Annotator::default();
    let mut env = TypeEnv::default();
    let mut decl = point_decl();
    annotator.annotate_decl(&mut decl, &mut env).unwrap();

    // ps : Point[] — a rank-1 array of records; ps.x : int[].
    env.bind_var("ps", Type::new(BaseType::Record("Point".into()), 1));
    let mut access = Expr::new(
        ExprKind::Field {
            object: Box::new(Expr::new(ExprKind::Var("ps".into()), Span::dummy())),
            field: "x".into(),
        },
        Span::dummy(),
    );
    assert_eq!(annotator.annotate_expr(&mut access, &env).unwrap(), int_ty(1));
}

#[test]
fn strict_record_fields_is_opt_in() {
    let strict = Annotator::new(AnnotateOptions {
        strict_record_fields: true,
    });
    let lax = Annotator::default();
    let mut env = TypeEnv::default();
    let mut decl = point_decl();
    strict.annotate_decl(&mut decl, &mut env).unwrap();

    // Unknown field: rejected only under the flag.
    let mut bad = point_literal(vec![("x", int_lit(1)), ("q", int_lit(2))]);
    assert!(lax.annotate_expr(&mut bad.clone(), &env).is_ok());
    assert!(matches!(
        strict.annotate_expr(&mut bad, &env),
        Err(TypeError::UnknownField { .. })
    ));

    // Missing field.
    let mut partial = point_literal(vec![("x", int_lit(1))]);
    assert!(matches!(
        strict.annotate_expr(&mut partial, &env),
        Err(TypeError::MissingField { .. })
    ));

    // Field type mismatch.
    let mut wrong = point_literal(vec![
        ("x", Expr::new(ExprKind::Lit(Lit::Float(1.0)), Span::dummy())),
        ("y", int_lit(2)),
    ]);
    assert!(matches!(
        strict.annotate_expr(&mut wrong, &env),
        Err(TypeError::Mismatch { .. })
    ));
}

// ── Builtins ────────────────────────────────────────────────────────────

#[test]
fn builtin_call_types() {
    assert_checks("float a[2][2] = zeros({2, 2});");
    assert_checks("int v[3] = ones({3}, \"int\");");
    assert_checks("unit main() { print(1, \"two\", 3.0); }");

    let program = assert_checks("float a[2][2] = zeros({2, 2}); int s[2] = shape(a);");
    let Decl::Var(v) = &program.decls[1] else { panic!() };
    assert_eq!(v.ty, Some(int_ty(1)));
}

#[test]
fn builtin_dims_must_be_literal_for_static_rank() {
    assert!(matches!(
        assert_type_error("int d[2] = {2, 2}; float a[2][2] = zeros(d);"),
        TypeError::Builtin { .. }
    ));
    assert!(matches!(
        assert_type_error("float a[2][2] = zeros({2, 2}, \"bytes\");"),
        TypeError::Builtin { .. }
    ));
}

#[test]
fn shadowing_a_builtin_restores_normal_rules() {
    assert_checks("int print(int x) { return x; } int y = print(3);");
}

// ── Typed-AST invariant ─────────────────────────────────────────────────

/// After annotation every expression carries a type.
#[test]
fn every_expression_is_annotated() {
    let program = assert_checks(
        r#"
        int fact(int n) {
            if (n == 0) return 1; else return n * fact(n - 1);
        }
        int main() {
            int v[3] = {1, 2, 3};
            int total = 0;
            int i = 0;
            while (i < 3) {
                total = total + v[i];
                i = i + 1;
            }
            return fact(total);
        }
        "#,
    );
    for decl in &program.decls {
        walk_decl(decl);
    }
}

fn walk_decl(decl: &Decl) {
    match decl {
        Decl::Var(v) => {
            if let Some(init) = &v.init {
                walk_expr(init);
            }
        }
        Decl::Func(f) => walk_expr(&f.body),
        Decl::Record(_) => {}
    }
}

fn walk_stmt(stmt: &Stmt) {
    match stmt {
        Stmt::Expr(es) => walk_expr(&es.expr),
        Stmt::Assign(a) => {
            walk_expr(&a.lvalue);
            walk_expr(&a.rvalue);
        }
        Stmt::Decl(d) => walk_decl(&d.decl),
        Stmt::While(w) => {
            walk_expr(&w.cond);
            walk_stmt(&w.body);
        }
    }
}

fn walk_expr(expr: &Expr) {
    assert!(
        expr.ty.is_some(),
        "expression without a type after annotation: {:?}",
        expr.kind
    );
    match &expr.kind {
        ExprKind::Lit(_) | ExprKind::Var(_) => {}
        ExprKind::Array(elems) => elems.iter().for_each(walk_expr),
        ExprKind::Record { fields, .. } => fields.iter().for_each(|(_, e)| walk_expr(e)),
        ExprKind::Lambda { body, .. } => walk_expr(body),
        ExprKind::Field { object, .. } => walk_expr(object),
        ExprKind::Call { callee, args } => {
            walk_expr(callee);
            args.iter().for_each(walk_expr);
        }
        ExprKind::OpCall { operands, .. } => operands.iter().for_each(walk_expr),
        ExprKind::Block(stmts) => stmts.iter().for_each(walk_stmt),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond);
            walk_expr(then_branch);
            if let Some(e) = else_branch {
                walk_expr(e);
            }
        }
    }
}
