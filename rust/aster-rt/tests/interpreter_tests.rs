//! End-to-end interpreter tests: scalar programs, closures, recursion,
//! array broadcasting at runtime, builtins and failure modes.

use aster_compiler::compiler::ast::*;
use aster_compiler::compiler::tokens::Span;
use aster_rt::interpreter::RuntimeError;
use aster_rt::{Frame, Interpreter, Value};
use aster_tensor::{Backend, Shape};

const BACKENDS: [Backend; 2] = [Backend::Dense, Backend::Nested];

/// Check and run a program, returning the interpreter for inspection.
fn run_checked(backend: Backend, source: &str) -> Interpreter {
    let program = aster_compiler::check(source)
        .unwrap_or_else(|e| panic!("program failed to check: {}\n{}", e, source));
    let interpreter = Interpreter::new(backend);
    interpreter
        .run_program(&program)
        .unwrap_or_else(|e| panic!("program failed to run: {}\n{}", e, source));
    interpreter
}

fn global(interpreter: &Interpreter, name: &str) -> Value {
    Frame::lookup(interpreter.globals(), name)
        .unwrap_or_else(|| panic!("missing global '{}'", name))
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected int, got {}", other),
    }
}

// ── Scalar programs ─────────────────────────────────────────────────────

#[test]
fn scalar_arithmetic_binds_global() {
    // S1: after the run, the global frame holds x = 7.
    let interp = run_checked(Backend::Dense, "int x = 3 + 4;");
    assert_eq!(as_int(&global(&interp, "x")), 7);
}

#[test]
fn while_loop_counts_up() {
    // S4 inside a main function.
    let interp = run_checked(
        Backend::Dense,
        "int main() { int i = 0; while (i < 3) { i = i + 1; } return i; }",
    );
    let result = interp.call_function("main", Vec::new()).unwrap();
    assert_eq!(as_int(&result), 3);
}

#[test]
fn recursive_factorial() {
    // S6: recursion through the captured global frame.
    let interp = run_checked(
        Backend::Dense,
        r#"
        int fact(int n) {
            if (n == 0) return 1; else return n * fact(n - 1);
        }
        "#,
    );
    let result = interp.call_function("fact", vec![Value::Int(5)]).unwrap();
    assert_eq!(as_int(&result), 120);
}

#[test]
fn named_functions_resolve_against_the_global_frame() {
    // Lexical, not dynamic: f sees the global x, not main's local x.
    let interp = run_checked(
        Backend::Dense,
        r#"
        int x = 1;
        int f() { return x; }
        int main() { int x = 99; return f(); }
        "#,
    );
    let result = interp.call_function("main", Vec::new()).unwrap();
    assert_eq!(as_int(&result), 1);
}

#[test]
fn if_else_takes_one_branch() {
    let interp = run_checked(
        Backend::Dense,
        "int pick(int n) { if (n < 10) return 1; else return 2; }",
    );
    assert_eq!(
        as_int(&interp.call_function("pick", vec![Value::Int(3)]).unwrap()),
        1
    );
    assert_eq!(
        as_int(&interp.call_function("pick", vec![Value::Int(30)]).unwrap()),
        2
    );
}

// ── Closures ────────────────────────────────────────────────────────────

/// S3: a lambda captures the frame where it was constructed; calling it
/// from a scope with a different `x` must still see the captured binding.
#[test]
fn lambda_capture_is_lexical() {
    let interp = Interpreter::new(Backend::Dense);
    let source = r#"
    {
        int x = 10;
        int f(int y) { return 0; }
        f = (int y) -> x + y;
        {
            int x = 99;
            f(5);
        }
    }
    "#;
    // The shim declaration gives `f` a function-typed binding the surface
    // syntax can name; the lambda then replaces it.
    let mut stmt = aster_compiler::parse_stmt(source).unwrap();
    let annotator = aster_compiler::compiler::typecheck::Annotator::default();
    let mut env = aster_compiler::compiler::typecheck::TypeEnv::default();
    annotator.annotate_stmt(&mut stmt, &mut env).unwrap();

    let result = interp.exec_stmt(&stmt, interp.globals()).unwrap();
    assert_eq!(as_int(&result.unwrap()), 15);
}

#[test]
fn closure_outlives_its_defining_block() {
    // The captured frame stays alive through the closure value.
    let interp = Interpreter::new(Backend::Dense);
    let source = r#"
    {
        int g(int y) { return 0; }
        {
            int hidden = 40;
            g = (int y) -> hidden + y;
        }
        g(2);
    }
    "#;
    let mut stmt = aster_compiler::parse_stmt(source).unwrap();
    let annotator = aster_compiler::compiler::typecheck::Annotator::default();
    let mut env = aster_compiler::compiler::typecheck::TypeEnv::default();
    annotator.annotate_stmt(&mut stmt, &mut env).unwrap();

    let result = interp.exec_stmt(&stmt, interp.globals()).unwrap();
    assert_eq!(as_int(&result.unwrap()), 42);
}

// ── Arrays at runtime ───────────────────────────────────────────────────

#[test]
fn array_scalar_broadcast_at_runtime() {
    // S2: zeros + ones element-wise; shape (2, 2), every element 1.0.
    for backend in BACKENDS {
        let interp = run_checked(
            backend,
            r#"
            float a[2][2] = zeros({2, 2});
            float b[2][2] = ones({2, 2});
            float c[2][2] = a + b;
            "#,
        );
        let Value::Array(c) = global(&interp, "c") else {
            panic!("c should be an array");
        };
        assert_eq!(c.shape(), Shape::new(vec![2, 2]));
        for idx in [[0, 0], [0, 1], [1, 0], [1, 1]] {
            assert_eq!(c.get(&idx).unwrap(), aster_tensor::Scalar::Float(1.0));
        }
    }
}

#[test]
fn runtime_rank_matches_static_dimension() {
    // Agreement: the inferred dimension of `c` equals the runtime rank.
    let source = r#"
    int v[3] = {1, 2, 3};
    int c[3] = v * 2;
    "#;
    let program = aster_compiler::check(source).unwrap();
    let Decl::Var(c_decl) = &program.decls[1] else {
        panic!()
    };
    let static_dim = c_decl.init.as_ref().unwrap().ty.as_ref().unwrap().dim;

    for backend in BACKENDS {
        let interp = Interpreter::new(backend);
        interp.run_program(&program).unwrap();
        let Value::Array(c) = global(&interp, "c") else {
            panic!()
        };
        assert_eq!(c.ndim(), static_dim);
        assert_eq!(c.get(&[2]).unwrap(), aster_tensor::Scalar::Int(6));
    }
}

#[test]
fn indexing_and_element_access() {
    for backend in BACKENDS {
        let interp = run_checked(
            backend,
            r#"
            int m[2][2] = {{1, 2}, {3, 4}};
            int row[1] = m[1];
            int corner = m[1][1];
            int last = m[1][-1];
            "#,
        );
        assert_eq!(as_int(&global(&interp, "corner")), 4);
        assert_eq!(as_int(&global(&interp, "last")), 4);
        let Value::Array(row) = global(&interp, "row") else {
            panic!()
        };
        assert_eq!(row.shape(), Shape::new(vec![2]));
    }
}

#[test]
fn comparison_on_arrays_yields_bool_array() {
    for backend in BACKENDS {
        let interp = run_checked(
            backend,
            r#"
            int v[2] = {1, 5};
            bool hits[2] = v > 2;
            "#,
        );
        let Value::Array(hits) = global(&interp, "hits") else {
            panic!()
        };
        assert_eq!(
            hits.to_flat(),
            vec![
                aster_tensor::Scalar::Bool(false),
                aster_tensor::Scalar::Bool(true)
            ]
        );
    }
}

#[test]
fn string_indexing_yields_chars() {
    let interp = Interpreter::new(Backend::Dense);
    let expr = aster_compiler::parse_expr("\"hello\"[1]").unwrap();
    let v = interp.eval_expr(&expr, interp.globals()).unwrap();
    assert!(matches!(v, Value::Char('e')));
}

// ── Builtins ────────────────────────────────────────────────────────────

#[test]
fn shape_builtin_reports_dimensions() {
    for backend in BACKENDS {
        let interp = run_checked(
            backend,
            r#"
            float a[2][3] = zeros({2, 3});
            int s[2] = shape(a);
            int rows = s[0];
            int cols = s[1];
            "#,
        );
        assert_eq!(as_int(&global(&interp, "rows")), 2);
        assert_eq!(as_int(&global(&interp, "cols")), 3);
    }
}

#[test]
fn shape_of_scalar_is_empty() {
    let interp = Interpreter::new(Backend::Dense);
    let result = interp
        .call_function("shape", vec![Value::Int(7)])
        .unwrap();
    let Value::Array(s) = result else { panic!() };
    assert_eq!(s.shape(), Shape::new(vec![0]));
}

#[test]
fn zeros_with_int_tag() {
    let interp = run_checked(Backend::Dense, "int z[2][2] = zeros({2, 2}, \"int\");");
    let Value::Array(z) = global(&interp, "z") else {
        panic!()
    };
    assert_eq!(z.dtype(), aster_tensor::DType::Int);
    assert_eq!(z.get(&[0, 1]).unwrap(), aster_tensor::Scalar::Int(0));
}

#[test]
fn print_returns_unit() {
    let interp = Interpreter::new(Backend::Dense);
    let result = interp
        .call_function("print", vec![Value::Int(1), Value::Str("ok".into())])
        .unwrap();
    assert!(matches!(result, Value::Unit));
}

#[test]
fn builtin_misuse_is_a_runtime_error() {
    let interp = Interpreter::new(Backend::Dense);
    assert!(matches!(
        interp.call_function("zeros", vec![Value::Int(2)]),
        Err(RuntimeError::Builtin { .. })
    ));
    assert!(matches!(
        interp.call_function("shape", vec![]),
        Err(RuntimeError::Builtin { .. })
    ));
}

// ── Records ─────────────────────────────────────────────────────────────

fn span() -> Span {
    Span::dummy()
}

fn record_program() -> (Program, Expr) {
    // record Point { int x; int y; }  p = Point(x: 1, y: 2);
    let record = Decl::Record(RecordDecl {
        name: "Point".into(),
        fields: vec![
            FieldDecl {
                name: "x".into(),
                ty: Type::prim(Prim::Int),
                span: span(),
            },
            FieldDecl {
                name: "y".into(),
                ty: Type::prim(Prim::Int),
                span: span(),
            },
        ],
        span: span(),
    });
    let literal = Expr::new(
        ExprKind::Record {
            name: "Point".into(),
            fields: vec![
                ("x".into(), Expr::new(ExprKind::Lit(Lit::Int(1)), span())),
                ("y".into(), Expr::new(ExprKind::Lit(Lit::Int(2)), span())),
            ],
        },
        span(),
    );
    let var = Decl::Var(VarDecl {
        name: "p".into(),
        ty: None,
        mutable: true,
        init: Some(literal.clone()),
        span: span(),
    });
    (
        Program {
            decls: vec![record, var],
            span: span(),
        },
        literal,
    )
}

fn field_of(name: &str, field: &str) -> Expr {
    Expr::new(
        ExprKind::Field {
            object: Box::new(Expr::new(ExprKind::Var(name.into()), span())),
            field: field.into(),
        },
        span(),
    )
}

#[test]
fn record_construction_and_field_access() {
    let (program, _) = record_program();
    let interp = Interpreter::new(Backend::Dense);
    interp.run_program(&program).unwrap();

    let v = interp.eval_expr(&field_of("p", "x"), interp.globals()).unwrap();
    assert_eq!(as_int(&v), 1);
    assert!(interp.record_schema("Point").is_some());

    assert!(matches!(
        interp.eval_expr(&field_of("p", "z"), interp.globals()),
        Err(RuntimeError::UnknownField { .. })
    ));
}

#[test]
fn field_assignment_mutates_in_place() {
    let (program, _) = record_program();
    let interp = Interpreter::new(Backend::Dense);
    interp.run_program(&program).unwrap();

    // alias = p; alias.y = 9; p.y == 9 (records are shared mappings).
    let alias = Decl::Var(VarDecl {
        name: "alias".into(),
        ty: None,
        mutable: true,
        init: Some(Expr::new(ExprKind::Var("p".into()), span())),
        span: span(),
    });
    interp
        .exec_stmt(
            &Stmt::Decl(DeclStmt {
                decl: alias,
                span: span(),
            }),
            interp.globals(),
        )
        .unwrap();
    let assign = Stmt::Assign(AssignStmt {
        lvalue: field_of("alias", "y"),
        rvalue: Expr::new(ExprKind::Lit(Lit::Int(9)), span()),
        span: span(),
    });
    interp.exec_stmt(&assign, interp.globals()).unwrap();

    let v = interp.eval_expr(&field_of("p", "y"), interp.globals()).unwrap();
    assert_eq!(as_int(&v), 9);

    // Field addition through assignment is rejected.
    let add_field = Stmt::Assign(AssignStmt {
        lvalue: field_of("p", "w"),
        rvalue: Expr::new(ExprKind::Lit(Lit::Int(0)), span()),
        span: span(),
    });
    assert!(matches!(
        interp.exec_stmt(&add_field, interp.globals()),
        Err(RuntimeError::UnknownField { .. })
    ));
}

#[test]
fn record_equality_is_structural() {
    let (program, literal) = record_program();
    let interp = Interpreter::new(Backend::Dense);
    interp.run_program(&program).unwrap();

    // q is a second Point(x: 1, y: 2), distinct from p but field-equal.
    let q = Decl::Var(VarDecl {
        name: "q".into(),
        ty: None,
        mutable: true,
        init: Some(literal),
        span: span(),
    });
    interp
        .exec_stmt(
            &Stmt::Decl(DeclStmt {
                decl: q,
                span: span(),
            }),
            interp.globals(),
        )
        .unwrap();

    let eq = |l: &str, r: &str| {
        Expr::new(
            ExprKind::OpCall {
                op: Op::Eq,
                operands: vec![
                    Expr::new(ExprKind::Var(l.into()), span()),
                    Expr::new(ExprKind::Var(r.into()), span()),
                ],
            },
            span(),
        )
    };
    let v = interp.eval_expr(&eq("p", "q"), interp.globals()).unwrap();
    assert!(matches!(v, Value::Bool(true)));

    // Diverge one field; the records stop comparing equal.
    let bump = Stmt::Assign(AssignStmt {
        lvalue: field_of("q", "y"),
        rvalue: Expr::new(ExprKind::Lit(Lit::Int(7)), span()),
        span: span(),
    });
    interp.exec_stmt(&bump, interp.globals()).unwrap();
    let v = interp.eval_expr(&eq("p", "q"), interp.globals()).unwrap();
    assert!(matches!(v, Value::Bool(false)));
}

#[test]
fn function_equality_is_identity() {
    let interp = run_checked(Backend::Dense, "int id(int n) { return n; } int inc(int n) { return n + 1; }");
    let same = aster_compiler::parse_expr("id == id").unwrap();
    let differ = aster_compiler::parse_expr("id != inc").unwrap();
    assert!(matches!(
        interp.eval_expr(&same, interp.globals()).unwrap(),
        Value::Bool(true)
    ));
    assert!(matches!(
        interp.eval_expr(&differ, interp.globals()).unwrap(),
        Value::Bool(true)
    ));
}

// ── Assignment semantics ────────────────────────────────────────────────

#[test]
fn assignment_writes_to_the_holding_frame() {
    // The block writes through to the outer binding (S4 depends on this).
    let interp = run_checked(
        Backend::Dense,
        "int main() { int n = 1; { n = 5; } return n; }",
    );
    assert_eq!(as_int(&interp.call_function("main", vec![]).unwrap()), 5);
}

#[test]
fn unbound_assignment_defines_locally() {
    // Without a prior declaration the binding lands in the current frame;
    // this path is only reachable with the checker skipped.
    let program = aster_compiler::parse("int main() { fresh = 1; return fresh; }").unwrap();
    let interp = Interpreter::new(Backend::Dense);
    interp.run_program(&program).unwrap();
    assert_eq!(as_int(&interp.call_function("main", vec![]).unwrap()), 1);
}

// ── Failure modes ───────────────────────────────────────────────────────

#[test]
fn distinguishable_runtime_errors() {
    let interp = Interpreter::new(Backend::Dense);

    assert!(matches!(
        interp.call_function("missing", vec![]),
        Err(RuntimeError::NameNotFound { .. })
    ));

    let not_callable = aster_compiler::parse("int x = 3; int main() { return x(1); }").unwrap();
    interp.run_program(&not_callable).unwrap();
    assert!(matches!(
        interp.call_function("main", vec![]),
        Err(RuntimeError::NotCallable { .. })
    ));
}

#[test]
fn arity_and_argument_type_errors() {
    let interp = run_checked(Backend::Dense, "int id(int n) { return n; }");
    assert!(matches!(
        interp.call_function("id", vec![]),
        Err(RuntimeError::Arity { .. })
    ));
    assert!(matches!(
        interp.call_function("id", vec![Value::Float(1.5)]),
        Err(RuntimeError::TypeMismatch { .. })
    ));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let interp = run_checked(Backend::Dense, "int f(int n) { return 10 / n; }");
    assert!(interp.call_function("f", vec![Value::Int(0)]).is_err());
    assert_eq!(
        as_int(&interp.call_function("f", vec![Value::Int(2)]).unwrap()),
        5
    );
}

#[test]
fn index_out_of_bounds_is_reported() {
    for backend in BACKENDS {
        let interp = run_checked(backend, "int v[2] = {1, 2};");
        let expr = aster_compiler::parse_expr("v[7]").unwrap();
        assert!(matches!(
            interp.eval_expr(&expr, interp.globals()),
            Err(RuntimeError::IndexOutOfBounds { .. })
        ));
    }
}

#[test]
fn operator_type_mismatch_without_checking() {
    // With the checker skipped, `1 + true` must still fail, at runtime.
    let interp = Interpreter::new(Backend::Dense);
    let expr = aster_compiler::parse_expr("1 + true").unwrap();
    assert!(interp.eval_expr(&expr, interp.globals()).is_err());
}

#[test]
fn incompatible_runtime_shapes_error() {
    for backend in BACKENDS {
        let program = aster_compiler::parse(
            r#"
            int a[2] = {1, 2};
            int b[3] = {1, 2, 3};
            int c[1] = a + b;
            "#,
        )
        .unwrap();
        let interp = Interpreter::new(backend);
        assert!(matches!(
            interp.run_program(&program),
            Err(RuntimeError::Array(_))
        ));
    }
}
