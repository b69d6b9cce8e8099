//! Parser structure tests: declarations, precedence, postfix chains and
//! error positions.

use aster_compiler::compiler::ast::*;
use aster_compiler::compiler::parser::ParseError;
use aster_compiler::{parse, parse_expr, FrontendError};

fn parse_ok(source: &str) -> Program {
    match parse(source) {
        Ok(p) => p,
        Err(e) => panic!("expected parse of:\n{}\nbut got error: {}", source, e),
    }
}

fn expr_ok(source: &str) -> Expr {
    match parse_expr(source) {
        Ok(e) => e,
        Err(e) => panic!("expected expression parse of '{}', got: {}", source, e),
    }
}

fn op_of(expr: &Expr) -> Op {
    match &expr.kind {
        ExprKind::OpCall { op, .. } => *op,
        other => panic!("expected operator call, got {:?}", other),
    }
}

fn operands_of(expr: &Expr) -> &[Expr] {
    match &expr.kind {
        ExprKind::OpCall { operands, .. } => operands,
        other => panic!("expected operator call, got {:?}", other),
    }
}

// ── Declarations ────────────────────────────────────────────────────────

#[test]
fn function_declaration_shape() {
    let program = parse_ok("int add(int a, int b) { return a + b; }");
    assert_eq!(program.decls.len(), 1);
    let Decl::Func(f) = &program.decls[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(f.name, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0].ty, Type::prim(Prim::Int));
    assert_eq!(f.return_ty, Type::prim(Prim::Int));
    let ExprKind::Block(stmts) = &f.body.kind else {
        panic!("function body must be a block");
    };
    assert_eq!(stmts.len(), 1);
}

#[test]
fn variable_declaration_with_array_suffix() {
    let program = parse_ok("int arr[5] = {1, 2, 3, 4, 5};");
    let Decl::Var(v) = &program.decls[0] else {
        panic!("expected variable declaration");
    };
    assert_eq!(v.name, "arr");
    // The declared extent is consumed; only the rank is recorded.
    assert_eq!(v.ty, Some(Type::new(BaseType::Prim(Prim::Int), 1)));
    let Some(init) = &v.init else {
        panic!("expected initializer")
    };
    let ExprKind::Array(elems) = &init.kind else {
        panic!("expected array literal")
    };
    assert_eq!(elems.len(), 5);
}

#[test]
fn dimension_suffixes_accumulate() {
    let program = parse_ok("float[2] m[3];");
    let Decl::Var(v) = &program.decls[0] else {
        panic!()
    };
    assert_eq!(v.ty, Some(Type::new(BaseType::Prim(Prim::Float), 2)));
}

#[test]
fn record_typed_declaration_uses_ident_type() {
    let program = parse_ok("Point origin;");
    let Decl::Var(v) = &program.decls[0] else {
        panic!()
    };
    assert_eq!(
        v.ty,
        Some(Type::new(BaseType::Record("Point".into()), 0))
    );
}

#[test]
fn nested_array_initializer() {
    let program = parse_ok("int m[2][2] = {{1, 2}, {3, 4}};");
    let Decl::Var(v) = &program.decls[0] else {
        panic!()
    };
    assert_eq!(v.ty, Some(Type::new(BaseType::Prim(Prim::Int), 2)));
    let ExprKind::Array(rows) = &v.init.as_ref().unwrap().kind else {
        panic!()
    };
    assert!(matches!(rows[0].kind, ExprKind::Array(_)));
}

// ── Precedence and associativity ────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let e = expr_ok("1 + 2 * 3");
    assert_eq!(op_of(&e), Op::Add);
    assert_eq!(op_of(&operands_of(&e)[1]), Op::Mul);

    let e = expr_ok("1 * 2 + 3");
    assert_eq!(op_of(&e), Op::Add);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Mul);
}

#[test]
fn comparison_sits_between_logic_and_arithmetic() {
    let e = expr_ok("a + b < c * d");
    assert_eq!(op_of(&e), Op::Lt);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Add);
    assert_eq!(op_of(&operands_of(&e)[1]), Op::Mul);

    let e = expr_ok("a || b && c");
    assert_eq!(op_of(&e), Op::Or);
    assert_eq!(op_of(&operands_of(&e)[1]), Op::And);
}

#[test]
fn left_associativity() {
    let e = expr_ok("10 - 4 - 3");
    assert_eq!(op_of(&e), Op::Sub);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Sub);
}

#[test]
fn parentheses_override_precedence() {
    let e = expr_ok("(1 + 2) * 3");
    assert_eq!(op_of(&e), Op::Mul);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Add);
}

#[test]
fn unary_operators_bind_tightest() {
    let e = expr_ok("-x * y");
    assert_eq!(op_of(&e), Op::Mul);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Neg);

    let e = expr_ok("!a && b");
    assert_eq!(op_of(&e), Op::And);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Not);
}

// ── Postfix chains ──────────────────────────────────────────────────────

#[test]
fn call_and_index_chains() {
    let e = expr_ok("f(1)(2)");
    let ExprKind::Call { callee, args } = &e.kind else {
        panic!()
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(callee.kind, ExprKind::Call { .. }));

    let e = expr_ok("a[0][1]");
    assert_eq!(op_of(&e), Op::Index);
    assert_eq!(op_of(&operands_of(&e)[0]), Op::Index);

    let e = expr_ok("f(x)[1]");
    assert_eq!(op_of(&e), Op::Index);
    assert!(matches!(operands_of(&e)[0].kind, ExprKind::Call { .. }));
}

// ── Lambdas ─────────────────────────────────────────────────────────────

#[test]
fn lambda_literal_with_typed_params() {
    let e = expr_ok("(int y) -> y + 1");
    let ExprKind::Lambda { params, body } = &e.kind else {
        panic!("expected lambda, got {:?}", e.kind)
    };
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "y");
    assert_eq!(params[0].ty, Type::prim(Prim::Int));
    assert!(matches!(body.kind, ExprKind::OpCall { .. }));
}

#[test]
fn empty_param_lambda_and_block_body() {
    let e = expr_ok("() -> 1");
    assert!(matches!(e.kind, ExprKind::Lambda { ref params, .. } if params.is_empty()));

    let e = expr_ok("(int x) -> { x; }");
    let ExprKind::Lambda { body, .. } = &e.kind else {
        panic!()
    };
    assert!(matches!(body.kind, ExprKind::Block(_)));
}

#[test]
fn parenthesized_expression_is_not_a_lambda() {
    let e = expr_ok("(x)");
    assert!(matches!(e.kind, ExprKind::Var(_)));
}

// ── Statements ──────────────────────────────────────────────────────────

#[test]
fn if_else_and_while_shapes() {
    let program = parse_ok(
        r#"
        int main() {
            int x = 10;
            if (x < 20) { x = x + 1; } else { x = x - 1; }
            while (x < 15) { x = x + 2; }
            return x;
        }
        "#,
    );
    let Decl::Func(f) = &program.decls[0] else {
        panic!()
    };
    let ExprKind::Block(stmts) = &f.body.kind else {
        panic!()
    };
    assert_eq!(stmts.len(), 4);
    let Stmt::Expr(if_stmt) = &stmts[1] else {
        panic!("if should be an expression statement")
    };
    assert!(matches!(if_stmt.expr.kind, ExprKind::If { .. }));
    assert!(matches!(stmts[2], Stmt::While(_)));
}

#[test]
fn bare_return_lowers_to_unit_block() {
    let program = parse_ok("unit f() { return; }");
    let Decl::Func(f) = &program.decls[0] else {
        panic!()
    };
    let ExprKind::Block(stmts) = &f.body.kind else {
        panic!()
    };
    let Stmt::Expr(es) = &stmts[0] else { panic!() };
    assert!(matches!(&es.expr.kind, ExprKind::Block(b) if b.is_empty()));
}

#[test]
fn assignment_statement_accepts_variable_target() {
    let program = parse_ok("int main() { x = 1; }");
    let Decl::Func(f) = &program.decls[0] else {
        panic!()
    };
    let ExprKind::Block(stmts) = &f.body.kind else {
        panic!()
    };
    assert!(matches!(stmts[0], Stmt::Assign(_)));
}

#[test]
fn assignment_to_literal_is_rejected() {
    let err = parse("int main() { 1 = 2; }").unwrap_err();
    assert!(matches!(
        err,
        FrontendError::Parse(ParseError::InvalidAssignTarget { .. })
    ));
}

// ── Errors ──────────────────────────────────────────────────────────────

#[test]
fn missing_semicolon_reports_position() {
    let err = parse("int x = 3").unwrap_err();
    let FrontendError::Parse(ParseError::Unexpected { line, .. }) = err else {
        panic!("expected unexpected-token error, got {}", err)
    };
    assert_eq!(line, 1);
}

#[test]
fn unterminated_block_reports_opening_position() {
    let err = parse("int main() { int x = 1;").unwrap_err();
    assert!(matches!(
        err,
        FrontendError::Parse(ParseError::UnterminatedBlock { line: 1, .. })
    ));
}

#[test]
fn stray_token_is_rejected() {
    assert!(parse("int 5x;").is_err());
    assert!(parse_expr("1 +").is_err());
    assert!(parse_expr("1 1").is_err());
}
