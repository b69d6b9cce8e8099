//! Recursive descent parser with Pratt expression parsing for Aster.

use crate::compiler::ast::*;
use crate::compiler::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token {found} at line {line}, col {col}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        line: usize,
        col: usize,
    },
    #[error("unterminated block opened at line {line}, col {col}")]
    UnterminatedBlock { line: usize, col: usize },
    #[error("invalid assignment target at line {line}, col {col}")]
    InvalidAssignTarget { line: usize, col: usize },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a whole token stream into a program.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut decls = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Eof) {
            decls.push(self.parse_declaration()?);
        }
        let span = match (decls.first(), decls.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => Span::dummy(),
        };
        Ok(Program { decls, span })
    }

    /// True once every token but the trailing `Eof` has been consumed.
    pub fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// An error for input left over after an entry point finished.
    pub fn trailing_input(&self) -> ParseError {
        self.unexpected("end of input")
    }

    // ── Token utilities ─────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // The stream always ends with Eof, so pos stays in range.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let tok = self.advance();
                Ok((name, tok.span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        ParseError::Unexpected {
            found: tok.kind.to_string(),
            expected: expected.to_string(),
            line: tok.span.line,
            col: tok.span.col,
        }
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// `type IDENT` followed by a function tail or a variable tail.
    fn parse_declaration(&mut self) -> Result<Decl, ParseError> {
        let start = self.peek().span;
        let mut ty = self.parse_type()?;
        let (name, _) = self.expect_ident()?;

        // C-style dimension suffixes on the name: `int arr[5][10]`.
        // Sizes are dynamic, so a declared extent is consumed and dropped.
        while self.accept(&TokenKind::LBracket) {
            if matches!(self.peek_kind(), TokenKind::IntLit(_)) {
                self.advance();
            }
            self.expect(&TokenKind::RBracket)?;
            ty.dim += 1;
        }

        if self.accept(&TokenKind::LParen) {
            // Function declaration.
            let mut params = Vec::new();
            if !self.accept(&TokenKind::RParen) {
                loop {
                    params.push(self.parse_param()?);
                    if self.accept(&TokenKind::RParen) {
                        break;
                    }
                    self.expect(&TokenKind::Comma)?;
                }
            }
            let body = self.parse_block()?;
            let span = start.merge(body.span);
            Ok(Decl::Func(FuncDecl {
                name,
                params,
                return_ty: ty,
                body,
                span,
            }))
        } else {
            // Variable declaration.
            let init = if self.accept(&TokenKind::Assign) {
                if matches!(self.peek_kind(), TokenKind::LBrace) {
                    Some(self.parse_array_literal()?)
                } else {
                    Some(self.parse_expression(0)?)
                }
            } else {
                None
            };
            let end = self.expect(&TokenKind::Semicolon)?;
            Ok(Decl::Var(VarDecl {
                name,
                ty: Some(ty),
                mutable: true,
                init,
                span: start.merge(end.span),
            }))
        }
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let start = self.peek().span;
        let ty = self.parse_type()?;
        let (name, end) = self.expect_ident()?;
        Ok(Param {
            name,
            ty,
            span: start.merge(end),
        })
    }

    /// `(primKeyword | IDENT) ("[" NUMBER? "]")*`
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let base = match self.peek_kind().clone() {
            TokenKind::Int => {
                self.advance();
                BaseType::Prim(Prim::Int)
            }
            TokenKind::Float => {
                self.advance();
                BaseType::Prim(Prim::Float)
            }
            TokenKind::Bool => {
                self.advance();
                BaseType::Prim(Prim::Bool)
            }
            TokenKind::Char => {
                self.advance();
                BaseType::Prim(Prim::Char)
            }
            TokenKind::Unit => {
                self.advance();
                BaseType::Prim(Prim::Unit)
            }
            TokenKind::Ident(name) => {
                self.advance();
                BaseType::Record(name)
            }
            _ => return Err(self.unexpected("type")),
        };

        let mut dim = 0;
        while self.accept(&TokenKind::LBracket) {
            if matches!(self.peek_kind(), TokenKind::IntLit(_)) {
                self.advance();
            }
            self.expect(&TokenKind::RBracket)?;
            dim += 1;
        }
        Ok(Type::new(base, dim))
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// `{ statement* }` as a block expression.
    fn parse_block(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            if self.accept(&TokenKind::RBrace) {
                break;
            }
            if matches!(self.peek_kind(), TokenKind::Eof) {
                return Err(ParseError::UnterminatedBlock {
                    line: open.span.line,
                    col: open.span.col,
                });
            }
            stmts.push(self.parse_statement()?);
        }
        let span = match stmts.last() {
            Some(last) => open.span.merge(last.span()),
            None => open.span,
        };
        Ok(Expr::new(ExprKind::Block(stmts), span))
    }

    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::If => {
                let expr = self.parse_if()?;
                let span = expr.span;
                Ok(Stmt::Expr(ExprStmt { expr, span }))
            }
            TokenKind::While => self.parse_while(),
            TokenKind::Return => {
                let start = self.advance().span;
                let expr = if matches!(self.peek_kind(), TokenKind::Semicolon) {
                    // `return;` lowers to the unit value (an empty block).
                    Expr::new(ExprKind::Block(Vec::new()), start)
                } else {
                    self.parse_expression(0)?
                };
                let end = self.expect(&TokenKind::Semicolon)?;
                let span = start.merge(end.span);
                Ok(Stmt::Expr(ExprStmt { expr, span }))
            }
            TokenKind::LBrace => {
                let expr = self.parse_block()?;
                let span = expr.span;
                Ok(Stmt::Expr(ExprStmt { expr, span }))
            }
            kind if kind.is_type_keyword() => self.parse_decl_stmt(),
            // `Point p;` — an identifier followed by another identifier can
            // only start a record-typed declaration.
            TokenKind::Ident(_) if matches!(self.peek_at(1), TokenKind::Ident(_)) => {
                self.parse_decl_stmt()
            }
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn parse_decl_stmt(&mut self) -> Result<Stmt, ParseError> {
        let decl = self.parse_declaration()?;
        let span = decl.span();
        Ok(Stmt::Decl(DeclStmt { decl, span }))
    }

    fn parse_expr_or_assign_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek().span;
        let expr = self.parse_expression(0)?;
        if self.accept(&TokenKind::Assign) {
            if !matches!(expr.kind, ExprKind::Var(_) | ExprKind::Field { .. }) {
                return Err(ParseError::InvalidAssignTarget {
                    line: expr.span.line,
                    col: expr.span.col,
                });
            }
            let rvalue = self.parse_expression(0)?;
            let end = self.expect(&TokenKind::Semicolon)?;
            Ok(Stmt::Assign(AssignStmt {
                lvalue: expr,
                rvalue,
                span: start.merge(end.span),
            }))
        } else {
            let end = self.expect(&TokenKind::Semicolon)?;
            Ok(Stmt::Expr(ExprStmt {
                expr,
                span: start.merge(end.span),
            }))
        }
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::If)?.span;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expression(0)?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = self.branch_expr()?;
        let mut span = start.merge(then_branch.span);
        let else_branch = if self.accept(&TokenKind::Else) {
            let e = self.branch_expr()?;
            span = span.merge(e.span);
            Some(Box::new(e))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            span,
        ))
    }

    /// An `if`/`while` branch is a statement; expose it as an expression by
    /// unwrapping expression statements and wrapping everything else in a
    /// one-statement block.
    fn branch_expr(&mut self) -> Result<Expr, ParseError> {
        let stmt = self.parse_statement()?;
        Ok(match stmt {
            Stmt::Expr(es) => es.expr,
            other => {
                let span = other.span();
                Expr::new(ExprKind::Block(vec![other]), span)
            }
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::While)?.span;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expression(0)?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        let span = start.merge(body.span());
        Ok(Stmt::While(WhileStmt {
            cond,
            body: Box::new(body),
            span,
        }))
    }

    // ── Expressions ─────────────────────────────────────────────────────

    /// Binding power and operator for an infix token. Assignment is not an
    /// expression; it is recognized at statement level.
    fn infix_op(kind: &TokenKind) -> Option<(u8, Op)> {
        let entry = match kind {
            TokenKind::PipePipe => (2, Op::Or),
            TokenKind::AmpAmp => (3, Op::And),
            TokenKind::EqEq => (4, Op::Eq),
            TokenKind::NotEq => (4, Op::NotEq),
            TokenKind::Lt => (5, Op::Lt),
            TokenKind::LtEq => (5, Op::LtEq),
            TokenKind::Gt => (5, Op::Gt),
            TokenKind::GtEq => (5, Op::GtEq),
            TokenKind::Plus => (6, Op::Add),
            TokenKind::Minus => (6, Op::Sub),
            TokenKind::Star => (7, Op::Mul),
            TokenKind::Slash => (7, Op::Div),
            TokenKind::Percent => (7, Op::Rem),
            _ => return None,
        };
        Some(entry)
    }

    pub fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut node = self.parse_unary()?;
        loop {
            let Some((bp, op)) = Self::infix_op(self.peek_kind()) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            // All infix operators are left-associative.
            let rhs = self.parse_expression(bp + 1)?;
            let span = node.span.merge(rhs.span);
            node = Expr::new(
                ExprKind::OpCall {
                    op,
                    operands: vec![node, rhs],
                },
                span,
            );
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(Op::Neg),
            TokenKind::Bang => Some(Op::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::OpCall {
                    op,
                    operands: vec![operand],
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    /// A primary followed by any number of call and index suffixes.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_primary()?;
        loop {
            if self.accept(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.accept(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression(0)?);
                        if self.accept(&TokenKind::RParen) {
                            break;
                        }
                        self.expect(&TokenKind::Comma)?;
                    }
                }
                let span = node.span.merge(self.prev_span());
                node = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(node),
                        args,
                    },
                    span,
                );
            } else if self.accept(&TokenKind::LBracket) {
                let index = self.parse_expression(0)?;
                self.expect(&TokenKind::RBracket)?;
                let span = node.span.merge(self.prev_span());
                node = Expr::new(
                    ExprKind::OpCall {
                        op: Op::Index,
                        operands: vec![node, index],
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            Span::dummy()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Lit(Lit::Int(n)), tok.span))
            }
            TokenKind::FloatLit(x) => {
                self.advance();
                Ok(Expr::new(ExprKind::Lit(Lit::Float(x)), tok.span))
            }
            TokenKind::BoolLit(b) => {
                self.advance();
                Ok(Expr::new(ExprKind::Lit(Lit::Bool(b)), tok.span))
            }
            TokenKind::CharLit(c) => {
                self.advance();
                Ok(Expr::new(ExprKind::Lit(Lit::Char(c)), tok.span))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Lit(Lit::Str(s)), tok.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Var(name), tok.span))
            }
            TokenKind::LParen => {
                if self.looks_like_lambda() {
                    self.parse_lambda()
                } else {
                    self.advance();
                    let expr = self.parse_expression(0)?;
                    self.expect(&TokenKind::RParen)?;
                    Ok(expr)
                }
            }
            // `{...}` in expression position is an array literal; blocks are
            // recognized at statement level before expressions are tried.
            TokenKind::LBrace => self.parse_array_literal(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// After `(`: a type keyword, an empty parameter list followed by `->`,
    /// or `IDENT IDENT` all announce a lambda parameter list rather than a
    /// parenthesized expression.
    fn looks_like_lambda(&self) -> bool {
        match self.peek_at(1) {
            kind if kind.is_type_keyword() => true,
            TokenKind::RParen => matches!(self.peek_at(2), TokenKind::Arrow),
            TokenKind::Ident(_) => matches!(self.peek_at(2), TokenKind::Ident(_)),
            _ => false,
        }
    }

    /// `( type IDENT, ... ) -> expr` — the body may also be a block.
    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LParen)?.span;
        let mut params = Vec::new();
        if !self.accept(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if self.accept(&TokenKind::RParen) {
                    break;
                }
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::Arrow)?;
        let body = if matches!(self.peek_kind(), TokenKind::LBrace) {
            self.parse_block()?
        } else {
            self.parse_expression(0)?
        };
        let span = start.merge(body.span);
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `{ expr, ... }` or `{}`; elements may themselves be array literals.
    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LBrace)?.span;
        let mut values = Vec::new();
        if !self.accept(&TokenKind::RBrace) {
            loop {
                values.push(self.parse_expression(0)?);
                if self.accept(&TokenKind::RBrace) {
                    break;
                }
                self.expect(&TokenKind::Comma)?;
            }
        }
        let span = start.merge(self.prev_span());
        Ok(Expr::new(ExprKind::Array(values), span))
    }
}
