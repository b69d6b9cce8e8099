use crate::compiler::tokens::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete Aster program: the ordered top-level declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub span: Span,
}

// ── Type system ──

/// The closed set of primitive base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prim {
    Int,
    Float,
    Bool,
    Char,
    Unit,
}

impl Prim {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Prim::Int | Prim::Float)
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prim::Int => write!(f, "int"),
            Prim::Float => write!(f, "float"),
            Prim::Bool => write!(f, "bool"),
            Prim::Char => write!(f, "char"),
            Prim::Unit => write!(f, "unit"),
        }
    }
}

/// A function's shape: parameter types and return type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

/// What a type is made of, before the array dimension is applied.
///
/// Equality is structural for primitives and function types and nominal for
/// records: two record types are equal iff their names match, regardless of
/// field schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaseType {
    Prim(Prim),
    Record(String),
    Fn(FnType),
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Prim(p) => write!(f, "{}", p),
            BaseType::Record(name) => write!(f, "{}", name),
            BaseType::Fn(ft) => {
                write!(f, "fn(")?;
                for (i, p) in ft.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ft.ret)
            }
        }
    }
}

/// A resolved Aster type: a base type plus an array dimension (rank).
///
/// `dim == 0` is a scalar; `dim == d > 0` is a d-dimensional array whose
/// elements have the base type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    pub base: BaseType,
    pub dim: usize,
}

impl Type {
    pub fn new(base: BaseType, dim: usize) -> Self {
        Self { base, dim }
    }

    /// A rank-0 primitive type.
    pub fn prim(p: Prim) -> Self {
        Self::new(BaseType::Prim(p), 0)
    }

    pub fn unit() -> Self {
        Self::prim(Prim::Unit)
    }

    pub fn is_scalar(&self) -> bool {
        self.dim == 0
    }

    pub fn is_bool_scalar(&self) -> bool {
        self.dim == 0 && self.base == BaseType::Prim(Prim::Bool)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for _ in 0..self.dim {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

// ── Declarations ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Var(VarDecl),
    Func(FuncDecl),
    Record(RecordDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Var(d) => d.span,
            Decl::Func(d) => d.span,
            Decl::Record(d) => d.span,
        }
    }
}

/// `int x = 3;` — also used for uninitialized and untyped bindings built
/// through the AST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    /// Declared type; the annotator fills it in from the initializer when
    /// absent.
    pub ty: Option<Type>,
    pub mutable: bool,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A typed parameter of a function or lambda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// `int add(int a, int b) { ... }` — the body is a block expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_ty: Type,
    pub body: Expr,
    pub span: Span,
}

/// A nominal record type declaration: name plus ordered field schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Expr(ExprStmt),
    Assign(AssignStmt),
    Decl(DeclStmt),
    While(WhileStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Decl(s) => s.span,
            Stmt::While(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// `x = e;` or `r.f = e;` — the lvalue is a `Var` or `Field` expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    pub lvalue: Expr,
    pub rvalue: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclStmt {
    pub decl: Decl,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

// ── Expressions ──

/// A literal value. The tag distinguishes bool from int structurally, so
/// the literal typing rule never has to order its checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

/// Operators usable in `OpCall`. `Index` is the postfix `[...]` form;
/// `Neg`/`Not` are the unary forms.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum Op {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "neg")]
    Neg,
    #[strum(serialize = "[]")]
    Index,
    /// Matrix product. No surface operator spells it; it exists for
    /// programs built through the AST API and for the array engine tests.
    #[strum(serialize = "@")]
    MatMul,
}

impl Op {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Rem)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Op::Eq | Op::NotEq | Op::Lt | Op::LtEq | Op::Gt | Op::GtEq
        )
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Op::Lt | Op::LtEq | Op::Gt | Op::GtEq)
    }
}

/// An expression node. `ty` is `None` out of the parser; the annotator
/// writes the inferred type into every node it visits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Lit(Lit),
    /// `{e1, e2, ...}` — homogeneous array literal.
    Array(Vec<Expr>),
    /// Record construction: name plus field values in insertion order.
    Record {
        name: String,
        fields: Vec<(String, Expr)>,
    },
    /// `(int x) -> x + 1`
    Lambda { params: Vec<Param>, body: Box<Expr> },
    Var(String),
    /// `object.field`
    Field { object: Box<Expr>, field: String },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Operator application; one operand for `Neg`/`Not`, two otherwise
    /// (`Index` takes target and index).
    OpCall { op: Op, operands: Vec<Expr> },
    /// `{ stmt* }` — value of the last expression statement, or unit.
    Block(Vec<Stmt>),
    /// `if (c) t else e` — `els` of `None` makes the whole form unit-valued.
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
}
