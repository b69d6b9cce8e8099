//! Aster front-end
//!
//! Transforms Aster source text into a typed AST: token stream, recursive
//! descent parse, and a type-annotation pass that attaches an inferred type
//! to every expression.

pub mod compiler;
pub mod diagnostics;

use compiler::ast::Program;
use compiler::lexer::{self, LexError};
use compiler::parser::{ParseError, Parser};
use compiler::tokens::Token;
use compiler::typecheck::{AnnotateOptions, Annotator, TypeError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl FrontendError {
    /// The source position of the error, when one is known:
    /// (1-based line, optional 1-based column).
    pub fn position(&self) -> Option<(usize, Option<usize>)> {
        match self {
            FrontendError::Lex(e) => match e {
                LexError::UnexpectedChar { line, col, .. }
                | LexError::UnterminatedString { line, col }
                | LexError::UnterminatedChar { line, col }
                | LexError::UnterminatedComment { line, col }
                | LexError::InvalidNumber { line, col } => Some((*line, Some(*col))),
            },
            FrontendError::Parse(e) => match e {
                ParseError::Unexpected { line, col, .. }
                | ParseError::UnterminatedBlock { line, col }
                | ParseError::InvalidAssignTarget { line, col } => Some((*line, Some(*col))),
            },
            FrontendError::Type(e) => {
                use TypeError::*;
                let line = match e {
                    Mismatch { line, .. }
                    | UndefinedVar { line, .. }
                    | NotCallable { line, .. }
                    | ArgCount { line, .. }
                    | HeterogeneousArray { line, .. }
                    | EmptyArray { line }
                    | UnknownRecord { line, .. }
                    | UnknownField { line, .. }
                    | MissingField { line, .. }
                    | FieldOnNonRecord { line, .. }
                    | UnderRank { line, .. }
                    | RankConflict { line, .. }
                    | BadOperand { line, .. }
                    | Condition { line, .. }
                    | AssignUndeclared { line, .. }
                    | CannotInfer { line, .. }
                    | IndexScalar { line, .. }
                    | Builtin { line, .. } => *line,
                };
                Some((line, None))
            }
        }
    }
}

/// Lex a source string into tokens (with the trailing `Eof`).
pub fn tokenize(source: &str) -> Result<Vec<Token>, FrontendError> {
    Ok(lexer::tokenize(source)?)
}

/// Lex and parse a source string into an untyped program.
pub fn parse(source: &str) -> Result<Program, FrontendError> {
    let tokens = lexer::tokenize(source)?;
    Ok(Parser::new(tokens).parse_program()?)
}

/// Parse a single expression spanning the whole input.
pub fn parse_expr(source: &str) -> Result<compiler::ast::Expr, FrontendError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression(0)?;
    if !parser.at_eof() {
        return Err(parser.trailing_input().into());
    }
    Ok(expr)
}

/// Parse a single statement spanning the whole input.
pub fn parse_stmt(source: &str) -> Result<compiler::ast::Stmt, FrontendError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let stmt = parser.parse_statement()?;
    if !parser.at_eof() {
        return Err(parser.trailing_input().into());
    }
    Ok(stmt)
}

/// Annotate a parsed program in place with default options.
pub fn annotate(program: &mut Program) -> Result<(), FrontendError> {
    annotate_with(program, AnnotateOptions::default())
}

/// Annotate a parsed program in place.
pub fn annotate_with(
    program: &mut Program,
    options: AnnotateOptions,
) -> Result<(), FrontendError> {
    Annotator::new(options).annotate_program(program)?;
    Ok(())
}

/// Parse and annotate: the full static pipeline.
pub fn check(source: &str) -> Result<Program, FrontendError> {
    let mut program = parse(source)?;
    annotate(&mut program)?;
    Ok(program)
}
