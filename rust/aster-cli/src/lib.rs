//! Command implementations for the `aster` binary.

pub mod repl;

use aster_compiler::compiler::typecheck::AnnotateOptions;
use aster_compiler::{diagnostics, FrontendError};
use aster_rt::{Interpreter, RuntimeError, Value};
use aster_tensor::Backend;
use std::fs;
use std::path::Path;

/// Top-level failure of a CLI command; already rendered for the user.
pub struct CommandError(pub String);

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError(format!("error: {}", e))
    }
}

fn render_frontend(source: &str, err: &FrontendError) -> CommandError {
    match err.position() {
        Some((line, col)) => CommandError(diagnostics::render(source, &err.to_string(), line, col)),
        None => CommandError(format!("error: {}", err)),
    }
}

fn render_runtime(err: &RuntimeError) -> CommandError {
    CommandError(format!("runtime error: {}", err))
}

/// `aster run <file>`: parse, annotate (unless skipped), evaluate.
pub fn run(
    file: &Path,
    backend: Backend,
    skip_check: bool,
    call_main: bool,
) -> Result<(), CommandError> {
    let source = fs::read_to_string(file)?;
    let program = if skip_check {
        aster_compiler::parse(&source)
    } else {
        aster_compiler::check(&source)
    }
    .map_err(|e| render_frontend(&source, &e))?;

    let interpreter = Interpreter::new(backend);
    interpreter
        .run_program(&program)
        .map_err(|e| render_runtime(&e))?;

    if call_main {
        let result = interpreter
            .call_function("main", Vec::new())
            .map_err(|e| render_runtime(&e))?;
        if !matches!(result, Value::Unit) {
            println!("{}", result);
        }
    }
    Ok(())
}

/// `aster check <file>`: the static pipeline only.
pub fn check(file: &Path, strict_records: bool) -> Result<(), CommandError> {
    let source = fs::read_to_string(file)?;
    let mut program = aster_compiler::parse(&source).map_err(|e| render_frontend(&source, &e))?;
    let options = AnnotateOptions {
        strict_record_fields: strict_records,
    };
    aster_compiler::annotate_with(&mut program, options)
        .map_err(|e| render_frontend(&source, &e))?;
    println!("{}: ok", file.display());
    Ok(())
}

/// `aster ast <file>`: dump the (optionally typed) AST as JSON.
pub fn ast(file: &Path, typed: bool) -> Result<(), CommandError> {
    let source = fs::read_to_string(file)?;
    let mut program = aster_compiler::parse(&source).map_err(|e| render_frontend(&source, &e))?;
    if typed {
        aster_compiler::annotate(&mut program).map_err(|e| render_frontend(&source, &e))?;
    }
    let json = serde_json::to_string_pretty(&program)
        .map_err(|e| CommandError(format!("error: {}", e)))?;
    println!("{}", json);
    Ok(())
}
