//! Interactive REPL for the Aster language.

use aster_compiler::compiler::typecheck::{Annotator, TypeEnv};
use aster_rt::{Frame, Interpreter, Value};
use aster_tensor::Backend;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}
fn gray(s: &str) -> String {
    format!("\x1b[90m{}\x1b[0m", s)
}

const HELP: &str = "\
:help          show this help
:type <expr>   show the inferred type of an expression
:env           list global bindings
:quit          exit the repl

Expressions evaluate and print; declarations and statements accumulate
in the global frame.";

pub fn run(backend: Backend) -> Result<(), String> {
    let mut editor = DefaultEditor::new().map_err(|e| e.to_string())?;
    let interpreter = Interpreter::new(backend);
    let annotator = Annotator::default();
    let mut type_env = TypeEnv::default();

    println!("aster repl — :help for commands, :quit to exit");
    loop {
        match editor.readline("aster> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                match line {
                    ":quit" | ":q" => break,
                    ":help" => println!("{}", HELP),
                    ":env" => {
                        for name in Frame::local_names(interpreter.globals()) {
                            println!("{}", name);
                        }
                    }
                    _ if line.starts_with(":type ") => {
                        show_type(&annotator, &type_env, &line[6..]);
                    }
                    _ => eval_line(&interpreter, &annotator, &mut type_env, line),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(())
}

fn show_type(annotator: &Annotator, env: &TypeEnv, source: &str) {
    match aster_compiler::parse_expr(source) {
        Ok(mut expr) => match annotator.annotate_expr(&mut expr, env) {
            Ok(ty) => println!("{}", cyan(&ty.to_string())),
            Err(e) => println!("{}", red(&e.to_string())),
        },
        Err(e) => println!("{}", red(&e.to_string())),
    }
}

/// Try the line as an expression, then as a statement, then as a whole
/// program. Successful inputs are type-checked against the accumulated
/// environment before they run.
fn eval_line(
    interpreter: &Interpreter,
    annotator: &Annotator,
    type_env: &mut TypeEnv,
    line: &str,
) {
    if let Ok(mut expr) = aster_compiler::parse_expr(line) {
        match annotator.annotate_expr(&mut expr, type_env) {
            Ok(_) => match interpreter.eval_expr(&expr, interpreter.globals()) {
                Ok(Value::Unit) => {}
                Ok(value) => println!("{}", green(&value.to_string())),
                Err(e) => println!("{}", red(&format!("runtime error: {}", e))),
            },
            Err(e) => println!("{}", red(&format!("type error: {}", e))),
        }
        return;
    }

    if let Ok(mut stmt) = aster_compiler::parse_stmt(line) {
        // Statements bind into the persistent environment: check on a copy
        // first so a failed line leaves it untouched.
        let mut candidate = type_env.clone();
        match annotator.annotate_stmt(&mut stmt, &mut candidate) {
            Ok(_) => {
                match interpreter.exec_stmt(&stmt, interpreter.globals()) {
                    Ok(Some(value)) if !matches!(value, Value::Unit) => {
                        println!("{}", green(&value.to_string()))
                    }
                    Ok(_) => {}
                    Err(e) => println!("{}", red(&format!("runtime error: {}", e))),
                }
                *type_env = candidate;
            }
            Err(e) => println!("{}", red(&format!("type error: {}", e))),
        }
        return;
    }

    match aster_compiler::parse(line) {
        Ok(mut program) => {
            let mut candidate = type_env.clone();
            let mut failed = false;
            for decl in &mut program.decls {
                if let Err(e) = annotator.annotate_decl(decl, &mut candidate) {
                    println!("{}", red(&format!("type error: {}", e)));
                    failed = true;
                    break;
                }
            }
            if !failed {
                match interpreter.run_program(&program) {
                    Ok(()) => *type_env = candidate,
                    Err(e) => println!("{}", red(&format!("runtime error: {}", e))),
                }
            }
        }
        Err(e) => println!("{}", gray(&e.to_string())),
    }
}
