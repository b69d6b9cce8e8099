//! The `aster` command-line driver.

use aster_tensor::Backend;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "aster", version, about = "The Aster language front-end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Flat-storage array engine.
    Dense,
    /// Nested-sequence fallback engine.
    Nested,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Dense => Backend::Dense,
            BackendArg::Nested => Backend::Nested,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Parse, type-check and evaluate a program.
    Run {
        file: PathBuf,
        /// Array engine backend.
        #[arg(long, value_enum, default_value = "dense")]
        backend: BackendArg,
        /// Skip the static type checker.
        #[arg(long)]
        no_check: bool,
        /// Call `main()` after the top-level declarations run.
        #[arg(long)]
        main: bool,
    },
    /// Parse and type-check only.
    Check {
        file: PathBuf,
        /// Cross-check record literals against declared schemas.
        #[arg(long)]
        strict_records: bool,
    },
    /// Dump the AST as JSON.
    Ast {
        file: PathBuf,
        /// Annotate before dumping, so every expression carries its type.
        #[arg(long)]
        typed: bool,
    },
    /// Start an interactive session.
    Repl {
        #[arg(long, value_enum, default_value = "dense")]
        backend: BackendArg,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run {
            file,
            backend,
            no_check,
            main,
        } => aster_cli::run(&file, backend.into(), no_check, main),
        Command::Check {
            file,
            strict_records,
        } => aster_cli::check(&file, strict_records),
        Command::Ast { file, typed } => aster_cli::ast(&file, typed),
        Command::Repl { backend } => {
            return match aster_cli::repl::run(backend.into()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(aster_cli::CommandError(rendered)) => {
            eprintln!("{}", rendered.trim_end());
            ExitCode::FAILURE
        }
    }
}
