//! scriptcore CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use scriptcore::db::MemoryDb;
use scriptcore::{InterpreterConfig, Interpreter, Program};

#[derive(Parser)]
#[command(name = "scriptcore", version, about = "Run serialized scriptcore programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program
    Run {
        /// Program file (JSON statement tree)
        file: PathBuf,
        /// Interpreter limits (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// In-memory tables for `connect` (JSON object of table -> rows)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Pretty-print a program's statement tree
    Dump {
        /// Program file (JSON statement tree)
        file: PathBuf,
    },
}

fn main() {
    scriptcore::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file, config, db } => run_file(&file, config.as_deref(), db.as_deref()),
        Command::Dump { file } => dump_file(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(
    path: &Path,
    config: Option<&Path>,
    db: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(p) => InterpreterConfig::load(p)?,
        None => InterpreterConfig::default(),
    };
    let mut interp = Interpreter::new().with_config(config);
    if let Some(tables) = db {
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(tables)?)?;
        interp = interp.with_db_adapter(Box::new(MemoryDb::from_json(&json)?));
    }

    if let Err(e) = interp.run_file(path) {
        eprintln!("{e}");
        if !e.stack.is_empty() {
            eprintln!("{}", e.stack_trace());
        }
        std::process::exit(1);
    }
    Ok(())
}

fn dump_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let program = Program::from_json(&std::fs::read_to_string(path)?)?;
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}
