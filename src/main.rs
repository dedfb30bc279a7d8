mod console;
mod command;
mod errors;
mod repl;
mod session;
mod storage;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use session::Session;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "sqlyte", version = VERSION, about = "A small persistent single-table database.")]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    db_file: PathBuf,
}

fn main() -> ExitCode {
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("sqlyte.log")
        .expect("failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap's own exit code doesn't match the shell's documented
            // contract (exit 1 on a missing db-file argument), so print its
            // message ourselves and pick the code explicitly.
            eprint!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let session = match Session::open(&cli.db_file) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match repl::run(session) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
