//! `Taskboard` command-line front end.
//!
//! Loads the board from the data directory, applies one command, and
//! writes the result back. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! taskboard column add Review
//! taskboard task add "Write docs" --column todo --attach notes.md
//! TASKBOARD_KEY=work taskboard show
//! ```

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::board::BoardEngine;
use taskboard::cli::{self, Command};
use taskboard::config::{BoardConfig, CliArgs};
use taskboard::store::FileStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match BoardConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&config.log_level, cli.log_file.as_deref());

    tracing::debug!(data_dir = %config.data_dir.display(), key = %config.storage_key, "taskboard starting");

    let store = FileStore::new(&config.data_dir);
    let mut engine = BoardEngine::load(store, config.to_engine_config());
    let command = cli.command.unwrap_or(Command::Show { json: false });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = cli::run(&mut engine, command, &mut out).await {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = out.flush() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    if engine.persist_failures() > 0 {
        eprintln!("Warning: the board could not be saved to {}", config.data_dir.display());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Initialize logging.
///
/// Logs go to stderr unless a file is given, in which case they are
/// written through a non-blocking appender. The returned [`WorkerGuard`]
/// must be held until exit so buffered entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
