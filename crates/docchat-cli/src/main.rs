//! docchat - chat with AI providers over your documents from the terminal.
//!
//! Thin shell over `docchat-core`: it owns the current screen, runs the
//! startup session check, and reacts to auth events from the API client.

mod app;
mod cli;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Directory for log files; logs go to stderr when unset
const LOG_DIR_ENV_VAR: &str = "DOCCHAT_LOG_DIR";

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var_os(LOG_DIR_ENV_VAR).map(PathBuf::from) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "docchat.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("docchat starting");

    let mut app = App::new(&cli)?;
    let result = app.run(cli.command).await;

    info!("docchat shutting down");
    result
}
