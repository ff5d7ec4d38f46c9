//! Binary entry point that glues the SQLite-backed report store to the TUI.
//! Summarizing the bootstrapping pipeline here keeps the intent obvious when
//! revisiting the code: we route tracing to a log file, bring up the database,
//! hydrate the initial app state, and drive the Ratatui event loop until the
//! user exits.
use std::fs;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;

use report_instance_manager::{
    db, ensure_schema, fetch_instances, run_app, App, AppConfig, Session,
};

/// Keeps the background log writer alive for the lifetime of the process.
/// Dropping the guard would silently discard buffered log lines.
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Route tracing output to a daily-rolled file under the data directory. The
/// terminal itself belongs to Ratatui while the app runs, so nothing may be
/// written to stdout.
fn init_tracing(config: &AppConfig) -> Result<()> {
    let log_dir = db::data_root(config)?.join("logs");
    fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "report-instance-manager.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Ok(())
}

/// Initialize persistence, load the saved report instances, and launch the
/// Ratatui event loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// the user removing the writable data directory) to the terminal instead of
/// crashing silently. The local console runs as the site administrator; the
/// permission checks still matter because saved instances carry their own
/// access restrictions.
fn main() -> Result<()> {
    let config = AppConfig::default();
    init_tracing(&config)?;

    let conn = ensure_schema(&config)?;
    let session = Session::administrator(1);
    let instances = fetch_instances(&conn)?;

    let mut app = App::new(conn, config, session, instances);
    run_app(&mut app)
}
