//! Core library surface for the report instance manager TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as the integration tests can reuse the same pieces:
//! the SQLite persistence layer, the report-instance form pipeline, and the
//! Ratatui front-end that drives both.
pub mod access;
pub mod config;
pub mod db;
pub mod form;
pub mod models;
pub mod session;
pub mod ui;
pub mod urls;

/// Convenience re-exports for the persistence layer. These functions are
/// typically used by `main.rs` to initialize the embedded SQLite store and
/// preload data.
pub use db::{ensure_schema, fetch_instances, open_in_memory};

/// Runtime configuration and the acting user, passed down explicitly instead
/// of read from global state.
pub use config::AppConfig;
pub use session::Session;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
