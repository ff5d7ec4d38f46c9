//! Ratatui front-end for the report instance manager: a list of saved
//! instances, the schema-driven editor modal, and a navigation-menu screen
//! backed by the cached menu tree.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
