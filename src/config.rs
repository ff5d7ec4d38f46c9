//! Runtime configuration for the manager. Everything the form layer used to
//! reach into global state for (base URLs, themed header markup, storage
//! location) is collected here and passed down explicitly.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Prefix for every generated application link, with a trailing slash.
    pub base_url: String,
    /// Prefix for static assets referenced from generated report HTML, with a
    /// trailing slash.
    pub resource_url: String,
    /// Markup rendered by the site theme for the printed-report head section.
    /// Spliced into the default header boilerplate when present.
    pub header_region: Option<String>,
    /// Override for where the SQLite database lives. `None` resolves to the
    /// per-user data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_url: "http://localhost/".to_string(),
            resource_url: "http://localhost/assets/".to_string(),
            header_region: None,
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Configuration rooted at an explicit data directory. Used by tests and
    /// by deployments that keep state somewhere other than the home directory.
    pub fn with_data_dir(dir: PathBuf) -> Self {
        AppConfig {
            data_dir: Some(dir),
            ..AppConfig::default()
        }
    }
}
