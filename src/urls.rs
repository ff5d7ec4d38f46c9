//! Link assembly for saved reports. Every URL the manager hands out (menu
//! targets, post-save redirects, the report catalogue) is built here so the
//! query-string conventions stay in one place.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::AppConfig;
use crate::models::ViewMode;

/// Characters escaped inside query-string values. Covers everything that would
/// change how a URL parses, plus space.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'=')
    .add(b'?');

/// Join a path onto the configured base and append query parameters. Values
/// are percent-encoded; keys are compile-time identifiers and pass through.
pub fn build_url(config: &AppConfig, path: &str, params: &[(&str, &str)]) -> String {
    let mut url = format!("{}{}", config.base_url, path.trim_start_matches('/'));
    for (index, (key, value)) in params.iter().enumerate() {
        let sep = if index == 0 { '?' } else { '&' };
        url.push(sep);
        url.push_str(key);
        url.push('=');
        url.push_str(&utf8_percent_encode(value, QUERY_VALUE).to_string());
    }
    url
}

/// Link that opens a saved instance. `reset=1` clears any stale session state
/// on the engine side; view mode then decides whether the link forces an
/// immediate render or lands on the criteria page.
pub fn instance_url(config: &AppConfig, instance_id: i64, view_mode: ViewMode) -> String {
    let path = format!("report/instance/{instance_id}");
    match view_mode {
        ViewMode::View => build_url(config, &path, &[("reset", "1"), ("force", "1")]),
        ViewMode::Criteria => build_url(config, &path, &[("reset", "1"), ("output", "criteria")]),
    }
}

/// Link back to the saved-report catalogue. Users denied access to a specific
/// instance are bounced here.
pub fn report_list_url(config: &AppConfig) -> String {
    build_url(config, "report/list", &[("reset", "1")])
}

/// Whether a stored link targets the criteria page. Menu entries keep their
/// full URL, so this is how edit-form defaults recover the saved view mode.
pub fn targets_criteria(url: &str) -> bool {
    url.contains("output=criteria")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_values_but_not_keys() {
        let config = AppConfig::default();
        let url = build_url(&config, "report/list", &[("title", "A & B=C")]);
        assert_eq!(url, "http://localhost/report/list?title=A%20%26%20B%3DC");
    }

    #[test]
    fn instance_url_forces_render_in_view_mode() {
        let config = AppConfig::default();
        assert_eq!(
            instance_url(&config, 42, ViewMode::View),
            "http://localhost/report/instance/42?reset=1&force=1"
        );
    }

    #[test]
    fn instance_url_targets_criteria_page_in_criteria_mode() {
        let config = AppConfig::default();
        let url = instance_url(&config, 42, ViewMode::Criteria);
        assert_eq!(
            url,
            "http://localhost/report/instance/42?reset=1&output=criteria"
        );
        assert!(targets_criteria(&url));
    }

    #[test]
    fn view_links_do_not_read_as_criteria_links() {
        let config = AppConfig::default();
        assert!(!targets_criteria(&instance_url(&config, 7, ViewMode::View)));
    }
}
