//! Edit-time defaults for the instance form. For new instances this is mostly
//! fixed boilerplate; for existing ones the stored row is folded in on top,
//! and the menu entry (when there is one) contributes placement and view-mode
//! hints.

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use crate::access::ACCESS_REPORTS;
use crate::config::AppConfig;
use crate::db::{instances, navigation};
use crate::form::FormContext;
use crate::models::ViewMode;
use crate::urls;

/// Cache lifetime applied when a record carries none.
pub const DEFAULT_CACHE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy)]
/// Identity of the menu entry already pointing at the edited instance, held
/// aside at default time so the submission processor can update that entry in
/// place instead of minting a duplicate.
pub struct NavigationStash {
    pub id: i64,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
/// Initial value for every form field, plus the stashed menu identity that
/// never renders but must survive the display round-trip.
pub struct InstanceDefaults {
    pub title: String,
    pub description: String,
    pub email_subject: String,
    pub email_to: String,
    pub email_cc: String,
    pub report_header: String,
    pub report_footer: String,
    pub row_count: Option<i64>,
    pub cache_minutes: i64,
    pub is_navigation: bool,
    pub view_mode: ViewMode,
    pub is_dashboard: bool,
    pub add_to_my_reports: bool,
    pub is_reserved: bool,
    pub permission: String,
    pub grouprole: Vec<String>,
    pub parent_id: Option<i64>,
    pub drilldown_id: Option<i64>,
    /// Whether the linked menu entry is currently shown. Entries hidden by a
    /// menu administrator come back when the instance is saved with the menu
    /// box still checked.
    pub navigation_active: bool,
    pub navigation: Option<NavigationStash>,
}

/// Compute defaults for the form. The layering order matters: fixed defaults
/// first, then the request's `output` parameter, then the stored record, and
/// finally the menu entry's URL, so a saved criteria link wins over everything
/// else when deciding the view mode.
pub fn default_values(
    conn: &Connection,
    config: &AppConfig,
    ctx: &FormContext,
) -> Result<InstanceDefaults> {
    let mut defaults = InstanceDefaults {
        title: String::new(),
        description: ctx.description.clone().unwrap_or_default(),
        email_subject: String::new(),
        email_to: String::new(),
        email_cc: String::new(),
        report_header: default_report_header(config),
        report_footer: default_report_footer(config),
        row_count: None,
        cache_minutes: DEFAULT_CACHE_MINUTES,
        is_navigation: false,
        view_mode: ViewMode::View,
        is_dashboard: false,
        add_to_my_reports: false,
        is_reserved: false,
        permission: ACCESS_REPORTS.to_string(),
        grouprole: Vec::new(),
        parent_id: None,
        drilldown_id: None,
        navigation_active: false,
        navigation: None,
    };

    if ctx.output_param.as_deref() == Some("criteria") {
        defaults.view_mode = ViewMode::Criteria;
    }

    let Some(instance_id) = ctx.instance_id else {
        return Ok(defaults);
    };
    let record = instances::get_instance(conn, instance_id)?
        .ok_or_else(|| anyhow!("Report instance not found"))?;

    defaults.title = record.title;
    if let Some(description) = record.description {
        defaults.description = description;
    }
    defaults.email_subject = record.email_subject.unwrap_or_default();
    defaults.email_to = record.email_to.unwrap_or_default();
    defaults.email_cc = record.email_cc.unwrap_or_default();
    defaults.row_count = record.row_count;
    defaults.is_dashboard = record.is_dashboard;
    defaults.is_reserved = record.is_reserved;
    defaults.drilldown_id = record.drilldown_id;
    if let Some(permission) = record.permission {
        defaults.permission = permission;
    }
    defaults.grouprole = record.grouprole
        .as_deref()
        .map(crate::models::split_grouproles)
        .unwrap_or_default();

    // A customised header wins; blank ones keep the regenerated boilerplate.
    if let Some(header) = record.header.filter(|h| !h.trim().is_empty()) {
        defaults.report_header = header;
    }
    if let Some(footer) = record.footer.filter(|f| !f.trim().is_empty()) {
        defaults.report_footer = footer;
    }

    if record.cache_minutes > 0 {
        defaults.cache_minutes = record.cache_minutes;
    }

    defaults.add_to_my_reports = record.owner_id.is_some();

    if let Some(navigation_id) = record.navigation_id {
        if let Some(entry) = navigation::get_entry(conn, navigation_id)? {
            defaults.is_navigation = true;
            defaults.parent_id = entry.parent_id;
            defaults.navigation_active = entry.is_active;
            defaults.navigation = Some(NavigationStash {
                id: entry.id,
                parent_id: entry.parent_id,
            });
            // The link saved on the menu entry overrides any assumption made
            // from the request parameters.
            if entry.url.as_deref().is_some_and(urls::targets_criteria) {
                defaults.view_mode = ViewMode::Criteria;
            }
        }
    }

    Ok(defaults)
}

/// Boilerplate wrapped around printed and mailed reports when no custom header
/// was saved. The themed region markup from configuration is spliced in so
/// sites can brand the default without editing every instance.
pub fn default_report_header(config: &AppConfig) -> String {
    let region = config.header_region.as_deref().unwrap_or("");
    format!(
        "<html>\n  <head>\n    <title>Report</title>\n    <meta http-equiv='Content-Type' content='text/html; charset=utf-8' />\n    <style type=\"text/css\">@import url({resource}css/print.css);</style>\n    {region}\n  </head>\n  <body><div id=\"report-container\">",
        resource = config.resource_url,
    )
}

/// Counterpart of [`default_report_header`].
pub fn default_report_footer(config: &AppConfig) -> String {
    format!(
        "<p><img src=\"{resource}i/powered_by.png\" /></p></div></body>\n</html>\n",
        resource = config.resource_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;
    use crate::db::instances::{create_or_update, InstanceParams, NavigationPlacement};

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn new_form_gets_boilerplate_and_fixed_defaults() {
        let conn = open_in_memory().unwrap();
        let mut ctx = FormContext::for_new("contribute/summary");
        ctx.description = Some("All contributions by month".to_string());

        let defaults = default_values(&conn, &config(), &ctx).unwrap();
        assert_eq!(defaults.cache_minutes, DEFAULT_CACHE_MINUTES);
        assert_eq!(defaults.permission, ACCESS_REPORTS);
        assert_eq!(defaults.view_mode, ViewMode::View);
        assert_eq!(defaults.description, "All contributions by month");
        assert!(defaults.report_header.contains("css/print.css"));
        assert!(defaults.report_footer.contains("powered_by.png"));
        assert!(defaults.navigation.is_none());
    }

    #[test]
    fn output_parameter_flips_view_mode_to_criteria() {
        let conn = open_in_memory().unwrap();
        let mut ctx = FormContext::for_new("contribute/summary");
        ctx.output_param = Some("criteria".to_string());

        let defaults = default_values(&conn, &config(), &ctx).unwrap();
        assert_eq!(defaults.view_mode, ViewMode::Criteria);
    }

    #[test]
    fn owner_presence_drives_add_to_my_reports() {
        let conn = open_in_memory().unwrap();
        let owned = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                owner_id: Some(42),
                ..InstanceParams::sample("contribute/summary", "Mine")
            },
        )
        .unwrap();
        let shared = create_or_update(
            &conn,
            &config(),
            InstanceParams::sample("contribute/summary", "Everyone's"),
        )
        .unwrap();

        let mine = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(owned.id, "contribute/summary"),
        )
        .unwrap();
        assert!(mine.add_to_my_reports);

        let theirs = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(shared.id, "contribute/summary"),
        )
        .unwrap();
        assert!(!theirs.add_to_my_reports);
    }

    #[test]
    fn zero_cache_minutes_falls_back_to_sixty() {
        let conn = open_in_memory().unwrap();
        let saved = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                cache_minutes: 0,
                ..InstanceParams::sample("contribute/summary", "Stale")
            },
        )
        .unwrap();

        let defaults = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(saved.id, "contribute/summary"),
        )
        .unwrap();
        assert_eq!(defaults.cache_minutes, DEFAULT_CACHE_MINUTES);
    }

    #[test]
    fn stored_header_wins_over_boilerplate() {
        let conn = open_in_memory().unwrap();
        let saved = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                header: Some("<html><body>Branded".to_string()),
                footer: Some("   ".to_string()),
                ..InstanceParams::sample("contribute/summary", "Branded")
            },
        )
        .unwrap();

        let defaults = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(saved.id, "contribute/summary"),
        )
        .unwrap();
        assert_eq!(defaults.report_header, "<html><body>Branded");
        // Whitespace-only footers do not count as customised.
        assert!(defaults.report_footer.contains("powered_by.png"));
    }

    #[test]
    fn menu_entry_contributes_stash_and_wins_view_mode() {
        let conn = open_in_memory().unwrap();
        let saved = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                view_mode: ViewMode::Criteria,
                navigation: Some(NavigationPlacement {
                    existing_id: None,
                    parent_id: None,
                }),
                ..InstanceParams::sample("contribute/summary", "In the menu")
            },
        )
        .unwrap();

        // The request URL said nothing about criteria; the menu entry does.
        let defaults = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(saved.id, "contribute/summary"),
        )
        .unwrap();
        assert!(defaults.is_navigation);
        assert!(defaults.navigation_active);
        assert_eq!(defaults.view_mode, ViewMode::Criteria);
        let stash = defaults.navigation.expect("stash should be present");
        assert_eq!(stash.parent_id, None);
    }

    #[test]
    fn deactivated_menu_entry_still_stashes_but_reads_hidden() {
        let conn = open_in_memory().unwrap();
        let saved = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                navigation: Some(NavigationPlacement {
                    existing_id: None,
                    parent_id: None,
                }),
                ..InstanceParams::sample("contribute/summary", "Benched")
            },
        )
        .unwrap();
        conn.execute(
            "UPDATE navigation SET is_active = 0
             WHERE id = (SELECT navigation_id FROM report_instances WHERE id = ?1)",
            rusqlite::params![saved.id],
        )
        .unwrap();

        let defaults = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(saved.id, "contribute/summary"),
        )
        .unwrap();
        assert!(defaults.is_navigation);
        assert!(!defaults.navigation_active);
        assert!(defaults.navigation.is_some());
    }

    #[test]
    fn grouprole_column_splits_into_the_multiselect_set() {
        let conn = open_in_memory().unwrap();
        let saved = create_or_update(
            &conn,
            &config(),
            InstanceParams {
                grouprole: vec!["editor".to_string(), "authenticated".to_string()],
                ..InstanceParams::sample("contribute/summary", "Role bound")
            },
        )
        .unwrap();

        let defaults = default_values(
            &conn,
            &config(),
            &FormContext::for_instance(saved.id, "contribute/summary"),
        )
        .unwrap();
        assert_eq!(
            defaults.grouprole,
            vec!["editor".to_string(), "authenticated".to_string()]
        );
    }
}
