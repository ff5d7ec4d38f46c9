use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::access::EVERYONE_PERMISSION;
use crate::config::AppConfig;
use crate::db::navigation;
use crate::models::{join_grouproles, split_grouproles, ReportInstance, ViewMode};
use crate::urls;

#[derive(Debug, Clone)]
/// Where the instance's menu entry should live. `existing_id` is the entry
/// already pointing at this instance, when one was stashed at form-build time.
pub struct NavigationPlacement {
    pub existing_id: Option<i64>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
/// Everything the persistence layer needs to write one instance row, plus the
/// menu placement when the instance should appear in navigation. Assembled by
/// the submission processor; the raw submitted field map never reaches here.
pub struct InstanceParams {
    pub instance_id: Option<i64>,
    pub report_id: String,
    pub title: String,
    pub description: Option<String>,
    pub email_subject: Option<String>,
    pub email_to: Option<String>,
    pub email_cc: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub row_count: Option<i64>,
    pub cache_minutes: i64,
    pub is_dashboard: bool,
    pub is_reserved: bool,
    pub permission: Option<String>,
    pub grouprole: Vec<String>,
    pub drilldown_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub form_values: Option<String>,
    /// Decides whether generated links force a render or open the criteria
    /// page. Baked into the menu entry URL.
    pub view_mode: ViewMode,
    pub navigation: Option<NavigationPlacement>,
}

#[cfg(test)]
impl InstanceParams {
    /// Minimal valid params for tests; override fields with struct update
    /// syntax.
    pub(crate) fn sample(report_id: &str, title: &str) -> Self {
        InstanceParams {
            instance_id: None,
            report_id: report_id.to_string(),
            title: title.to_string(),
            description: None,
            email_subject: None,
            email_to: None,
            email_cc: None,
            header: None,
            footer: None,
            row_count: None,
            cache_minutes: 60,
            is_dashboard: false,
            is_reserved: false,
            permission: Some(crate::access::ACCESS_REPORTS.to_string()),
            grouprole: Vec::new(),
            drilldown_id: None,
            owner_id: None,
            form_values: None,
            view_mode: ViewMode::View,
            navigation: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Identity of the row that was just written, echoed back so callers can build
/// status messages and redirects without re-querying.
pub struct SavedInstance {
    pub id: i64,
    pub title: String,
}

/// Write one instance row, inserting or updating based on `instance_id`, then
/// reconcile its menu entry. A requested placement upserts the entry, points
/// it at a freshly built instance link and invalidates the menu cache. Updates
/// against a vanished row surface an explicit error.
pub fn create_or_update(
    conn: &Connection,
    config: &AppConfig,
    params: InstanceParams,
) -> Result<SavedInstance> {
    let grouprole = if params.grouprole.is_empty() {
        None
    } else {
        Some(join_grouproles(&params.grouprole))
    };

    let id = match params.instance_id {
        Some(id) => {
            let updated = conn
                .execute(
                    "UPDATE report_instances
                     SET report_id = ?1, title = ?2, description = ?3, email_subject = ?4,
                         email_to = ?5, email_cc = ?6, header = ?7, footer = ?8,
                         row_count = ?9, cache_minutes = ?10, is_dashboard = ?11,
                         is_reserved = ?12, permission = ?13, grouprole = ?14,
                         drilldown_id = ?15, owner_id = ?16, form_values = ?17
                     WHERE id = ?18",
                    params![
                        params.report_id,
                        params.title,
                        params.description,
                        params.email_subject,
                        params.email_to,
                        params.email_cc,
                        params.header,
                        params.footer,
                        params.row_count,
                        params.cache_minutes,
                        params.is_dashboard,
                        params.is_reserved,
                        params.permission,
                        grouprole,
                        params.drilldown_id,
                        params.owner_id,
                        params.form_values,
                        id,
                    ],
                )
                .context("failed to update report instance")?;
            if updated == 0 {
                return Err(anyhow!("Report instance not found"));
            }
            id
        }
        None => {
            conn.execute(
                "INSERT INTO report_instances
                    (report_id, title, description, email_subject, email_to, email_cc,
                     header, footer, row_count, cache_minutes, is_dashboard, is_reserved,
                     permission, grouprole, drilldown_id, owner_id, form_values)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17)",
                params![
                    params.report_id,
                    params.title,
                    params.description,
                    params.email_subject,
                    params.email_to,
                    params.email_cc,
                    params.header,
                    params.footer,
                    params.row_count,
                    params.cache_minutes,
                    params.is_dashboard,
                    params.is_reserved,
                    params.permission,
                    grouprole,
                    params.drilldown_id,
                    params.owner_id,
                    params.form_values,
                ],
            )
            .context("failed to insert report instance")?;
            conn.last_insert_rowid()
        }
    };

    if let Some(placement) = &params.navigation {
        let url = urls::instance_url(config, id, params.view_mode);
        // Menu entries for open instances carry no permission gate at all.
        let nav_permission = params
            .permission
            .as_deref()
            .filter(|key| *key != EVERYONE_PERMISSION);
        let nav_id = navigation::upsert_report_entry(
            conn,
            placement.existing_id,
            placement.parent_id,
            &params.title,
            &url,
            nav_permission,
        )?;
        conn.execute(
            "UPDATE report_instances SET navigation_id = ?1 WHERE id = ?2",
            params![nav_id, id],
        )
        .context("failed to attach navigation entry to instance")?;
        navigation::reset_navigation_cache(conn)?;
        debug!(instance = id, entry = nav_id, "placed instance in navigation");
    }

    Ok(SavedInstance {
        id,
        title: params.title,
    })
}

/// Retrieve every saved instance sorted by title. The query doubles as the
/// single source of truth for how the UI orders the catalogue.
pub fn fetch_instances(conn: &Connection) -> Result<Vec<ReportInstance>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, report_id, title, description, email_subject, email_to, email_cc,
                    header, footer, row_count, cache_minutes, is_dashboard, is_reserved,
                    permission, grouprole, navigation_id, drilldown_id, owner_id, form_values
             FROM report_instances
             ORDER BY title COLLATE NOCASE",
        )
        .context("failed to prepare instance query")?;

    let instances = stmt
        .query_map([], hydrate_instance)
        .context("failed to iterate report instances")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect report instances")?;

    Ok(instances)
}

/// Load one instance by id.
pub fn get_instance(conn: &Connection, id: i64) -> Result<Option<ReportInstance>> {
    conn.query_row(
        "SELECT id, report_id, title, description, email_subject, email_to, email_cc,
                header, footer, row_count, cache_minutes, is_dashboard, is_reserved,
                permission, grouprole, navigation_id, drilldown_id, owner_id, form_values
         FROM report_instances WHERE id = ?1",
        params![id],
        hydrate_instance,
    )
    .optional()
    .context("failed to load report instance")
}

/// Report definition key behind an instance. Copy flows use this so the copy
/// parameterises the same underlying report as its source.
pub fn instance_report_id(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row(
        "SELECT report_id FROM report_instances WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .context("failed to load instance report key")?
    .ok_or_else(|| anyhow!("Report instance not found"))
}

/// Role restriction on an instance, decoded to individual names. Missing rows
/// and blank columns both come back as an empty, unrestricted set.
pub fn instance_grouproles(conn: &Connection, id: i64) -> Result<Vec<String>> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT grouprole FROM report_instances WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load instance roles")?;

    Ok(raw
        .flatten()
        .map(|flat| split_grouproles(&flat))
        .unwrap_or_default())
}

/// Menu entry currently pointing at an instance, if any.
pub fn navigation_id_of(conn: &Connection, id: i64) -> Result<Option<i64>> {
    let raw: Option<Option<i64>> = conn
        .query_row(
            "SELECT navigation_id FROM report_instances WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load instance navigation link")?;

    Ok(raw.flatten())
}

/// Stored drill-down link on an instance, if any.
pub fn drilldown_id_of(conn: &Connection, id: i64) -> Result<Option<i64>> {
    let raw: Option<Option<i64>> = conn
        .query_row(
            "SELECT drilldown_id FROM report_instances WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load instance drilldown link")?;

    Ok(raw.flatten())
}

/// Sibling instances of a report definition, offered as drill-down targets.
pub fn instances_for_report(conn: &Connection, report_id: &str) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title FROM report_instances
             WHERE report_id = ?1
             ORDER BY title COLLATE NOCASE",
        )
        .context("failed to prepare sibling instance query")?;

    let rows = stmt
        .query_map(params![report_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to iterate sibling instances")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect sibling instances")?;

    Ok(rows)
}

fn hydrate_instance(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportInstance> {
    Ok(ReportInstance {
        id: row.get(0)?,
        report_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        email_subject: row.get(4)?,
        email_to: row.get(5)?,
        email_cc: row.get(6)?,
        header: row.get(7)?,
        footer: row.get(8)?,
        row_count: row.get(9)?,
        cache_minutes: row.get(10)?,
        is_dashboard: row.get(11)?,
        is_reserved: row.get(12)?,
        permission: row.get(13)?,
        grouprole: row.get(14)?,
        navigation_id: row.get(15)?,
        drilldown_id: row.get(16)?,
        owner_id: row.get(17)?,
        form_values: row.get(18)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;
    use crate::db::navigation::{delete_entry, navigation_cache_is_warm, navigation_list};

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn insert_then_fetch_round_trips_all_columns() {
        let conn = open_in_memory().unwrap();
        let params = InstanceParams {
            description: Some("Donors by month".to_string()),
            email_subject: Some("Monthly donors".to_string()),
            email_to: Some("board@example.org".to_string()),
            row_count: Some(50),
            cache_minutes: 15,
            is_dashboard: true,
            grouprole: vec!["editor".to_string(), "authenticated".to_string()],
            owner_id: Some(12),
            form_values: Some("{\"fields\":\"all\"}".to_string()),
            ..InstanceParams::sample("contribute/detail", "Monthly donors")
        };
        let saved = create_or_update(&conn, &config(), params).unwrap();

        let loaded = get_instance(&conn, saved.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Monthly donors");
        assert_eq!(loaded.report_id, "contribute/detail");
        assert_eq!(loaded.row_count, Some(50));
        assert_eq!(loaded.cache_minutes, 15);
        assert!(loaded.is_dashboard);
        assert_eq!(loaded.owner_id, Some(12));
        assert_eq!(
            loaded.grouprole_set(),
            vec!["editor".to_string(), "authenticated".to_string()]
        );
        assert_eq!(loaded.form_values.as_deref(), Some("{\"fields\":\"all\"}"));
    }

    #[test]
    fn update_against_missing_row_surfaces_an_error() {
        let conn = open_in_memory().unwrap();
        let params = InstanceParams {
            instance_id: Some(404),
            ..InstanceParams::sample("contribute/detail", "Ghost")
        };
        let err = create_or_update(&conn, &config(), params).unwrap_err();
        assert_eq!(err.to_string(), "Report instance not found");
    }

    #[test]
    fn placement_creates_menu_entry_and_invalidates_cache() {
        let conn = open_in_memory().unwrap();
        navigation_list(&conn).unwrap();
        assert!(navigation_cache_is_warm(&conn).unwrap());

        let params = InstanceParams {
            navigation: Some(NavigationPlacement {
                existing_id: None,
                parent_id: None,
            }),
            ..InstanceParams::sample("member/lapsed", "Lapsed members")
        };
        let saved = create_or_update(&conn, &config(), params).unwrap();

        assert!(!navigation_cache_is_warm(&conn).unwrap());
        let nav_id = navigation_id_of(&conn, saved.id).unwrap().unwrap();
        let entry = crate::db::navigation::get_entry(&conn, nav_id).unwrap().unwrap();
        assert_eq!(entry.label, "Lapsed members");
        let url = entry.url.unwrap();
        assert!(url.contains(&format!("report/instance/{}", saved.id)));
        assert!(url.contains("force=1"));
    }

    #[test]
    fn criteria_mode_placement_bakes_criteria_into_menu_url() {
        let conn = open_in_memory().unwrap();
        let params = InstanceParams {
            view_mode: ViewMode::Criteria,
            navigation: Some(NavigationPlacement {
                existing_id: None,
                parent_id: None,
            }),
            ..InstanceParams::sample("member/lapsed", "Lapsed members")
        };
        let saved = create_or_update(&conn, &config(), params).unwrap();

        let nav_id = navigation_id_of(&conn, saved.id).unwrap().unwrap();
        let entry = crate::db::navigation::get_entry(&conn, nav_id).unwrap().unwrap();
        assert!(entry.url.unwrap().contains("output=criteria"));
    }

    #[test]
    fn deleting_menu_entry_nulls_the_instance_link() {
        let conn = open_in_memory().unwrap();
        let params = InstanceParams {
            navigation: Some(NavigationPlacement {
                existing_id: None,
                parent_id: None,
            }),
            ..InstanceParams::sample("member/lapsed", "Lapsed members")
        };
        let saved = create_or_update(&conn, &config(), params).unwrap();
        let nav_id = navigation_id_of(&conn, saved.id).unwrap().unwrap();

        delete_entry(&conn, nav_id).unwrap();
        assert_eq!(navigation_id_of(&conn, saved.id).unwrap(), None);
    }

    #[test]
    fn everyone_permission_is_not_copied_onto_menu_entries() {
        let conn = open_in_memory().unwrap();
        let params = InstanceParams {
            permission: Some(EVERYONE_PERMISSION.to_string()),
            navigation: Some(NavigationPlacement {
                existing_id: None,
                parent_id: None,
            }),
            ..InstanceParams::sample("member/lapsed", "Open report")
        };
        let saved = create_or_update(&conn, &config(), params).unwrap();
        let nav_id = navigation_id_of(&conn, saved.id).unwrap().unwrap();
        let entry = crate::db::navigation::get_entry(&conn, nav_id).unwrap().unwrap();
        assert_eq!(entry.permission, None);

        let loaded = get_instance(&conn, saved.id).unwrap().unwrap();
        assert_eq!(loaded.permission.as_deref(), Some(EVERYONE_PERMISSION));
    }
}
