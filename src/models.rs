//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. The intent is that these types stay light-weight data holders so other
//! layers can focus on presentation and persistence logic. Keeping the
//! commentary here means later refactors can reconstruct the assumptions even
//! if other context is lost.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used when a set of role names is flattened into a single column.
/// The value is a control character so it can never collide with characters
/// that appear in real role names.
pub const GROUPROLE_SEPARATOR: char = '\u{1}';

/// Join role names into the flattened form stored in `report_instances.grouprole`.
pub fn join_grouproles(roles: &[String]) -> String {
    roles.join(&GROUPROLE_SEPARATOR.to_string())
}

/// Split a flattened `grouprole` column back into individual role names. Blank
/// segments are dropped so a stored empty string round-trips to an empty set.
pub fn split_grouproles(raw: &str) -> Vec<String> {
    raw.split(GROUPROLE_SEPARATOR)
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| piece.to_string())
        .collect()
}

/// How a saved report opens when its link is followed: straight to rendered
/// results, or to the criteria page so the viewer can adjust filters first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    View,
    Criteria,
}

impl ViewMode {
    /// Stable string form used in submitted field maps and saved criteria.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::View => "view",
            ViewMode::Criteria => "criteria",
        }
    }

    /// Parse the stored string form, falling back to `View` for anything
    /// unrecognised so stale rows never wedge the form.
    pub fn parse(raw: &str) -> ViewMode {
        match raw {
            "criteria" => ViewMode::Criteria,
            _ => ViewMode::View,
        }
    }

    /// Label shown next to the selector in the form.
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::View => "View Results",
            ViewMode::Criteria => "Criteria Page",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
/// In-memory representation of one saved report configuration. The struct
/// mirrors rows in the `report_instances` table; `form_values` stays an opaque
/// serialized blob because only the reporting engine understands its contents.
pub struct ReportInstance {
    /// Primary key from the SQLite store. Edit/copy/delete flows bubble the id
    /// back to the persistence layer.
    pub id: i64,
    /// Key of the report definition this instance parameterises. Copies share
    /// the same `report_id` as their source.
    pub report_id: String,
    /// Title displayed in lists, menus and status messages.
    pub title: String,
    /// Optional blurb shown under the title in listings.
    pub description: Option<String>,
    /// Subject line used when the rendered report is mailed out.
    pub email_subject: Option<String>,
    /// Comma separated recipient list for scheduled delivery.
    pub email_to: Option<String>,
    /// Comma separated CC list for scheduled delivery.
    pub email_cc: Option<String>,
    /// HTML wrapped around the top of printed and mailed output. `None` means
    /// the boilerplate default is regenerated at edit time.
    pub header: Option<String>,
    /// HTML appended after printed and mailed output.
    pub footer: Option<String>,
    /// Cap on rendered rows; `None` leaves the engine default in place.
    pub row_count: Option<i64>,
    /// How long rendered output may be served from cache, in minutes.
    pub cache_minutes: i64,
    /// Whether the instance is offered as a dashboard widget.
    pub is_dashboard: bool,
    /// Reserved instances are locked against casual edits; only holders of the
    /// reserved-report permission may change them.
    pub is_reserved: bool,
    /// Single permission key a viewer must hold, or `None` for unrestricted.
    pub permission: Option<String>,
    /// Flattened role-name set (see [`GROUPROLE_SEPARATOR`]); any one matching
    /// role grants access.
    pub grouprole: Option<String>,
    /// Menu entry that points at this instance, when it has been added to the
    /// navigation tree.
    pub navigation_id: Option<i64>,
    /// Instance of a companion detail report that row-level drill-down links
    /// should target.
    pub drilldown_id: Option<i64>,
    /// Owning user. Set when the creator keeps the instance on their personal
    /// report list, `None` for shared instances.
    pub owner_id: Option<i64>,
    /// Serialized criteria map captured at save time. Treated as opaque here.
    pub form_values: Option<String>,
}

impl ReportInstance {
    /// Role names granted access, decoded from the flattened column.
    pub fn grouprole_set(&self) -> Vec<String> {
        self.grouprole
            .as_deref()
            .map(split_grouproles)
            .unwrap_or_default()
    }
}

impl fmt::Display for ReportInstance {
    /// Write the instance title to any formatter. Display is implemented so the
    /// type plays nicely with Ratatui widgets that consume strings implicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One entry in the navigation menu tree. Serialization derives exist because
/// the assembled tree is cached as JSON between rebuilds.
pub struct NavigationEntry {
    /// Primary key from the SQLite store.
    pub id: i64,
    /// Menu text; report entries reuse the instance title.
    pub label: String,
    /// Parent entry, or `None` for a root of the tree.
    pub parent_id: Option<i64>,
    /// Link target. Separator-style entries carry no URL.
    pub url: Option<String>,
    /// Permission key required to see the entry, if any.
    pub permission: Option<String>,
    /// Inactive entries stay in the table but are hidden from menus.
    pub is_active: bool,
    /// Sort key among siblings.
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One selectable permission for the access selector: machine key plus the
/// label shown to the person filling in the form.
pub struct PermissionOption {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One site role offered by the role multi-select.
pub struct RoleOption {
    pub name: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouproles_round_trip_through_the_flattened_form() {
        let roles = vec!["editor".to_string(), "authenticated".to_string()];
        let flat = join_grouproles(&roles);
        assert!(flat.contains(GROUPROLE_SEPARATOR));
        assert_eq!(split_grouproles(&flat), roles);
    }

    #[test]
    fn splitting_blank_grouprole_yields_no_roles() {
        assert!(split_grouproles("").is_empty());
        assert!(split_grouproles("\u{1}").is_empty());
    }

    #[test]
    fn view_mode_parse_falls_back_to_view() {
        assert_eq!(ViewMode::parse("criteria"), ViewMode::Criteria);
        assert_eq!(ViewMode::parse("view"), ViewMode::View);
        assert_eq!(ViewMode::parse("garbage"), ViewMode::View);
    }
}
