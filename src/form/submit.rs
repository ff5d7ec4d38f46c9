//! Submission processing for the instance form: validate, reconcile the menu
//! entry, project the submitted map into the criteria blob, then hand one
//! assembled parameter set to the persistence layer and report back what
//! happened.

use std::collections::BTreeMap;

use anyhow::Context;
use rusqlite::Connection;
use tracing::info;

use crate::config::AppConfig;
use crate::db::instances::{self, InstanceParams, NavigationPlacement};
use crate::db::navigation;
use crate::form::defaults::{NavigationStash, DEFAULT_CACHE_MINUTES};
use crate::form::FormError;
use crate::models::ViewMode;
use crate::session::Session;
use crate::urls;

/// Keys stripped from the submitted map before the leftover becomes the
/// criteria blob. Everything here is either stored in its own column or is
/// scaffolding from the embedding form (auth token, button marker, editor
/// aliases).
const FORM_VALUES_EXCLUDED: &[&str] = &[
    "title",
    "to_emails",
    "cc_emails",
    "header",
    "footer",
    "request_token",
    "id",
    "report_header",
    "report_footer",
    "grouprole",
    "drilldown_id",
    "task",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which control submitted the form. Only the primary controls insist on a
/// title; secondary ones (print, export, refresh) submit whatever is there.
pub enum TriggerAction {
    Save,
    Next,
    Secondary,
}

impl TriggerAction {
    fn requires_title(self) -> bool {
        matches!(self, TriggerAction::Save | TriggerAction::Next)
    }
}

#[derive(Debug, Clone)]
/// One submitted form, exactly as the renderer hands it over. Checkbox fields
/// appear in `values` only when checked; any keys beyond the declared fields
/// ride along into the criteria blob.
pub struct Submission {
    /// Instance being edited, `None` for a fresh save.
    pub instance_id: Option<i64>,
    /// Report definition key. Ignored in copy mode, where the source row's
    /// key is re-read so the copy stays bound to the same definition.
    pub report_id: String,
    /// Save a copy instead of updating in place.
    pub create_new: bool,
    pub trigger: TriggerAction,
    /// Submitted field values keyed by field name.
    pub values: BTreeMap<String, String>,
    /// Roles picked in the multi-select. Kept apart from `values` because
    /// flattening them into one column is the persistence layer's business.
    pub grouprole: Vec<String>,
    /// Menu identity stashed by the default populator.
    pub navigation: Option<NavigationStash>,
}

impl Submission {
    fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Trimmed non-empty text value.
    fn text(&self, key: &str) -> Option<String> {
        self.value(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Checkbox semantics: present and not literally "0" counts as checked.
    fn flag(&self, key: &str) -> bool {
        self.value(key).is_some_and(|v| !v.is_empty() && v != "0")
    }

    fn number(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Created,
    Updated,
    Copied,
}

#[derive(Debug, Clone)]
/// What a successful submission produced: the saved row's identity, a status
/// message worded for how the save happened, and where a front end should
/// send the user next.
pub struct SaveOutcome {
    pub id: i64,
    pub title: String,
    pub action: SaveAction,
    pub message: String,
    pub redirect: String,
}

/// The title rule is the form's only field validation, and it only applies to
/// the primary submit controls.
fn validate(sub: &Submission) -> Result<(), FormError> {
    let mut errors = BTreeMap::new();
    if sub.trigger.requires_title() && sub.text("title").is_none() {
        errors.insert("title".to_string(), "Title is a required field.".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FormError::Validation(errors))
    }
}

/// Run one submission through the whole pipeline. On success the instance row
/// exists with its menu entry reconciled; on validation failure nothing has
/// been written.
pub fn process_submission(
    conn: &Connection,
    config: &AppConfig,
    session: &Session,
    sub: &Submission,
) -> Result<SaveOutcome, FormError> {
    validate(sub)?;

    // Copy mode pins the source's report key, then forgets the row id so the
    // persistence layer inserts a fresh row.
    let mut instance_id = sub.instance_id;
    let mut report_id = sub.report_id.clone();
    if sub.create_new {
        if let Some(source_id) = sub.instance_id {
            report_id = instances::instance_report_id(conn, source_id)?;
        }
        instance_id = None;
    }

    let placement = if sub.flag("is_navigation") {
        let parent_id = match sub.value("parent_id") {
            // An explicit placeholder choice means top level.
            Some(raw) => raw.trim().parse().ok(),
            None => sub.navigation.and_then(|stash| stash.parent_id),
        };
        Some(NavigationPlacement {
            existing_id: sub.navigation.map(|stash| stash.id),
            parent_id,
        })
    } else {
        if let Some(id) = instance_id {
            if let Some(nav_id) = instances::navigation_id_of(conn, id)? {
                navigation::delete_entry(conn, nav_id)?;
                navigation::reset_navigation_cache(conn)?;
            }
        }
        None
    };

    // Everything not stored in its own column survives into the criteria
    // blob, view_mode included, so the execution engine sees it.
    let mut criteria = sub.values.clone();
    for key in FORM_VALUES_EXCLUDED {
        criteria.remove(*key);
    }

    let view_mode = ViewMode::parse(sub.value("view_mode").unwrap_or(ViewMode::View.as_str()));

    let owner_id = if sub.flag("add_to_my_reports") {
        session.user_id
    } else {
        None
    };
    criteria.remove("add_to_my_reports");

    let form_values =
        serde_json::to_string(&criteria).context("failed to encode criteria values")?;

    // A submission without the drilldown key means the selector was never on
    // the form; in-place saves keep the stored link instead of clearing it.
    let drilldown_id = match sub.value("drilldown_id") {
        Some(raw) => raw.trim().parse().ok(),
        None => match instance_id {
            Some(id) => instances::drilldown_id_of(conn, id)?,
            None => None,
        },
    };

    let params = InstanceParams {
        instance_id,
        report_id,
        title: sub.text("title").unwrap_or_default(),
        description: sub.text("description"),
        email_subject: sub.text("email_subject"),
        email_to: sub.text("email_to"),
        email_cc: sub.text("email_cc"),
        header: sub.text("report_header"),
        footer: sub.text("report_footer"),
        row_count: sub.number("row_count").filter(|n| *n > 0),
        cache_minutes: sub
            .number("cache_minutes")
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_CACHE_MINUTES),
        is_dashboard: sub.flag("is_dashboard"),
        is_reserved: sub.flag("is_reserved"),
        permission: sub.text("permission"),
        grouprole: sub.grouprole.clone(),
        drilldown_id,
        owner_id,
        form_values: Some(form_values),
        view_mode,
        navigation: placement,
    };

    let saved = instances::create_or_update(conn, config, params)?;

    let (action, message) = match (sub.instance_id, sub.create_new) {
        (Some(_), false) => (
            SaveAction::Updated,
            format!("\"{}\" report has been updated.", saved.title),
        ),
        (Some(_), true) => (
            SaveAction::Copied,
            format!(
                "Your report has been successfully copied as \"{}\". You are currently viewing the new copy.",
                saved.title
            ),
        ),
        (None, _) => (
            SaveAction::Created,
            format!(
                "\"{}\" report has been successfully created. You are currently viewing the new report instance.",
                saved.title
            ),
        ),
    };

    let redirect = urls::instance_url(config, saved.id, view_mode);
    info!(instance = saved.id, action = ?action, "saved report instance");

    Ok(SaveOutcome {
        id: saved.id,
        title: saved.title,
        action,
        message,
        redirect,
    })
}
