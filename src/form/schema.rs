//! Field declarations for the instance form. The shape of every field lives in
//! one compile-time table; building the form resolves option lists against the
//! database and applies the per-session gates (reserved flag, role catalogue,
//! drill-down availability).

use rusqlite::Connection;

use crate::access::{
    is_instance_grouprole_allowed, ADMINISTER_RESERVED_REPORTS, EVERYONE_LABEL,
    EVERYONE_PERMISSION,
};
use crate::config::AppConfig;
use crate::db::{instances, navigation, permissions};
use crate::form::{FormContext, FormError};
use crate::models::ViewMode;
use crate::session::Session;
use crate::urls;

/// Placeholder label for "nothing chosen" options on selects that permit it.
const SELECT_PLACEHOLDER: &str = "- select -";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a select or multi-select gets its options from at build time.
pub enum OptionSource {
    ViewModes,
    Permissions,
    Roles,
    ParentMenus,
    DrilldownInstances,
}

#[derive(Debug, Clone, Copy)]
/// Widget shape as declared in the static table, before options are resolved.
pub enum WidgetDef {
    Text { max_len: usize },
    TextArea,
    Number { min: i64 },
    Checkbox,
    Select(OptionSource),
    MultiSelect(OptionSource),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: WidgetDef,
}

/// Every editable field of the instance form, in display order. Labels and
/// length limits are declared here instead of being read back out of column
/// metadata at runtime.
pub const INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "title",
        label: "Report Title",
        widget: WidgetDef::Text { max_len: 255 },
    },
    FieldDef {
        name: "description",
        label: "Report Description",
        widget: WidgetDef::Text { max_len: 255 },
    },
    FieldDef {
        name: "email_subject",
        label: "Subject",
        widget: WidgetDef::Text { max_len: 128 },
    },
    FieldDef {
        name: "email_to",
        label: "To",
        widget: WidgetDef::Text { max_len: 255 },
    },
    FieldDef {
        name: "email_cc",
        label: "CC",
        widget: WidgetDef::Text { max_len: 255 },
    },
    FieldDef {
        name: "row_count",
        label: "Limit Dashboard Results",
        widget: WidgetDef::Number { min: 1 },
    },
    FieldDef {
        name: "report_header",
        label: "Report Header",
        widget: WidgetDef::TextArea,
    },
    FieldDef {
        name: "report_footer",
        label: "Report Footer",
        widget: WidgetDef::TextArea,
    },
    FieldDef {
        name: "is_navigation",
        label: "Include Report in Navigation Menu?",
        widget: WidgetDef::Checkbox,
    },
    FieldDef {
        name: "view_mode",
        label: "Configure link to...",
        widget: WidgetDef::Select(OptionSource::ViewModes),
    },
    FieldDef {
        name: "is_dashboard",
        label: "Available for Dashboard?",
        widget: WidgetDef::Checkbox,
    },
    FieldDef {
        name: "cache_minutes",
        label: "Cache dashlet for",
        widget: WidgetDef::Number { min: 1 },
    },
    FieldDef {
        name: "add_to_my_reports",
        label: "Add to My Reports?",
        widget: WidgetDef::Checkbox,
    },
    FieldDef {
        name: "is_reserved",
        label: "Reserved Report?",
        widget: WidgetDef::Checkbox,
    },
    FieldDef {
        name: "permission",
        label: "Permission",
        widget: WidgetDef::Select(OptionSource::Permissions),
    },
    FieldDef {
        name: "grouprole",
        label: "ACL Group/Role",
        widget: WidgetDef::MultiSelect(OptionSource::Roles),
    },
    FieldDef {
        name: "parent_id",
        label: "Parent Menu",
        widget: WidgetDef::Select(OptionSource::ParentMenus),
    },
    FieldDef {
        name: "drilldown_id",
        label: "Drill-down Report",
        widget: WidgetDef::Select(OptionSource::DrilldownInstances),
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: &str, label: &str) -> Self {
        SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
/// Widget shape after option resolution, ready for a renderer.
pub enum FieldWidget {
    Text { max_len: usize },
    TextArea,
    Number { min: i64 },
    Checkbox,
    Select { options: Vec<SelectOption> },
    MultiSelect { options: Vec<SelectOption> },
}

#[derive(Debug, Clone)]
/// One renderable form field. `read_only` fields are shown but locked, which
/// is how the reserved flag appears to users who may not change it.
pub struct FormField {
    pub name: &'static str,
    pub label: String,
    pub widget: FieldWidget,
    pub read_only: bool,
}

impl FormField {
    pub fn is_editable(&self) -> bool {
        !self.read_only
    }
}

/// Resolve the static table into renderable fields for one session and
/// context. Fields whose option source comes up empty (no roles, no eligible
/// drill-down targets) are omitted entirely. Editing an instance the session's
/// roles do not cover aborts with a bounce to the report catalogue rather than
/// a form error.
pub fn build_fields(
    conn: &Connection,
    config: &AppConfig,
    session: &Session,
    ctx: &FormContext,
) -> Result<Vec<FormField>, FormError> {
    if let Some(instance_id) = ctx.instance_id {
        if !is_instance_grouprole_allowed(conn, session, instance_id)? {
            return Err(FormError::AccessDenied {
                redirect: urls::report_list_url(config),
            });
        }
    }

    let mut fields = Vec::with_capacity(INSTANCE_FIELDS.len());
    for def in INSTANCE_FIELDS {
        let widget = match def.widget {
            WidgetDef::Text { max_len } => FieldWidget::Text { max_len },
            WidgetDef::TextArea => FieldWidget::TextArea,
            WidgetDef::Number { min } => FieldWidget::Number { min },
            WidgetDef::Checkbox => FieldWidget::Checkbox,
            WidgetDef::Select(source) => match resolve_options(conn, ctx, source)? {
                Some(options) => FieldWidget::Select { options },
                None => continue,
            },
            WidgetDef::MultiSelect(source) => match resolve_options(conn, ctx, source)? {
                Some(options) => FieldWidget::MultiSelect { options },
                None => continue,
            },
        };

        let read_only =
            def.name == "is_reserved" && !session.has_permission(ADMINISTER_RESERVED_REPORTS);
        let label = match (def.name, &ctx.drilldown_report) {
            ("drilldown_id", Some((_, drill_label))) => drill_label.clone(),
            _ => def.label.to_string(),
        };

        fields.push(FormField {
            name: def.name,
            label,
            widget,
            read_only,
        });
    }

    Ok(fields)
}

/// Option lists per source. `None` means the field should not be rendered at
/// all for this context.
fn resolve_options(
    conn: &Connection,
    ctx: &FormContext,
    source: OptionSource,
) -> Result<Option<Vec<SelectOption>>, FormError> {
    match source {
        OptionSource::ViewModes => Ok(Some(vec![
            SelectOption::new(ViewMode::View.as_str(), ViewMode::View.label()),
            SelectOption::new(ViewMode::Criteria.as_str(), ViewMode::Criteria.label()),
        ])),
        OptionSource::Permissions => {
            let mut options = vec![SelectOption::new(EVERYONE_PERMISSION, EVERYONE_LABEL)];
            let catalogue =
                permissions::list_permissions(conn, permissions::REPORT_PERMISSION_GROUPS)?;
            options.extend(
                catalogue
                    .into_iter()
                    .map(|p| SelectOption { value: p.key, label: p.label }),
            );
            Ok(Some(options))
        }
        OptionSource::Roles => {
            let roles = permissions::role_names(conn)?;
            if roles.is_empty() {
                return Ok(None);
            }
            Ok(Some(
                roles
                    .into_iter()
                    .map(|r| SelectOption { value: r.name, label: r.label })
                    .collect(),
            ))
        }
        OptionSource::ParentMenus => {
            let mut options = vec![SelectOption::new("", SELECT_PLACEHOLDER)];
            options.extend(
                navigation::parent_options(conn)?
                    .into_iter()
                    .map(|(id, label)| SelectOption { value: id.to_string(), label }),
            );
            Ok(Some(options))
        }
        OptionSource::DrilldownInstances => {
            let Some((report_key, _)) = &ctx.drilldown_report else {
                return Ok(None);
            };
            let candidates = instances::instances_for_report(conn, report_key)?;
            if candidates.len() <= 1 {
                return Ok(None);
            }
            let mut options = vec![SelectOption::new("", SELECT_PLACEHOLDER)];
            options.extend(
                candidates
                    .into_iter()
                    .map(|(id, title)| SelectOption { value: id.to_string(), label: title }),
            );
            Ok(Some(options))
        }
    }
}
