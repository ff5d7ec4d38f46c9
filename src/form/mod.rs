//! The saved-report form itself, split into its three phases: declaring the
//! editable fields, computing defaults for display, and processing a
//! submission into a persisted instance. The surrounding UI only renders what
//! this module hands it and feeds the submitted values back in.

pub mod defaults;
pub mod schema;
pub mod submit;

use std::collections::BTreeMap;

use thiserror::Error;

pub use defaults::{default_values, InstanceDefaults, NavigationStash, DEFAULT_CACHE_MINUTES};
pub use schema::{build_fields, FieldWidget, FormField, SelectOption, INSTANCE_FIELDS};
pub use submit::{
    process_submission, SaveAction, SaveOutcome, Submission, TriggerAction,
};

#[derive(Debug, Clone)]
/// Everything the form phases need to know about why the form is open. Threaded
/// through explicitly so nothing in here reaches for ambient request state.
pub struct FormContext {
    /// Instance being edited, `None` when configuring a fresh save.
    pub instance_id: Option<i64>,
    /// Report definition the instance parameterises.
    pub report_id: String,
    /// Description inherited from the report definition; prefills new
    /// instances only.
    pub description: Option<String>,
    /// Raw `output` query parameter of the request that opened the form.
    pub output_param: Option<String>,
    /// Companion detail report offered for drill-down, as
    /// (definition key, selector label).
    pub drilldown_report: Option<(String, String)>,
}

impl FormContext {
    /// Context for configuring a brand-new instance of a report definition.
    pub fn for_new(report_id: &str) -> Self {
        FormContext {
            instance_id: None,
            report_id: report_id.to_string(),
            description: None,
            output_param: None,
            drilldown_report: None,
        }
    }

    /// Context for editing an instance that already exists.
    pub fn for_instance(instance_id: i64, report_id: &str) -> Self {
        FormContext {
            instance_id: Some(instance_id),
            report_id: report_id.to_string(),
            description: None,
            output_param: None,
            drilldown_report: None,
        }
    }
}

#[derive(Debug, Error)]
/// The three ways a form request can fail. Authorization failures bounce the
/// user elsewhere, validation failures stay on the form, and storage failures
/// propagate with their original cause attached.
pub enum FormError {
    #[error("You do not have permission to access this report.")]
    AccessDenied {
        /// Where to send the user instead, normally the report catalogue.
        redirect: String,
    },
    #[error("The form has errors that need correcting.")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    Persistence(#[from] anyhow::Error),
}
