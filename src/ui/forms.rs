use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::form::{
    FieldWidget, FormField, InstanceDefaults, NavigationStash, Submission, TriggerAction,
};
use crate::models::NavigationEntry;

use super::helpers::truncate_text;

/// Runtime value held behind one rendered field. Text-like widgets share a
/// buffer variant; the widget on the matching field decides how keys mutate it.
enum FieldState {
    Text(String),
    Number(String),
    Checkbox(bool),
    Select(usize),
    MultiSelect { checked: Vec<bool>, cursor: usize },
}

/// Interactive state of the instance editor. The field list comes straight
/// from the form builder, so anything the builder omitted (no roles, no
/// drill-down candidates) never shows up here, and locked fields keep their
/// seeded value all the way into the submission.
pub(crate) struct InstanceForm {
    pub(crate) instance_id: Option<i64>,
    pub(crate) report_id: String,
    pub(crate) create_new: bool,
    /// The linked menu entry exists but an administrator has hidden it.
    /// Saving with the menu box checked brings it back.
    pub(crate) menu_hidden: bool,
    fields: Vec<FormField>,
    states: Vec<FieldState>,
    active: usize,
    navigation: Option<NavigationStash>,
    pub(crate) error: Option<String>,
    field_errors: BTreeMap<String, String>,
}

impl InstanceForm {
    pub(crate) fn new(
        fields: Vec<FormField>,
        defaults: &InstanceDefaults,
        instance_id: Option<i64>,
        report_id: &str,
        create_new: bool,
    ) -> Self {
        let states = fields
            .iter()
            .map(|field| seed_state(field, defaults))
            .collect();
        let active = fields
            .iter()
            .position(|field| field.is_editable())
            .unwrap_or(0);

        InstanceForm {
            instance_id,
            report_id: report_id.to_string(),
            create_new,
            menu_hidden: defaults.is_navigation && !defaults.navigation_active,
            fields,
            states,
            active,
            navigation: defaults.navigation,
            error: None,
            field_errors: BTreeMap::new(),
        }
    }

    pub(crate) fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn next_field(&mut self) {
        self.shift_focus(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.shift_focus(-1);
    }

    /// Move focus to the nearest editable field in the given direction,
    /// wrapping around and skipping locked fields.
    fn shift_focus(&mut self, delta: isize) {
        if self.fields.is_empty() {
            return;
        }
        let len = self.fields.len() as isize;
        let mut idx = self.active as isize;
        for _ in 0..self.fields.len() {
            idx = (idx + delta).rem_euclid(len);
            if self.fields[idx as usize].is_editable() {
                self.active = idx as usize;
                return;
            }
        }
    }

    /// Printable input for the focused field. Text widgets append, number
    /// widgets only take digits, and a space toggles check-style widgets.
    /// Returns whether the key changed anything.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let field = &self.fields[self.active];
        if field.read_only {
            return false;
        }
        let name = field.name;

        let changed = match (&mut self.states[self.active], &field.widget) {
            (FieldState::Text(value), FieldWidget::Text { max_len }) => {
                if ch.is_control() || value.chars().count() >= *max_len {
                    false
                } else {
                    value.push(ch);
                    true
                }
            }
            (FieldState::Text(value), _) => {
                if ch.is_control() {
                    false
                } else {
                    value.push(ch);
                    true
                }
            }
            (FieldState::Number(value), _) => {
                if ch.is_ascii_digit() {
                    value.push(ch);
                    true
                } else {
                    false
                }
            }
            (FieldState::Checkbox(checked), _) => {
                if ch == ' ' {
                    *checked = !*checked;
                    true
                } else {
                    false
                }
            }
            (FieldState::MultiSelect { checked, cursor }, _) => {
                match (ch, checked.get_mut(*cursor)) {
                    (' ', Some(slot)) => {
                        *slot = !*slot;
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        };

        if changed {
            self.field_errors.remove(name);
        }
        changed
    }

    /// Remove the last character from the focused text or number field.
    pub(crate) fn backspace(&mut self) {
        let field = &self.fields[self.active];
        if field.read_only {
            return;
        }
        let name = field.name;
        match &mut self.states[self.active] {
            FieldState::Text(value) | FieldState::Number(value) => {
                if value.pop().is_some() {
                    self.field_errors.remove(name);
                }
            }
            _ => {}
        }
    }

    /// Left/right on the focused field: cycles a select's choice, or moves the
    /// pick cursor inside a multi-select. Returns whether the key applied.
    pub(crate) fn cycle_option(&mut self, delta: isize) -> bool {
        let field = &self.fields[self.active];
        if field.read_only {
            return false;
        }
        match (&mut self.states[self.active], &field.widget) {
            (FieldState::Select(selected), FieldWidget::Select { options }) => {
                if options.is_empty() {
                    return false;
                }
                let len = options.len() as isize;
                *selected = ((*selected as isize + delta).rem_euclid(len)) as usize;
                self.field_errors.remove(field.name);
                true
            }
            (FieldState::MultiSelect { checked, cursor }, _) => {
                if checked.is_empty() {
                    return false;
                }
                let len = checked.len() as isize;
                *cursor = ((*cursor as isize + delta).rem_euclid(len)) as usize;
                true
            }
            _ => false,
        }
    }

    /// Inline messages from a rejected submission. Focus jumps to the first
    /// offending field so the correction is one keystroke away.
    pub(crate) fn set_field_errors(&mut self, errors: BTreeMap<String, String>) {
        if let Some((field, message)) = errors.iter().next() {
            self.error = Some(message.clone());
            if let Some(idx) = self.fields.iter().position(|f| f.name == field.as_str()) {
                if self.fields[idx].is_editable() {
                    self.active = idx;
                }
            }
        }
        self.field_errors = errors;
    }

    /// Assemble the submission the processor expects: text and select values
    /// keyed by field name, checkboxes present only while checked, roles and
    /// the stashed menu identity carried out-of-band.
    pub(crate) fn submission(&self, trigger: TriggerAction) -> Submission {
        let mut values = BTreeMap::new();
        let mut grouprole = Vec::new();

        for (field, state) in self.fields.iter().zip(&self.states) {
            match (state, &field.widget) {
                (FieldState::Text(value), _) | (FieldState::Number(value), _) => {
                    values.insert(field.name.to_string(), value.clone());
                }
                (FieldState::Checkbox(true), _) => {
                    values.insert(field.name.to_string(), "1".to_string());
                }
                (FieldState::Checkbox(false), _) => {}
                (FieldState::Select(selected), FieldWidget::Select { options }) => {
                    if let Some(option) = options.get(*selected) {
                        values.insert(field.name.to_string(), option.value.clone());
                    }
                }
                (FieldState::MultiSelect { checked, .. }, FieldWidget::MultiSelect { options }) => {
                    if field.name == "grouprole" {
                        grouprole.extend(
                            options
                                .iter()
                                .zip(checked)
                                .filter(|(_, picked)| **picked)
                                .map(|(option, _)| option.value.clone()),
                        );
                    }
                }
                _ => {}
            }
        }

        Submission {
            instance_id: self.instance_id,
            report_id: self.report_id.clone(),
            create_new: self.create_new,
            trigger,
            values,
            grouprole,
            navigation: self.navigation,
        }
    }

    /// Render one field as a single line that fits `width` columns. The active
    /// field shows the tail of its value so appended input stays visible; the
    /// rest get a compacted preview.
    pub(crate) fn build_line(&self, idx: usize, width: usize) -> Line<'static> {
        let field = &self.fields[idx];
        let state = &self.states[idx];
        let is_active = idx == self.active;

        let prefix = format!("{}: ", field.label);
        let avail = width.saturating_sub(prefix.chars().count() + 2);

        let label_style = if field.read_only {
            Style::default().fg(Color::DarkGray)
        } else if is_active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value_style = if is_active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let mut spans = vec![Span::styled(prefix, label_style)];

        match (state, &field.widget) {
            (FieldState::Text(value), _) | (FieldState::Number(value), _) => {
                if value.is_empty() {
                    if field.name == "title" {
                        spans.push(Span::styled(
                            "<required>",
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                } else {
                    let shown = if is_active {
                        tail_window(value, avail)
                    } else {
                        truncate_text(value, avail)
                    };
                    spans.push(Span::styled(shown, value_style));
                }
            }
            (FieldState::Checkbox(checked), _) => {
                let mark = if *checked { "[x]" } else { "[ ]" };
                spans.push(Span::styled(mark.to_string(), value_style));
            }
            (FieldState::Select(selected), FieldWidget::Select { options }) => {
                let label = options
                    .get(*selected)
                    .map(|option| option.label.clone())
                    .unwrap_or_default();
                if is_active {
                    spans.push(Span::styled(format!("< {label} >"), value_style));
                } else {
                    spans.push(Span::raw(label));
                }
            }
            (FieldState::MultiSelect { checked, cursor }, FieldWidget::MultiSelect { options }) => {
                if is_active {
                    for (i, option) in options.iter().enumerate() {
                        let mark = if checked.get(i).copied().unwrap_or(false) {
                            "[x] "
                        } else {
                            "[ ] "
                        };
                        let mut style = value_style;
                        if i == *cursor {
                            style = style.add_modifier(Modifier::UNDERLINED);
                        }
                        spans.push(Span::styled(format!("{mark}{}  ", option.label), style));
                    }
                } else {
                    let chosen: Vec<&str> = options
                        .iter()
                        .zip(checked)
                        .filter(|(_, picked)| **picked)
                        .map(|(option, _)| option.label.as_str())
                        .collect();
                    let shown = if chosen.is_empty() {
                        "-".to_string()
                    } else {
                        chosen.join(", ")
                    };
                    spans.push(Span::raw(shown));
                }
            }
            _ => {}
        }

        if field.read_only {
            spans.push(Span::styled(
                "  (locked)".to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if let Some(message) = self.field_errors.get(field.name) {
            spans.push(Span::styled(
                format!("  {message}"),
                Style::default().fg(Color::Red),
            ));
        }

        Line::from(spans)
    }

    /// Paragraph scroll offset that keeps the focused line in view.
    pub(crate) fn scroll_offset(&self, visible_rows: usize) -> u16 {
        self.active.saturating_sub(visible_rows.saturating_sub(2)) as u16
    }
}

fn seed_state(field: &FormField, defaults: &InstanceDefaults) -> FieldState {
    match &field.widget {
        FieldWidget::Text { .. } | FieldWidget::TextArea => {
            let value = match field.name {
                "title" => defaults.title.clone(),
                "description" => defaults.description.clone(),
                "email_subject" => defaults.email_subject.clone(),
                "email_to" => defaults.email_to.clone(),
                "email_cc" => defaults.email_cc.clone(),
                "report_header" => defaults.report_header.clone(),
                "report_footer" => defaults.report_footer.clone(),
                _ => String::new(),
            };
            FieldState::Text(value)
        }
        FieldWidget::Number { .. } => {
            let value = match field.name {
                "row_count" => defaults
                    .row_count
                    .map(|count| count.to_string())
                    .unwrap_or_default(),
                "cache_minutes" => defaults.cache_minutes.to_string(),
                _ => String::new(),
            };
            FieldState::Number(value)
        }
        FieldWidget::Checkbox => FieldState::Checkbox(match field.name {
            "is_navigation" => defaults.is_navigation,
            "is_dashboard" => defaults.is_dashboard,
            "add_to_my_reports" => defaults.add_to_my_reports,
            "is_reserved" => defaults.is_reserved,
            _ => false,
        }),
        FieldWidget::Select { options } => {
            let wanted = match field.name {
                "view_mode" => Some(defaults.view_mode.as_str().to_string()),
                "permission" => Some(defaults.permission.clone()),
                "parent_id" => defaults.parent_id.map(|id| id.to_string()),
                "drilldown_id" => defaults.drilldown_id.map(|id| id.to_string()),
                _ => None,
            };
            let selected = wanted
                .and_then(|value| options.iter().position(|option| option.value == value))
                .unwrap_or(0);
            FieldState::Select(selected)
        }
        FieldWidget::MultiSelect { options } => FieldState::MultiSelect {
            checked: options
                .iter()
                .map(|option| defaults.grouprole.contains(&option.value))
                .collect(),
            cursor: 0,
        },
    }
}

/// Last `max_chars` characters of a value, so appended input stays on screen.
fn tail_window(value: &str, max_chars: usize) -> String {
    let count = value.chars().count();
    if count <= max_chars {
        return value.to_string();
    }
    value.chars().skip(count - max_chars).collect()
}

/// Fields available within the new-instance prompt.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum ReportKeyField {
    Key,
    Description,
}

impl Default for ReportKeyField {
    fn default() -> Self {
        ReportKeyField::Key
    }
}

/// Small prompt collecting the report definition key (and an optional
/// description) before the full editor opens for a fresh instance.
#[derive(Default, Clone)]
pub(crate) struct ReportKeyForm {
    pub(crate) key: String,
    pub(crate) description: String,
    pub(crate) active: ReportKeyField,
    pub(crate) error: Option<String>,
}

impl ReportKeyForm {
    /// Swap focus between the key and description fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            ReportKeyField::Key => ReportKeyField::Description,
            ReportKeyField::Description => ReportKeyField::Key,
        };
    }

    /// Report keys never contain whitespace; the description takes anything
    /// printable.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            ReportKeyField::Key => {
                if ch.is_whitespace() || ch.is_control() {
                    false
                } else {
                    self.key.push(ch);
                    true
                }
            }
            ReportKeyField::Description => {
                if !ch.is_control() {
                    self.description.push(ch);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            ReportKeyField::Key => {
                self.key.pop();
            }
            ReportKeyField::Description => {
                self.description.pop();
            }
        }
    }

    /// Validate the inputs and return typed values ready for the editor.
    pub(crate) fn parse_inputs(&self) -> Result<(String, Option<String>)> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(anyhow!("Report key is required."));
        }
        let description = self.description.trim();
        let description = if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        };
        Ok((key.to_string(), description))
    }

    /// Render a single line for the prompt widget.
    pub(crate) fn build_line(&self, field_name: &str, field: ReportKeyField) -> Line<'static> {
        let value = match field {
            ReportKeyField::Key => &self.key,
            ReportKeyField::Description => &self.description,
        };
        let is_active = self.active == field;

        let (content, style) = if value.is_empty() {
            let placeholder = match field {
                ReportKeyField::Key => "<required>",
                ReportKeyField::Description => "",
            };
            (
                placeholder.to_string(),
                Style::default().fg(Color::DarkGray),
            )
        } else if is_active {
            (value.clone(), Style::default().fg(Color::Yellow))
        } else {
            (value.clone(), Style::default())
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(content, style),
        ])
    }

    pub(crate) fn value_len(&self, field: ReportKeyField) -> usize {
        match field {
            ReportKeyField::Key => self.key.chars().count(),
            ReportKeyField::Description => self.description.chars().count(),
        }
    }
}

/// Confirmation state for deleting a menu entry from the navigation screen.
pub(crate) struct ConfirmMenuDelete {
    pub(crate) entry: NavigationEntry,
}

impl From<NavigationEntry> for ConfirmMenuDelete {
    fn from(entry: NavigationEntry) -> Self {
        ConfirmMenuDelete { entry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::SelectOption;
    use crate::models::ViewMode;

    fn sample_fields() -> Vec<FormField> {
        vec![
            FormField {
                name: "title",
                label: "Report Title".to_string(),
                widget: FieldWidget::Text { max_len: 255 },
                read_only: false,
            },
            FormField {
                name: "cache_minutes",
                label: "Cache dashlet for".to_string(),
                widget: FieldWidget::Number { min: 1 },
                read_only: false,
            },
            FormField {
                name: "is_navigation",
                label: "Include Report in Navigation Menu?".to_string(),
                widget: FieldWidget::Checkbox,
                read_only: false,
            },
            FormField {
                name: "is_reserved",
                label: "Reserved Report?".to_string(),
                widget: FieldWidget::Checkbox,
                read_only: true,
            },
            FormField {
                name: "view_mode",
                label: "Configure link to...".to_string(),
                widget: FieldWidget::Select {
                    options: vec![
                        SelectOption {
                            value: "view".to_string(),
                            label: "View Results".to_string(),
                        },
                        SelectOption {
                            value: "criteria".to_string(),
                            label: "Criteria Page".to_string(),
                        },
                    ],
                },
                read_only: false,
            },
            FormField {
                name: "grouprole",
                label: "ACL Group/Role".to_string(),
                widget: FieldWidget::MultiSelect {
                    options: vec![
                        SelectOption {
                            value: "administrator".to_string(),
                            label: "Administrator".to_string(),
                        },
                        SelectOption {
                            value: "editor".to_string(),
                            label: "Editor".to_string(),
                        },
                    ],
                },
                read_only: false,
            },
        ]
    }

    fn sample_defaults() -> InstanceDefaults {
        InstanceDefaults {
            title: String::new(),
            description: String::new(),
            email_subject: String::new(),
            email_to: String::new(),
            email_cc: String::new(),
            report_header: String::new(),
            report_footer: String::new(),
            row_count: None,
            cache_minutes: 60,
            is_navigation: false,
            view_mode: ViewMode::View,
            is_dashboard: false,
            add_to_my_reports: false,
            is_reserved: true,
            permission: "access reports".to_string(),
            grouprole: Vec::new(),
            parent_id: None,
            drilldown_id: None,
            navigation_active: false,
            navigation: None,
        }
    }

    fn form() -> InstanceForm {
        InstanceForm::new(
            sample_fields(),
            &sample_defaults(),
            None,
            "test/report",
            false,
        )
    }

    #[test]
    fn number_fields_only_accept_digits() {
        let mut form = form();
        form.next_field();

        assert!(!form.push_char('x'));
        assert!(form.push_char('3'));

        let submission = form.submission(TriggerAction::Secondary);
        assert_eq!(
            submission.values.get("cache_minutes").map(String::as_str),
            Some("603")
        );
    }

    #[test]
    fn focus_skips_locked_fields() {
        let mut form = form();
        form.next_field();
        form.next_field();
        assert!(form.push_char(' '));

        form.next_field();
        assert!(form.cycle_option(1));

        let submission = form.submission(TriggerAction::Secondary);
        assert_eq!(
            submission.values.get("is_navigation").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            submission.values.get("view_mode").map(String::as_str),
            Some("criteria")
        );
    }

    #[test]
    fn submission_reflects_widget_states() {
        let mut form = form();
        for ch in "Donors".chars() {
            assert!(form.push_char(ch));
        }

        let submission = form.submission(TriggerAction::Save);
        assert_eq!(
            submission.values.get("title").map(String::as_str),
            Some("Donors")
        );
        assert!(!submission.values.contains_key("is_navigation"));
        assert_eq!(
            submission.values.get("is_reserved").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            submission.values.get("view_mode").map(String::as_str),
            Some("view")
        );
        assert!(submission.grouprole.is_empty());
    }

    #[test]
    fn multi_select_collects_picked_roles() {
        let mut form = form();
        for _ in 0..4 {
            form.next_field();
        }
        assert!(form.push_char(' '));
        assert!(form.cycle_option(1));
        assert!(form.push_char(' '));

        let submission = form.submission(TriggerAction::Secondary);
        assert_eq!(
            submission.grouprole,
            vec!["administrator".to_string(), "editor".to_string()]
        );
    }

    #[test]
    fn validation_errors_focus_the_offending_field() {
        let mut form = form();
        form.next_field();

        let mut errors = BTreeMap::new();
        errors.insert(
            "title".to_string(),
            "Title is a required field.".to_string(),
        );
        form.set_field_errors(errors);

        assert_eq!(form.error.as_deref(), Some("Title is a required field."));
        assert!(form.push_char('T'));
        let submission = form.submission(TriggerAction::Save);
        assert_eq!(
            submission.values.get("title").map(String::as_str),
            Some("T")
        );
    }

    #[test]
    fn report_key_prompt_requires_a_key() {
        let mut prompt = ReportKeyForm::default();
        assert!(prompt.parse_inputs().is_err());
        assert!(!prompt.push_char(' '));

        for ch in "contribute/summary".chars() {
            assert!(prompt.push_char(ch));
        }
        prompt.toggle_field();
        for ch in "Monthly totals".chars() {
            prompt.push_char(ch);
        }

        let (key, description) = prompt.parse_inputs().unwrap();
        assert_eq!(key, "contribute/summary");
        assert_eq!(description.as_deref(), Some("Monthly totals"));
    }
}
