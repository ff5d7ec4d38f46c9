use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::warn;

use crate::config::AppConfig;
use crate::db::{self, navigation};
use crate::form::{self, FormContext, FormError, TriggerAction};
use crate::models::{NavigationEntry, ReportInstance, ViewMode};
use crate::session::Session;
use crate::urls;

use super::forms::{ConfirmMenuDelete, InstanceForm, ReportKeyField, ReportKeyForm};
use super::helpers::{centered_rect, surface_error, truncate_text};
use super::screens::{InstanceListScreen, NavigationScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states. Keeping this explicit makes it easy to reason
/// about which rendering path runs and what keyboard shortcuts should do.
enum Screen {
    Instances,
    Navigation(NavigationScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    PromptReportKey(ReportKeyForm),
    EditingInstance(InstanceForm),
    ConfirmMenuDelete(ConfirmMenuDelete),
    Searching(SearchState),
}

/// State for an active inline search over the instance list.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    config: AppConfig,
    session: Session,
    list: InstanceListScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        session: Session,
        instances: Vec<ReportInstance>,
    ) -> Self {
        Self {
            conn,
            config,
            session,
            list: InstanceListScreen::new(instances),
            screen: Screen::Instances,
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::PromptReportKey(form) => self.handle_report_key_prompt(code, form)?,
            Mode::EditingInstance(form) => self.handle_instance_editor(code, form)?,
            Mode::ConfirmMenuDelete(confirm) => self.handle_confirm_menu_delete(code, confirm)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Instances => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Up => self.list.move_selection(-1),
                    KeyCode::Down => self.list.move_selection(1),
                    KeyCode::PageUp => self.list.move_selection(-5),
                    KeyCode::PageDown => self.list.move_selection(5),
                    KeyCode::Home => self.list.select_first(),
                    KeyCode::End => self.list.select_last(),
                    KeyCode::Enter => self.open_current_instance(),
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(instance) = self.list.current_instance().cloned() {
                            self.clear_status();
                            let ctx = FormContext::for_instance(instance.id, &instance.report_id);
                            match self.build_editor(&ctx, false) {
                                Ok(editor) => return Ok(self.enter_editor(editor)),
                                Err(message) => self.set_status(message, StatusKind::Error),
                            }
                        } else {
                            self.set_status(
                                "No report instance selected to edit.",
                                StatusKind::Error,
                            );
                        }
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => {
                        if let Some(instance) = self.list.current_instance().cloned() {
                            self.clear_status();
                            let ctx = FormContext::for_instance(instance.id, &instance.report_id);
                            match self.build_editor(&ctx, true) {
                                Ok(editor) => return Ok(self.enter_editor(editor)),
                                Err(message) => self.set_status(message, StatusKind::Error),
                            }
                        } else {
                            self.set_status(
                                "No report instance selected to copy.",
                                StatusKind::Error,
                            );
                        }
                    }
                    KeyCode::Char('+') => {
                        self.clear_status();
                        return Ok(Mode::PromptReportKey(ReportKeyForm::default()));
                    }
                    KeyCode::Char('m') | KeyCode::Char('M') => {
                        self.clear_status();
                        self.open_navigation_view()?;
                    }
                    KeyCode::Char('f') | KeyCode::Char('F') => {
                        return Ok(Mode::Searching(SearchState {
                            query: String::new(),
                        }));
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Navigation(ref mut menu) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut back_to_list = false;
                let mut rebuild = false;
                let mut confirm_entry: Option<NavigationEntry> = None;
                let mut open_target: Option<(String, String)> = None;

                match code {
                    KeyCode::Char('q') => {
                        *exit = true;
                    }
                    KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('M') => {
                        back_to_list = true;
                    }
                    KeyCode::Up => menu.move_selection(-1),
                    KeyCode::Down => menu.move_selection(1),
                    KeyCode::PageUp => menu.move_selection(-5),
                    KeyCode::PageDown => menu.move_selection(5),
                    KeyCode::Home => menu.select_first(),
                    KeyCode::End => menu.select_last(),
                    KeyCode::Enter => {
                        if let Some(row) = menu.current_row() {
                            match &row.entry.url {
                                Some(url) => {
                                    open_target = Some((row.entry.label.clone(), url.clone()));
                                }
                                None => {
                                    status_to_set = Some((
                                        "This menu entry has no link.".to_string(),
                                        StatusKind::Error,
                                    ));
                                }
                            }
                        }
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        rebuild = true;
                    }
                    KeyCode::Char('-') => {
                        if let Some(row) = menu.current_row() {
                            confirm_entry = Some(row.entry.clone());
                        } else {
                            status_to_set = Some((
                                "No menu entry selected to delete.".to_string(),
                                StatusKind::Error,
                            ));
                        }
                    }
                    _ => {}
                }

                if rebuild {
                    navigation::reset_navigation_cache(&self.conn)?;
                    let warm = navigation::navigation_cache_is_warm(&self.conn)?;
                    let rows = navigation::navigation_list(&self.conn)?;
                    menu.set_rows(rows, warm);
                    status_to_set = Some((
                        "Navigation menu rebuilt and re-cached.".to_string(),
                        StatusKind::Info,
                    ));
                }

                if back_to_list {
                    self.clear_status();
                    self.screen = Screen::Instances;
                } else if let Some(entry) = confirm_entry {
                    self.clear_status();
                    return Ok(Mode::ConfirmMenuDelete(entry.into()));
                } else if let Some((label, url)) = open_target {
                    if let Err(err) = open_link(&url) {
                        self.set_status(format!("Failed to open link: {err}"), StatusKind::Error);
                    } else {
                        self.set_status(format!("Opened \"{label}\"."), StatusKind::Info);
                    }
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }

                Ok(Mode::Normal)
            }
        }
    }

    /// Resolve the form phases for one context and seed the interactive
    /// editor, flattening failures into a message for the status footer.
    fn build_editor(
        &self,
        ctx: &FormContext,
        create_new: bool,
    ) -> std::result::Result<InstanceForm, String> {
        let fields = match form::build_fields(&self.conn, &self.config, &self.session, ctx) {
            Ok(fields) => fields,
            Err(FormError::AccessDenied { redirect }) => {
                warn!(
                    instance = ctx.instance_id,
                    redirect = %redirect,
                    "report instance edit denied"
                );
                return Err("You do not have permission to access this report.".to_string());
            }
            Err(FormError::Persistence(err)) => return Err(surface_error(&err)),
            Err(err) => return Err(err.to_string()),
        };
        let defaults = form::default_values(&self.conn, &self.config, ctx)
            .map_err(|err| surface_error(&err))?;

        Ok(InstanceForm::new(
            fields,
            &defaults,
            ctx.instance_id,
            &ctx.report_id,
            create_new,
        ))
    }

    /// Open the editor modal, flagging a menu entry an administrator hid.
    fn enter_editor(&mut self, editor: InstanceForm) -> Mode {
        if editor.menu_hidden {
            self.set_status(
                "The linked menu entry is hidden from the menu; saving re-enables it.",
                StatusKind::Info,
            );
        }
        Mode::EditingInstance(editor)
    }

    fn handle_report_key_prompt(&mut self, code: KeyCode, mut form: ReportKeyForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("New report instance cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((report_id, description)) => {
                    let mut ctx = FormContext::for_new(&report_id);
                    ctx.description = description;
                    match self.build_editor(&ctx, false) {
                        Ok(editor) => return Ok(self.enter_editor(editor)),
                        Err(message) => {
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::PromptReportKey(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_instance_editor(&mut self, code: KeyCode, mut form: InstanceForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Left => {
                form.cycle_option(-1);
            }
            KeyCode::Right => {
                form.cycle_option(1);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let submission = form.submission(TriggerAction::Save);
                match form::process_submission(&self.conn, &self.config, &self.session, &submission)
                {
                    Ok(outcome) => {
                        self.refresh_instances()?;
                        self.select_instance(outcome.id);
                        self.set_status(outcome.message, StatusKind::Info);
                        keep_open = false;
                    }
                    Err(FormError::Validation(errors)) => {
                        form.set_field_errors(errors);
                        if let Some(message) = form.error.clone() {
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                    Err(FormError::AccessDenied { .. }) => {
                        self.set_status(
                            "You do not have permission to access this report.",
                            StatusKind::Error,
                        );
                        keep_open = false;
                    }
                    Err(FormError::Persistence(err)) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    }
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingInstance(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_menu_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmMenuDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.delete_menu_entry(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmMenuDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmMenuDelete(confirm)),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.list.set_filter(None);
                return Ok(Mode::Normal);
            }
            KeyCode::Up => {
                self.list.move_selection(-1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Down => {
                self.list.move_selection(1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::PageUp => {
                self.list.move_selection(-5);
                return Ok(Mode::Searching(state));
            }
            KeyCode::PageDown => {
                self.list.move_selection(5);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Home => {
                self.list.select_first();
                return Ok(Mode::Searching(state));
            }
            KeyCode::End => {
                self.list.select_last();
                return Ok(Mode::Searching(state));
            }
            KeyCode::Enter => {
                self.open_current_instance();
                return Ok(Mode::Searching(state));
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => {}
        }

        if state.query.trim().is_empty() {
            self.list.set_filter(None);
        } else {
            self.list.set_filter(Some(state.query.clone()));
        }

        Ok(Mode::Searching(state))
    }

    /// Launch the selected instance's view link in the browser.
    fn open_current_instance(&mut self) {
        if let Some(instance) = self.list.current_instance().cloned() {
            let url = urls::instance_url(&self.config, instance.id, ViewMode::View);
            if let Err(err) = open_link(&url) {
                self.set_status(format!("Failed to open link: {err}"), StatusKind::Error);
            } else {
                self.set_status(format!("Opened \"{}\".", instance.title), StatusKind::Info);
            }
        } else {
            self.set_status("No report instance selected.", StatusKind::Error);
        }
    }

    fn open_navigation_view(&mut self) -> Result<()> {
        let warm = navigation::navigation_cache_is_warm(&self.conn)?;
        let rows = navigation::navigation_list(&self.conn)?;
        self.screen = Screen::Navigation(NavigationScreen::new(rows, warm));
        Ok(())
    }

    fn refresh_instances(&mut self) -> Result<()> {
        let instances = db::fetch_instances(&self.conn)?;
        self.list.set_instances(instances);
        Ok(())
    }

    fn select_instance(&mut self, id: i64) {
        if let Some(idx) = self
            .list
            .filtered_instances
            .iter()
            .position(|instance| instance.id == id)
        {
            self.list.selected = idx;
        }
    }

    fn reload_navigation(&mut self) -> Result<()> {
        if let Screen::Navigation(ref mut menu) = self.screen {
            let warm = navigation::navigation_cache_is_warm(&self.conn)?;
            let rows = navigation::navigation_list(&self.conn)?;
            menu.set_rows(rows, warm);
        }
        Ok(())
    }

    fn delete_menu_entry(&mut self, confirm: &ConfirmMenuDelete) -> Result<()> {
        navigation::delete_entry(&self.conn, confirm.entry.id)?;
        navigation::reset_navigation_cache(&self.conn)?;
        self.reload_navigation()?;
        self.refresh_instances()?;
        self.set_status(
            format!("Menu entry \"{}\" deleted.", confirm.entry.label),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Ctrl+R re-reads both the instance list and, when open, the menu rows.
    pub(crate) fn handle_ctrl_r(&mut self) -> Result<()> {
        self.refresh_instances()?;
        self.reload_navigation()?;
        self.set_status("Reloaded from the database.", StatusKind::Info);
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Instances => self.draw_instance_list(frame, content_area),
            Screen::Navigation(menu) => self.draw_navigation(frame, content_area, menu),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::PromptReportKey(form) => self.draw_report_key_form(frame, area, form),
            Mode::EditingInstance(form) => self.draw_instance_form(frame, area, form),
            Mode::ConfirmMenuDelete(confirm) => self.draw_confirm_menu_delete(frame, area, confirm),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Normal => {}
        }
    }

    fn draw_instance_list(&self, frame: &mut Frame, area: Rect) {
        if self.list.instances.is_empty() {
            let message = Paragraph::new("No report instances yet. Press '+' to configure one.")
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Report Instances"),
                );
            frame.render_widget(message, area);
            return;
        }

        if self.list.filtered_instances.is_empty() {
            let message = Paragraph::new("No report instances match the search.")
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Report Instances"),
                );
            frame.render_widget(message, area);
            return;
        }

        let width = area.width.saturating_sub(6) as usize;
        let items: Vec<ListItem> = self
            .list
            .filtered_instances
            .iter()
            .map(|instance| {
                let mut spans = vec![Span::styled(
                    instance.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                spans.push(Span::styled(
                    format!("  [{}]", instance.report_id),
                    Style::default().fg(Color::DarkGray),
                ));
                if instance.navigation_id.is_some() {
                    spans.push(Span::styled("  menu", Style::default().fg(Color::Cyan)));
                }
                if instance.is_dashboard {
                    spans.push(Span::styled(
                        "  dashboard",
                        Style::default().fg(Color::Cyan),
                    ));
                }
                if instance.is_reserved {
                    spans.push(Span::styled(
                        "  reserved",
                        Style::default().fg(Color::Magenta),
                    ));
                }

                let mut lines = vec![Line::from(spans)];
                if let Some(description) = &instance.description {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", truncate_text(description, width)),
                        Style::default().fg(Color::Gray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.list.selected));

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Report Instances"),
            )
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_navigation(&self, frame: &mut Frame, area: Rect, menu: &NavigationScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        let source = if menu.cache_was_warm {
            "served from cache"
        } else {
            "rebuilt and cached"
        };
        let header = Paragraph::new(vec![Line::from(vec![
            Span::styled(
                "Navigation Menu",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {} entries, {source}", menu.rows.len())),
        ])])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title("Navigation"));
        frame.render_widget(header, chunks[0]);

        if menu.rows.is_empty() {
            let message = Paragraph::new("The navigation menu is empty.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        let items: Vec<ListItem> = menu
            .rows
            .iter()
            .map(|row| {
                let indent = "  ".repeat(row.depth);
                let mut spans = vec![Span::raw(format!("{indent}{}", row.entry.label))];
                if let Some(url) = &row.entry.url {
                    spans.push(Span::styled(
                        format!("  {url}"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                if let Some(permission) = &row.entry.permission {
                    spans.push(Span::styled(
                        format!("  ({permission})"),
                        Style::default().fg(Color::Cyan),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(menu.selected));

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::EditingInstance(_)) => Line::from(vec![
                Span::styled("[Tab/↑↓]", key_style),
                Span::raw(" Field   "),
                Span::styled("[←→]", key_style),
                Span::raw(" Option   "),
                Span::styled("[Space]", key_style),
                Span::raw(" Toggle   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (_, Mode::PromptReportKey(_)) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Switch   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Continue   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (_, Mode::ConfirmMenuDelete(_)) => Line::from(vec![
                Span::styled("[y/Enter]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[n/Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (_, Mode::Searching(_)) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Open   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Clear Search"),
            ]),
            (Screen::Navigation(_), _) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Open Link   "),
                Span::styled("[r]", key_style),
                Span::raw(" Rebuild Cache   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Back   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            _ => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Open   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[c]", key_style),
                Span::raw(" Copy   "),
                Span::styled("[+]", key_style),
                Span::raw(" New   "),
                Span::styled("[m]", key_style),
                Span::raw(" Menu   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_report_key_form(&self, frame: &mut Frame, area: Rect, form: &ReportKeyForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("New Report Instance")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let key_line = form.build_line("Report Key", ReportKeyField::Key);
        let description_line = form.build_line("Description", ReportKeyField::Description);

        let mut lines = vec![key_line, description_line, Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to continue • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (prefix, row) = match form.active {
            ReportKeyField::Key => ("Report Key: ".len() as u16, 0),
            ReportKeyField::Description => ("Description: ".len() as u16, 1),
        };
        frame.set_cursor_position((
            inner.x + prefix + form.value_len(form.active) as u16,
            inner.y + row,
        ));
    }

    fn draw_instance_form(&self, frame: &mut Frame, area: Rect, form: &InstanceForm) {
        let popup_area = centered_rect(80, 90, area);
        frame.render_widget(Clear, popup_area);

        let title = match (form.create_new, form.instance_id) {
            (true, _) => "Copy Report Instance",
            (false, Some(_)) => "Edit Report Instance",
            (false, None) => "New Report Instance",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let width = inner.width as usize;
        let visible = inner.height.saturating_sub(2) as usize;

        let mut lines = Vec::with_capacity(form.field_count() + 2);
        for idx in 0..form.field_count() {
            lines.push(form.build_line(idx, width));
        }
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Space to toggle • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).scroll((form.scroll_offset(visible), 0));
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_menu_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmMenuDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete Menu Entry")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::from(format!(
                "Delete the menu entry \"{}\"?",
                confirm.entry.label
            )),
            Line::from("Reports linked to it stay saved and drop their menu link."),
            Line::from(""),
            Line::from(vec![
                Span::styled("[y]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[n]", key_style),
                Span::raw(" Cancel"),
            ]),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        let cursor_y = inner.y;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
