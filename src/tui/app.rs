//! Main application logic for the template previewer.
//!
//! This module contains the `App` struct which holds one template, the
//! values typed in for it so far, and the render options. The left pane is
//! an outline of groups and sections; the right pane is the issue description
//! those values render to, updated on every keystroke. Reordering goes through
//! the locked store so it is persisted immediately.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use log::{debug, info};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::compose::render_issue_description;
use crate::db::{format_variant, truncate, with_store, write_atomic, Database};
use crate::error::Result;
use crate::fields::SelectType;
use crate::render::RenderOptions;
use crate::template::{IssueTemplate, Section, SectionVariant};
use crate::tui::{
    colors::{instruction_color, kind_color, DARK_GREEN, DARK_RED},
    enums::{AppState, OutlineRow, ValueShape},
    input::InputField,
};
use crate::values::{boolean_value, extract, flag_values, list_values, Extracted, ValueMap};

/// Main application state for the previewer.
pub struct App {
    state: AppState,
    template: IssueTemplate,
    store_path: PathBuf,
    rows: Vec<OutlineRow>,
    table_state: TableState,
    values: ValueMap,
    opts: RenderOptions,
    input: InputField,
    editing: Option<(u64, ValueShape)>,
    status_message: String,
    status_is_error: bool,
    preview_scroll: u16,
}

/// How a section's value is typed in.
fn value_shape(section: &Section) -> ValueShape {
    match section.variant {
        SectionVariant::TextField | SectionVariant::TextArea | SectionVariant::Date { .. } => ValueShape::Text,
        SectionVariant::Checkbox => ValueShape::Flags,
        SectionVariant::Select { select_type } => match select_type {
            SelectType::Radio | SelectType::MonovalueSelect => ValueShape::Text,
            SelectType::MultivalueSelect => ValueShape::List,
            SelectType::Checkbox => ValueShape::Flags,
        },
        SectionVariant::Instruction { .. } => ValueShape::None,
    }
}

/// One-line summary of what a section currently holds.
fn value_summary(section: &Section, values: &ValueMap, opts: &RenderOptions) -> String {
    match extract(section, values) {
        Extracted::Text(Some(v)) => v.into_owned(),
        Extracted::Text(None) => String::new(),
        Extracted::Flag(checked) => opts.labels.label(checked).to_string(),
        Extracted::List(selected) => selected.join(", "),
        Extracted::Flags(flags) => {
            let total = section.possible_values().len();
            let checked = flags.iter().take(total).filter(|f| **f).count();
            format!("{}/{} checked", checked, total)
        }
        Extracted::Nothing => section.text.clone().unwrap_or_default(),
    }
}

impl App {
    /// Load `template_id` from the store, plus any values saved for it earlier.
    pub fn new(store_path: &Path, template_id: u64, opts: RenderOptions) -> Result<Self> {
        let db = Database::load(store_path)?;
        let template = db.template(template_id)?.clone();

        let values_path = Self::values_path_for(store_path, template_id);
        let values = if values_path.exists() {
            debug!("Loading saved values from {}", values_path.display());
            ValueMap::from_json(&fs::read_to_string(&values_path)?)?
        } else {
            ValueMap::new()
        };

        let mut app = App {
            state: AppState::Outline,
            template,
            store_path: store_path.to_path_buf(),
            rows: Vec::new(),
            table_state: TableState::default(),
            values,
            opts,
            input: InputField::new(),
            editing: None,
            status_message: String::new(),
            status_is_error: false,
            preview_scroll: 0,
        };
        app.rebuild_rows();
        let first_section = app
            .rows
            .iter()
            .position(|r| matches!(r, OutlineRow::Section { .. }))
            .or(if app.rows.is_empty() { None } else { Some(0) });
        app.table_state.select(first_section);
        Ok(app)
    }

    fn values_path_for(store_path: &Path, template_id: u64) -> PathBuf {
        store_path.with_file_name(format!("values-{}.json", template_id))
    }

    fn values_path(&self) -> PathBuf {
        Self::values_path_for(&self.store_path, self.template.id)
    }

    fn rebuild_rows(&mut self) {
        self.rows.clear();
        for group in &self.template.section_groups {
            self.rows.push(OutlineRow::Group { id: group.id });
            for section in &group.sections {
                self.rows.push(OutlineRow::Section { group_id: group.id, id: section.id });
            }
        }
    }

    fn selected_row(&self) -> Option<OutlineRow> {
        self.table_state.selected().and_then(|i| self.rows.get(i).copied())
    }

    fn selected_section(&self) -> Option<&Section> {
        match self.selected_row()? {
            OutlineRow::Section { id, .. } => self.template.find_section(id).map(|(_, s)| s),
            OutlineRow::Group { .. } => None,
        }
    }

    fn select_row(&mut self, row: OutlineRow) {
        if let Some(index) = self.rows.iter().position(|r| *r == row) {
            self.table_state.select(Some(index));
        }
    }

    fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    fn select_previous(&mut self) {
        let prev = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        if !self.rows.is_empty() {
            self.table_state.select(Some(prev));
        }
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
        self.status_is_error = false;
    }

    fn set_error_message(&mut self, msg: String) {
        self.status_message = msg;
        self.status_is_error = true;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
        self.status_is_error = false;
    }

    /// The rendered issue description for the current values.
    pub fn preview(&self) -> String {
        render_issue_description(&self.template, &self.values, &self.opts)
    }

    /// Open the edit prompt for the selected section, or toggle it if it's a
    /// lone checkbox.
    fn start_edit(&mut self) {
        let Some(section) = self.selected_section() else {
            return;
        };
        if section.variant == SectionVariant::Checkbox {
            self.toggle_checkbox();
            return;
        }
        let shape = value_shape(section);
        if shape == ValueShape::None {
            self.set_status_message("Instructions take no value".to_string());
            return;
        }
        let id = section.id;
        let current = match shape {
            ValueShape::Flags => flag_values(self.values.get(id)).join(";"),
            _ => list_values(self.values.get(id)).join(";"),
        };
        self.input = InputField::with_value(&current);
        self.editing = Some((id, shape));
        self.state = AppState::EditValue;
    }

    /// Store what was typed in the edit prompt. An empty prompt clears the value.
    fn commit_edit(&mut self) {
        let Some((id, shape)) = self.editing.take() else {
            return;
        };
        let raw = self.input.value.trim();
        if raw.is_empty() {
            self.values.remove(id);
        } else {
            match shape {
                ValueShape::Text => self.values.set_text(id, raw),
                ValueShape::List => self.values.set_list(
                    id,
                    raw.split(';')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect(),
                ),
                ValueShape::Flags => self.values.set_list(
                    id,
                    raw.split(';')
                        .map(|v| if boolean_value(v.trim()) { "1" } else { "0" }.to_string())
                        .collect(),
                ),
                ValueShape::None => {}
            }
        }
        debug!("Set value for section {}", id);
        self.input.clear();
        self.state = AppState::Outline;
    }

    fn cancel_edit(&mut self) {
        self.editing = None;
        self.input.clear();
        self.state = AppState::Outline;
    }

    fn toggle_checkbox(&mut self) {
        let Some(section) = self.selected_section() else {
            return;
        };
        if section.variant != SectionVariant::Checkbox {
            return;
        }
        let id = section.id;
        let checked = matches!(extract(section, &self.values), Extracted::Flag(true));
        self.values.set_text(id, if checked { "0" } else { "1" });
    }

    /// Flip option `index` of a checkbox-set select.
    fn toggle_option(&mut self, index: usize) {
        let Some(section) = self.selected_section() else {
            return;
        };
        if value_shape(section) != ValueShape::Flags || section.variant == SectionVariant::Checkbox {
            return;
        }
        let options = section.possible_values().len();
        if index >= options {
            self.set_status_message(format!("Option {} does not exist", index + 1));
            return;
        }
        let id = section.id;
        let mut flags: Vec<bool> = flag_values(self.values.get(id)).into_iter().map(boolean_value).collect();
        if flags.len() < options {
            flags.resize(options, false);
        }
        flags[index] = !flags[index];
        self.values
            .set_list(id, flags.iter().map(|f| if *f { "1" } else { "0" }.to_string()).collect());
    }

    fn clear_value(&mut self) {
        if let Some(id) = self.selected_section().map(|s| s.id) {
            self.values.remove(id);
        }
    }

    /// Move the selected row one step and persist the new order.
    fn shift_selected(&mut self, up: bool) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let template_id = self.template.id;
        let result = with_store(&self.store_path, |db| {
            let moved = match row {
                OutlineRow::Group { id } => db.shift_group(id, up)?,
                OutlineRow::Section { id, .. } => db.shift_section(id, up)?,
            };
            Ok((moved, db.template(template_id)?.clone()))
        });
        match result {
            Ok((moved, template)) => {
                self.template = template;
                self.rebuild_rows();
                self.select_row(row);
                if moved {
                    info!("Reordered {:?}", row);
                    self.set_status_message("Order saved".to_string());
                }
            }
            Err(e) => self.set_error_message(format!("Reorder failed: {}", e)),
        }
    }

    fn reload(&mut self) {
        match Database::load(&self.store_path).and_then(|db| db.template(self.template.id).cloned()) {
            Ok(template) => {
                let row = self.selected_row();
                self.template = template;
                self.rebuild_rows();
                if let Some(row) = row {
                    self.select_row(row);
                }
                self.set_status_message("Reloaded".to_string());
            }
            Err(e) => self.set_error_message(format!("Reload failed: {}", e)),
        }
    }

    fn save_values(&mut self) {
        let path = self.values_path();
        let result = serde_json::to_string_pretty(&self.values)
            .map_err(crate::error::Error::from)
            .and_then(|json| write_atomic(&path, &json));
        match result {
            Ok(()) => {
                info!("Saved values to {}", path.display());
                self.set_status_message(format!("Values saved to {}", path.display()));
            }
            Err(e) => self.set_error_message(format!("Save failed: {}", e)),
        }
    }

    fn handle_outline_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Char('J') => self.shift_selected(false),
            KeyCode::Char('K') => self.shift_selected(true),
            KeyCode::Enter => self.start_edit(),
            KeyCode::Char(' ') => self.toggle_checkbox(),
            KeyCode::Char(d @ '1'..='9') => self.toggle_option(d as usize - '1' as usize),
            KeyCode::Char('x') | KeyCode::Delete => self.clear_value(),
            KeyCode::Char('t') => self.opts.textile = !self.opts.textile,
            KeyCode::Char('v') => self.opts.value_only = !self.opts.value_only,
            KeyCode::PageDown => self.preview_scroll = self.preview_scroll.saturating_add(10),
            KeyCode::PageUp => self.preview_scroll = self.preview_scroll.saturating_sub(10),
            KeyCode::Char('s') => self.save_values(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        Ok(false)
    }

    fn handle_edit_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> Result<bool> {
        match key {
            KeyCode::Enter => self.commit_edit(),
            KeyCode::Esc => self.cancel_edit(),
            KeyCode::Char(c) => self.input.handle_char(c),
            KeyCode::Backspace => self.input.handle_backspace(),
            KeyCode::Delete => self.input.handle_delete(),
            KeyCode::Left => self.input.move_cursor_left(),
            KeyCode::Right => self.input.move_cursor_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_help_input(&mut self, _key: KeyCode, _modifiers: KeyModifiers) -> Result<bool> {
        self.state = AppState::Outline;
        Ok(false)
    }

    /// Poll for and handle keyboard events based on current application state.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                self.clear_status_message();
                return match self.state {
                    AppState::Outline => self.handle_outline_input(key.code, key.modifiers),
                    AppState::EditValue => self.handle_edit_input(key.code, key.modifiers),
                    AppState::Help => self.handle_help_input(key.code, key.modifiers),
                };
            }
        }
        Ok(false)
    }

    fn render_outline(&mut self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| match *row {
                OutlineRow::Group { id } => {
                    let title = self.template.group(id).map(|g| g.title.as_str()).unwrap_or("?");
                    Row::new(vec![
                        Cell::from(title.to_string()),
                        Cell::from("group"),
                        Cell::from(""),
                    ])
                    .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
                }
                OutlineRow::Section { id, .. } => match self.template.find_section(id) {
                    Some((_, s)) => {
                        let color = match s.variant {
                            SectionVariant::Instruction { instruction_type } => instruction_color(instruction_type),
                            _ => kind_color(s.variant.kind()),
                        };
                        Row::new(vec![
                            Cell::from(format!("  {}", s.title)),
                            Cell::from(format_variant(&s.variant)).style(Style::default().fg(color)),
                            Cell::from(truncate(&value_summary(s, &self.values, &self.opts), 40)),
                        ])
                    }
                    None => Row::new(vec![Cell::from("  ?")]),
                },
            })
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Percentage(40), Constraint::Length(22), Constraint::Min(10)],
        )
        .header(
            Row::new(vec!["Title", "Kind", "Value"])
                .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.template.title_with_tracker()),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_preview(&mut self, f: &mut Frame, area: Rect) {
        let title = format!(
            "Preview ({}{})",
            if self.opts.textile { "textile" } else { "plain" },
            if self.opts.value_only { ", value only" } else { "" }
        );
        let text = self.preview();
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((self.preview_scroll, 0));
        f.render_widget(paragraph, area);
    }

    fn render_edit_prompt(&mut self, f: &mut Frame, area: Rect) {
        let Some((id, shape)) = self.editing else {
            return;
        };
        let label = self
            .template
            .find_section(id)
            .map(|(_, s)| s.title.clone())
            .unwrap_or_default();
        let hint = match self.template.find_section(id).map(|(_, s)| s.possible_values()) {
            Some(options) if !options.is_empty() => format!("{} [{}]", shape.hint(), options.join(";")),
            _ => shape.hint().to_string(),
        };

        let popup = centered_rect(70, 5, area);
        f.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} - Enter to save, Esc to cancel", label));
        let inner = block.inner(popup);
        let lines = vec![
            Line::from(self.input.value.as_str()),
            Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
        ];
        f.render_widget(Paragraph::new(lines).block(block), popup);
        let column = self.input.cursor.min(inner.width.saturating_sub(1) as usize) as u16;
        f.set_cursor_position((inner.x + column, inner.y));
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(vec![Span::styled("Template Previewer Help", bold)]),
            Line::from(""),
            Line::from(vec![Span::styled("Outline:", bold)]),
            Line::from("  j/k, Down/Up   Select group or section"),
            Line::from("  Enter          Edit the section's value"),
            Line::from("  Space          Toggle a checkbox"),
            Line::from("  1-9            Toggle an option of a checkbox set"),
            Line::from("  x/Delete       Clear the section's value"),
            Line::from("  J/K            Move the selected row down/up (saved immediately)"),
            Line::from(""),
            Line::from(vec![Span::styled("Preview:", bold)]),
            Line::from("  t              Toggle Textile / plain text"),
            Line::from("  v              Toggle value-only output"),
            Line::from("  PgUp/PgDn      Scroll"),
            Line::from(""),
            Line::from(vec![Span::styled("Other:", bold)]),
            Line::from("  s              Save values for `itpl render --values`"),
            Line::from("  r              Reload the template from the store"),
            Line::from("  h/F1           Show this help"),
            Line::from("  q/Esc/Ctrl+C   Quit"),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::Outline => format!(
                    "Template {} | {} groups, {} sections{} | Press 'h' for help",
                    self.template.id,
                    self.template.section_groups.len(),
                    self.template.sections().count(),
                    if self.template.template_enabled { "" } else { " | disabled" }
                ),
                AppState::EditValue => "Edit value".to_string(),
                AppState::Help => "Help".to_string(),
            }
        };
        let bg = if self.status_is_error { DARK_RED } else { DARK_GREEN };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(bg).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
            .split(f.area());

        if self.state == AppState::Help {
            self.render_help(f, chunks[0]);
        } else {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                .split(chunks[0]);
            self.render_outline(f, panes[0]);
            self.render_preview(f, panes[1]);
            if self.state == AppState::EditValue {
                self.render_edit_prompt(f, chunks[0]);
            }
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering and input processing until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// A rectangle `percent_x` wide and `height` rows tall, centred in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
