use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use goalscope_core::date_mask::MASK_PLACEHOLDER;
use goalscope_core::description::DescriptionState;
use goalscope_core::form::{FormMode, GoalForm, SmartField};
use goalscope_core::image::ImageFile;
use goalscope_core::subgoals::{EditSession, EditOutcome};
use goalscope_core::ValidationError;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::centered_rect;
use super::goal_list::urgency_style;

/// Focusable fields, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Smart(SmartField),
    Description,
    Award,
    Deadline,
    Urgency,
    Privacy,
    Template,
    ShortDescription,
    SubGoals,
    Image,
}

impl FormField {
    fn order(mode: FormMode) -> Vec<FormField> {
        let mut fields: Vec<FormField> = SmartField::ALL.iter().copied().map(FormField::Smart).collect();
        fields.extend([
            FormField::Description,
            FormField::Award,
            FormField::Deadline,
            FormField::Urgency,
            FormField::Privacy,
        ]);
        if mode == FormMode::Create {
            fields.extend([FormField::Template, FormField::ShortDescription]);
        }
        fields.extend([FormField::SubGoals, FormField::Image]);
        fields
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Smart(field) => field.label(),
            FormField::Description => "Description",
            FormField::Award => "Award",
            FormField::Deadline => "Deadline",
            FormField::Urgency => "Urgency",
            FormField::Privacy => "Privacy",
            FormField::Template => "Template",
            FormField::ShortDescription => "About",
            FormField::SubGoals => "Sub-goals",
            FormField::Image => "Image",
        }
    }
}

/// Which input of a sub-goal popup takes typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupField {
    Text,
    Date,
}

/// Work the form hands back to the app; anything that needs the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Close,
    GenerateDescription,
    GenerateTasks,
    GenerateFromTemplate,
    LoadImage(PathBuf),
}

/// Key handling and rendering around one [`GoalForm`] draft.
pub struct GoalFormView {
    id: u64,
    pub form: GoalForm,
    focus: FormField,
    selected: usize,
    popup_field: PopupField,
    image_path: String,
    pub saving: bool,
}

impl GoalFormView {
    pub fn new(id: u64, form: GoalForm) -> Self {
        Self {
            id,
            form,
            focus: FormField::Smart(SmartField::Title),
            selected: 0,
            popup_field: PopupField::Text,
            image_path: String::new(),
            saving: false,
        }
    }

    /// Identifies the draft that an assistant reply was requested for.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Start over with an empty create draft under a new id.
    pub fn reset(&mut self, id: u64) {
        self.form.reset();
        self.id = id;
        self.focus = FormField::Smart(SmartField::Title);
        self.selected = 0;
        self.popup_field = PopupField::Text;
        self.image_path.clear();
        self.saving = false;
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn set_image(&mut self, image: ImageFile) {
        self.form.image = Some(image);
        self.image_path.clear();
    }

    /// Move the cursor to the last row, used after rows are appended.
    pub fn select_last(&mut self) {
        self.selected = self.form.sub_goals.len().saturating_sub(1);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Result<FormAction, ValidationError> {
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.submit_with_open_edits();
        }
        if self.form.sub_goals.add_popup().is_some() {
            return self.handle_add_popup(key);
        }
        if self.form.sub_goals.session().is_active() {
            self.handle_session(key);
            return Ok(FormAction::None);
        }
        if self.form.description.is_editing() {
            self.handle_description_edit(key);
            return Ok(FormAction::None);
        }

        match key.code {
            KeyCode::Esc => return Ok(FormAction::Close),
            KeyCode::Tab => {
                self.move_focus(1);
                return Ok(FormAction::None);
            }
            KeyCode::BackTab => {
                self.move_focus(-1);
                return Ok(FormAction::None);
            }
            _ => {}
        }

        match self.focus {
            FormField::Smart(field) => {
                let mut value = self.form.field(field).to_string();
                if edit_text(&mut value, key) {
                    self.form.set_field(field, value, now);
                }
            }
            FormField::Award => {
                edit_text(&mut self.form.award, key);
            }
            FormField::ShortDescription => {
                edit_text(&mut self.form.short_description, key);
            }
            FormField::Description => match key.code {
                KeyCode::Enter => self.form.description.begin_edit(),
                KeyCode::Char('g') => return Ok(FormAction::GenerateDescription),
                KeyCode::Char('a') => {
                    let enabled = !self.form.description.auto_generate();
                    self.form.description.set_auto_generate(enabled);
                }
                _ => {}
            },
            FormField::Deadline => {
                if is_cycle_key(key) {
                    self.form.deadline = self.form.deadline.next();
                }
            }
            FormField::Urgency => {
                if is_cycle_key(key) {
                    self.form.urgency = self.form.urgency.next();
                }
            }
            FormField::Privacy => {
                if is_cycle_key(key) {
                    self.form.privacy = self.form.privacy.toggled();
                }
            }
            FormField::Template => match key.code {
                KeyCode::Char(' ') | KeyCode::Enter => {
                    self.form.template = goalscope_core::GoalTemplate::cycle(self.form.template);
                }
                KeyCode::Char('g') => return Ok(FormAction::GenerateFromTemplate),
                _ => {}
            },
            FormField::SubGoals => return self.handle_sub_goal_list(key),
            FormField::Image => {
                if key.code == KeyCode::Enter {
                    let path = self.image_path.trim();
                    if !path.is_empty() {
                        return Ok(FormAction::LoadImage(PathBuf::from(path)));
                    }
                } else {
                    edit_text(&mut self.image_path, key);
                }
            }
        }
        Ok(FormAction::None)
    }

    fn move_focus(&mut self, step: isize) {
        let order = FormField::order(self.form.mode());
        let current = order.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let len = order.len() as isize;
        let next = (current + step).rem_euclid(len) as usize;
        self.focus = order[next];
    }

    fn handle_sub_goal_list(&mut self, key: KeyEvent) -> Result<FormAction, ValidationError> {
        let len = self.form.sub_goals.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('a') => {
                self.form.sub_goals.open_add(Local::now().naive_local());
                self.popup_field = PopupField::Text;
            }
            KeyCode::Char('e') | KeyCode::Enter => self.form.sub_goals.begin_inline(self.selected)?,
            KeyCode::Char('E') => {
                self.form.sub_goals.begin_popup(self.selected)?;
                self.popup_field = PopupField::Text;
            }
            KeyCode::Char('d') => {
                self.form.sub_goals.remove(self.selected)?;
                if self.selected >= self.form.sub_goals.len() {
                    self.select_last();
                }
            }
            KeyCode::Char('g') => return Ok(FormAction::GenerateTasks),
            _ => {}
        }
        Ok(FormAction::None)
    }

    /// An open inline row edit is committed as if focus left it. Popups and
    /// the description editor need an explicit confirm, so submitting is
    /// refused while one is open.
    fn submit_with_open_edits(&mut self) -> Result<FormAction, ValidationError> {
        let sub_goals = &self.form.sub_goals;
        if sub_goals.add_popup().is_some()
            || matches!(sub_goals.session(), EditSession::Popup { .. })
            || self.form.description.is_editing()
        {
            return Err(ValidationError::EditInProgress);
        }
        if matches!(sub_goals.session(), EditSession::Inline { .. }) {
            self.form.sub_goals.commit_session();
        }
        Ok(FormAction::Submit)
    }

    fn handle_add_popup(&mut self, key: KeyEvent) -> Result<FormAction, ValidationError> {
        let field = self.popup_field;
        match key.code {
            KeyCode::Esc => self.form.sub_goals.close_add(),
            KeyCode::Tab | KeyCode::BackTab => self.popup_field = toggle(field),
            KeyCode::Enter => {
                self.form.sub_goals.submit_add()?;
                self.select_last();
            }
            _ => {
                if let Some(popup) = self.form.sub_goals.add_popup_mut() {
                    match field {
                        PopupField::Text => {
                            edit_text(&mut popup.description, key);
                        }
                        PopupField::Date => edit_date(&mut popup.date, key),
                    }
                }
            }
        }
        Ok(FormAction::None)
    }

    fn handle_session(&mut self, key: KeyEvent) {
        let is_popup = matches!(self.form.sub_goals.session(), EditSession::Popup { .. });
        match key.code {
            KeyCode::Esc => self.form.sub_goals.cancel_session(),
            KeyCode::Enter => {
                if self.form.sub_goals.commit_session() == EditOutcome::Cancelled {
                    tracing::debug!("blank sub-goal edit discarded");
                }
            }
            KeyCode::Tab | KeyCode::BackTab if is_popup => {
                self.popup_field = toggle(self.popup_field);
            }
            _ => {
                if is_popup && self.popup_field == PopupField::Date {
                    if let Some(date) = self.form.sub_goals.session_date_mut() {
                        edit_date(date, key);
                    }
                } else if let Some(text) = self.form.sub_goals.session_text_mut() {
                    edit_text(text, key);
                }
            }
        }
    }

    fn handle_description_edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.form.description.cancel(),
            KeyCode::Enter => self.form.description.save(),
            _ => {
                if let Some(text) = self.form.description.text_mut() {
                    edit_text(text, key);
                }
            }
        }
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(80, 90, area);
        frame.render_widget(Clear, popup);

        let title = match self.form.mode() {
            FormMode::Create => " New goal ".to_string(),
            FormMode::Edit { goal_id } => format!(" Edit goal #{goal_id} "),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let mut lines = Vec::new();
        for field in FormField::order(self.form.mode()) {
            lines.extend(self.field_lines(field));
        }
        if self.saving {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Saving...",
                Style::default().fg(Color::Yellow),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

        if let Some(add) = self.form.sub_goals.add_popup() {
            self.render_sub_goal_popup(frame, " Add sub-goal ", &add.description, add.date.text(), area);
        } else if let EditSession::Popup { draft, date, .. } = self.form.sub_goals.session() {
            self.render_sub_goal_popup(frame, " Edit sub-goal ", &draft.description, date.text(), area);
        }
    }

    fn field_lines(&self, field: FormField) -> Vec<Line<'static>> {
        let focused = field == self.focus;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().bold()
        };
        let marker = if focused { "> " } else { "  " };
        let label = Span::styled(format!("{marker}{}: ", field.label()), label_style);

        let value: Vec<Span<'static>> = match field {
            FormField::Smart(smart) => vec![Span::raw(self.form.field(smart).to_string())],
            FormField::Award => vec![Span::raw(self.form.award.clone())],
            FormField::ShortDescription => vec![Span::raw(self.form.short_description.clone())],
            FormField::Description => {
                let tag = if self.form.description.is_generating() {
                    " [generating...]"
                } else if let DescriptionState::Editing { .. } = self.form.description.state() {
                    " [editing: Enter save, Esc cancel]"
                } else if self.form.description.auto_generate() {
                    " [auto]"
                } else {
                    ""
                };
                vec![
                    Span::raw(self.form.description.text().to_string()),
                    Span::styled(tag, Style::default().fg(Color::DarkGray)),
                ]
            }
            FormField::Deadline => vec![Span::raw(self.form.deadline.display_name())],
            FormField::Urgency => vec![Span::styled(
                self.form.urgency.display_name(),
                urgency_style(self.form.urgency),
            )],
            FormField::Privacy => vec![Span::raw(self.form.privacy.display_name())],
            FormField::Template => vec![
                Span::raw(self.form.template.map(|t| t.label()).unwrap_or("none")),
                Span::styled(
                    format!("  [g: {}]", self.form.template_generation.button_label()),
                    Style::default().fg(Color::DarkGray),
                ),
            ],
            FormField::SubGoals => vec![Span::styled(
                format!(
                    "{}  [g: {}]",
                    self.form.sub_goals.len(),
                    self.form.sub_goals.generate_label()
                ),
                Style::default().fg(Color::DarkGray),
            )],
            FormField::Image => {
                let current = match (&self.form.image, self.form.existing_image_url()) {
                    (Some(image), _) => format!("{} ({} bytes)", image.file_name, image.size()),
                    (None, Some(url)) => format!("current: {url}"),
                    (None, None) => "none".to_string(),
                };
                let mut spans = vec![Span::raw(current)];
                if focused {
                    spans.push(Span::styled(
                        format!("  path: {}", self.image_path),
                        Style::default().fg(Color::Cyan),
                    ));
                }
                spans
            }
        };

        let mut first = vec![label];
        first.extend(value);
        let mut lines = vec![Line::from(first)];
        if field == FormField::SubGoals {
            lines.extend(self.sub_goal_lines(focused));
        }
        lines
    }

    fn sub_goal_lines(&self, focused: bool) -> Vec<Line<'static>> {
        let session = self.form.sub_goals.session();
        self.form
            .sub_goals
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let cursor = if focused && i == self.selected { "  > " } else { "    " };
                let text = match session {
                    EditSession::Inline { index, buffer } if *index == i => format!("{buffer}_"),
                    _ => item.display_description(),
                };
                let mut spans = vec![Span::raw(cursor)];
                if item.is_ai_generated() {
                    spans.push(Span::styled("✦ ", Style::default().fg(Color::Magenta)));
                }
                spans.push(Span::raw(text));
                spans.push(Span::styled(
                    format!("  {}", item.deadline.format("%d.%m.%Y")),
                    Style::default().fg(Color::DarkGray),
                ));
                Line::from(spans)
            })
            .collect()
    }

    fn render_sub_goal_popup(&self, frame: &mut Frame, title: &str, text: &str, date: &str, area: Rect) {
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let style_for = |field: PopupField| {
            if self.popup_field == field {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default().bold()
            }
        };
        let date_text = if date.is_empty() { MASK_PLACEHOLDER } else { date };
        let lines = vec![
            Line::from(vec![
                Span::styled("Description: ", style_for(PopupField::Text)),
                Span::raw(text.to_string()),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Deadline: ", style_for(PopupField::Date)),
                Span::raw(date_text.to_string()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Tab switch  Enter save  Esc cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

fn toggle(field: PopupField) -> PopupField {
    match field {
        PopupField::Text => PopupField::Date,
        PopupField::Date => PopupField::Text,
    }
}

fn is_cycle_key(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter)
}

/// Apply a typing key to a text buffer. Returns whether it changed.
fn edit_text(buffer: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.push(c);
            true
        }
        KeyCode::Backspace => buffer.pop().is_some(),
        _ => false,
    }
}

fn edit_date(date: &mut goalscope_core::date_mask::MaskedDateInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => {
            date.push_char(c);
        }
        KeyCode::Backspace => {
            date.backspace();
        }
        _ => {}
    }
}
