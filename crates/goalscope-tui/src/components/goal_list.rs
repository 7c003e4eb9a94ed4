use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use goalscope_core::goal::{Goal, UrgencyLevel};
use goalscope_core::status::{progress_percent, urgency_color, GoalStatus};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

/// The persisted goals with a selection cursor. Status is derived at render
/// time from `now`, never stored.
pub struct GoalList {
    goals: Vec<Goal>,
    list_state: ListState,
}

impl Default for GoalList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GoalList {
    pub fn new(goals: Vec<Goal>) -> Self {
        let mut list_state = ListState::default();
        if !goals.is_empty() {
            list_state.select(Some(0));
        }
        Self { goals, list_state }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn goal(&self, id: i64) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn goal_mut(&mut self, id: i64) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }

    pub fn selected_goal(&self) -> Option<&Goal> {
        self.goals.get(self.list_state.selected()?)
    }

    /// Replace the goals, keeping the cursor on the same goal when it is
    /// still present.
    pub fn replace(&mut self, goals: Vec<Goal>) {
        let selected_id = self.selected_goal().map(|g| g.id);
        self.goals = goals;
        let idx = selected_id
            .and_then(|id| self.goals.iter().position(|g| g.id == id))
            .or(if self.goals.is_empty() { None } else { Some(0) });
        self.list_state.select(idx);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let current = self.list_state.selected().unwrap_or(0);
                if current + 1 < self.goals.len() {
                    self.list_state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let current = self.list_state.selected().unwrap_or(0);
                if current > 0 {
                    self.list_state.select(Some(current - 1));
                }
            }
            KeyCode::Char('g') => {
                if !self.goals.is_empty() {
                    self.list_state.select(Some(0));
                }
            }
            KeyCode::Char('G') => {
                if !self.goals.is_empty() {
                    self.list_state.select(Some(self.goals.len() - 1));
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, now: DateTime<Utc>) {
        let items: Vec<ListItem> = self
            .goals
            .iter()
            .map(|goal| ListItem::new(goal_line(goal, now)))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" Goals ({}) ", self.goals.len()));
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).bold())
            .highlight_symbol("> ");

        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}

pub fn urgency_style(level: UrgencyLevel) -> Style {
    let rgb = urgency_color(level);
    Style::default().fg(Color::Rgb(rgb.0, rgb.1, rgb.2))
}

pub fn status_style(status: GoalStatus) -> Style {
    match status {
        GoalStatus::Completed => Style::default().fg(Color::Green),
        GoalStatus::Expired => Style::default().fg(Color::Red),
        GoalStatus::SubGoalsDone => Style::default().fg(Color::Cyan),
        GoalStatus::InProgress => Style::default().fg(Color::Gray),
    }
}

fn goal_line(goal: &Goal, now: DateTime<Utc>) -> Line<'static> {
    let status = GoalStatus::of(goal, now);
    Line::from(vec![
        Span::styled("● ", urgency_style(goal.urgency_level)),
        Span::raw(goal.title.clone()),
        Span::styled(
            format!("  {}%", progress_percent(goal)),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(format!("  [{}]", status.display_name()), status_style(status)),
        Span::styled(
            format!("  due {}", goal.deadline.format("%d.%m.%Y")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}
