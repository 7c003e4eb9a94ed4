use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use goalscope_core::ai::{ChatRole, GeneratedTask, TemplateGoal};
use goalscope_core::chat::ChatSession;
use goalscope_core::completion::CompletionState;
use goalscope_core::form::FormMode;
use goalscope_core::goal::{Goal, GoalSource};
use goalscope_core::status::{is_sub_goal_expired, progress_percent};
use goalscope_core::{CompletionFlow, GoalForm, GoalStatus, ImageFile, ValidationError};
use goalscope_service::{AiAssistClient, GoalRepository, ServiceError};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::components::centered_rect;
use crate::components::goal_form::{FormAction, GoalFormView};
use crate::components::goal_list::{status_style, urgency_style, GoalList};

/// What the app is currently doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Goal list navigation
    Normal,
    /// One goal with its sub-goals; `selected` is the sub-goal cursor
    GoalDetail { goal_id: i64, selected: usize },
    /// Completing a goal: typing the proof image path, then the achievement
    CompleteGoal { goal_id: i64, input: String },
    /// Creating or editing a goal
    Form,
    /// Asking the assistant about goals
    Chat { input: String },
    /// Weekly report; `text` is None until it arrives
    Report { text: Option<String>, scroll: u16 },
}

/// Results of backend calls, delivered back to the UI thread.
#[derive(Debug)]
pub enum AppEvent {
    GoalsLoaded(Result<Vec<Goal>, ServiceError>),
    GoalSaved {
        form_id: u64,
        created: bool,
        result: Result<Goal, ServiceError>,
    },
    SubGoalToggled {
        sub_goal_id: i64,
        done: bool,
        result: Result<(), ServiceError>,
    },
    GoalCompleted {
        goal_id: i64,
        result: Result<Goal, ServiceError>,
    },
    DescriptionGenerated {
        form_id: u64,
        result: Result<String, ServiceError>,
    },
    TasksGenerated {
        form_id: u64,
        result: Result<Vec<GeneratedTask>, ServiceError>,
    },
    TemplateGenerated {
        form_id: u64,
        result: Result<TemplateGoal, ServiceError>,
    },
    ChatAnswered(Result<String, ServiceError>),
    WeeklyReport(Result<String, ServiceError>),
}

pub struct App {
    repo: Arc<dyn GoalRepository>,
    ai: Arc<dyn AiAssistClient>,
    runtime: Handle,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    pending_ops: usize,
    goals: GoalList,
    mode: Mode,
    /// The open draft. A create draft survives leaving the form.
    form: Option<GoalFormView>,
    next_form_id: u64,
    completion: Option<CompletionFlow>,
    chat: ChatSession,
    status_message: Option<String>,
}

impl App {
    /// Build the app and start loading goals. Backend calls run on `runtime`
    /// and report back through [`App::drain_events`].
    pub fn new(repo: Arc<dyn GoalRepository>, ai: Arc<dyn AiAssistClient>, runtime: Handle) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        let mut app = Self {
            repo,
            ai,
            runtime,
            events_tx,
            events_rx,
            pending_ops: 0,
            goals: GoalList::default(),
            mode: Mode::Normal,
            form: None,
            next_form_id: 1,
            completion: None,
            chat: ChatSession::new(),
            status_message: None,
        };
        app.refresh();
        app
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn goals(&self) -> &[Goal] {
        self.goals.goals()
    }

    pub fn form(&self) -> Option<&GoalFormView> {
        self.form.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionFlow> {
        self.completion.as_ref()
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    /// Backend calls started and not yet drained.
    pub fn pending_ops(&self) -> usize {
        self.pending_ops
    }

    pub fn is_input_mode(&self) -> bool {
        matches!(
            self.mode,
            Mode::Form | Mode::CompleteGoal { .. } | Mode::Chat { .. }
        )
    }

    // -- Background work --

    fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.pending_ops += 1;
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            // The receiver only goes away with the app.
            let _ = tx.send(fut.await);
        });
    }

    fn refresh(&mut self) {
        let repo = self.repo.clone();
        self.spawn(async move { AppEvent::GoalsLoaded(repo.list().await) });
    }

    fn next_form_id(&mut self) -> u64 {
        let id = self.next_form_id;
        self.next_form_id += 1;
        id
    }

    /// Apply every finished backend call.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.pending_ops = self.pending_ops.saturating_sub(1);
            self.apply_event(event);
        }
    }

    /// Called on every UI tick: apply results, fire the debounced
    /// description request, and close an expired achievement.
    pub fn on_tick(&mut self, now: Instant) {
        self.drain_events();

        if let Some(view) = self.form.as_mut() {
            if let Some(req) = view.form.poll_description(now) {
                let form_id = view.id();
                let ai = self.ai.clone();
                self.spawn(async move {
                    AppEvent::DescriptionGenerated {
                        form_id,
                        result: ai.generate_description(&req).await,
                    }
                });
            }
        }

        if let Some(flow) = self.completion.as_mut() {
            if flow.tick(now) {
                let goal_id = flow.goal_id();
                self.completion = None;
                if matches!(self.mode, Mode::CompleteGoal { .. }) {
                    self.mode = Mode::GoalDetail {
                        goal_id,
                        selected: 0,
                    };
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::GoalsLoaded(Ok(goals)) => {
                info!(count = goals.len(), "goals loaded");
                self.goals.replace(goals);
            }
            AppEvent::GoalsLoaded(Err(e)) => {
                self.status_message = Some(format!("Failed to load goals: {e}"));
            }
            AppEvent::GoalSaved {
                form_id,
                created,
                result,
            } => self.on_goal_saved(form_id, created, result),
            AppEvent::SubGoalToggled {
                sub_goal_id,
                done,
                result,
            } => {
                match result {
                    Ok(()) => self.refresh(),
                    Err(e) => {
                        warn!(sub_goal_id, done, error = %e, "sub-goal toggle failed");
                        self.status_message = Some(format!("Could not update sub-goal: {e}"));
                    }
                }
            }
            AppEvent::GoalCompleted { goal_id, result } => {
                let Some(flow) = self.completion.as_mut().filter(|f| f.goal_id() == goal_id) else {
                    return;
                };
                match result {
                    Ok(_) => {
                        info!(goal_id, "goal completed");
                        flow.on_success(Instant::now());
                        self.refresh();
                    }
                    Err(e) => {
                        flow.on_failure();
                        self.status_message = Some(format!("Could not complete goal: {e}"));
                    }
                }
            }
            AppEvent::DescriptionGenerated { form_id, result } => {
                let Some(view) = self.form_for(form_id) else {
                    return;
                };
                match result {
                    Ok(text) => view.form.description.apply_generated(text),
                    Err(e) => {
                        view.form.description.generation_failed();
                        self.status_message = Some(format!("Description generation failed: {e}"));
                    }
                }
            }
            AppEvent::TasksGenerated { form_id, result } => {
                let Some(view) = self.form_for(form_id) else {
                    return;
                };
                match result {
                    Ok(tasks) => {
                        view.form
                            .apply_generated_tasks(&tasks, Local::now().date_naive());
                        if tasks.is_empty() {
                            self.status_message = Some("The assistant suggested no tasks".into());
                        }
                    }
                    Err(e) => {
                        view.form.sub_goals.generation_failed();
                        self.status_message = Some(format!("Task generation failed: {e}"));
                    }
                }
            }
            AppEvent::TemplateGenerated { form_id, result } => {
                let Some(view) = self.form_for(form_id) else {
                    return;
                };
                match result {
                    Ok(goal) => view
                        .form
                        .apply_template_goal(goal, Local::now().date_naive()),
                    Err(e) => {
                        view.form.template_generation_failed();
                        self.status_message = Some(format!("Template generation failed: {e}"));
                    }
                }
            }
            AppEvent::ChatAnswered(Ok(text)) => self.chat.on_answer(text),
            AppEvent::ChatAnswered(Err(e)) => {
                self.chat.on_failure();
                self.status_message = Some(format!("Assistant unavailable: {e}"));
            }
            AppEvent::WeeklyReport(result) => {
                let Mode::Report { text, .. } = &mut self.mode else {
                    return;
                };
                match result {
                    Ok(report) => *text = Some(report),
                    Err(e) => {
                        self.mode = Mode::Normal;
                        self.status_message = Some(format!("Weekly report failed: {e}"));
                    }
                }
            }
        }
    }

    fn form_for(&mut self, form_id: u64) -> Option<&mut GoalFormView> {
        self.form.as_mut().filter(|v| v.id() == form_id)
    }

    fn on_goal_saved(&mut self, form_id: u64, created: bool, result: Result<Goal, ServiceError>) {
        let new_id = self.next_form_id();
        let Some(view) = self.form_for(form_id) else {
            return;
        };
        view.saving = false;
        let goal = match result {
            Ok(goal) => goal,
            Err(e) => {
                warn!(error = %e, created, "saving goal failed");
                self.status_message = Some(format!("Could not save goal: {e}"));
                return;
            }
        };

        info!(goal_id = goal.id, created, "goal saved");
        let goal_id = goal.id;
        if created {
            view.reset(new_id);
            self.status_message = Some(format!("Goal \"{}\" created", goal.title));
            if self.mode == Mode::Form {
                self.mode = Mode::Normal;
            }
        } else {
            self.form = None;
            self.status_message = Some("Goal updated".into());
            if self.mode == Mode::Form {
                self.mode = Mode::GoalDetail {
                    goal_id,
                    selected: 0,
                };
            }
        }
        self.refresh();
    }

    // -- Keys --

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match &self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::GoalDetail { goal_id, selected } => self.handle_detail(key, *goal_id, *selected),
            Mode::CompleteGoal { goal_id, input } => self.handle_complete(key, *goal_id, input),
            Mode::Form => self.handle_form(key),
            Mode::Chat { input } => self.handle_chat(key, input),
            Mode::Report { text, scroll } => match key.code {
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Char('j') | KeyCode::Down => {
                    self.mode = Mode::Report {
                        text: text.clone(),
                        scroll: scroll.saturating_add(1),
                    }
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.mode = Mode::Report {
                        text: text.clone(),
                        scroll: scroll.saturating_sub(1),
                    }
                }
                _ => {}
            },
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(goal) = self.goals.selected_goal() {
                    self.mode = Mode::GoalDetail {
                        goal_id: goal.id,
                        selected: 0,
                    };
                }
            }
            KeyCode::Char('n') => self.open_create_form(),
            KeyCode::Char('e') => {
                if let Some(id) = self.goals.selected_goal().map(|g| g.id) {
                    self.open_edit_form(id);
                }
            }
            KeyCode::Char('c') => {
                let focus = self.goals.selected_goal().map(|g| g.title.clone());
                self.chat.set_focus(focus);
                self.mode = Mode::Chat {
                    input: String::new(),
                };
            }
            KeyCode::Char('w') => {
                self.mode = Mode::Report {
                    text: None,
                    scroll: 0,
                };
                let ai = self.ai.clone();
                self.spawn(async move { AppEvent::WeeklyReport(ai.weekly_report().await) });
            }
            KeyCode::Char('r') => {
                self.refresh();
                self.status_message = Some("Refreshing...".into());
            }
            _ => self.goals.handle_key(key),
        }
    }

    fn open_create_form(&mut self) {
        let reuse = self
            .form
            .as_ref()
            .is_some_and(|v| v.form.mode() == FormMode::Create);
        if !reuse {
            let id = self.next_form_id();
            self.form = Some(GoalFormView::new(id, GoalForm::new()));
        }
        self.mode = Mode::Form;
    }

    fn open_edit_form(&mut self, goal_id: i64) {
        let Some(goal) = self.goals.goal(goal_id) else {
            return;
        };
        let form = GoalForm::from_goal(goal, Utc::now());
        let id = self.next_form_id();
        self.form = Some(GoalFormView::new(id, form));
        self.mode = Mode::Form;
    }

    fn handle_detail(&mut self, key: KeyEvent, goal_id: i64, selected: usize) {
        let Some(goal) = self.goals.goal(goal_id) else {
            self.mode = Mode::Normal;
            return;
        };
        let count = goal.sub_goals.len();
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Char('j') | KeyCode::Down => {
                if selected + 1 < count {
                    self.mode = Mode::GoalDetail {
                        goal_id,
                        selected: selected + 1,
                    };
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.mode = Mode::GoalDetail {
                    goal_id,
                    selected: selected.saturating_sub(1),
                };
            }
            KeyCode::Char(' ') => self.toggle_sub_goal(goal_id, selected),
            KeyCode::Char('e') => self.open_edit_form(goal_id),
            KeyCode::Char('c') => {
                let flow = CompletionFlow::new(goal);
                if goal.is_completed {
                    self.status_message = Some("Goal is already completed".into());
                } else if !flow.can_complete(goal) {
                    self.status_message = Some(ValidationError::SubGoalsIncomplete.to_string());
                } else {
                    self.completion = Some(flow);
                    self.mode = Mode::CompleteGoal {
                        goal_id,
                        input: String::new(),
                    };
                }
            }
            _ => {}
        }
    }

    /// Flip a sub-goal locally, then tell the backend. Success refetches the
    /// list; a failed call is reported and the local state is kept.
    fn toggle_sub_goal(&mut self, goal_id: i64, index: usize) {
        let Some(sub) = self
            .goals
            .goal_mut(goal_id)
            .and_then(|g| g.sub_goals.get_mut(index))
        else {
            return;
        };
        let done = !sub.is_completed;
        sub.is_completed = done;
        sub.completed_at = done.then(Utc::now);
        let sub_goal_id = sub.id;

        let repo = self.repo.clone();
        self.spawn(async move {
            let result = if done {
                repo.complete_sub_goal(sub_goal_id).await
            } else {
                repo.uncomplete_sub_goal(sub_goal_id).await
            };
            AppEvent::SubGoalToggled {
                sub_goal_id,
                done,
                result,
            }
        });
    }

    fn handle_complete(&mut self, key: KeyEvent, goal_id: i64, input: &str) {
        let Some(flow) = self.completion.as_mut() else {
            self.mode = Mode::GoalDetail {
                goal_id,
                selected: 0,
            };
            return;
        };
        match key.code {
            KeyCode::Esc => {
                if !flow.is_pending() {
                    self.completion = None;
                    self.mode = Mode::GoalDetail {
                        goal_id,
                        selected: 0,
                    };
                }
            }
            _ if !matches!(flow.state(), CompletionState::Idle) => {}
            KeyCode::Enter => {
                let image = if input.trim().is_empty() {
                    None
                } else {
                    match load_image(Path::new(input.trim())) {
                        Ok(image) => Some(image),
                        Err(e) => {
                            self.status_message = Some(format!("{e:#}"));
                            return;
                        }
                    }
                };
                let Some(goal) = self.goals.goal(goal_id) else {
                    return;
                };
                match flow.begin(goal, image) {
                    Ok(req) => {
                        let repo = self.repo.clone();
                        self.spawn(async move {
                            AppEvent::GoalCompleted {
                                goal_id: req.goal_id,
                                result: repo.complete(req.goal_id, &req.image).await,
                            }
                        });
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
            KeyCode::Backspace => {
                let mut input = input.to_string();
                input.pop();
                self.mode = Mode::CompleteGoal { goal_id, input };
            }
            KeyCode::Char(c) => {
                let mut input = input.to_string();
                input.push(c);
                self.mode = Mode::CompleteGoal { goal_id, input };
            }
            _ => {}
        }
    }

    fn handle_form(&mut self, key: KeyEvent) {
        let Some(view) = self.form.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };
        let action = match view.handle_key(key, Instant::now()) {
            Ok(action) => action,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };
        let form_id = view.id();

        match action {
            FormAction::None => {}
            FormAction::Close => {
                if view.form.mode() == FormMode::Create {
                    self.mode = Mode::Normal;
                } else {
                    let goal_id = match view.form.mode() {
                        FormMode::Edit { goal_id } => goal_id,
                        FormMode::Create => 0,
                    };
                    self.form = None;
                    self.mode = Mode::GoalDetail {
                        goal_id,
                        selected: 0,
                    };
                }
            }
            FormAction::Submit => self.submit_form(),
            FormAction::GenerateDescription => match view.form.request_description() {
                Ok(req) => {
                    let ai = self.ai.clone();
                    self.spawn(async move {
                        AppEvent::DescriptionGenerated {
                            form_id,
                            result: ai.generate_description(&req).await,
                        }
                    });
                }
                Err(e) => self.status_message = Some(e.to_string()),
            },
            FormAction::GenerateTasks => match view.form.begin_task_generation() {
                Ok(req) => {
                    let ai = self.ai.clone();
                    self.spawn(async move {
                        AppEvent::TasksGenerated {
                            form_id,
                            result: ai.generate_tasks(&req).await,
                        }
                    });
                }
                Err(e) => self.status_message = Some(e.to_string()),
            },
            FormAction::GenerateFromTemplate => match view.form.begin_template_generation() {
                Ok(req) => {
                    let ai = self.ai.clone();
                    self.spawn(async move {
                        AppEvent::TemplateGenerated {
                            form_id,
                            result: ai.generate_goal_from_template(&req).await,
                        }
                    });
                }
                Err(e) => self.status_message = Some(e.to_string()),
            },
            FormAction::LoadImage(path) => match load_image(&path) {
                Ok(image) => {
                    self.status_message = Some(format!("Image {} attached", image.file_name));
                    view.set_image(image);
                }
                Err(e) => self.status_message = Some(format!("{e:#}")),
            },
        }
    }

    fn submit_form(&mut self) {
        let Some(view) = self.form.as_mut() else {
            return;
        };
        if view.saving {
            self.status_message = Some("Goal is already being saved".into());
            return;
        }
        let submission = match view.form.submission() {
            Ok(submission) => submission,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };
        view.saving = true;
        let form_id = view.id();
        let repo = self.repo.clone();

        match view.form.mode() {
            FormMode::Create => self.spawn(async move {
                let result = match submission.image.as_ref() {
                    Some(image) => match submission.source {
                        GoalSource::Template => {
                            repo.create_from_template(&submission.payload, image).await
                        }
                        GoalSource::Manual => repo.create(&submission.payload, image).await,
                    },
                    None => Err(ValidationError::MissingGoalImage.into()),
                };
                AppEvent::GoalSaved {
                    form_id,
                    created: true,
                    result,
                }
            }),
            FormMode::Edit { goal_id } => self.spawn(async move {
                let result = repo
                    .update(goal_id, &submission.payload, submission.image.as_ref())
                    .await;
                AppEvent::GoalSaved {
                    form_id,
                    created: false,
                    result,
                }
            }),
        }
    }

    fn handle_chat(&mut self, key: KeyEvent, input: &str) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Tab => {
                let titles: Vec<String> = self.goals.goals().iter().map(|g| g.title.clone()).collect();
                let next = match self.chat.focus() {
                    None => titles.first().cloned(),
                    Some(current) => titles
                        .iter()
                        .position(|t| t == current)
                        .and_then(|i| titles.get(i + 1).cloned()),
                };
                self.chat.set_focus(next);
            }
            KeyCode::Enter => match self.chat.send(input, self.goals.goals()) {
                Ok(Some(req)) => {
                    self.mode = Mode::Chat {
                        input: String::new(),
                    };
                    let ai = self.ai.clone();
                    self.spawn(async move { AppEvent::ChatAnswered(ai.chat(&req).await) });
                }
                Ok(None) => {}
                Err(e) => self.status_message = Some(e.to_string()),
            },
            KeyCode::Backspace => {
                let mut input = input.to_string();
                input.pop();
                self.mode = Mode::Chat { input };
            }
            KeyCode::Char(c) => {
                let mut input = input.to_string();
                input.push(c);
                self.mode = Mode::Chat { input };
            }
            _ => {}
        }
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let now = Utc::now();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        self.goals.render(frame, layout[1], now);
        self.render_status_bar(frame, layout[2]);

        // Overlays
        match &self.mode {
            Mode::Normal => {}
            Mode::GoalDetail { goal_id, selected } => {
                if let Some(goal) = self.goals.goal(*goal_id) {
                    self.render_goal_detail(frame, goal, *selected, area);
                }
            }
            Mode::CompleteGoal { input, .. } => self.render_complete(frame, input, area),
            Mode::Form => {
                if let Some(view) = &self.form {
                    view.render(frame, area);
                }
            }
            Mode::Chat { input } => self.render_chat(frame, input, area),
            Mode::Report { text, scroll } => self.render_report(frame, text.as_deref(), *scroll, area),
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " goalscope ",
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
        )];
        if self.pending_ops > 0 {
            spans.push(Span::styled(
                format!(" working ({}) ", self.pending_ops),
                Style::default().fg(Color::Yellow),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if let Some(ref msg) = self.status_message {
            let line = Line::from(Span::styled(
                format!(" {msg}"),
                Style::default().fg(Color::Green),
            ));
            frame.render_widget(line, area);
            return;
        }

        let hints = match &self.mode {
            Mode::Normal => vec![
                ("q", "quit"),
                ("j/k", "goals"),
                ("Enter", "detail"),
                ("n", "new"),
                ("e", "edit"),
                ("c", "chat"),
                ("w", "weekly report"),
                ("r", "refresh"),
            ],
            Mode::GoalDetail { .. } => vec![
                ("j/k", "sub-goals"),
                ("Space", "toggle"),
                ("e", "edit"),
                ("c", "complete"),
                ("Esc", "back"),
            ],
            Mode::CompleteGoal { .. } => vec![("Enter", "confirm"), ("Esc", "cancel")],
            Mode::Form => vec![
                ("Tab", "next field"),
                ("Space", "cycle"),
                ("g", "generate"),
                ("a/e/E/d", "sub-goals"),
                ("Ctrl+S", "save"),
                ("Esc", "close"),
            ],
            Mode::Chat { .. } => vec![("Enter", "send"), ("Tab", "focus goal"), ("Esc", "back")],
            Mode::Report { .. } => vec![("j/k", "scroll"), ("Esc", "back")],
        };

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(
                        format!(" {key}"),
                        Style::default().fg(Color::Yellow).bold(),
                    ),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn render_input_bar(&self, frame: &mut Frame, label: &str, input: &str, area: Rect) {
        let input_area = Rect {
            x: area.x,
            y: area.y + area.height.saturating_sub(3),
            width: area.width,
            height: 3,
        };
        frame.render_widget(Clear, input_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(label);
        let paragraph = Paragraph::new(input).block(block);
        frame.render_widget(paragraph, input_area);
    }

    fn render_goal_detail(&self, frame: &mut Frame, goal: &Goal, selected: usize, area: Rect) {
        let popup = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Goal ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let now = Utc::now();
        let status = GoalStatus::of(goal, now);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Title: ", Style::default().bold()),
                Span::raw(goal.title.as_str()),
            ]),
            Line::from(vec![
                Span::styled("Status: ", Style::default().bold()),
                Span::styled(status.display_name(), status_style(status)),
                Span::raw(format!("  {}%", progress_percent(goal))),
            ]),
            Line::from(vec![
                Span::styled("Urgency: ", Style::default().bold()),
                Span::styled(goal.urgency_level.display_name(), urgency_style(goal.urgency_level)),
                Span::styled("  Privacy: ", Style::default().bold()),
                Span::raw(goal.privacy.display_name()),
            ]),
            Line::from(vec![
                Span::styled("Deadline: ", Style::default().bold()),
                Span::raw(goal.deadline.format("%d.%m.%Y %H:%M").to_string()),
            ]),
        ];
        if let Some(award) = goal.award.as_deref().filter(|a| !a.is_empty()) {
            lines.push(Line::from(vec![
                Span::styled("Award: ", Style::default().bold()),
                Span::raw(award),
            ]));
        }
        lines.push(Line::from(""));
        for (label, text) in [
            ("Specific", &goal.specific),
            ("Measurable", &goal.measurable),
            ("Attainable", &goal.attainable),
            ("Relevant", &goal.relevant),
        ] {
            lines.push(Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
                Span::raw(text.as_str()),
            ]));
        }
        if !goal.description.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(goal.description.as_str()));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Sub-goals ({}):", goal.sub_goals.len()),
            Style::default().bold(),
        )));
        for (i, sub) in goal.sub_goals.iter().enumerate() {
            let cursor = if i == selected { "> " } else { "  " };
            let check = if sub.is_completed { "[x] " } else { "[ ] " };
            let style = if sub.is_completed {
                Style::default().fg(Color::Green)
            } else if is_sub_goal_expired(sub, now) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw(cursor),
                Span::styled(format!("{check}{}", sub.description), style),
                Span::styled(
                    format!("  {}", sub.deadline.format("%d.%m.%Y")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn render_complete(&self, frame: &mut Frame, input: &str, area: Rect) {
        let Some(flow) = &self.completion else {
            return;
        };
        match flow.state() {
            CompletionState::Achievement { .. } | CompletionState::Dismissed => {
                let popup = centered_rect(50, 30, area);
                frame.render_widget(Clear, popup);
                let block = Block::default()
                    .title(" Achievement ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green));
                let inner = block.inner(popup);
                frame.render_widget(block, popup);
                let mut lines = vec![Line::from(Span::styled(
                    "Goal completed!",
                    Style::default().fg(Color::Green).bold(),
                ))];
                if let Some(award) = flow.award() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(award));
                }
                frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
            }
            CompletionState::Pending => {
                self.render_input_bar(frame, " Uploading proof... ", input, area)
            }
            CompletionState::Idle => {
                self.render_input_bar(frame, " Proof image path: ", input, area)
            }
        }
    }

    fn render_chat(&self, frame: &mut Frame, input: &str, area: Rect) {
        let popup = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup);
        let title = match self.chat.focus() {
            Some(focus) => format!(" Assistant: {focus} "),
            None => " Assistant ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let mut lines: Vec<Line> = Vec::new();
        for message in self.chat.messages() {
            let (who, style) = match message.role {
                ChatRole::User => ("you", Style::default().fg(Color::Yellow).bold()),
                ChatRole::Assistant => ("assistant", Style::default().fg(Color::Cyan).bold()),
            };
            lines.push(Line::from(Span::styled(format!("{who}:"), style)));
            lines.push(Line::from(message.content.as_str()));
            lines.push(Line::from(""));
        }
        if self.chat.is_pending() {
            lines.push(Line::from(Span::styled(
                "thinking...",
                Style::default().fg(Color::DarkGray),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
        self.render_input_bar(frame, " Ask: ", input, popup);
    }

    fn render_report(&self, frame: &mut Frame, text: Option<&str>, scroll: u16, area: Rect) {
        let popup = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(" Weekly report ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let paragraph = Paragraph::new(text.unwrap_or("Loading..."))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        frame.render_widget(paragraph, popup);
    }
}

fn load_image(path: &Path) -> Result<ImageFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageFile::new(file_name, bytes))
}
