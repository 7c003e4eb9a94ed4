//! State machine tests for the TUI App.
//!
//! Each test builds an App over an in-memory backend on its own runtime and
//! simulates key events, draining finished backend calls between steps.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use goalscope_core::ai::{GeneratedTask, TemplateGoal};
use goalscope_core::form::{FormMode, SmartField};
use goalscope_core::goal::{Goal, Privacy, SubGoal, UrgencyLevel};
use goalscope_service::{Call, MemoryService, ServiceError};
use goalscope_tui::app::{App, Mode};
use goalscope_tui::components::goal_form::FormField;
use tokio::runtime::Runtime;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn char_key(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}

fn ctrl_s() -> KeyEvent {
    KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)
}

fn type_str(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_key(char_key(c));
    }
}

/// Drain events until every spawned backend call has reported back.
fn settle(app: &mut App) {
    for _ in 0..200 {
        app.drain_events();
        if app.pending_ops() == 0 {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("backend calls did not settle");
}

fn focus_field(app: &mut App, field: FormField) {
    for _ in 0..20 {
        if app.form().unwrap().focus() == field {
            return;
        }
        app.handle_key(key(KeyCode::Tab));
    }
    panic!("field {field:?} not reachable");
}

fn sample_goal(title: &str, sub_goals: &[(&str, bool)]) -> Goal {
    let now = Utc::now();
    Goal {
        id: 0,
        title: title.into(),
        specific: "s".into(),
        measurable: "m".into(),
        attainable: "a".into(),
        relevant: "r".into(),
        description: String::new(),
        award: Some("Награда: trip".into()),
        privacy: Privacy::Private,
        urgency_level: UrgencyLevel::Average,
        deadline: now + chrono::Duration::days(30),
        image_url: Some("/uploads/goal.png".into()),
        is_completed: false,
        created_at: now,
        sub_goals: sub_goals
            .iter()
            .enumerate()
            .map(|(i, (description, done))| SubGoal {
                id: 100 + i as i64,
                description: description.to_string(),
                deadline: now + chrono::Duration::days(7),
                is_completed: *done,
                completed_at: done.then(|| now),
            })
            .collect(),
    }
}

fn make_app(svc: &Arc<MemoryService>, rt: &Runtime) -> App {
    let mut app = App::new(svc.clone(), svc.clone(), rt.handle().clone());
    settle(&mut app);
    app
}

fn image_file(dir: &tempfile::TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"\x89PNG fake").unwrap();
    path.to_string_lossy().into_owned()
}

fn fill_smart(app: &mut App, title: &str) {
    type_str(app, title);
    for value in ["s", "m", "a", "r"] {
        app.handle_key(key(KeyCode::Tab));
        type_str(app, value);
    }
}

#[test]
fn loads_goals_on_start() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.insert_goal(sample_goal("Run a marathon", &[]));
    let app = make_app(&svc, &rt);

    assert_eq!(app.goals().len(), 1);
    assert_eq!(app.goals()[0].title, "Run a marathon");
    assert_eq!(app.mode(), &Mode::Normal);
    assert!(!app.is_input_mode());
}

#[test]
fn create_goal_end_to_end() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let mut app = make_app(&svc, &rt);
    let dir = tempfile::tempdir().unwrap();
    let cover = image_file(&dir, "cover.png");

    app.handle_key(char_key('n'));
    assert_eq!(app.mode(), &Mode::Form);
    assert!(app.is_input_mode());
    fill_smart(&mut app, "Learn X");

    focus_field(&mut app, FormField::SubGoals);
    app.handle_key(char_key('a'));
    type_str(&mut app, "Finish chapter 1");
    app.handle_key(key(KeyCode::Tab));
    type_str(&mut app, "010120251200");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.form().unwrap().form.sub_goals.len(), 1);

    focus_field(&mut app, FormField::Image);
    type_str(&mut app, &cover);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.form().unwrap().form.image.is_some());

    app.handle_key(ctrl_s());
    settle(&mut app);

    let created = svc
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Create { payload, image } => Some((payload, image)),
            _ => None,
        })
        .expect("create call");
    assert_eq!(created.0.title, "Learn X");
    assert_eq!(created.0.sub_goals.len(), 1);
    assert_eq!(created.0.sub_goals[0].description, "Finish chapter 1");
    assert_eq!(
        created.0.sub_goals[0].deadline,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
    assert_eq!(created.1.file_name, "cover.png");

    assert_eq!(app.mode(), &Mode::Normal);
    let form = &app.form().unwrap().form;
    assert_eq!(form.field(SmartField::Title), "");
    assert!(form.sub_goals.is_empty());
    assert!(form.image.is_none());
    assert!(app.goals().iter().any(|g| g.title == "Learn X"));
}

#[test]
fn create_without_image_is_blocked_locally() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('n'));
    fill_smart(&mut app, "Learn X");
    focus_field(&mut app, FormField::SubGoals);
    app.handle_key(char_key('a'));
    type_str(&mut app, "Step");
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(ctrl_s());
    settle(&mut app);

    assert_eq!(app.status_message(), Some("upload a photo for the goal"));
    assert!(!svc.calls().iter().any(|c| matches!(c, Call::Create { .. })));
    assert_eq!(app.mode(), &Mode::Form);
}

#[test]
fn create_failure_keeps_draft() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let mut app = make_app(&svc, &rt);
    let dir = tempfile::tempdir().unwrap();
    let cover = image_file(&dir, "cover.png");

    app.handle_key(char_key('n'));
    fill_smart(&mut app, "Learn X");
    focus_field(&mut app, FormField::SubGoals);
    app.handle_key(char_key('a'));
    type_str(&mut app, "Step");
    app.handle_key(key(KeyCode::Enter));
    focus_field(&mut app, FormField::Image);
    type_str(&mut app, &cover);
    app.handle_key(key(KeyCode::Enter));

    svc.fail_next(ServiceError::InvalidInput("title too long".into()));
    app.handle_key(ctrl_s());
    settle(&mut app);

    assert!(app.status_message().unwrap().contains("title too long"));
    assert_eq!(app.mode(), &Mode::Form);
    let view = app.form().unwrap();
    assert!(!view.saving);
    assert_eq!(view.form.field(SmartField::Title), "Learn X");
}

#[test]
fn sub_goal_toggle_is_optimistic() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let goal = svc.insert_goal(sample_goal("Read", &[("chapter 1", false)]));
    let mut app = make_app(&svc, &rt);

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(
        app.mode(),
        &Mode::GoalDetail {
            goal_id: goal.id,
            selected: 0
        }
    );
    app.handle_key(char_key(' '));
    assert!(app.goals()[0].sub_goals[0].is_completed);
    settle(&mut app);
    assert!(svc.calls().contains(&Call::CompleteSubGoal(100)));

    app.handle_key(char_key(' '));
    assert!(!app.goals()[0].sub_goals[0].is_completed);
    settle(&mut app);
    assert!(svc.calls().contains(&Call::UncompleteSubGoal(100)));
}

#[test]
fn failed_toggle_keeps_local_state_and_reports() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.insert_goal(sample_goal("Read", &[("chapter 1", false)]));
    let mut app = make_app(&svc, &rt);

    app.handle_key(key(KeyCode::Enter));
    svc.fail_next(ServiceError::Server {
        status: 500,
        message: "boom".into(),
    });
    app.handle_key(char_key(' '));
    settle(&mut app);

    assert!(app.goals()[0].sub_goals[0].is_completed);
    assert!(app
        .status_message()
        .unwrap()
        .starts_with("Could not update sub-goal"));
}

fn list_calls(svc: &MemoryService) -> usize {
    svc.calls()
        .iter()
        .filter(|c| matches!(c, Call::List))
        .count()
}

#[test]
fn mutations_refetch_goal_list() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let goal = svc.insert_goal(sample_goal("Read", &[("chapter 1", false)]));
    let mut app = make_app(&svc, &rt);
    let dir = tempfile::tempdir().unwrap();
    let proof = image_file(&dir, "proof.jpg");
    assert_eq!(list_calls(&svc), 1);

    app.handle_key(key(KeyCode::Enter));
    app.handle_key(char_key(' '));
    settle(&mut app);
    assert_eq!(list_calls(&svc), 2);
    assert!(app.goals()[0].sub_goals[0].is_completed);

    app.handle_key(char_key('c'));
    type_str(&mut app, &proof);
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app);
    assert_eq!(list_calls(&svc), 3);
    assert!(app.goals()[0].is_completed);

    app.on_tick(Instant::now() + Duration::from_secs(6));
    app.handle_key(char_key('e'));
    type_str(&mut app, " more");
    app.handle_key(ctrl_s());
    settle(&mut app);
    assert_eq!(list_calls(&svc), 4);
    assert_eq!(app.goals()[0].title, "Read more");
    assert_eq!(
        app.mode(),
        &Mode::GoalDetail {
            goal_id: goal.id,
            selected: 0
        }
    );
}

#[test]
fn completion_requires_finished_sub_goals() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.insert_goal(sample_goal("Read", &[("chapter 1", true), ("chapter 2", false)]));
    let mut app = make_app(&svc, &rt);

    app.handle_key(key(KeyCode::Enter));
    app.handle_key(char_key('c'));
    assert!(matches!(app.mode(), Mode::GoalDetail { .. }));
    assert_eq!(
        app.status_message(),
        Some("every sub-goal must be completed first")
    );
    assert!(app.completion().is_none());
}

#[test]
fn completion_flow_shows_achievement_then_closes() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let goal = svc.insert_goal(sample_goal("Read", &[("chapter 1", true)]));
    let mut app = make_app(&svc, &rt);
    let dir = tempfile::tempdir().unwrap();
    let proof = image_file(&dir, "proof.jpg");

    app.handle_key(key(KeyCode::Enter));
    app.handle_key(char_key('c'));
    assert!(matches!(app.mode(), Mode::CompleteGoal { .. }));

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(
        app.status_message(),
        Some("select a photo to confirm completion")
    );
    assert!(!svc.calls().iter().any(|c| matches!(c, Call::Complete { .. })));

    type_str(&mut app, &proof);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.completion().unwrap().is_pending());
    settle(&mut app);

    assert!(app.completion().unwrap().achievement_visible());
    assert_eq!(app.completion().unwrap().award(), Some("Награда: trip"));
    assert!(app.goals()[0].is_completed);
    let calls = svc.calls();
    match calls.iter().rev().find(|c| matches!(c, Call::Complete { .. })) {
        Some(Call::Complete { id, image }) => {
            assert_eq!(*id, goal.id);
            assert_eq!(image.file_name, "proof.jpg");
            assert_eq!(image.mime_type, "image/jpeg");
        }
        other => panic!("expected complete call, got {other:?}"),
    }

    app.on_tick(Instant::now() + Duration::from_secs(6));
    assert!(app.completion().is_none());
    assert!(matches!(app.mode(), Mode::GoalDetail { .. }));
}

#[test]
fn failed_completion_allows_retry() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.insert_goal(sample_goal("Read", &[("chapter 1", true)]));
    let mut app = make_app(&svc, &rt);
    let dir = tempfile::tempdir().unwrap();
    let proof = image_file(&dir, "proof.png");

    app.handle_key(key(KeyCode::Enter));
    app.handle_key(char_key('c'));
    type_str(&mut app, &proof);
    svc.fail_next(ServiceError::Network("offline".into()));
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app);

    let flow = app.completion().unwrap();
    assert!(flow.can_complete(&app.goals()[0]));
    assert!(!flow.achievement_visible());
    assert!(app.status_message().unwrap().contains("offline"));
}

#[test]
fn description_generates_after_quiet_period() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.set_description("A generated description");
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('n'));
    fill_smart(&mut app, "Learn X");

    app.on_tick(Instant::now());
    assert_eq!(app.pending_ops(), 0);

    app.on_tick(Instant::now() + Duration::from_millis(700));
    settle(&mut app);

    let requests: Vec<_> = svc
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Description(req) => Some(req),
            _ => None,
        })
        .collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "Learn X");
    assert_eq!(requests[0].context, "s\nm\na\nr");
    assert_eq!(
        app.form().unwrap().form.description.text(),
        "A generated description"
    );
}

#[test]
fn task_generation_replaces_only_assistant_rows() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.set_tasks(vec![
        GeneratedTask::Text("First".into()),
        GeneratedTask::Detailed {
            description: "Second".into(),
            deadline: Some("2025-03-01".into()),
        },
    ]);
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('n'));
    type_str(&mut app, "Learn X");
    focus_field(&mut app, FormField::SubGoals);
    app.handle_key(char_key('a'));
    type_str(&mut app, "Mine");
    app.handle_key(key(KeyCode::Enter));

    app.handle_key(char_key('g'));
    settle(&mut app);
    app.handle_key(char_key('g'));
    settle(&mut app);

    let sub_goals = &app.form().unwrap().form.sub_goals;
    let descriptions: Vec<&str> = sub_goals
        .items()
        .iter()
        .map(|s| s.description.as_str())
        .collect();
    assert_eq!(descriptions, ["Mine", "First", "Second"]);
    assert!(!sub_goals.items()[0].is_ai_generated());
    assert!(sub_goals.items()[1].is_ai_generated());
    assert_eq!(
        sub_goals.items()[2].deadline,
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    );
    assert_eq!(sub_goals.generate_label(), "Regenerate tasks");

    match svc.calls().last() {
        Some(Call::Tasks(req)) => {
            assert_eq!(req.title, "Learn X");
            assert_eq!(req.max_items, 6);
        }
        other => panic!("expected tasks call, got {other:?}"),
    }
}

#[test]
fn template_generation_fills_draft() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.set_template_goal(TemplateGoal {
        title: Some("Lose 5 kg".into()),
        description: "Eat better".into(),
        tasks: vec![GeneratedTask::Text("Walk daily".into())],
    });
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('n'));
    focus_field(&mut app, FormField::Template);
    app.handle_key(char_key('g'));
    assert_eq!(app.status_message(), Some("choose a template first"));

    app.handle_key(char_key(' '));
    assert!(app.form().unwrap().form.template.is_some());
    app.handle_key(char_key('g'));
    settle(&mut app);

    let form = &app.form().unwrap().form;
    assert_eq!(form.field(SmartField::Title), "Lose 5 kg");
    assert_eq!(form.description.text(), "Eat better");
    assert_eq!(form.sub_goals.len(), 1);
    assert_eq!(form.template_generation.button_label(), "Generate again");
}

#[test]
fn edit_goal_sends_update() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let goal = svc.insert_goal(sample_goal("Read", &[("chapter 1", false)]));
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('e'));
    assert_eq!(app.mode(), &Mode::Form);
    assert_eq!(
        app.form().unwrap().form.mode(),
        FormMode::Edit { goal_id: goal.id }
    );
    type_str(&mut app, " more");
    app.handle_key(ctrl_s());
    settle(&mut app);

    let calls = svc.calls();
    match calls.iter().rev().find(|c| matches!(c, Call::Update { .. })) {
        Some(Call::Update { id, payload, image }) => {
            assert_eq!(*id, goal.id);
            assert_eq!(payload.title, "Read more");
            assert_eq!(payload.award.as_deref(), Some("Награда: trip"));
            assert_eq!(payload.template, None);
            assert!(image.is_none());
        }
        other => panic!("expected update call, got {other:?}"),
    }
    assert_eq!(
        app.mode(),
        &Mode::GoalDetail {
            goal_id: goal.id,
            selected: 0
        }
    );
    assert!(app.form().is_none());
    assert_eq!(app.goals()[0].title, "Read more");
}

#[test]
fn chat_sends_question_with_focus() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.insert_goal(sample_goal("Read", &[("chapter 1", true)]));
    svc.insert_goal(sample_goal("Run", &[]));
    svc.set_chat_answer("Keep going");
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('c'));
    assert_eq!(app.chat().focus(), Some("Read"));
    type_str(&mut app, "How am I doing?");
    app.handle_key(key(KeyCode::Enter));
    assert!(app.chat().is_pending());
    settle(&mut app);

    assert_eq!(app.chat().messages().len(), 2);
    assert_eq!(app.chat().messages()[1].content, "Keep going");
    match svc.calls().last() {
        Some(Call::Chat(req)) => {
            assert_eq!(req.question, "How am I doing?");
            assert_eq!(req.focus.as_deref(), Some("Read"));
            assert_eq!(req.context.goals.len(), 2);
            assert!(req.history.is_empty());
        }
        other => panic!("expected chat call, got {other:?}"),
    }

    app.handle_key(key(KeyCode::Tab));
    assert_eq!(app.chat().focus(), Some("Run"));
    app.handle_key(key(KeyCode::Tab));
    assert_eq!(app.chat().focus(), None);
}

#[test]
fn weekly_report_loads_into_view() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    svc.set_weekly_report("Good week");
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('w'));
    assert_eq!(
        app.mode(),
        &Mode::Report {
            text: None,
            scroll: 0
        }
    );
    settle(&mut app);
    assert_eq!(
        app.mode(),
        &Mode::Report {
            text: Some("Good week".into()),
            scroll: 0
        }
    );
    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.mode(), &Mode::Normal);
}

#[test]
fn leaving_create_form_keeps_draft() {
    let rt = Runtime::new().unwrap();
    let svc = Arc::new(MemoryService::new());
    let mut app = make_app(&svc, &rt);

    app.handle_key(char_key('n'));
    type_str(&mut app, "Half typed");
    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.mode(), &Mode::Normal);

    app.handle_key(char_key('n'));
    assert_eq!(
        app.form().unwrap().form.field(SmartField::Title),
        "Half typed"
    );
}
