use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use goalscope_core::ai::{
    ChatRequest, DescriptionRequest, GeneratedTask, TasksRequest, TemplateGoal, TemplateRequest,
};
use goalscope_core::goal::{DeadlineBucket, Goal, GoalPayload, SubGoal};
use goalscope_core::image::ImageFile;

use crate::{AiAssistClient, GoalRepository, ServiceError};

/// One call observed by [`MemoryService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { payload: GoalPayload, image: ImageFile },
    CreateFromTemplate { payload: GoalPayload, image: ImageFile },
    Get(i64),
    List,
    Update { id: i64, payload: GoalPayload, image: Option<ImageFile> },
    CompleteSubGoal(i64),
    UncompleteSubGoal(i64),
    Complete { id: i64, image: ImageFile },
    Description(DescriptionRequest),
    Tasks(TasksRequest),
    Template(TemplateRequest),
    Chat(ChatRequest),
    WeeklyReport,
}

#[derive(Default)]
struct State {
    goals: Vec<Goal>,
    next_id: i64,
    calls: Vec<Call>,
    fail_next: VecDeque<ServiceError>,
    description: String,
    tasks: Vec<GeneratedTask>,
    template: TemplateGoal,
    chat: String,
    report: String,
}

/// In-memory goals and canned assistant replies, with every call recorded.
pub struct MemoryService {
    state: Mutex<State>,
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Internal("memory service lock poisoned".into()))
    }

    /// Run `f` on the state after recording `call`, unless a failure is queued.
    fn with_call<T>(
        &self,
        call: Call,
        f: impl FnOnce(&mut State) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut state = self.lock()?;
        state.calls.push(call);
        if let Some(err) = state.fail_next.pop_front() {
            return Err(err);
        }
        f(&mut state)
    }

    pub fn insert_goal(&self, mut goal: Goal) -> Goal {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if goal.id == 0 {
            goal.id = state.next_id;
        }
        state.next_id = state.next_id.max(goal.id + 1);
        state.goals.push(goal.clone());
        goal
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.state
            .lock()
            .map(|s| s.goals.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: ServiceError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next.push_back(err);
        }
    }

    pub fn set_description(&self, text: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.description = text.into();
        }
    }

    pub fn set_tasks(&self, tasks: Vec<GeneratedTask>) {
        if let Ok(mut state) = self.state.lock() {
            state.tasks = tasks;
        }
    }

    pub fn set_template_goal(&self, goal: TemplateGoal) {
        if let Ok(mut state) = self.state.lock() {
            state.template = goal;
        }
    }

    pub fn set_chat_answer(&self, text: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.chat = text.into();
        }
    }

    pub fn set_weekly_report(&self, text: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.report = text.into();
        }
    }
}

fn materialize(state: &mut State, payload: &GoalPayload, image: Option<&ImageFile>) -> Goal {
    let now = Utc::now();
    let id = state.next_id;
    state.next_id += 1;
    let days = match payload.deadline {
        DeadlineBucket::ThreeMonths => 90,
        DeadlineBucket::SixMonths => 180,
        DeadlineBucket::OneYear => 365,
    };
    let sub_goals = payload
        .sub_goals
        .iter()
        .map(|s| {
            let sub_id = state.next_id;
            state.next_id += 1;
            SubGoal {
                id: sub_id,
                description: s.description.clone(),
                deadline: s.deadline.and_time(NaiveTime::MIN).and_utc(),
                is_completed: false,
                completed_at: None,
            }
        })
        .collect();
    Goal {
        id,
        title: payload.title.clone(),
        specific: payload.specific.clone(),
        measurable: payload.measurable.clone(),
        attainable: payload.attainable.clone(),
        relevant: payload.relevant.clone(),
        description: payload.description.clone(),
        award: payload.award.clone(),
        privacy: payload.privacy,
        urgency_level: payload.urgency_level,
        deadline: now + Duration::days(days),
        image_url: image.map(|i| format!("memory://{}", i.file_name)),
        is_completed: false,
        created_at: now,
        sub_goals,
    }
}

fn find_goal(state: &mut State, id: i64) -> Result<&mut Goal, ServiceError> {
    state
        .goals
        .iter_mut()
        .find(|g| g.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("goal {id}")))
}

fn set_sub_goal(state: &mut State, id: i64, done: bool) -> Result<(), ServiceError> {
    let sub = state
        .goals
        .iter_mut()
        .flat_map(|g| g.sub_goals.iter_mut())
        .find(|s| s.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("sub-goal {id}")))?;
    sub.is_completed = done;
    sub.completed_at = done.then(Utc::now);
    Ok(())
}

#[async_trait]
impl GoalRepository for MemoryService {
    async fn create(&self, goal: &GoalPayload, image: &ImageFile) -> Result<Goal, ServiceError> {
        let call = Call::Create {
            payload: goal.clone(),
            image: image.clone(),
        };
        self.with_call(call, |state| {
            let created = materialize(state, goal, Some(image));
            state.goals.push(created.clone());
            Ok(created)
        })
    }

    async fn create_from_template(
        &self,
        goal: &GoalPayload,
        image: &ImageFile,
    ) -> Result<Goal, ServiceError> {
        let call = Call::CreateFromTemplate {
            payload: goal.clone(),
            image: image.clone(),
        };
        self.with_call(call, |state| {
            let created = materialize(state, goal, Some(image));
            state.goals.push(created.clone());
            Ok(created)
        })
    }

    async fn get(&self, id: i64) -> Result<Goal, ServiceError> {
        self.with_call(Call::Get(id), |state| find_goal(state, id).map(|g| g.clone()))
    }

    async fn list(&self) -> Result<Vec<Goal>, ServiceError> {
        self.with_call(Call::List, |state| Ok(state.goals.clone()))
    }

    async fn update(
        &self,
        id: i64,
        goal: &GoalPayload,
        image: Option<&ImageFile>,
    ) -> Result<Goal, ServiceError> {
        let call = Call::Update {
            id,
            payload: goal.clone(),
            image: image.cloned(),
        };
        self.with_call(call, |state| {
            let existing = find_goal(state, id)?.clone();
            let mut updated = materialize(state, goal, image);
            updated.id = existing.id;
            updated.created_at = existing.created_at;
            updated.deadline = existing.deadline;
            if image.is_none() {
                updated.image_url = existing.image_url;
            }
            let slot = find_goal(state, id)?;
            *slot = updated.clone();
            Ok(updated)
        })
    }

    async fn complete_sub_goal(&self, id: i64) -> Result<(), ServiceError> {
        self.with_call(Call::CompleteSubGoal(id), |state| set_sub_goal(state, id, true))
    }

    async fn uncomplete_sub_goal(&self, id: i64) -> Result<(), ServiceError> {
        self.with_call(Call::UncompleteSubGoal(id), |state| {
            set_sub_goal(state, id, false)
        })
    }

    async fn complete(&self, id: i64, image: &ImageFile) -> Result<Goal, ServiceError> {
        let call = Call::Complete {
            id,
            image: image.clone(),
        };
        self.with_call(call, |state| {
            let goal = find_goal(state, id)?;
            goal.is_completed = true;
            Ok(goal.clone())
        })
    }
}

#[async_trait]
impl AiAssistClient for MemoryService {
    async fn generate_description(&self, req: &DescriptionRequest) -> Result<String, ServiceError> {
        self.with_call(Call::Description(req.clone()), |state| {
            Ok(state.description.clone())
        })
    }

    async fn generate_tasks(&self, req: &TasksRequest) -> Result<Vec<GeneratedTask>, ServiceError> {
        self.with_call(Call::Tasks(req.clone()), |state| Ok(state.tasks.clone()))
    }

    async fn generate_goal_from_template(
        &self,
        req: &TemplateRequest,
    ) -> Result<TemplateGoal, ServiceError> {
        self.with_call(Call::Template(req.clone()), |state| {
            Ok(state.template.clone())
        })
    }

    async fn chat(&self, req: &ChatRequest) -> Result<String, ServiceError> {
        self.with_call(Call::Chat(req.clone()), |state| Ok(state.chat.clone()))
    }

    async fn weekly_report(&self) -> Result<String, ServiceError> {
        self.with_call(Call::WeeklyReport, |state| Ok(state.report.clone()))
    }
}
