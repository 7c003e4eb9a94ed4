use async_trait::async_trait;
use goalscope_core::ai::{
    ChatRequest, DescriptionRequest, GeneratedTask, TasksRequest, TemplateGoal, TemplateRequest,
};
use goalscope_core::goal::{Goal, GoalPayload};
use goalscope_core::image::ImageFile;
use goalscope_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Authentication expired and a token refresh did not help.
    #[error("session expired, please reload: {0}")]
    Unauthorized(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Persistence of goals behind the backend.
///
/// The TUI programs against this trait.
/// `HttpService` talks to the REST backend.
/// `MemoryService` keeps goals in memory for tests.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn create(&self, goal: &GoalPayload, image: &ImageFile) -> Result<Goal, ServiceError>;
    async fn create_from_template(
        &self,
        goal: &GoalPayload,
        image: &ImageFile,
    ) -> Result<Goal, ServiceError>;
    async fn get(&self, id: i64) -> Result<Goal, ServiceError>;
    async fn list(&self) -> Result<Vec<Goal>, ServiceError>;
    async fn update(
        &self,
        id: i64,
        goal: &GoalPayload,
        image: Option<&ImageFile>,
    ) -> Result<Goal, ServiceError>;
    async fn complete_sub_goal(&self, id: i64) -> Result<(), ServiceError>;
    async fn uncomplete_sub_goal(&self, id: i64) -> Result<(), ServiceError>;
    async fn complete(&self, id: i64, image: &ImageFile) -> Result<Goal, ServiceError>;
}

/// Text generation for goals. Failures are reported, never retried.
#[async_trait]
pub trait AiAssistClient: Send + Sync {
    async fn generate_description(&self, req: &DescriptionRequest) -> Result<String, ServiceError>;
    async fn generate_tasks(&self, req: &TasksRequest) -> Result<Vec<GeneratedTask>, ServiceError>;
    async fn generate_goal_from_template(
        &self,
        req: &TemplateRequest,
    ) -> Result<TemplateGoal, ServiceError>;
    async fn chat(&self, req: &ChatRequest) -> Result<String, ServiceError>;
    async fn weekly_report(&self) -> Result<String, ServiceError>;
}
