use std::sync::Arc;

use async_trait::async_trait;
use goalscope_core::ai::{
    ChatRequest, DescriptionRequest, GeneratedTask, TasksRequest, TemplateGoal, TemplateRequest,
};
use goalscope_core::goal::{Goal, GoalPayload};
use goalscope_core::image::ImageFile;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::token::{StaticToken, TokenSource};
use crate::{AiAssistClient, GoalRepository, ServiceError};

/// Async HTTP client for the goal backend and its assistant endpoints.
pub struct HttpService {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        Self::with_tokens(base_url, Arc::new(StaticToken::new(None)))
    }

    pub fn with_tokens(base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request built by `build`. A 401/403 triggers one token refresh
    /// and one resend; the resent response is returned whatever its status.
    async fn send<F>(&self, build: F) -> Result<Response, ServiceError>
    where
        F: Fn(&Client, &str) -> Result<RequestBuilder, ServiceError>,
    {
        let resp = self
            .with_auth(build(&self.client, &self.base_url)?)
            .send()
            .await
            .map_err(network_error)?;
        if !is_auth_failure(resp.status()) {
            return Ok(resp);
        }

        warn!(status = %resp.status(), url = %resp.url(), "auth rejected, refreshing token");
        self.tokens
            .refresh()
            .await
            .map_err(|e| ServiceError::Unauthorized(e.to_string()))?;
        self.with_auth(build(&self.client, &self.base_url)?)
            .send()
            .await
            .map_err(network_error)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        debug!("GET {path}");
        let resp = self
            .send(|c, base| Ok(c.get(format!("{base}{path}"))))
            .await?;
        handle_response(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        debug!("POST {path}");
        let resp = self
            .send(|c, base| Ok(c.post(format!("{base}{path}")).json(body)))
            .await?;
        handle_response(resp).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), ServiceError> {
        debug!("POST {path}");
        let resp = self
            .send(|c, base| Ok(c.post(format!("{base}{path}"))))
            .await?;
        expect_success(resp).await
    }

    async fn post_multipart<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        goal: Option<&GoalPayload>,
        image: Option<&ImageFile>,
    ) -> Result<T, ServiceError> {
        log_multipart("POST", path, image);
        let resp = self
            .send(|c, base| Ok(c.post(format!("{base}{path}")).multipart(goal_form(goal, image)?)))
            .await?;
        handle_response(resp).await
    }

    async fn put_multipart<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        goal: &GoalPayload,
        image: Option<&ImageFile>,
    ) -> Result<T, ServiceError> {
        log_multipart("PUT", path, image);
        let resp = self
            .send(|c, base| {
                Ok(c.put(format!("{base}{path}"))
                    .multipart(goal_form(Some(goal), image)?))
            })
            .await?;
        handle_response(resp).await
    }
}

fn log_multipart(method: &str, path: &str, image: Option<&ImageFile>) {
    match image {
        Some(image) => debug!(
            file = %image.file_name,
            size = image.size(),
            mime = %image.mime_type,
            "{method} {path}"
        ),
        None => debug!("{method} {path}"),
    }
}

/// `image` file part and `info` JSON part, in that order.
fn goal_form(goal: Option<&GoalPayload>, image: Option<&ImageFile>) -> Result<Form, ServiceError> {
    let mut form = Form::new();
    if let Some(image) = image {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ServiceError::InvalidInput(format!("image mime type: {e}")))?;
        form = form.part("image", part);
    }
    if let Some(goal) = goal {
        let info = serde_json::to_string(goal)
            .map_err(|e| ServiceError::Internal(format!("encode goal: {e}")))?;
        form = form.text("info", info);
    }
    Ok(form)
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn network_error(e: reqwest::Error) -> ServiceError {
    ServiceError::Network(e.to_string())
}

async fn handle_response<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn expect_success(resp: Response) -> Result<(), ServiceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error_with_status(status: StatusCode, resp: Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = error_message(&body);
    warn!(status = status.as_u16(), message = %msg, "backend request failed");

    if is_auth_failure(status) {
        ServiceError::Unauthorized(msg)
    } else if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound(msg)
    } else if status.is_server_error() {
        ServiceError::Server {
            status: status.as_u16(),
            message: msg,
        }
    } else if status.is_client_error() {
        ServiceError::InvalidInput(msg)
    } else {
        ServiceError::Internal(msg)
    }
}

/// Pull a readable message out of an error body: a bare string, then
/// `message`, then `error`, then the `errors` list.
pub(crate) fn error_message(body: &str) -> String {
    let value = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value,
        Err(_) if body.trim().is_empty() => return "unknown error".into(),
        Err(_) => return body.to_string(),
    };
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    let joined = |v: &serde_json::Value| -> Option<String> {
        match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    };
    joined(&value["message"])
        .or_else(|| joined(&value["error"]))
        .or_else(|| match &value["errors"] {
            v @ serde_json::Value::Array(_) => joined(v),
            _ => None,
        })
        .unwrap_or_else(|| "unknown error".into())
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<GeneratedTask>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportResponse {
    Plain(String),
    Wrapped { text: String },
}

#[async_trait]
impl GoalRepository for HttpService {
    async fn create(&self, goal: &GoalPayload, image: &ImageFile) -> Result<Goal, ServiceError> {
        self.post_multipart("/goal/create", Some(goal), Some(image))
            .await
    }

    async fn create_from_template(
        &self,
        goal: &GoalPayload,
        image: &ImageFile,
    ) -> Result<Goal, ServiceError> {
        self.post_multipart("/goal/create-from-template", Some(goal), Some(image))
            .await
    }

    async fn get(&self, id: i64) -> Result<Goal, ServiceError> {
        self.get_json(&format!("/goal/{id}")).await
    }

    async fn list(&self) -> Result<Vec<Goal>, ServiceError> {
        self.get_json("/goal").await
    }

    async fn update(
        &self,
        id: i64,
        goal: &GoalPayload,
        image: Option<&ImageFile>,
    ) -> Result<Goal, ServiceError> {
        self.put_multipart(&format!("/goal/{id}"), goal, image)
            .await
    }

    async fn complete_sub_goal(&self, id: i64) -> Result<(), ServiceError> {
        self.post_empty(&format!("/goal/sub-goal/{id}/complete"))
            .await
    }

    async fn uncomplete_sub_goal(&self, id: i64) -> Result<(), ServiceError> {
        self.post_empty(&format!("/goal/sub-goal/{id}/uncomplete"))
            .await
    }

    async fn complete(&self, id: i64, image: &ImageFile) -> Result<Goal, ServiceError> {
        self.post_multipart(&format!("/goal/{id}/complete"), None, Some(image))
            .await
    }
}

#[async_trait]
impl AiAssistClient for HttpService {
    async fn generate_description(&self, req: &DescriptionRequest) -> Result<String, ServiceError> {
        let resp: TextResponse = self.post_json("/ai/goal/description", req).await?;
        Ok(resp.text)
    }

    async fn generate_tasks(&self, req: &TasksRequest) -> Result<Vec<GeneratedTask>, ServiceError> {
        let resp: TasksResponse = self.post_json("/ai/goal/tasks", req).await?;
        Ok(resp.tasks)
    }

    async fn generate_goal_from_template(
        &self,
        req: &TemplateRequest,
    ) -> Result<TemplateGoal, ServiceError> {
        self.post_json("/ai/goal/from-template", req).await
    }

    async fn chat(&self, req: &ChatRequest) -> Result<String, ServiceError> {
        let resp: TextResponse = self.post_json("/ai/goal/chat", req).await?;
        Ok(resp.text)
    }

    async fn weekly_report(&self) -> Result<String, ServiceError> {
        let resp: ReportResponse = self.get_json("/ai/goal/weekly-report").await?;
        Ok(match resp {
            ReportResponse::Plain(text) | ReportResponse::Wrapped { text } => text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_sources() {
        assert_eq!(error_message(r#""plain""#), "plain");
        assert_eq!(error_message(r#"{"message":"bad title"}"#), "bad title");
        assert_eq!(
            error_message(r#"{"message":["a must be set","b too long"]}"#),
            "a must be set, b too long"
        );
        assert_eq!(error_message(r#"{"error":"Forbidden"}"#), "Forbidden");
        assert_eq!(error_message(r#"{"errors":["x","y"]}"#), "x, y");
        assert_eq!(error_message("<html>oops</html>"), "<html>oops</html>");
        assert_eq!(error_message(""), "unknown error");
        assert_eq!(error_message(r#"{"statusCode":400}"#), "unknown error");
        assert_eq!(error_message(r#"{"errors":"x"}"#), "unknown error");
        assert_eq!(error_message("42"), "unknown error");
    }

    #[test]
    fn server_error_display_carries_status() {
        let err = ServiceError::Server {
            status: 502,
            message: "upstream".into(),
        };
        assert_eq!(err.to_string(), "server error (502): upstream");
    }
}
