//! Request and response documents exchanged with the assistant backend.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::template::GoalTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRequest {
    pub title: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksRequest {
    pub title: String,
    pub context: String,
    pub max_items: u32,
    /// Natural-language horizon, e.g. "6 месяцев".
    pub deadline: String,
}

/// One task suggested by the assistant. The backend sends either a bare
/// string or an object with an optional deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneratedTask {
    Text(String),
    Detailed {
        description: String,
        #[serde(default)]
        deadline: Option<String>,
    },
}

impl GeneratedTask {
    pub fn description(&self) -> &str {
        match self {
            GeneratedTask::Text(text) => text,
            GeneratedTask::Detailed { description, .. } => description,
        }
    }

    /// The suggested deadline as a calendar day, if one was sent and parses.
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        match self {
            GeneratedTask::Text(_) => None,
            GeneratedTask::Detailed { deadline, .. } => deadline.as_deref().and_then(parse_day),
        }
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub template: GoalTemplate,
    pub deadline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

/// A whole goal drafted from a template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateGoal {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<GeneratedTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub context: ChatContext,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatContext {
    pub goals: Vec<ChatGoal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGoal {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub progress: Progress,
    pub sub_goals: Vec<ChatSubGoal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSubGoal {
    pub description: String,
    pub done: bool,
}
