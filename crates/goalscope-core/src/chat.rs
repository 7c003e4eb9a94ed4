use crate::ai::{ChatContext, ChatGoal, ChatMessage, ChatRequest, ChatRole, ChatSubGoal, Progress};
use crate::error::ValidationError;
use crate::goal::Goal;
use crate::status::completed_count;

/// Prior messages sent along with each question.
pub const HISTORY_LIMIT: usize = 10;

/// Conversation with the assistant about the user's goals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    focus: Option<String>,
    pending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn set_focus(&mut self, title: Option<String>) {
        self.focus = title.filter(|t| !t.is_empty());
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn can_send(&self) -> bool {
        !self.pending
    }

    /// Append the question and build the request. Blank input yields
    /// `Ok(None)` and changes nothing.
    pub fn send(&mut self, input: &str, goals: &[Goal]) -> Result<Option<ChatRequest>, ValidationError> {
        let question = input.trim();
        if question.is_empty() {
            return Ok(None);
        }
        if self.pending {
            return Err(ValidationError::AlreadyPending("chat request"));
        }
        let start = self.messages.len().saturating_sub(HISTORY_LIMIT);
        let history = self.messages[start..].to_vec();
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: question.to_string(),
        });
        self.pending = true;
        Ok(Some(ChatRequest {
            question: question.to_string(),
            focus: self.focus.clone(),
            context: goals_context(goals, self.focus.as_deref()),
            history,
        }))
    }

    pub fn on_answer(&mut self, text: String) {
        self.pending = false;
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: text,
        });
    }

    /// The question stays in the list; no reply is added.
    pub fn on_failure(&mut self) {
        self.pending = false;
    }
}

/// Summaries of every goal, with the focused one (if any) moved first and
/// the rest in their original order.
pub fn goals_context(goals: &[Goal], focus: Option<&str>) -> ChatContext {
    let mut ordered: Vec<&Goal> = goals.iter().collect();
    if let Some(focus) = focus {
        ordered.sort_by_key(|g| g.title != focus);
    }
    ChatContext {
        goals: ordered
            .into_iter()
            .map(|g| ChatGoal {
                id: g.id,
                title: g.title.clone(),
                description: g.description.clone(),
                progress: Progress {
                    completed: completed_count(g),
                    total: g.sub_goals.len(),
                },
                sub_goals: g
                    .sub_goals
                    .iter()
                    .map(|s| ChatSubGoal {
                        description: s.description.clone(),
                        done: s.is_completed,
                    })
                    .collect(),
            })
            .collect(),
    }
}
