use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ValidationError;
use crate::goal::Goal;
use crate::image::ImageFile;
use crate::status::all_sub_goals_completed;

/// How long the achievement stays on screen before it and the completion
/// dialog close on their own.
pub const ACHIEVEMENT_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionState {
    Idle,
    Pending,
    Achievement { dismiss_at: Instant },
    Dismissed,
}

/// A validated request to complete a goal with proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub goal_id: i64,
    pub image: ImageFile,
}

/// Completing one goal: proof upload, then a timed achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionFlow {
    goal_id: i64,
    award: Option<String>,
    state: CompletionState,
}

impl CompletionFlow {
    pub fn new(goal: &Goal) -> Self {
        Self {
            goal_id: goal.id,
            award: goal.award.clone(),
            state: CompletionState::Idle,
        }
    }

    pub fn goal_id(&self) -> i64 {
        self.goal_id
    }

    /// Award captured when the flow opened, shown with the achievement.
    pub fn award(&self) -> Option<&str> {
        self.award.as_deref()
    }

    pub fn state(&self) -> &CompletionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == CompletionState::Pending
    }

    /// Whether the completion control is enabled for the goal as it is now.
    pub fn can_complete(&self, goal: &Goal) -> bool {
        all_sub_goals_completed(goal) && matches!(self.state, CompletionState::Idle)
    }

    pub fn achievement_visible(&self) -> bool {
        matches!(self.state, CompletionState::Achievement { .. })
    }

    /// Validate and mark the request as outstanding. Errors leave the flow
    /// untouched and mean no call must be made.
    pub fn begin(
        &mut self,
        goal: &Goal,
        image: Option<ImageFile>,
    ) -> Result<CompletionRequest, ValidationError> {
        if !all_sub_goals_completed(goal) {
            return Err(ValidationError::SubGoalsIncomplete);
        }
        if self.is_pending() {
            return Err(ValidationError::AlreadyPending("goal completion"));
        }
        let image = image.ok_or(ValidationError::MissingProofImage)?;
        self.state = CompletionState::Pending;
        debug!(goal_id = self.goal_id, bytes = image.size(), "goal completion requested");
        Ok(CompletionRequest {
            goal_id: self.goal_id,
            image,
        })
    }

    pub fn on_success(&mut self, now: Instant) {
        self.state = CompletionState::Achievement {
            dismiss_at: now + ACHIEVEMENT_DURATION,
        };
    }

    /// No automatic retry; the user may invoke again.
    pub fn on_failure(&mut self) {
        self.state = CompletionState::Idle;
    }

    /// Returns true exactly once, when the achievement window ends.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            CompletionState::Achievement { dismiss_at } if now >= dismiss_at => {
                self.state = CompletionState::Dismissed;
                true
            }
            _ => false,
        }
    }
}
