//! Presentational state derived from persisted goals. Recomputed on every
//! render; nothing here is stored.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::goal::{Goal, SubGoal, UrgencyLevel};

pub fn is_goal_expired(goal: &Goal, now: DateTime<Utc>) -> bool {
    !goal.is_completed && goal.deadline < now
}

pub fn is_sub_goal_expired(sub_goal: &SubGoal, now: DateTime<Utc>) -> bool {
    !sub_goal.is_completed && sub_goal.deadline < now
}

/// True for an empty list.
pub fn all_sub_goals_completed(goal: &Goal) -> bool {
    goal.sub_goals.iter().all(|s| s.is_completed)
}

pub fn completed_count(goal: &Goal) -> usize {
    goal.sub_goals.iter().filter(|s| s.is_completed).count()
}

/// Completion percentage; a goal with no sub-goals counts as done.
pub fn progress_percent(goal: &Goal) -> u8 {
    let total = goal.sub_goals.len();
    if total == 0 {
        return 100;
    }
    ((completed_count(goal) as f64 / total as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Completed,
    Expired,
    SubGoalsDone,
    InProgress,
}

impl GoalStatus {
    pub fn of(goal: &Goal, now: DateTime<Utc>) -> Self {
        if goal.is_completed {
            GoalStatus::Completed
        } else if is_goal_expired(goal, now)
            || goal.sub_goals.iter().any(|s| is_sub_goal_expired(s, now))
        {
            GoalStatus::Expired
        } else if all_sub_goals_completed(goal) {
            GoalStatus::SubGoalsDone
        } else {
            GoalStatus::InProgress
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GoalStatus::Completed => "Completed",
            GoalStatus::Expired => "Expired",
            GoalStatus::SubGoalsDone => "Ready to complete",
            GoalStatus::InProgress => "In progress",
        }
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

pub fn urgency_color(level: UrgencyLevel) -> Rgb {
    match level {
        UrgencyLevel::Low => Rgb(0xF9, 0xF9, 0x24),
        UrgencyLevel::Average => Rgb(0xFA, 0x8E, 0x00),
        UrgencyLevel::High => Rgb(0xC6, 0x15, 0x15),
    }
}

/// Color for a raw urgency string; unknown values are an error, never a
/// fallback color.
pub fn urgency_color_raw(raw: &str) -> Result<Rgb, ValidationError> {
    UrgencyLevel::parse_str(raw).map(urgency_color)
}
