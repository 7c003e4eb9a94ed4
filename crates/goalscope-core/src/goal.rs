use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::image::ImageFile;
use crate::template::GoalTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privacy {
    #[default]
    Private,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Private => "PRIVATE",
            Privacy::Public => "PUBLIC",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Privacy::Private => "Private",
            Privacy::Public => "Public",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Privacy::Private => Privacy::Public,
            Privacy::Public => Privacy::Private,
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Average,
    High,
}

impl UrgencyLevel {
    pub const ALL: &[UrgencyLevel] = &[UrgencyLevel::Low, UrgencyLevel::Average, UrgencyLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "LOW",
            UrgencyLevel::Average => "AVERAGE",
            UrgencyLevel::High => "HIGH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "Low",
            UrgencyLevel::Average => "Average",
            UrgencyLevel::High => "High",
        }
    }

    /// Parse a raw urgency string as the backend sends it. Matching is
    /// case-insensitive; anything outside the three levels is an error.
    pub fn parse_str(s: &str) -> Result<Self, ValidationError> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(UrgencyLevel::Low),
            "AVERAGE" => Ok(UrgencyLevel::Average),
            "HIGH" => Ok(UrgencyLevel::High),
            _ => Err(ValidationError::UnknownUrgency(s.to_string())),
        }
    }

    pub fn next(self) -> Self {
        match self {
            UrgencyLevel::Low => UrgencyLevel::Average,
            UrgencyLevel::Average => UrgencyLevel::High,
            UrgencyLevel::High => UrgencyLevel::Low,
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Coarse goal horizon chosen at creation. Sizes AI task generation; never
/// stored as a literal date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeadlineBucket {
    #[default]
    #[serde(rename = "3_MONTHS")]
    ThreeMonths,
    #[serde(rename = "6_MONTHS")]
    SixMonths,
    #[serde(rename = "1_YEAR")]
    OneYear,
}

impl DeadlineBucket {
    pub const ALL: &[DeadlineBucket] = &[
        DeadlineBucket::ThreeMonths,
        DeadlineBucket::SixMonths,
        DeadlineBucket::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineBucket::ThreeMonths => "3_MONTHS",
            DeadlineBucket::SixMonths => "6_MONTHS",
            DeadlineBucket::OneYear => "1_YEAR",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "3_MONTHS" => Some(DeadlineBucket::ThreeMonths),
            "6_MONTHS" => Some(DeadlineBucket::SixMonths),
            "1_YEAR" => Some(DeadlineBucket::OneYear),
            _ => None,
        }
    }

    /// Number of sub-goals requested from the assistant.
    pub fn max_items(&self) -> u32 {
        match self {
            DeadlineBucket::ThreeMonths => 6,
            DeadlineBucket::SixMonths => 10,
            DeadlineBucket::OneYear => 12,
        }
    }

    /// Natural-language horizon passed to the assistant.
    pub fn hint(&self) -> &'static str {
        match self {
            DeadlineBucket::ThreeMonths => "3 месяца",
            DeadlineBucket::SixMonths => "6 месяцев",
            DeadlineBucket::OneYear => "1 год",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeadlineBucket::ThreeMonths => "3 months",
            DeadlineBucket::SixMonths => "6 months",
            DeadlineBucket::OneYear => "1 year",
        }
    }

    /// Infer the bucket of an already persisted goal from its deadline.
    /// Days are rounded up; up to 90 is three months, up to 180 six.
    pub fn from_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let millis = (deadline - now).num_milliseconds();
        let day = 24 * 60 * 60 * 1000;
        let days = if millis > 0 {
            (millis + day - 1) / day
        } else {
            millis / day
        };
        if days <= 90 {
            DeadlineBucket::ThreeMonths
        } else if days <= 180 {
            DeadlineBucket::SixMonths
        } else {
            DeadlineBucket::OneYear
        }
    }

    pub fn next(self) -> Self {
        match self {
            DeadlineBucket::ThreeMonths => DeadlineBucket::SixMonths,
            DeadlineBucket::SixMonths => DeadlineBucket::OneYear,
            DeadlineBucket::OneYear => DeadlineBucket::ThreeMonths,
        }
    }
}

impl fmt::Display for DeadlineBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A goal as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub specific: String,
    #[serde(default)]
    pub measurable: String,
    #[serde(default)]
    pub attainable: String,
    #[serde(default)]
    pub relevant: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub award: Option<String>,
    #[serde(default)]
    pub privacy: Privacy,
    pub urgency_level: UrgencyLevel,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sub_goals: Vec<SubGoal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoal {
    pub id: i64,
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The `info` document sent with create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    pub title: String,
    pub urgency_level: UrgencyLevel,
    pub specific: String,
    pub measurable: String,
    pub attainable: String,
    pub relevant: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award: Option<String>,
    pub privacy: Privacy,
    pub deadline: DeadlineBucket,
    pub sub_goals: Vec<SubGoalPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<GoalTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGoalPayload {
    pub description: String,
    pub deadline: NaiveDate,
}

/// Which create endpoint a new goal goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalSource {
    #[default]
    Manual,
    Template,
}

/// A validated draft ready to hand to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSubmission {
    pub payload: GoalPayload,
    pub image: Option<ImageFile>,
    /// Image already attached to the goal being edited.
    pub existing_image_url: Option<String>,
    pub source: GoalSource,
}

impl GoalSubmission {
    /// Checks a create must pass before any network call.
    pub fn check_create(&self) -> Result<(), ValidationError> {
        if self.payload.sub_goals.is_empty() {
            return Err(ValidationError::NoSubGoals);
        }
        if self.image.is_none() {
            return Err(ValidationError::MissingGoalImage);
        }
        Ok(())
    }

    /// Checks an update must pass before any network call.
    pub fn check_update(&self) -> Result<(), ValidationError> {
        if self.payload.sub_goals.is_empty() {
            return Err(ValidationError::NoSubGoals);
        }
        if self.image.is_none() && self.existing_image_url.is_none() {
            return Err(ValidationError::MissingGoalImage);
        }
        Ok(())
    }
}
