//! The goal draft being authored or edited, owned as a single aggregate.

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::ai::{GeneratedTask, TasksRequest, TemplateGoal, TemplateRequest};
use crate::description::{DescriptionGenerator, SmartFields};
use crate::error::ValidationError;
use crate::goal::{
    DeadlineBucket, Goal, GoalPayload, GoalSource, GoalSubmission, Privacy, UrgencyLevel,
};
use crate::image::ImageFile;
use crate::subgoals::{SubGoalDraft, SubGoalListEditor};
use crate::template::{GoalTemplate, TemplateGeneration};

/// Prefix the award text carries when a goal is created.
pub const AWARD_PREFIX: &str = "Награда: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { goal_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartField {
    Title,
    Specific,
    Measurable,
    Attainable,
    Relevant,
}

impl SmartField {
    pub const ALL: &[SmartField] = &[
        SmartField::Title,
        SmartField::Specific,
        SmartField::Measurable,
        SmartField::Attainable,
        SmartField::Relevant,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SmartField::Title => "Title",
            SmartField::Specific => "Specific",
            SmartField::Measurable => "Measurable",
            SmartField::Attainable => "Attainable",
            SmartField::Relevant => "Relevant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalForm {
    mode: FormMode,
    smart: SmartFields,
    pub award: String,
    pub privacy: Privacy,
    pub deadline: DeadlineBucket,
    pub urgency: UrgencyLevel,
    pub template: Option<GoalTemplate>,
    pub short_description: String,
    pub image: Option<ImageFile>,
    existing_image_url: Option<String>,
    pub description: DescriptionGenerator,
    pub sub_goals: SubGoalListEditor,
    pub template_generation: TemplateGeneration,
}

impl Default for GoalForm {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalForm {
    /// An empty create draft with default privacy, bucket and urgency.
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            smart: SmartFields::default(),
            award: String::new(),
            privacy: Privacy::default(),
            deadline: DeadlineBucket::default(),
            urgency: UrgencyLevel::default(),
            template: None,
            short_description: String::new(),
            image: None,
            existing_image_url: None,
            description: DescriptionGenerator::new(true),
            sub_goals: SubGoalListEditor::new(),
            template_generation: TemplateGeneration::default(),
        }
    }

    /// A draft populated from a persisted goal for editing.
    pub fn from_goal(goal: &Goal, now: DateTime<Utc>) -> Self {
        Self {
            mode: FormMode::Edit { goal_id: goal.id },
            smart: SmartFields {
                title: goal.title.clone(),
                specific: goal.specific.clone(),
                measurable: goal.measurable.clone(),
                attainable: goal.attainable.clone(),
                relevant: goal.relevant.clone(),
            },
            award: goal.award.clone().unwrap_or_default(),
            privacy: goal.privacy,
            deadline: DeadlineBucket::from_deadline(goal.deadline, now),
            urgency: goal.urgency_level,
            template: None,
            short_description: String::new(),
            image: None,
            existing_image_url: goal.image_url.clone(),
            description: DescriptionGenerator::with_saved(goal.description.clone()),
            sub_goals: SubGoalListEditor::from_drafts(
                goal.sub_goals.iter().map(SubGoalDraft::from_persisted).collect(),
            ),
            template_generation: TemplateGeneration::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn smart(&self) -> &SmartFields {
        &self.smart
    }

    pub fn field(&self, field: SmartField) -> &str {
        match field {
            SmartField::Title => &self.smart.title,
            SmartField::Specific => &self.smart.specific,
            SmartField::Measurable => &self.smart.measurable,
            SmartField::Attainable => &self.smart.attainable,
            SmartField::Relevant => &self.smart.relevant,
        }
    }

    /// Set a SMART field and restart the description debounce.
    pub fn set_field(&mut self, field: SmartField, value: String, now: Instant) {
        let slot = match field {
            SmartField::Title => &mut self.smart.title,
            SmartField::Specific => &mut self.smart.specific,
            SmartField::Measurable => &mut self.smart.measurable,
            SmartField::Attainable => &mut self.smart.attainable,
            SmartField::Relevant => &mut self.smart.relevant,
        };
        if *slot == value {
            return;
        }
        *slot = value;
        self.description.fields_changed(&self.smart, now);
    }

    pub fn existing_image_url(&self) -> Option<&str> {
        self.existing_image_url.as_deref()
    }

    pub fn source(&self) -> GoalSource {
        match (self.mode, self.template) {
            (FormMode::Create, Some(_)) => GoalSource::Template,
            _ => GoalSource::Manual,
        }
    }

    // -- Assistant --

    /// Fire the debounced description request if it is due.
    pub fn poll_description(&mut self, now: Instant) -> Option<crate::ai::DescriptionRequest> {
        self.description.poll(&self.smart, now)
    }

    pub fn request_description(
        &mut self,
    ) -> Result<crate::ai::DescriptionRequest, ValidationError> {
        self.description.request(&self.smart)
    }

    pub fn begin_task_generation(&mut self) -> Result<TasksRequest, ValidationError> {
        if self.smart.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let context = self.smart.context();
        self.sub_goals
            .begin_generation(&self.smart.title, &context, self.deadline)
    }

    pub fn apply_generated_tasks(&mut self, tasks: &[GeneratedTask], today: NaiveDate) {
        self.sub_goals.apply_generated(tasks, today);
    }

    pub fn begin_template_generation(&mut self) -> Result<TemplateRequest, ValidationError> {
        self.template_generation
            .begin(self.template, self.deadline, &self.short_description)
    }

    /// Replace description and sub-goals with a template draft. A blank
    /// title is filled from the draft when it carries one.
    pub fn apply_template_goal(&mut self, goal: TemplateGoal, today: NaiveDate) {
        self.template_generation.succeeded();
        if self.smart.title.trim().is_empty() {
            if let Some(title) = goal.title.filter(|t| !t.trim().is_empty()) {
                self.smart.title = title;
            }
        }
        self.description.replace(goal.description);
        self.sub_goals.replace_with_generated(&goal.tasks, today);
        info!(tasks = self.sub_goals.len(), "template goal applied");
    }

    pub fn template_generation_failed(&mut self) {
        self.template_generation.failed();
    }

    // -- Submission --

    /// Validate and normalize the draft. Nothing is sent from here; the
    /// caller hands the submission to the repository.
    pub fn submission(&self) -> Result<GoalSubmission, ValidationError> {
        if self.smart.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let award = self.award.trim();
        let award = match self.mode {
            _ if award.is_empty() => None,
            FormMode::Create => Some(format!("{AWARD_PREFIX}{award}")),
            FormMode::Edit { .. } => Some(award.to_string()),
        };
        let template = match self.mode {
            FormMode::Create => self.template,
            FormMode::Edit { .. } => None,
        };
        let short_description = template
            .map(|_| self.short_description.trim().to_string())
            .filter(|s| !s.is_empty());

        let submission = GoalSubmission {
            payload: GoalPayload {
                title: self.smart.title.trim().to_string(),
                urgency_level: self.urgency,
                specific: self.smart.specific.clone(),
                measurable: self.smart.measurable.clone(),
                attainable: self.smart.attainable.clone(),
                relevant: self.smart.relevant.clone(),
                description: self.description.text().to_string(),
                award,
                privacy: self.privacy,
                deadline: self.deadline,
                sub_goals: self.sub_goals.to_payload(),
                template,
                short_description,
            },
            image: self.image.clone(),
            existing_image_url: self.existing_image_url.clone(),
            source: self.source(),
        };
        match self.mode {
            FormMode::Create => submission.check_create()?,
            FormMode::Edit { .. } => submission.check_update()?,
        }
        debug!(
            sub_goals = submission.payload.sub_goals.len(),
            source = ?submission.source,
            "goal draft validated"
        );
        Ok(submission)
    }

    /// Back to an empty create draft after a successful create.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
