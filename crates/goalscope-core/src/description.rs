//! The goal description field: assistant text with an explicit edit mode,
//! plus the debounce that drives automatic generation.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::ai::DescriptionRequest;
use crate::error::ValidationError;

/// Quiet period after the last SMART field change before a description is
/// requested.
pub const AUTO_GENERATE_DELAY: Duration = Duration::from_millis(600);

/// The five fields that must all be filled before a description can be
/// generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmartFields {
    pub title: String,
    pub specific: String,
    pub measurable: String,
    pub attainable: String,
    pub relevant: String,
}

impl SmartFields {
    pub fn all_filled(&self) -> bool {
        [
            &self.title,
            &self.specific,
            &self.measurable,
            &self.attainable,
            &self.relevant,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Non-empty SMART answers, one per line.
    pub fn context(&self) -> String {
        [
            &self.specific,
            &self.measurable,
            &self.attainable,
            &self.relevant,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn description_request(&self) -> DescriptionRequest {
        DescriptionRequest {
            title: self.title.clone(),
            context: self.context(),
        }
    }
}

/// Trailing-edge debounce over an injected clock. Each `schedule` pushes the
/// deadline out; `poll` fires at most once per deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounce {
    delay: Duration,
    due: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionState {
    /// Read-only; the text is generated or empty.
    Generated,
    /// The user is typing. `snapshot` is what Cancel restores.
    Editing { snapshot: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionGenerator {
    text: String,
    state: DescriptionState,
    auto_generate: bool,
    debounce: Debounce,
    generating: bool,
}

impl Default for DescriptionGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DescriptionGenerator {
    pub fn new(auto_generate: bool) -> Self {
        Self {
            text: String::new(),
            state: DescriptionState::Generated,
            auto_generate,
            debounce: Debounce::new(AUTO_GENERATE_DELAY),
            generating: false,
        }
    }

    /// A saved description from a persisted goal; automatic generation is off.
    pub fn with_saved(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(false)
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &DescriptionState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, DescriptionState::Editing { .. })
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn auto_generate(&self) -> bool {
        self.auto_generate
    }

    pub fn set_auto_generate(&mut self, enabled: bool) {
        self.auto_generate = enabled;
        if !enabled {
            self.debounce.cancel();
        }
    }

    pub fn debounce(&self) -> &Debounce {
        &self.debounce
    }

    // -- Manual editing --

    pub fn begin_edit(&mut self) {
        if !self.is_editing() {
            self.state = DescriptionState::Editing {
                snapshot: self.text.clone(),
            };
        }
    }

    /// Editable text, only while editing.
    pub fn text_mut(&mut self) -> Option<&mut String> {
        if self.is_editing() {
            Some(&mut self.text)
        } else {
            None
        }
    }

    /// Keep the typed text as the new baseline.
    pub fn save(&mut self) {
        self.state = DescriptionState::Generated;
    }

    /// Discard typing and restore the text from before the edit.
    pub fn cancel(&mut self) {
        if let DescriptionState::Editing { snapshot } =
            std::mem::replace(&mut self.state, DescriptionState::Generated)
        {
            self.text = snapshot;
        }
    }

    // -- Generation --

    /// Record a change to any SMART field. Restarts the quiet period when
    /// all five are filled; otherwise drops any pending request.
    pub fn fields_changed(&mut self, fields: &SmartFields, now: Instant) {
        if self.auto_generate && fields.all_filled() {
            self.debounce.schedule(now);
        } else {
            self.debounce.cancel();
        }
    }

    /// Returns the request to send once the quiet period has elapsed.
    pub fn poll(&mut self, fields: &SmartFields, now: Instant) -> Option<DescriptionRequest> {
        if !self.debounce.poll(now) {
            return None;
        }
        if !self.auto_generate || !fields.all_filled() {
            return None;
        }
        debug!("description auto-generation due");
        self.generating = true;
        Some(fields.description_request())
    }

    /// Explicit user-triggered generation.
    pub fn request(&mut self, fields: &SmartFields) -> Result<DescriptionRequest, ValidationError> {
        if fields.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.generating {
            return Err(ValidationError::AlreadyPending("description generation"));
        }
        self.debounce.cancel();
        self.generating = true;
        Ok(fields.description_request())
    }

    /// Apply generated text. While the user is editing, only the Cancel
    /// baseline moves; the text being typed is left alone.
    pub fn apply_generated(&mut self, text: String) {
        self.generating = false;
        match &mut self.state {
            DescriptionState::Editing { snapshot } => *snapshot = text,
            DescriptionState::Generated => self.text = text,
        }
    }

    pub fn generation_failed(&mut self) {
        self.generating = false;
    }

    /// Replace the text outright, as a template generation does.
    pub fn replace(&mut self, text: String) {
        self.text = text;
        self.state = DescriptionState::Generated;
    }
}
