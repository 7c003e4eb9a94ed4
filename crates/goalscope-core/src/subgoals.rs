use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::ai::{GeneratedTask, TasksRequest};
use crate::date_mask::MaskedDateInput;
use crate::error::ValidationError;
use crate::goal::{DeadlineBucket, SubGoal, SubGoalPayload};

/// Characters of a sub-goal description shown in the form list.
pub const LIST_DISPLAY_CHARS: usize = 25;

/// Who wrote a sub-goal. Regeneration only ever replaces assistant entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    User,
    Assistant,
}

/// A sub-goal inside a form draft. `id` is set for rows loaded from a
/// persisted goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGoalDraft {
    pub id: Option<i64>,
    pub description: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub provenance: Provenance,
}

impl SubGoalDraft {
    pub fn new(description: impl Into<String>, deadline: NaiveDate) -> Self {
        Self {
            id: None,
            description: description.into(),
            deadline,
            is_completed: false,
            provenance: Provenance::User,
        }
    }

    pub fn generated(task: &GeneratedTask, today: NaiveDate) -> Self {
        Self {
            id: None,
            description: task.description().to_string(),
            deadline: task.deadline_date().unwrap_or(today),
            is_completed: false,
            provenance: Provenance::Assistant,
        }
    }

    pub fn from_persisted(sub_goal: &SubGoal) -> Self {
        Self {
            id: Some(sub_goal.id),
            description: sub_goal.description.clone(),
            deadline: sub_goal.deadline.date_naive(),
            is_completed: sub_goal.is_completed,
            provenance: Provenance::User,
        }
    }

    pub fn is_ai_generated(&self) -> bool {
        self.provenance == Provenance::Assistant
    }

    /// Description cut for the list row. The stored text is untouched.
    pub fn display_description(&self) -> String {
        truncate_for_list(&self.description)
    }

    pub fn to_payload(&self) -> SubGoalPayload {
        SubGoalPayload {
            description: self.description.clone(),
            deadline: self.deadline,
        }
    }
}

pub fn truncate_for_list(text: &str) -> String {
    if text.chars().count() > LIST_DISPLAY_CHARS {
        let head: String = text.chars().take(LIST_DISPLAY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Partial update for [`SubGoalListEditor::edit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubGoalEdit {
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
}

/// The single edit session a list can have open at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditSession {
    #[default]
    Inactive,
    /// Editing the row text in place; the buffer replaces the description
    /// on commit.
    Inline { index: usize, buffer: String },
    /// Editing a working copy in a popup; the copy replaces the row on
    /// confirm and is dropped on close.
    Popup {
        index: usize,
        draft: SubGoalDraft,
        date: MaskedDateInput,
    },
}

impl EditSession {
    pub fn index(&self) -> Option<usize> {
        match self {
            EditSession::Inactive => None,
            EditSession::Inline { index, .. } | EditSession::Popup { index, .. } => Some(*index),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, EditSession::Inactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Committed,
    Cancelled,
}

/// Temporary input buffer behind the "add sub-goal" popup.
#[derive(Debug, Clone, PartialEq)]
pub struct AddPopup {
    pub description: String,
    pub date: MaskedDateInput,
}

/// Owns the ordered sub-goal list of one goal draft and mediates every
/// mutation to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubGoalListEditor {
    items: Vec<SubGoalDraft>,
    session: EditSession,
    add_popup: Option<AddPopup>,
    has_generated: bool,
    generating: bool,
}

impl SubGoalListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_drafts(items: Vec<SubGoalDraft>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[SubGoalDraft] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SubGoalDraft> {
        self.items.get(index)
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn add_popup(&self) -> Option<&AddPopup> {
        self.add_popup.as_ref()
    }

    pub fn add_popup_mut(&mut self) -> Option<&mut AddPopup> {
        self.add_popup.as_mut()
    }

    pub fn has_generated(&self) -> bool {
        self.has_generated
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn generate_label(&self) -> &'static str {
        if self.generating {
            "Generating..."
        } else if self.has_generated {
            "Regenerate tasks"
        } else {
            "Generate tasks"
        }
    }

    pub fn to_payload(&self) -> Vec<SubGoalPayload> {
        self.items.iter().map(SubGoalDraft::to_payload).collect()
    }

    // -- Add --

    pub fn open_add(&mut self, now: NaiveDateTime) {
        self.add_popup = Some(AddPopup {
            description: String::new(),
            date: MaskedDateInput::new(now),
        });
    }

    pub fn close_add(&mut self) {
        self.add_popup = None;
    }

    /// Append a user-authored sub-goal. Closes the add popup on success.
    pub fn add(&mut self, description: &str, deadline: NaiveDate) -> Result<(), ValidationError> {
        if description.trim().is_empty() {
            return Err(ValidationError::EmptySubGoalDescription);
        }
        self.items.push(SubGoalDraft::new(description, deadline));
        self.add_popup = None;
        debug!(count = self.items.len(), "sub-goal added");
        Ok(())
    }

    /// Add from the popup buffer. On failure the popup stays open as typed.
    pub fn submit_add(&mut self) -> Result<(), ValidationError> {
        let Some(popup) = self.add_popup.as_ref() else {
            return Ok(());
        };
        let description = popup.description.clone();
        let deadline = popup.date.committed().date();
        self.add(&description, deadline)
    }

    // -- Direct edit / remove --

    pub fn edit(&mut self, index: usize, edit: SubGoalEdit) -> Result<(), ValidationError> {
        if let Some(ref description) = edit.description {
            if description.trim().is_empty() {
                return Err(ValidationError::EmptySubGoalDescription);
            }
        }
        let item = self
            .items
            .get_mut(index)
            .ok_or(ValidationError::InvalidIndex(index))?;
        if let Some(description) = edit.description {
            item.description = description;
        }
        if let Some(deadline) = edit.deadline {
            item.deadline = deadline;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<SubGoalDraft, ValidationError> {
        if index >= self.items.len() {
            return Err(ValidationError::InvalidIndex(index));
        }
        let removed = self.items.remove(index);
        self.shift_session_after_removal(&[index]);
        debug!(index, count = self.items.len(), "sub-goal removed");
        Ok(removed)
    }

    // -- Edit sessions --

    pub fn begin_inline(&mut self, index: usize) -> Result<(), ValidationError> {
        self.ensure_no_session()?;
        let item = self
            .items
            .get(index)
            .ok_or(ValidationError::InvalidIndex(index))?;
        self.session = EditSession::Inline {
            index,
            buffer: item.description.clone(),
        };
        Ok(())
    }

    pub fn begin_popup(&mut self, index: usize) -> Result<(), ValidationError> {
        self.ensure_no_session()?;
        let item = self
            .items
            .get(index)
            .ok_or(ValidationError::InvalidIndex(index))?;
        let date = MaskedDateInput::new(item.deadline.and_time(NaiveTime::MIN));
        self.session = EditSession::Popup {
            index,
            draft: item.clone(),
            date,
        };
        Ok(())
    }

    /// Mutable access to the text being edited, whichever mode is active.
    pub fn session_text_mut(&mut self) -> Option<&mut String> {
        match &mut self.session {
            EditSession::Inactive => None,
            EditSession::Inline { buffer, .. } => Some(buffer),
            EditSession::Popup { draft, .. } => Some(&mut draft.description),
        }
    }

    /// Mutable access to the popup's masked date field.
    pub fn session_date_mut(&mut self) -> Option<&mut MaskedDateInput> {
        match &mut self.session {
            EditSession::Popup { date, .. } => Some(date),
            _ => None,
        }
    }

    /// Save the open session. Blank text cancels instead of saving.
    pub fn commit_session(&mut self) -> EditOutcome {
        let session = std::mem::take(&mut self.session);
        let (index, description, deadline) = match session {
            EditSession::Inactive => return EditOutcome::Cancelled,
            EditSession::Inline { index, buffer } => (index, buffer, None),
            EditSession::Popup { index, draft, date } => {
                (index, draft.description, Some(date.committed().date()))
            }
        };
        if description.trim().is_empty() {
            return EditOutcome::Cancelled;
        }
        match self.edit(
            index,
            SubGoalEdit {
                description: Some(description),
                deadline,
            },
        ) {
            Ok(()) => EditOutcome::Committed,
            Err(_) => EditOutcome::Cancelled,
        }
    }

    pub fn cancel_session(&mut self) {
        self.session = EditSession::Inactive;
    }

    fn ensure_no_session(&self) -> Result<(), ValidationError> {
        if self.session.is_active() {
            Err(ValidationError::EditInProgress)
        } else {
            Ok(())
        }
    }

    /// Keep the open session pointed at the same row after rows at
    /// `removed` (ascending, pre-removal indices) were deleted.
    fn shift_session_after_removal(&mut self, removed: &[usize]) {
        let Some(index) = self.session.index() else {
            return;
        };
        if removed.contains(&index) {
            self.cancel_session();
            return;
        }
        let shift = removed.iter().filter(|&&r| r < index).count();
        match &mut self.session {
            EditSession::Inline { index, .. } | EditSession::Popup { index, .. } => {
                *index -= shift;
            }
            EditSession::Inactive => {}
        }
    }

    // -- Assistant generation --

    /// Mark a generation request as outstanding and build it.
    pub fn begin_generation(
        &mut self,
        title: &str,
        context: &str,
        bucket: DeadlineBucket,
    ) -> Result<TasksRequest, ValidationError> {
        if self.generating {
            return Err(ValidationError::AlreadyPending("task generation"));
        }
        self.generating = true;
        Ok(TasksRequest {
            title: title.to_string(),
            context: context.to_string(),
            max_items: bucket.max_items(),
            deadline: bucket.hint().to_string(),
        })
    }

    /// Apply a successful generation. A repeat generation first drops the
    /// previous assistant rows; user rows keep their relative order and the
    /// new batch goes after them.
    pub fn apply_generated(&mut self, tasks: &[GeneratedTask], today: NaiveDate) {
        self.generating = false;
        if self.has_generated {
            self.strip_generated();
        }
        self.items
            .extend(tasks.iter().map(|t| SubGoalDraft::generated(t, today)));
        self.has_generated = true;
        debug!(added = tasks.len(), count = self.items.len(), "generated sub-goals applied");
    }

    /// A failed generation leaves the list as it was.
    pub fn generation_failed(&mut self) {
        self.generating = false;
    }

    /// Replace the whole list, used when a template generation succeeds.
    pub fn replace_with_generated(&mut self, tasks: &[GeneratedTask], today: NaiveDate) {
        self.cancel_session();
        self.items = tasks
            .iter()
            .map(|t| SubGoalDraft::generated(t, today))
            .collect();
        self.has_generated = true;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn strip_generated(&mut self) {
        let removed: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_ai_generated())
            .map(|(i, _)| i)
            .collect();
        self.items.retain(|item| !item.is_ai_generated());
        self.shift_session_after_removal(&removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        day(2025, 1, 1).and_hms_opt(9, 0, 0).unwrap()
    }

    fn editor_with(descriptions: &[&str]) -> SubGoalListEditor {
        let mut editor = SubGoalListEditor::new();
        for d in descriptions {
            editor.add(d, day(2025, 2, 1)).unwrap();
        }
        editor
    }

    fn text(t: &str) -> GeneratedTask {
        GeneratedTask::Text(t.into())
    }

    fn descriptions(editor: &SubGoalListEditor) -> Vec<&str> {
        editor.items().iter().map(|i| i.description.as_str()).collect()
    }

    #[test]
    fn new_editor_has_no_session() {
        let mut fresh = SubGoalListEditor::new();
        assert_eq!(fresh.session(), &EditSession::default());
        assert_eq!(fresh.session(), &EditSession::Inactive);
        assert!(fresh.session_text_mut().is_none());

        let mut editor = editor_with(&["a"]);
        editor.begin_inline(0).unwrap();
        assert!(editor.session().is_active());
        editor.cancel_session();
        assert_eq!(editor.session(), &EditSession::Inactive);
    }

    #[test]
    fn add_appends_user_row_and_closes_popup() {
        let mut editor = SubGoalListEditor::new();
        editor.open_add(now());
        editor.add_popup_mut().unwrap().description = "Finish chapter 1".into();
        editor.submit_add().unwrap();

        assert!(editor.add_popup().is_none());
        assert_eq!(editor.len(), 1);
        let item = editor.get(0).unwrap();
        assert_eq!(item.description, "Finish chapter 1");
        assert_eq!(item.deadline, day(2025, 1, 1));
        assert_eq!(item.provenance, Provenance::User);
    }

    #[test]
    fn add_rejects_blank_and_keeps_popup() {
        let mut editor = SubGoalListEditor::new();
        editor.open_add(now());
        editor.add_popup_mut().unwrap().description = "   ".into();
        assert_eq!(
            editor.submit_add(),
            Err(ValidationError::EmptySubGoalDescription)
        );
        assert!(editor.add_popup().is_some());
        assert!(editor.is_empty());
    }

    #[test]
    fn add_uses_masked_deadline() {
        let mut editor = SubGoalListEditor::new();
        editor.open_add(now());
        let popup = editor.add_popup_mut().unwrap();
        popup.description = "Book flights".into();
        popup.date.set_text("15:03:2025 14:30");
        editor.submit_add().unwrap();
        assert_eq!(editor.get(0).unwrap().deadline, day(2025, 3, 15));
    }

    #[test]
    fn edit_updates_in_place() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor
            .edit(
                1,
                SubGoalEdit {
                    description: Some("B".into()),
                    deadline: Some(day(2026, 1, 1)),
                },
            )
            .unwrap();
        assert_eq!(descriptions(&editor), vec!["a", "B", "c"]);
        assert_eq!(editor.get(1).unwrap().deadline, day(2026, 1, 1));
        assert_eq!(
            editor.edit(5, SubGoalEdit::default()),
            Err(ValidationError::InvalidIndex(5))
        );
    }

    #[test]
    fn remove_shifts_following_rows() {
        let mut editor = editor_with(&["a", "b", "c"]);
        let removed = editor.remove(0).unwrap();
        assert_eq!(removed.description, "a");
        assert_eq!(descriptions(&editor), vec!["b", "c"]);
        assert!(editor.remove(2).is_err());
    }

    #[test]
    fn add_edit_remove_sequence_counts() {
        let mut editor = SubGoalListEditor::new();
        let mut adds = 0;
        let mut removes = 0;
        for i in 0..10 {
            editor.add(&format!("task {i}"), day(2025, 1, 1)).unwrap();
            adds += 1;
            if i % 3 == 0 {
                editor.remove(0).unwrap();
                removes += 1;
            }
            if let Some(last) = editor.len().checked_sub(1) {
                editor
                    .edit(
                        last,
                        SubGoalEdit {
                            description: Some(format!("edited {i}")),
                            deadline: None,
                        },
                    )
                    .unwrap();
            }
        }
        assert_eq!(editor.len(), adds - removes);
        assert_eq!(editor.items().last().unwrap().description, "edited 9");
    }

    #[test]
    fn truncation_is_presentational() {
        let long = "abcdefghijklmnopqrstuvwxyz0123";
        let editor = editor_with(&[long]);
        let item = editor.get(0).unwrap();
        assert_eq!(item.display_description(), "abcdefghijklmnopqrstuvwxy...");
        assert_eq!(item.description, long);
        assert_eq!(truncate_for_list("short"), "short");
        assert_eq!(truncate_for_list("ёёёёёёёёёёёёёёёёёёёёёёёёё"), "ёёёёёёёёёёёёёёёёёёёёёёёёё");
    }

    #[test]
    fn inline_commit_and_cancel() {
        let mut editor = editor_with(&["a", "b"]);
        editor.begin_inline(1).unwrap();
        *editor.session_text_mut().unwrap() = "changed".into();
        assert_eq!(descriptions(&editor), vec!["a", "b"]);
        assert_eq!(editor.commit_session(), EditOutcome::Committed);
        assert_eq!(descriptions(&editor), vec!["a", "changed"]);
        assert!(!editor.session().is_active());

        editor.begin_inline(0).unwrap();
        *editor.session_text_mut().unwrap() = "discarded".into();
        editor.cancel_session();
        assert_eq!(descriptions(&editor), vec!["a", "changed"]);
    }

    #[test]
    fn blank_save_cancels() {
        let mut editor = editor_with(&["keep me"]);
        editor.begin_inline(0).unwrap();
        editor.session_text_mut().unwrap().clear();
        assert_eq!(editor.commit_session(), EditOutcome::Cancelled);
        assert_eq!(descriptions(&editor), vec!["keep me"]);
        assert_eq!(editor.session(), &EditSession::Inactive);
    }

    #[test]
    fn popup_works_on_a_copy() {
        let mut editor = editor_with(&["a"]);
        editor.begin_popup(0).unwrap();
        *editor.session_text_mut().unwrap() = "new text".into();
        editor
            .session_date_mut()
            .unwrap()
            .set_text("01:06:2025 00:00");
        assert_eq!(descriptions(&editor), vec!["a"]);
        assert_eq!(editor.get(0).unwrap().deadline, day(2025, 2, 1));

        editor.cancel_session();
        assert_eq!(descriptions(&editor), vec!["a"]);

        editor.begin_popup(0).unwrap();
        *editor.session_text_mut().unwrap() = "new text".into();
        editor
            .session_date_mut()
            .unwrap()
            .set_text("01:06:2025 00:00");
        assert_eq!(editor.commit_session(), EditOutcome::Committed);
        assert_eq!(descriptions(&editor), vec!["new text"]);
        assert_eq!(editor.get(0).unwrap().deadline, day(2025, 6, 1));
    }

    #[test]
    fn popup_invalid_mask_keeps_deadline() {
        let mut editor = editor_with(&["a"]);
        editor.begin_popup(0).unwrap();
        editor
            .session_date_mut()
            .unwrap()
            .set_text("32:01:2025 10:00");
        assert_eq!(editor.commit_session(), EditOutcome::Committed);
        assert_eq!(editor.get(0).unwrap().deadline, day(2025, 2, 1));
    }

    #[test]
    fn one_session_at_a_time() {
        let mut editor = editor_with(&["a", "b"]);
        editor.begin_inline(0).unwrap();
        assert_eq!(editor.begin_popup(1), Err(ValidationError::EditInProgress));
        assert_eq!(editor.begin_inline(7), Err(ValidationError::EditInProgress));
        editor.cancel_session();
        assert_eq!(editor.begin_inline(7), Err(ValidationError::InvalidIndex(7)));
    }

    #[test]
    fn removing_other_rows_keeps_session_target() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor.begin_inline(2).unwrap();
        editor.remove(0).unwrap();
        assert_eq!(editor.session().index(), Some(1));
        *editor.session_text_mut().unwrap() = "C".into();
        editor.commit_session();
        assert_eq!(descriptions(&editor), vec!["b", "C"]);

        editor.begin_inline(0).unwrap();
        editor.remove(0).unwrap();
        assert!(!editor.session().is_active());
    }

    #[test]
    fn generation_request_sized_by_bucket() {
        let mut editor = SubGoalListEditor::new();
        let req = editor
            .begin_generation("Learn X", "context", DeadlineBucket::OneYear)
            .unwrap();
        assert_eq!(req.max_items, 12);
        assert_eq!(req.deadline, "1 год");
        assert!(editor.is_generating());
        assert_eq!(editor.generate_label(), "Generating...");
        assert_eq!(
            editor.begin_generation("Learn X", "context", DeadlineBucket::OneYear),
            Err(ValidationError::AlreadyPending("task generation"))
        );
    }

    #[test]
    fn regeneration_replaces_only_assistant_rows() {
        let today = day(2025, 1, 1);
        let mut editor = editor_with(&["mine 1"]);

        editor
            .begin_generation("t", "c", DeadlineBucket::ThreeMonths)
            .unwrap();
        editor.apply_generated(&[text("ai 1"), text("ai 2")], today);
        editor.add("mine 2", today).unwrap();
        assert_eq!(descriptions(&editor), vec!["mine 1", "ai 1", "ai 2", "mine 2"]);
        assert_eq!(editor.generate_label(), "Regenerate tasks");

        editor
            .begin_generation("t", "c", DeadlineBucket::ThreeMonths)
            .unwrap();
        editor.apply_generated(&[text("ai 3")], today);
        assert_eq!(descriptions(&editor), vec!["mine 1", "mine 2", "ai 3"]);
        assert!(editor.items()[2].is_ai_generated());
        assert!(!editor.items()[0].is_ai_generated());
    }

    #[test]
    fn first_generation_keeps_everything() {
        let today = day(2025, 1, 1);
        let mut editor = editor_with(&["mine"]);
        editor.apply_generated(&[text("ai")], today);
        assert_eq!(descriptions(&editor), vec!["mine", "ai"]);
        assert_eq!(editor.items()[1].deadline, today);
    }

    #[test]
    fn failed_generation_leaves_list() {
        let today = day(2025, 1, 1);
        let mut editor = editor_with(&["mine"]);
        editor.apply_generated(&[text("ai")], today);
        editor
            .begin_generation("t", "c", DeadlineBucket::ThreeMonths)
            .unwrap();
        editor.generation_failed();
        assert_eq!(descriptions(&editor), vec!["mine", "ai"]);
        assert!(!editor.is_generating());
    }

    #[test]
    fn regeneration_moves_session_with_its_row() {
        let today = day(2025, 1, 1);
        let mut editor = SubGoalListEditor::new();
        editor.apply_generated(&[text("ai 1")], today);
        editor.add("mine", today).unwrap();
        editor.begin_inline(1).unwrap();
        editor.apply_generated(&[text("ai 2")], today);
        assert_eq!(editor.session().index(), Some(0));
    }

    #[test]
    fn payload_strips_provenance_and_ids() {
        let mut editor = SubGoalListEditor::from_drafts(vec![SubGoalDraft {
            id: Some(3),
            description: "persisted".into(),
            deadline: day(2025, 5, 5),
            is_completed: true,
            provenance: Provenance::User,
        }]);
        editor.apply_generated(&[text("ai")], day(2025, 1, 1));
        let payload = editor.to_payload();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload[0].description, "persisted");
        assert_eq!(payload[0].deadline, day(2025, 5, 5));
    }
}
