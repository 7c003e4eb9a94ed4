use thiserror::Error;

/// Local validation failures. These block an action before any network call
/// and leave the draft untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("goal title is required")]
    EmptyTitle,

    #[error("sub-goal description is required")]
    EmptySubGoalDescription,

    #[error("add at least one sub-goal")]
    NoSubGoals,

    #[error("upload a photo for the goal")]
    MissingGoalImage,

    #[error("select a photo to confirm completion")]
    MissingProofImage,

    #[error("every sub-goal must be completed first")]
    SubGoalsIncomplete,

    #[error("no sub-goal at index {0}")]
    InvalidIndex(usize),

    #[error("another edit is already in progress")]
    EditInProgress,

    #[error("{0} is already in progress")]
    AlreadyPending(&'static str),

    #[error("choose a template first")]
    NoTemplate,

    #[error("unknown urgency level: {0}")]
    UnknownUrgency(String),
}
