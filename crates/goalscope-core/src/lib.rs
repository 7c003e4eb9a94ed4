pub mod ai;
pub mod chat;
pub mod completion;
pub mod date_mask;
pub mod description;
pub mod error;
pub mod form;
pub mod goal;
pub mod image;
pub mod status;
pub mod subgoals;
pub mod template;

pub use completion::CompletionFlow;
pub use error::ValidationError;
pub use form::GoalForm;
pub use goal::{DeadlineBucket, Goal, GoalSource, Privacy, SubGoal, UrgencyLevel};
pub use image::ImageFile;
pub use status::GoalStatus;
pub use subgoals::{Provenance, SubGoalListEditor};
pub use template::GoalTemplate;
