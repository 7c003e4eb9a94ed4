mod http;
#[cfg(any(test, feature = "test-helpers"))]
mod memory;
mod token;
mod traits;

pub use http::HttpService;
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::{Call, MemoryService};
pub use token::{FileTokenSource, StaticToken, TokenSource};
pub use traits::{AiAssistClient, GoalRepository, ServiceError};
