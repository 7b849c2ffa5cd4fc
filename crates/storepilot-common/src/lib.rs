pub mod conversation;
pub mod error;
pub mod types;

pub use conversation::{MessageRole, Run, RunStatus, ThreadMessage};
pub use error::{Error, Result};
pub use types::{RunId, ThreadId, UserId};
