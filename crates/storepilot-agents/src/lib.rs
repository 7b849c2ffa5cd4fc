pub mod assistants;
pub mod context;
pub mod dates;
pub mod dispatch;
pub mod executor;
pub mod extract;
pub mod journal;
pub mod poll;
pub mod runtime;
pub mod skills;
pub mod transport;

pub use assistants::AssistantsClient;
pub use dispatch::{ActionDispatcher, ActionHandler, ActionResult, handler_fn};
pub use executor::{ApiExecutor, ExecutionOutcome, HttpRequestSpec, RestExecutor};
pub use extract::{ActionRequest, extract_action};
pub use journal::Journal;
pub use poll::{PollOutcome, PollPolicy, poll_until};
pub use runtime::AssistantRuntime;
pub use transport::ConversationTransport;
