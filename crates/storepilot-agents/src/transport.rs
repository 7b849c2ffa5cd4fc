use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use storepilot_common::{MessageRole, Result, RunId, RunStatus, Run, ThreadId, ThreadMessage};

/// Substring the assistant service uses when a thread is busy.
pub const ACTIVE_RUN_MARKER: &str = "already has an active run";

/// Thread/run/message operations of the hosted assistant service.
///
/// Each method is a single call with no retry; recovery policy lives in
/// the runtime.
#[async_trait]
pub trait ConversationTransport: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId>;

    async fn post_message(&self, thread: &ThreadId, role: MessageRole, content: &str)
    -> Result<()>;

    /// Starts a run. A busy thread yields `Error::RunConflict`.
    async fn create_run(&self, thread: &ThreadId, assistant_id: &str) -> Result<RunId>;

    async fn get_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunStatus>;

    async fn list_runs(&self, thread: &ThreadId) -> Result<Vec<Run>>;

    /// Most recent message in the thread, if any has text.
    async fn latest_message(&self, thread: &ThreadId) -> Result<Option<ThreadMessage>>;
}

/// Pulls the id of the blocking run out of a conflict message such as
/// `Thread thread_abc already has an active run run_xyz.`
pub fn parse_active_run_id(message: &str) -> Option<RunId> {
    static RUN_ID: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\brun_[A-Za-z0-9]+").expect("run id regex should compile"));
    RUN_ID.find(message).map(|m| RunId::from(m.as_str()))
}

pub fn is_active_run_conflict(message: &str) -> bool {
    message.contains(ACTIVE_RUN_MARKER)
}
