use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RunId, ThreadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn read back from a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: ThreadId,
    pub role: MessageRole,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Run lifecycle as reported by the assistant service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// A thread may hold at most one run in one of these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Queued | Self::InProgress | Self::RequiresAction | Self::Cancelling
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_wire_values() {
        let s: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(s, RunStatus::InProgress);
        let s: RunStatus = serde_json::from_str("\"requires_action\"").unwrap();
        assert!(s.is_active());
        let s: RunStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(s, RunStatus::Unknown);
        assert!(!s.is_active());
    }

    #[test]
    fn terminal_states_are_not_active() {
        for s in [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
            RunStatus::Incomplete,
        ] {
            assert!(!s.is_active(), "{s:?} should not be active");
        }
        assert!(RunStatus::Completed.is_completed());
        assert!(!RunStatus::Queued.is_completed());
    }

    #[test]
    fn message_role_uses_wire_names() {
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        let role: MessageRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, MessageRole::User);
    }
}
