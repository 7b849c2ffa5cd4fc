use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storepilot_common::{Result, ThreadId, UserId};

/// Per-user thread reference. The only state shared across tasks.
pub trait ThreadStore: Send + Sync {
    fn get(&self, user: &UserId) -> Result<Option<ThreadId>>;
    fn set(&self, user: &UserId, thread: &ThreadId) -> Result<()>;
    fn clear(&self, user: &UserId) -> Result<()>;
}

/// Append-only audit and debug logs. Readers get newest entries first.
pub trait LogStore: Send + Sync {
    fn append_event(&self, entry: &EventEntry) -> Result<()>;
    fn append_trace(&self, entry: &TraceEntry) -> Result<()>;
    fn recent_events(&self, limit: usize) -> Result<Vec<EventEntry>>;
    fn recent_traces(&self, limit: usize) -> Result<Vec<TraceEntry>>;
    fn clear_events(&self) -> Result<()>;
    fn clear_traces(&self) -> Result<()>;
}

/// Audit log row: either a plain event or a prompt/reply pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub time: DateTime<Utc>,
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl EventEntry {
    pub fn event(user_id: Option<UserId>, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            user_id,
            event: Some(message.into()),
            prompt: None,
            reply: None,
        }
    }

    pub fn conversation(
        user_id: UserId,
        prompt: impl Into<String>,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            time: Utc::now(),
            user_id: Some(user_id),
            event: None,
            prompt: Some(prompt.into()),
            reply: Some(reply.into()),
        }
    }

    pub fn is_conversation(&self) -> bool {
        self.prompt.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceDirection {
    Sent,
    Received,
    Executed,
    Warning,
}

impl TraceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
            Self::Executed => "executed",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "received" => Ok(Self::Received),
            "executed" => Ok(Self::Executed),
            "warning" => Ok(Self::Warning),
            other => Err(format!("unknown trace direction: {other}")),
        }
    }
}

/// Raw payload captured while debug mode is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub time: DateTime<Utc>,
    pub direction: TraceDirection,
    pub content: String,
}

impl TraceEntry {
    pub fn new(direction: TraceDirection, content: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            direction,
            content: content.into(),
        }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
