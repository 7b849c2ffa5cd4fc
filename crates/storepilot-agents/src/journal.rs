use std::sync::Arc;

use storepilot_common::{Result, UserId};
use storepilot_db::{EventEntry, InMemoryLogStore, LogStore, TraceDirection, TraceEntry};
use storepilot_security::redact_secrets;
use tracing::{debug, info, warn};

/// Audit and debug logging. Appends never fail the caller; read failures
/// degrade to an empty log.
pub struct Journal {
    store: Arc<dyn LogStore>,
    debug: bool,
}

impl Journal {
    pub fn new(store: Arc<dyn LogStore>, debug: bool) -> Self {
        Self { store, debug }
    }

    pub fn in_memory(debug: bool) -> Self {
        Self::new(Arc::new(InMemoryLogStore::new()), debug)
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn record_event(&self, user: Option<&UserId>, message: &str) {
        info!(user = user.map(UserId::as_str), "{message}");
        if let Err(e) = self
            .store
            .append_event(&EventEntry::event(user.cloned(), message))
        {
            warn!("failed to record event: {e}");
        }
    }

    /// Raw payload capture. No-op unless debug mode is on.
    pub fn record_trace(&self, direction: TraceDirection, content: &str) {
        if !self.debug {
            return;
        }
        let content = redact_secrets(content);
        debug!(direction = direction.as_str(), "{content}");
        if let Err(e) = self
            .store
            .append_trace(&TraceEntry::new(direction, content))
        {
            warn!("failed to record trace: {e}");
        }
    }

    pub fn record_conversation(&self, user: &UserId, prompt: &str, reply: &str) {
        if let Err(e) = self
            .store
            .append_event(&EventEntry::conversation(user.clone(), prompt, reply))
        {
            warn!("failed to record conversation: {e}");
        }
    }

    pub fn events(&self, limit: usize) -> Vec<EventEntry> {
        self.store.recent_events(limit).unwrap_or_else(|e| {
            warn!("event log unreadable, treating as empty: {e}");
            Vec::new()
        })
    }

    pub fn traces(&self, limit: usize) -> Vec<TraceEntry> {
        self.store.recent_traces(limit).unwrap_or_else(|e| {
            warn!("debug log unreadable, treating as empty: {e}");
            Vec::new()
        })
    }

    pub fn clear_events(&self) -> Result<()> {
        self.store.clear_events()
    }

    pub fn clear_traces(&self) -> Result<()> {
        self.store.clear_traces()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storepilot_common::Error;

    struct BrokenStore;

    impl LogStore for BrokenStore {
        fn append_event(&self, _: &EventEntry) -> Result<()> {
            Err(Error::Database("disk full".into()))
        }
        fn append_trace(&self, _: &TraceEntry) -> Result<()> {
            Err(Error::Database("disk full".into()))
        }
        fn recent_events(&self, _: usize) -> Result<Vec<EventEntry>> {
            Err(Error::Database("corrupt".into()))
        }
        fn recent_traces(&self, _: usize) -> Result<Vec<TraceEntry>> {
            Err(Error::Database("corrupt".into()))
        }
        fn clear_events(&self) -> Result<()> {
            Ok(())
        }
        fn clear_traces(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn traces_are_gated_on_debug() {
        let quiet = Journal::in_memory(false);
        quiet.record_trace(TraceDirection::Sent, "hidden");
        assert!(quiet.traces(10).is_empty());

        let loud = Journal::in_memory(true);
        loud.record_trace(TraceDirection::Sent, "shown");
        assert_eq!(loud.traces(10)[0].content, "shown");
    }

    #[test]
    fn traces_are_redacted() {
        let journal = Journal::in_memory(true);
        journal.record_trace(
            TraceDirection::Executed,
            "Authorization: Basic Y2tfYTpjc19iY2Rl",
        );
        assert_eq!(journal.traces(1)[0].content, "Authorization: [REDACTED]");
    }

    #[test]
    fn events_and_conversations_share_the_audit_log() {
        let journal = Journal::in_memory(false);
        let user = UserId::from("3");
        journal.record_event(Some(&user), "New thread created");
        journal.record_conversation(&user, "list orders", "You have 2 orders.");

        let events = journal.events(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].prompt.as_deref(), Some("list orders"));
        assert_eq!(events[1].event.as_deref(), Some("New thread created"));
    }

    #[test]
    fn broken_store_never_fails_the_caller() {
        let journal = Journal::new(Arc::new(BrokenStore), true);
        journal.record_event(None, "ignored");
        journal.record_trace(TraceDirection::Warning, "ignored");
        journal.record_conversation(&UserId::from("1"), "p", "r");
        assert!(journal.events(5).is_empty());
        assert!(journal.traces(5).is_empty());
    }
}
