use std::sync::Mutex;

use dashmap::DashMap;
use storepilot_common::{Error, Result, ThreadId, UserId};

use crate::store::{EventEntry, LogStore, ThreadStore, TraceEntry};

/// Process-local thread references, for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryThreadStore {
    threads: DashMap<UserId, ThreadId>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadStore for InMemoryThreadStore {
    fn get(&self, user: &UserId) -> Result<Option<ThreadId>> {
        Ok(self.threads.get(user).map(|t| t.value().clone()))
    }

    fn set(&self, user: &UserId, thread: &ThreadId) -> Result<()> {
        self.threads.insert(user.clone(), thread.clone());
        Ok(())
    }

    fn clear(&self, user: &UserId) -> Result<()> {
        self.threads.remove(user);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLogStore {
    events: Mutex<Vec<EventEntry>>,
    traces: Mutex<Vec<TraceEntry>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Database("log lock poisoned".to_string())
}

impl LogStore for InMemoryLogStore {
    fn append_event(&self, entry: &EventEntry) -> Result<()> {
        self.events.lock().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    fn append_trace(&self, entry: &TraceEntry) -> Result<()> {
        self.traces.lock().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<EventEntry>> {
        let events = self.events.lock().map_err(poisoned)?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    fn recent_traces(&self, limit: usize) -> Result<Vec<TraceEntry>> {
        let traces = self.traces.lock().map_err(poisoned)?;
        Ok(traces.iter().rev().take(limit).cloned().collect())
    }

    fn clear_events(&self) -> Result<()> {
        self.events.lock().map_err(poisoned)?.clear();
        Ok(())
    }

    fn clear_traces(&self) -> Result<()> {
        self.traces.lock().map_err(poisoned)?.clear();
        Ok(())
    }
}
