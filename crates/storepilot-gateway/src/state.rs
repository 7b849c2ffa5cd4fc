use std::sync::Arc;

use chrono::{DateTime, Utc};
use storepilot_agents::{AssistantRuntime, Journal};
use storepilot_config::AppConfig;

/// Shared state handed to every request handler.
pub struct AppState {
    pub runtime: Arc<AssistantRuntime>,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(runtime: Arc<AssistantRuntime>) -> Self {
        Self {
            runtime,
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.runtime.config()
    }

    pub fn journal(&self) -> &Journal {
        self.runtime.journal()
    }
}
