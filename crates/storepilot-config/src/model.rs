use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storepilot_common::{Error, Result};

pub const DEFAULT_ASSISTANT_BASE_URL: &str = "https://api.openai.com/v1";

/// Shown to the user when a task is submitted without credentials.
pub const MISSING_CREDENTIALS_NOTICE: &str = "Please set your API Key and Assistant ID in Settings.";

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assistant: AssistantConfig,
    pub store: StoreConfig,
    /// Enables the raw request/response trace log.
    pub debug: bool,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: DEFAULT_ASSISTANT_BASE_URL.to_string(),
        }
    }
}

/// WooCommerce REST credentials. `base_url` is the `wp-json` root.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub run_poll_attempts: u32,
    pub run_poll_interval_ms: u64,
    pub followup_attempts: u32,
    pub followup_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            run_poll_attempts: 10,
            run_poll_interval_ms: 1000,
            followup_attempts: 5,
            followup_interval_ms: 1000,
        }
    }
}

impl PollingConfig {
    pub fn run_poll_interval(&self) -> Duration {
        Duration::from_millis(self.run_poll_interval_ms)
    }

    pub fn followup_interval(&self) -> Duration {
        Duration::from_millis(self.followup_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file for threads and logs. Falls back to `~/.storepilot/storepilot.db`.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3900,
        }
    }
}

impl AppConfig {
    /// Checks that an assistant task may be submitted at all.
    pub fn ensure_task_ready(&self) -> Result<()> {
        if is_blank(&self.assistant.api_key) || is_blank(&self.assistant.assistant_id) {
            return Err(Error::Config(MISSING_CREDENTIALS_NOTICE.to_string()));
        }
        Ok(())
    }

    /// Checks that store requests can be authenticated and resolved.
    pub fn ensure_store_ready(&self) -> Result<()> {
        let mut missing = Vec::new();
        if is_blank(&self.store.base_url) {
            missing.push("store.base_url");
        }
        if is_blank(&self.store.consumer_key) {
            missing.push("store.consumer_key");
        }
        if is_blank(&self.store.consumer_secret) {
            missing.push("store.consumer_secret");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!("missing {}", missing.join(", "))))
        }
    }

    /// Presence report for status endpoints. Never includes secret values.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("assistant.api_key", !is_blank(&self.assistant.api_key)),
            ("assistant.assistant_id", !is_blank(&self.assistant.assistant_id)),
            ("store.base_url", !is_blank(&self.store.base_url)),
            ("store.consumer_key", !is_blank(&self.store.consumer_key)),
            ("store.consumer_secret", !is_blank(&self.store.consumer_secret)),
        ]
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(base) = self.store.base_url.as_deref().filter(|s| !s.trim().is_empty()) {
            url::Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid store.base_url '{base}': {e}")))?;
        }
        url::Url::parse(&self.assistant.base_url).map_err(|e| {
            Error::Config(format!(
                "invalid assistant.base_url '{}': {e}",
                self.assistant.base_url
            ))
        })?;
        if self.polling.run_poll_attempts == 0 {
            return Err(Error::Config(
                "polling.run_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn redacted(value: &Option<String>) -> &'static str {
    if is_blank(value) { "<unset>" } else { "<redacted>" }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("assistant", &self.assistant)
            .field("store", &self.store)
            .field("debug", &self.debug)
            .field("polling", &self.polling)
            .field("storage", &self.storage)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &redacted(&self.consumer_key))
            .field("consumer_secret", &redacted(&self.consumer_secret))
            .finish()
    }
}
