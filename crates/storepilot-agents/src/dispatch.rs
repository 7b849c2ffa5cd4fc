use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::dates::normalize_dates;

/// Outcome of a dispatched action, fed back to the assistant as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub data: Value,
}

impl ActionResult {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: data.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::String(message.into()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Handles one action identifier. Receives parameters after date
/// normalization; reports problems as `success: false` results.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&Map<String, Value>) -> ActionResult + Send + Sync,
{
    async fn handle(&self, params: &Map<String, Value>) -> ActionResult {
        (self.0)(params)
    }
}

/// Wraps a synchronous closure as a handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn ActionHandler>
where
    F: Fn(&Map<String, Value>) -> ActionResult + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Routes `domain/verb` identifiers to registered handlers.
#[derive(Default, Clone)]
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(&mut self, action_id: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action_id = action_id.into();
        info!("registered action handler: {}", action_id);
        if self.handlers.insert(action_id.clone(), handler).is_some() {
            warn!("action handler {} replaced", action_id);
        }
    }

    pub fn has_handler(&self, action_id: &str) -> bool {
        self.handlers.contains_key(action_id)
    }

    pub fn action_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn dispatch(&self, action_id: &str, params: Map<String, Value>) -> ActionResult {
        let params = normalize_dates(params);
        match self.handlers.get(action_id) {
            Some(handler) => handler.handle(&params).await,
            None => {
                warn!("unknown action: {}", action_id);
                ActionResult::failure(format!("Unknown action: {action_id}"))
            }
        }
    }
}

/// Non-empty string parameter. Numbers are accepted and stringified.
pub fn param_str(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Positive integer parameter, from a number or a numeric string.
pub fn param_u64(params: &Map<String, Value>, key: &str) -> Option<u64> {
    let n = match params.get(key)? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

/// Names of `keys` that are missing or empty.
pub fn missing_params<'a>(params: &Map<String, Value>, keys: &[&'a str]) -> Vec<&'a str> {
    keys.iter()
        .copied()
        .filter(|k| param_str(params, k).is_none())
        .collect()
}
