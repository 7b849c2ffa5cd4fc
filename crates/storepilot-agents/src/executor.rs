use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storepilot_common::{Error, Result};
use storepilot_config::StoreConfig;
use storepilot_db::TraceDirection;
use storepilot_security::basic_auth_header;
use tracing::warn;

use crate::journal::Journal;

/// Placeholder the assistant is told to prefix store URLs with.
pub const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// A raw HTTP call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestSpec {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl HttpRequestSpec {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and decoded body. `status == 0` means the call never completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: u16,
    pub body: Value,
}

impl ExecutionOutcome {
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes store API calls. Never fails: problems come back as outcomes.
#[async_trait]
pub trait ApiExecutor: Send + Sync {
    async fn execute(&self, request: &HttpRequestSpec) -> ExecutionOutcome;
}

pub struct RestExecutor {
    client: Client,
    base_url: Option<String>,
    auth_header: String,
    journal: Arc<Journal>,
}

impl RestExecutor {
    pub fn new(
        base_url: Option<String>,
        consumer_key: &str,
        consumer_secret: &str,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            auth_header: basic_auth_header(consumer_key, consumer_secret),
            journal,
        }
    }

    pub fn from_config(config: &StoreConfig, journal: Arc<Journal>) -> Self {
        Self::new(
            config.base_url.clone(),
            config.consumer_key.as_deref().unwrap_or_default(),
            config.consumer_secret.as_deref().unwrap_or_default(),
            journal,
        )
    }

    fn resolve_url(&self, raw: &str) -> Result<String> {
        let raw = raw.trim();
        let resolved = if let Some(rest) = raw.strip_prefix(BASE_URL_PLACEHOLDER) {
            let base = self.base_url.as_deref().ok_or_else(|| {
                Error::Config("store base URL is not configured".to_string())
            })?;
            format!("{base}{rest}")
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            let base = self.base_url.as_deref().ok_or_else(|| {
                Error::Config(format!("relative URL '{raw}' needs a store base URL"))
            })?;
            format!("{base}/{}", raw.trim_start_matches('/'))
        };
        url::Url::parse(&resolved)
            .map(|u| u.to_string())
            .map_err(|e| Error::Config(format!("invalid URL '{resolved}': {e}")))
    }

    async fn send(&self, request: &HttpRequestSpec) -> Result<ExecutionOutcome> {
        let url = self.resolve_url(&request.url)?;
        let method = Method::from_bytes(request.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::Action(format!("invalid HTTP method '{}'", request.method)))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            builder = builder.header(name.as_str(), value);
        }
        builder = builder.header("Authorization", &self.auth_header);
        if let Some(body) = request.body.as_ref().filter(|b| has_content(b)) {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(ExecutionOutcome {
            status,
            body: decode_body(&text),
        })
    }
}

#[async_trait]
impl ApiExecutor for RestExecutor {
    async fn execute(&self, request: &HttpRequestSpec) -> ExecutionOutcome {
        self.journal.record_trace(
            TraceDirection::Executed,
            &format!(
                "Executing API request: {}",
                serde_json::to_string(request).unwrap_or_default()
            ),
        );

        let outcome = match self.send(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("store request {} {} failed: {e}", request.method, request.url);
                ExecutionOutcome::transport_failure(e.to_string())
            }
        };

        self.journal.record_trace(
            TraceDirection::Executed,
            &format!(
                "API Response: {}",
                serde_json::to_string(&outcome).unwrap_or_default()
            ),
        );
        outcome
    }
}

/// Null, `""`, `[]` and `{}` bodies are not sent.
fn has_content(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(base: Option<&str>) -> RestExecutor {
        RestExecutor::new(
            base.map(str::to_string),
            "ck",
            "cs",
            Arc::new(Journal::in_memory(false)),
        )
    }

    #[test]
    fn resolves_placeholder_and_relative_urls() {
        let ex = executor(Some("https://shop.example/wp-json/"));
        assert_eq!(
            ex.resolve_url("{base_url}/wc/v3/orders").unwrap(),
            "https://shop.example/wp-json/wc/v3/orders"
        );
        assert_eq!(
            ex.resolve_url("/wc/v3/products/5").unwrap(),
            "https://shop.example/wp-json/wc/v3/products/5"
        );
        assert_eq!(
            ex.resolve_url("https://other.example/x").unwrap(),
            "https://other.example/x"
        );
    }

    #[test]
    fn placeholder_without_base_is_config_error() {
        let ex = executor(None);
        assert!(matches!(
            ex.resolve_url("{base_url}/wc/v3/orders"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn body_decoding() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(decode_body("<html>oops</html>"), json!("<html>oops</html>"));
    }

    #[test]
    fn empty_bodies_are_skipped() {
        assert!(!has_content(&Value::Null));
        assert!(!has_content(&json!({})));
        assert!(!has_content(&json!([])));
        assert!(has_content(&json!({"status": "completed"})));
        assert!(has_content(&json!(0)));
    }

    #[test]
    fn request_spec_defaults_optional_fields() {
        let request: HttpRequestSpec =
            serde_json::from_str(r#"{"method":"GET","url":"{base_url}/wc/v3/orders"}"#).unwrap();
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_becomes_status_zero() {
        let ex = executor(Some("http://127.0.0.1:1"));
        let outcome = ex
            .execute(&HttpRequestSpec::new("GET", "{base_url}/wc/v3/orders"))
            .await;
        assert_eq!(outcome.status, 0);
        assert!(outcome.body["error"].is_string());
    }

    #[tokio::test]
    async fn bad_method_becomes_status_zero() {
        let ex = executor(Some("http://127.0.0.1:1"));
        let outcome = ex
            .execute(&HttpRequestSpec::new("NOT A METHOD", "{base_url}/x"))
            .await;
        assert_eq!(outcome.status, 0);
    }
}
