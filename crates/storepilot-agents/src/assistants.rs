use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use storepilot_common::{
    Error, MessageRole, Result, Run, RunId, RunStatus, ThreadId, ThreadMessage,
};
use storepilot_config::DEFAULT_ASSISTANT_BASE_URL;
use storepilot_db::TraceDirection;
use storepilot_security::bearer_header;

use crate::journal::Journal;
use crate::transport::{ConversationTransport, is_active_run_conflict, parse_active_run_id};

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Assistants v2 client.
#[derive(Clone)]
pub struct AssistantsClient {
    client: Client,
    api_key: String,
    base_url: String,
    journal: Arc<Journal>,
}

impl AssistantsClient {
    pub fn new(api_key: String, base_url: Option<String>, journal: Arc<Journal>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_ASSISTANT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client: Client::new(),
            api_key,
            base_url,
            journal,
        }
    }

    /// One HTTP round trip. Both directions are traced before any parsing.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        label: &str,
    ) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        let body_text = body.as_ref().map(Value::to_string).unwrap_or_default();
        self.journal.record_trace(
            TraceDirection::Sent,
            &format!("{label}: {method} {path} {body_text}"),
        );

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", bearer_header(&self.api_key))
            .header(BETA_HEADER.0, BETA_HEADER.1);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("assistant request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read assistant response: {e}")))?;

        self.journal.record_trace(
            TraceDirection::Received,
            &format!("{label} response ({}): {text}", status.as_u16()),
        );
        Ok((status, text))
    }

    async fn call_ok<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        label: &str,
    ) -> Result<T> {
        let (status, text) = self.call(method, path, body, label).await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: error_message(&text),
            });
        }
        serde_json::from_str(&text).map_err(|e| {
            Error::Transport(format!("failed to parse {label} response: {e}"))
        })
    }
}

#[async_trait]
impl ConversationTransport for AssistantsClient {
    async fn create_thread(&self) -> Result<ThreadId> {
        let created: Created = self
            .call_ok(Method::POST, "/threads", Some(json!({})), "Thread creation")
            .await?;
        Ok(ThreadId::from(created.id))
    }

    async fn post_message(
        &self,
        thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> Result<()> {
        let _: Created = self
            .call_ok(
                Method::POST,
                &format!("/threads/{thread}/messages"),
                Some(json!({ "role": role.as_str(), "content": content })),
                "Message post",
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, assistant_id: &str) -> Result<RunId> {
        let (status, text) = self
            .call(
                Method::POST,
                &format!("/threads/{thread}/runs"),
                Some(json!({ "assistant_id": assistant_id })),
                "Run creation",
            )
            .await?;

        if !status.is_success() {
            let message = error_message(&text);
            if is_active_run_conflict(&message) {
                return Err(Error::RunConflict {
                    active_run_id: parse_active_run_id(&message).map(|id| id.0),
                    message,
                });
            }
            return Err(Error::Api {
                status: status.as_u16(),
                body: message,
            });
        }

        let created: MaybeCreated = serde_json::from_str(&text)
            .map_err(|e| Error::Transport(format!("failed to parse run creation response: {e}")))?;
        created
            .id
            .filter(|id| !id.is_empty())
            .map(RunId::from)
            .ok_or_else(|| Error::Transport("run creation response had no id".to_string()))
    }

    async fn get_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunStatus> {
        let object: RunObject = self
            .call_ok(
                Method::GET,
                &format!("/threads/{thread}/runs/{run}"),
                None,
                "Run status",
            )
            .await?;
        Ok(object.status)
    }

    async fn list_runs(&self, thread: &ThreadId) -> Result<Vec<Run>> {
        let list: ListResponse<RunObject> = self
            .call_ok(
                Method::GET,
                &format!("/threads/{thread}/runs"),
                None,
                "Run list",
            )
            .await?;
        Ok(list
            .data
            .into_iter()
            .map(|r| Run {
                id: RunId::from(r.id),
                status: r.status,
            })
            .collect())
    }

    async fn latest_message(&self, thread: &ThreadId) -> Result<Option<ThreadMessage>> {
        let list: ListResponse<MessageObject> = self
            .call_ok(
                Method::GET,
                &format!("/threads/{thread}/messages?limit=1&order=desc"),
                None,
                "Messages",
            )
            .await?;

        let Some(message) = list.data.into_iter().next() else {
            return Ok(None);
        };
        let text = message.content.into_iter().find_map(|part| match part {
            ContentPart::Text { text } => Some(text.value),
            ContentPart::Other => None,
        });
        Ok(text.map(|text| ThreadMessage {
            id: message.id,
            thread_id: thread.clone(),
            role: message.role,
            text,
            created_at: message
                .created_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }))
    }
}

/// Best-effort `error.message` from an error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .unwrap_or_else(|| body.to_string())
}

// --- wire types ---

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct MaybeCreated {
    id: Option<String>,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct MessageObject {
    id: String,
    role: MessageRole,
    #[serde(default)]
    content: Vec<ContentPart>,
    created_at: Option<i64>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_structured_field() {
        let body = r#"{"error":{"message":"Thread thread_1 already has an active run run_9.","type":"invalid_request_error"}}"#;
        assert_eq!(
            error_message(body),
            "Thread thread_1 already has an active run run_9."
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn message_content_skips_non_text_parts() {
        let raw = r#"{"id":"msg_1","role":"assistant","created_at":1700000000,
            "content":[{"type":"image_file","image_file":{"file_id":"f"}},
                       {"type":"text","text":{"value":"hello","annotations":[]}}]}"#;
        let msg: MessageObject = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.content.len(), 2);
        assert!(matches!(msg.content[0], ContentPart::Other));
    }
}
