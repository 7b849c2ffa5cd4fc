use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::executor::HttpRequestSpec;

/// Discriminator value for a raw store HTTP request.
pub const HTTP_ACTION: &str = "woocommerce_request";

/// A machine-actionable reply from the assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    /// `{"action": "woocommerce_request", "request": {...}}`
    Http(HttpRequestSpec),
    /// `{"action": "domain/verb", "params": {...}}`
    Skill {
        action: String,
        params: Map<String, Value>,
    },
}

impl ActionRequest {
    pub fn name(&self) -> &str {
        match self {
            Self::Http(_) => HTTP_ACTION,
            Self::Skill { action, .. } => action,
        }
    }
}

/// Classifies a reply as an action request, or `None` for ordinary text.
pub fn extract_action(reply: &str) -> Option<ActionRequest> {
    let payload = strip_code_fence(reply.trim());
    if payload.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(payload).ok()?;
    let object = value.as_object()?;
    let action = object.get("action")?.as_str()?.trim();

    if action == HTTP_ACTION {
        let request = serde_json::from_value(object.get("request")?.clone()).ok()?;
        return Some(ActionRequest::Http(request));
    }

    if !is_namespaced(action) {
        return None;
    }
    let params = match object.get("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params.clone(),
        Some(_) => return None,
    };
    Some(ActionRequest::Skill {
        action: action.to_string(),
        params,
    })
}

/// Removes a surrounding markdown code fence, tagged or not.
fn strip_code_fence(text: &str) -> &str {
    static FENCE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```\z")
            .expect("fence regex should compile")
    });
    FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text)
}

fn is_namespaced(action: &str) -> bool {
    static NAMESPACED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\A[A-Za-z0-9_\-]+/[A-Za-z0-9_\-]+\z").expect("action regex should compile")
    });
    NAMESPACED.is_match(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP_PAYLOAD: &str =
        r#"{"action":"woocommerce_request","request":{"method":"GET","url":"{base_url}/wc/v3/orders"}}"#;

    #[test]
    fn rejects_non_actions() {
        assert_eq!(extract_action(""), None);
        assert_eq!(extract_action("   \n "), None);
        assert_eq!(extract_action("You have three orders pending."), None);
        assert_eq!(extract_action("{\"action\": \"woocommerce_request\""), None);
        assert_eq!(extract_action("{\"request\": {\"method\": \"GET\"}}"), None);
        assert_eq!(extract_action("[1, 2, 3]"), None);
        assert_eq!(extract_action("{\"action\": \"summarize\"}"), None);
        assert_eq!(extract_action("{\"action\": 42}"), None);
    }

    #[test]
    fn http_request_without_request_object_is_text() {
        assert_eq!(
            extract_action(r#"{"action":"woocommerce_request"}"#),
            None
        );
    }

    #[test]
    fn extracts_http_request() {
        let Some(ActionRequest::Http(request)) = extract_action(HTTP_PAYLOAD) else {
            panic!("expected http action");
        };
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "{base_url}/wc/v3/orders");
    }

    #[test]
    fn fence_stripping_preserves_result() {
        let plain = extract_action(HTTP_PAYLOAD);
        let fenced = extract_action(&format!("```json\n{HTTP_PAYLOAD}\n```"));
        let bare_fence = extract_action(&format!("```\n{HTTP_PAYLOAD}\n```"));
        let inline = extract_action(&format!("```{HTTP_PAYLOAD}```"));
        assert!(plain.is_some());
        assert_eq!(plain, fenced);
        assert_eq!(plain, bare_fence);
        assert_eq!(plain, inline);
    }

    #[test]
    fn extracts_skill_action_with_params() {
        let reply = "```json\n{\"action\": \"woocommerce/check_availability\", \"params\": {\"product_id\": 12, \"date\": \"2025-03-01\"}}\n```";
        let Some(ActionRequest::Skill { action, params }) = extract_action(reply) else {
            panic!("expected skill action");
        };
        assert_eq!(action, "woocommerce/check_availability");
        assert_eq!(params["product_id"], 12);
    }

    #[test]
    fn skill_params_default_to_empty() {
        let Some(ActionRequest::Skill { params, .. }) =
            extract_action(r#"{"action":"woocommerce/get_booking_details"}"#)
        else {
            panic!("expected skill action");
        };
        assert!(params.is_empty());
        assert_eq!(
            extract_action(r#"{"action":"woocommerce/x","params":"nope"}"#),
            None
        );
    }

    #[test]
    fn prose_around_json_is_not_an_action() {
        assert_eq!(
            extract_action(&format!("Sure! Here it is: {HTTP_PAYLOAD}")),
            None
        );
    }
}
