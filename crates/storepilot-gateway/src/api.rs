use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use storepilot_common::{Error, UserId};
use tracing::warn;

use crate::state::SharedState;

const DEFAULT_LOG_LIMIT: usize = 100;

type ApiResponse = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct TaskRequest {
    pub user_id: String,
    pub task: String,
}

#[derive(Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

impl LogQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT)
    }
}

/// `POST /api/tasks`: runs one task for a user and returns the reply.
pub async fn submit_task(
    State(state): State<SharedState>,
    Json(body): Json<TaskRequest>,
) -> ApiResponse {
    let Some(user) = user_id(&body.user_id) else {
        return bad_request("user_id is required");
    };
    if body.task.trim().is_empty() {
        return bad_request("task is required");
    }

    match state.runtime.run_task(&user, &body.task).await {
        Ok(reply) => {
            let thread_id = state.runtime.current_thread(&user).ok().flatten();
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "reply": reply,
                    "thread_id": thread_id,
                })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// `POST /api/users/{user_id}/thread/reset`
pub async fn reset_thread(
    State(state): State<SharedState>,
    Path(raw_user): Path<String>,
) -> ApiResponse {
    let Some(user) = user_id(&raw_user) else {
        return bad_request("user_id is required");
    };
    match state.runtime.reset_thread(&user).await {
        Ok(thread_id) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "Thread reset successfully.",
                "thread_id": thread_id,
            })),
        ),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/logs`: events and conversations, newest first.
pub async fn list_logs(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> Json<Value> {
    Json(json!({ "entries": state.journal().events(query.limit()) }))
}

pub async fn clear_logs(State(state): State<SharedState>) -> ApiResponse {
    match state.journal().clear_events() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/debug-log`: raw traffic, newest first. Empty unless debug is on.
pub async fn list_debug_log(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> Json<Value> {
    Json(json!({
        "debug": state.journal().debug_enabled(),
        "entries": state.journal().traces(query.limit()),
    }))
}

pub async fn clear_debug_log(State(state): State<SharedState>) -> ApiResponse {
    match state.journal().clear_traces() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => error_response(&e),
    }
}

fn user_id(raw: &str) -> Option<UserId> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| UserId::from(raw))
}

fn bad_request(message: &str) -> ApiResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message })),
    )
}

/// Maps runtime errors onto HTTP statuses. Configuration problems carry
/// their message unprefixed so it can be shown to the user as is.
pub fn error_response(error: &Error) -> ApiResponse {
    let (status, message) = match error {
        Error::Config(message) => (StatusCode::PRECONDITION_FAILED, message.clone()),
        Error::ThreadCreation(_)
        | Error::NoActiveRun(_)
        | Error::RunConflict { .. }
        | Error::Transport(_)
        | Error::Api { .. } => (StatusCode::BAD_GATEWAY, error.to_string()),
        Error::Action(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        other => {
            warn!("request failed: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    };
    (
        status,
        Json(json!({ "status": "error", "message": message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_keep_their_message() {
        let (status, Json(body)) =
            error_response(&Error::Config("Please set your API Key".to_string()));
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(body["message"], "Please set your API Key");
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let (status, _) = error_response(&Error::NoActiveRun("thread_1".to_string()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (status, _) = error_response(&Error::ThreadCreation("boom".to_string()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (status, _) = error_response(&Error::Database("locked".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn blank_user_ids_are_rejected() {
        assert!(user_id("  ").is_none());
        assert_eq!(user_id(" 42 "), Some(UserId::from("42")));
    }
}
