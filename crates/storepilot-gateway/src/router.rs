use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde_json::{Map, Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::SharedState;

/// Build the application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/tasks", post(api::submit_task))
        .route("/api/users/{user_id}/thread/reset", post(api::reset_thread))
        .route("/api/logs", get(api::list_logs).delete(api::clear_logs))
        .route(
            "/api/debug-log",
            get(api::list_debug_log).delete(api::clear_debug_log),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health() -> &'static str {
    "ok"
}

/// `GET /api/status`: which settings are present, never their values.
async fn status(State(state): State<SharedState>) -> axum::Json<Value> {
    let config = state.config();
    let settings: Map<String, Value> = config
        .presence()
        .into_iter()
        .map(|(name, present)| (name.to_string(), Value::Bool(present)))
        .collect();

    axum::Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at,
        "ready": config.ensure_task_ready().is_ok(),
        "store_ready": config.ensure_store_ready().is_ok(),
        "debug": config.debug,
        "settings": settings,
        "actions": state.runtime.dispatcher().action_ids(),
    }))
}
