use std::sync::Arc;

use storepilot_agents::AssistantRuntime;
use storepilot_common::{Error, Result};
use storepilot_config::GatewayConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

pub struct GatewayServer {
    gateway: GatewayConfig,
    runtime: Arc<AssistantRuntime>,
}

impl GatewayServer {
    pub fn new(runtime: Arc<AssistantRuntime>) -> Self {
        Self {
            gateway: runtime.config().gateway.clone(),
            runtime,
        }
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.gateway.host, self.gateway.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("gateway listening on http://{addr}");

        let app = build_router(Arc::new(AppState::new(self.runtime)));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Error::Io)?;

        info!("gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
