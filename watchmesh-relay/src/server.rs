use crate::{RelayConfig, RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(service)
}

/// Bind and serve the relay until the process is stopped.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind relay on {}", config.bind))?;

    info!("Relay listening on {}", listener.local_addr()?);

    let service = RelayService::new(config.ice_servers);
    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")?;
    Ok(())
}
