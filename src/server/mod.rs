//! HTTP transport for the streaming research API.
//!
//! Mounts the chat stream, MCP discovery, configuration, and health routes
//! on an axum router and serves them until the cancellation token fires.

pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::checkpoint::BackendKind;
use crate::config::GlobalConfig;
use crate::mcp::discovery::ToolDiscovery;
use crate::orchestrator::streamer::ChatStreamer;
use crate::{AppError, Result};

/// Shared state handed to every request handler.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Streaming pipeline.
    pub streamer: ChatStreamer,
    /// MCP tool discovery collaborator.
    pub discovery: Arc<dyn ToolDiscovery>,
    /// Checkpoint backend selected at startup.
    pub backend: BackendKind,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat/stream", post(routes::chat_stream))
        .route("/api/mcp/server/metadata", post(routes::mcp_server_metadata))
        .route("/api/config", get(routes::config))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Serve the API on `config.bind_address:config.http_port`.
///
/// # Errors
///
/// Returns `AppError::Config` if the address is invalid or the server fails
/// to bind.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind: SocketAddr = format!("{}:{}", state.config.bind_address, state.config.http_port)
        .parse()
        .map_err(|err| AppError::Config(format!("invalid bind address: {err}")))?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(%bind, "starting HTTP streaming API");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("HTTP streaming API shut down");
    Ok(())
}
