//! Request handlers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures_util::StreamExt;
use serde::Serialize;

use super::AppState;
use crate::checkpoint::BackendKind;
use crate::mcp::discovery::discover_with_timeout;
use crate::models::request::{ChatRequest, McpServerMetadataRequest, McpServerMetadataResponse};
use crate::orchestrator::session_manager;
use crate::{AppError, Result};

/// `POST /api/chat/stream`: stream a research run as server-sent events.
///
/// # Errors
///
/// Returns `AppError::FeatureDisabled` before any output if the request
/// uses a disabled integration.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    let plan = session_manager::prepare(request, &state.config)?;
    let records = state
        .streamer
        .stream(plan)
        .map(|record| Ok::<_, Infallible>(record.text));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(records),
    )
        .into_response())
}

/// `POST /api/mcp/server/metadata`: list the tools of an MCP server.
///
/// # Errors
///
/// Returns `AppError::FeatureDisabled` when MCP is off, `AppError::Timeout`
/// when discovery exceeds its deadline.
pub async fn mcp_server_metadata(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpServerMetadataRequest>,
) -> Result<Json<McpServerMetadataResponse>> {
    if !state.config.features.mcp_enabled {
        return Err(AppError::FeatureDisabled(
            "MCP server configuration is disabled. Set ENABLE_MCP_SERVER_CONFIGURATION=true to enable MCP features".into(),
        ));
    }
    let default_timeout = Duration::from_secs(state.config.mcp_timeout_seconds);
    let response =
        discover_with_timeout(state.discovery.as_ref(), &request, default_timeout).await?;
    Ok(Json(response))
}

/// Server capabilities reported by `GET /api/config`.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Crate version.
    pub version: &'static str,
    /// Whether requests may carry MCP settings.
    pub mcp_enabled: bool,
    /// Active checkpoint backend.
    pub checkpoint_backend: BackendKind,
    /// Graph recursion limit.
    pub recursion_limit: u32,
}

/// `GET /api/config`
pub async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        version: env!("CARGO_PKG_VERSION"),
        mcp_enabled: state.config.features.mcp_enabled,
        checkpoint_backend: state.backend,
        recursion_limit: state.config.recursion_limit,
    })
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
