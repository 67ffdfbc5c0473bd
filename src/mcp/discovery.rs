//! MCP tool discovery.
//!
//! Discovery is a one-shot network call, so unlike workflow streams it is
//! bounded by an explicit timeout (300 s unless the caller overrides it).

use std::collections::HashMap;
use std::time::Duration;

use rmcp::service::RunningService;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use tracing::{debug, info, warn};

use crate::models::request::{McpServerMetadataRequest, McpServerMetadataResponse, McpTransport};
use crate::{AppError, BoxFuture, Result};

/// Default discovery timeout.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Lists the tools an MCP server advertises.
pub trait ToolDiscovery: Send + Sync {
    /// Connect to the server described by `request` and list its tools.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Mcp` if the server cannot be reached or answers
    /// with an error, and `AppError::Config` for unsupported transports.
    fn list_tools<'a>(
        &'a self,
        request: &'a McpServerMetadataRequest,
    ) -> BoxFuture<'a, Result<Vec<serde_json::Value>>>;
}

/// Discovery through the rmcp client: spawns stdio servers as child
/// processes and connects to streamable HTTP servers by URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpToolDiscovery;

impl ToolDiscovery for McpToolDiscovery {
    fn list_tools<'a>(
        &'a self,
        request: &'a McpServerMetadataRequest,
    ) -> BoxFuture<'a, Result<Vec<serde_json::Value>>> {
        Box::pin(async move {
            let client = match request.transport {
                McpTransport::Stdio => connect_stdio(request).await?,
                McpTransport::StreamableHttp => connect_streamable_http(request).await?,
                McpTransport::Sse => {
                    return Err(AppError::Config(
                        "sse transport is not supported, use streamable_http".into(),
                    ));
                }
            };

            let listed = client.list_all_tools().await;
            if let Err(err) = client.cancel().await {
                warn!(%err, "mcp client shutdown failed");
            }
            let tools = listed.map_err(|err| AppError::Mcp(format!("list tools failed: {err}")))?;

            tools
                .into_iter()
                .map(|tool| serde_json::to_value(tool).map_err(AppError::from))
                .collect()
        })
    }
}

async fn connect_stdio(request: &McpServerMetadataRequest) -> Result<RunningService<RoleClient, ()>> {
    let program = request
        .command
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Config("command is required for stdio".into()))?;

    let mut command = tokio::process::Command::new(program);
    command.args(request.args.iter().flatten());
    if let Some(env) = &request.env {
        command.envs(env);
    }

    let transport = TokioChildProcess::new(command)
        .map_err(|err| AppError::Mcp(format!("failed to spawn {program}: {err}")))?;
    ().serve(transport)
        .await
        .map_err(|err| AppError::Mcp(format!("initialize failed: {err}")))
}

async fn connect_streamable_http(
    request: &McpServerMetadataRequest,
) -> Result<RunningService<RoleClient, ()>> {
    let url = request
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Config("url is required for streamable_http".into()))?;

    let mut config = StreamableHttpClientTransportConfig::with_uri(url.to_owned());
    config.auth_header = bearer_token(request.headers.as_ref())?;

    debug!(url, "connecting to streamable http mcp server");
    ().serve(StreamableHttpClientTransport::from_config(config))
        .await
        .map_err(|err| AppError::Mcp(format!("initialize failed: {err}")))
}

/// The rmcp HTTP client only forwards an `Authorization: Bearer` credential,
/// so any other header is rejected rather than silently dropped.
fn bearer_token(headers: Option<&HashMap<String, String>>) -> Result<Option<String>> {
    let mut token = None;
    for (name, value) in headers.into_iter().flatten() {
        if !name.eq_ignore_ascii_case("authorization") {
            return Err(AppError::Config(format!("unsupported mcp header: {name}")));
        }
        let (scheme, credential) = value.trim().split_once(' ').unwrap_or((value.trim(), ""));
        if !scheme.eq_ignore_ascii_case("bearer") || credential.trim().is_empty() {
            return Err(AppError::Config(
                "authorization header must be a bearer token".into(),
            ));
        }
        token = Some(credential.trim().to_owned());
    }
    Ok(token)
}

/// Run discovery under the request's timeout (or `default_timeout`).
///
/// # Errors
///
/// Returns `AppError::Timeout` if discovery does not finish in time, or the
/// discovery error otherwise.
pub async fn discover_with_timeout(
    discovery: &dyn ToolDiscovery,
    request: &McpServerMetadataRequest,
    default_timeout: Duration,
) -> Result<McpServerMetadataResponse> {
    let timeout = request
        .timeout_seconds
        .map_or(default_timeout, Duration::from_secs);

    let tools = tokio::time::timeout(timeout, discovery.list_tools(request))
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "mcp discovery exceeded {} seconds",
                timeout.as_secs()
            ))
        })??;

    info!(tools = tools.len(), transport = ?request.transport, "mcp tools discovered");

    Ok(McpServerMetadataResponse {
        transport: request.transport,
        command: request.command.clone(),
        args: request.args.clone(),
        url: request.url.clone(),
        env: request.env.clone(),
        headers: request.headers.clone(),
        tools,
    })
}
