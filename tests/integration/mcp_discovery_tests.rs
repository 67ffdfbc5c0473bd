//! Integration tests for MCP discovery over streamable HTTP.
//!
//! A local rmcp `StreamableHttpService` mounted on an axum router plays the
//! tool server; a middleware in front of it demands a bearer token.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use research_stream::mcp::discovery::{discover_with_timeout, McpToolDiscovery};
use research_stream::models::request::{McpServerMetadataRequest, McpTransport};
use research_stream::AppError;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "secret-token";

#[derive(Clone)]
struct SearchTools;

impl ServerHandler for SearchTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, rmcp::ErrorData>> + Send + '_ {
        let tools = ["web_search", "crawl_page"]
            .into_iter()
            .map(|name| Tool::new(name, "research helper", serde_json::Map::new()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {TOKEN}");
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Serve the tool server on an ephemeral port; returns its `/mcp` URL.
async fn spawn_tool_server(ct: &CancellationToken) -> String {
    let service = StreamableHttpService::new(
        || Ok(SearchTools),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );
    let app = Router::new()
        .route_service("/mcp", service)
        .layer(middleware::from_fn(require_token));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
    });
    format!("http://{addr}/mcp")
}

fn request(url: &str, authorization: &str) -> McpServerMetadataRequest {
    McpServerMetadataRequest {
        transport: McpTransport::StreamableHttp,
        command: None,
        args: None,
        url: Some(url.to_owned()),
        env: None,
        headers: Some(HashMap::from([(
            "Authorization".to_owned(),
            authorization.to_owned(),
        )])),
        timeout_seconds: Some(10),
    }
}

#[tokio::test]
async fn streamable_http_lists_tools_with_bearer_header() {
    let ct = CancellationToken::new();
    let url = spawn_tool_server(&ct).await;

    let response = discover_with_timeout(
        &McpToolDiscovery,
        &request(&url, &format!("Bearer {TOKEN}")),
        Duration::from_secs(10),
    )
    .await
    .expect("discovery succeeds");

    let names: Vec<&str> = response
        .tools
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(names, vec!["web_search", "crawl_page"]);
    assert_eq!(response.transport, McpTransport::StreamableHttp);
    assert_eq!(response.url.as_deref(), Some(url.as_str()));

    ct.cancel();
}

#[tokio::test]
async fn streamable_http_with_wrong_token_is_mcp_error() {
    let ct = CancellationToken::new();
    let url = spawn_tool_server(&ct).await;

    let err = discover_with_timeout(
        &McpToolDiscovery,
        &request(&url, "Bearer wrong"),
        Duration::from_secs(10),
    )
    .await
    .expect_err("server refuses the token");

    assert!(matches!(err, AppError::Mcp(_)), "{err}");
    ct.cancel();
}
