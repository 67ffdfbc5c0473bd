#![forbid(unsafe_code)]

//! `research-stream`: streaming research API server binary.
//!
//! Bootstraps configuration, opens the chat stream log, selects the
//! checkpoint backend, and serves the HTTP API until a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use research_stream::checkpoint::{connector_for, MemorySaver};
use research_stream::config::GlobalConfig;
use research_stream::engine::HttpWorkflowEngine;
use research_stream::mcp::discovery::McpToolDiscovery;
use research_stream::orchestrator::streamer::ChatStreamer;
use research_stream::orchestrator::thread_registry::ThreadRegistry;
use research_stream::persistence::chat_log::{ChatLogRepo, ChatLogSink, MemoryChatLog};
use research_stream::persistence::{db, retention};
use research_stream::server::{self, AppState};
use research_stream::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "research-stream", about = "Streaming research workflow server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("research-stream server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if config.engine.url.is_empty() {
        return Err(AppError::Config(
            "engine.url must point at a workflow runner".into(),
        ));
    }
    let config = Arc::new(config);
    let backend = config.checkpoint.backend()?;
    info!(?backend, mcp_enabled = config.features.mcp_enabled, "configuration loaded");

    // ── Chat stream log ─────────────────────────────────
    let chat_log: Arc<dyn ChatLogSink> = match &config.chat_log.path {
        Some(path) => {
            let pool = Arc::new(db::connect(path).await?);
            info!(path = %path.display(), "chat stream log database connected");
            Arc::new(ChatLogRepo::new(pool))
        }
        None => {
            info!("chat stream log kept in memory");
            Arc::new(MemoryChatLog::new())
        }
    };

    // ── Workflow pipeline ───────────────────────────────
    let connector = connector_for(&config.checkpoint, Arc::new(MemorySaver::new()))?;
    let engine = Arc::new(HttpWorkflowEngine::new(
        reqwest::Client::new(),
        config.engine.url.clone(),
    ));
    let threads = Arc::new(ThreadRegistry::new());
    let streamer = ChatStreamer::new(
        engine,
        connector,
        Arc::clone(&chat_log),
        Arc::clone(&threads),
    );

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        streamer,
        discovery: Arc::new(McpToolDiscovery),
        backend,
    });

    let ct = CancellationToken::new();

    // ── Start retention service ─────────────────────────
    let retention_handle =
        retention::spawn_retention_task(chat_log, threads, config.retention_hours, ct.clone());
    info!(retention_hours = config.retention_hours, "retention service started");

    // ── Serve ───────────────────────────────────────────
    let server_ct = ct.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(state, server_ct).await {
            error!(%err, "http server failed");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let (server, retention) = tokio::join!(server_handle, retention_handle);
    if let Err(err) = server {
        error!(%err, "http server task panicked");
    }
    if let Err(err) = retention {
        error!(%err, "retention task panicked");
    }
    info!("research-stream shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
