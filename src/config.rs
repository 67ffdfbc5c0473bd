//! Global configuration parsing, validation, and environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::checkpoint::BackendKind;
use crate::{AppError, Result};

/// Reserved thread token that asks the server to mint a new thread id.
pub const NEW_THREAD_SENTINEL: &str = "__default__";

const TRUTHY: [&str; 5] = ["1", "true", "yes", "y", "on"];

/// Checkpoint persistence settings.
///
/// Persistence is active only when `enabled` is set and `url` is non-empty;
/// otherwise runs use volatile in-process state.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CheckpointConfig {
    /// Whether checkpoints are persisted to an external backend.
    #[serde(default)]
    pub enabled: bool,
    /// Backend connection string; the scheme selects the backend.
    #[serde(default)]
    pub url: String,
}

impl CheckpointConfig {
    /// Backend implied by the current settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if persistence is enabled with a URL whose
    /// scheme matches no known backend.
    pub fn backend(&self) -> Result<BackendKind> {
        if !self.enabled || self.url.is_empty() {
            return Ok(BackendKind::Memory);
        }
        BackendKind::from_url(&self.url)
    }
}

/// Optional integration switches.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FeatureConfig {
    /// Whether requests may carry MCP server settings.
    #[serde(default)]
    pub mcp_enabled: bool,
}

/// Location of the remote workflow runner.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Base URL that accepts run requests and answers with NDJSON.
    #[serde(default)]
    pub url: String,
}

/// Side-log storage settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChatLogConfig {
    /// `SQLite` file for the chat stream log; in-memory when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_http_port() -> u16 {
    8000
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_recursion_limit() -> u32 {
    25
}

fn default_mcp_timeout_seconds() -> u64 {
    300
}

fn default_retention_hours() -> u32 {
    24
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the streaming API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Interface address the HTTP server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Graph recursion limit forwarded to the workflow engine.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: u32,
    /// Default timeout for MCP tool discovery.
    #[serde(default = "default_mcp_timeout_seconds")]
    pub mcp_timeout_seconds: u64,
    /// Hours an idle thread's side log and pending suspension are kept.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
    /// Origins a fronting proxy should allow.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Checkpoint persistence.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Feature flags.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Remote workflow runner.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Chat stream side log.
    #[serde(default)]
    pub chat_log: ChatLogConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            recursion_limit: default_recursion_limit(),
            mcp_timeout_seconds: default_mcp_timeout_seconds(),
            retention_hours: default_retention_hours(),
            allowed_origins: default_allowed_origins(),
            checkpoint: CheckpointConfig::default(),
            features: FeatureConfig::default(),
            engine: EngineConfig::default(),
            chat_log: ChatLogConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the process environment on top of file settings, then re-validate.
    ///
    /// Recognised variables: `LANGGRAPH_CHECKPOINT_SAVER`,
    /// `LANGGRAPH_CHECKPOINT_DB_URL`, `ENABLE_MCP_SERVER_CONFIGURATION`,
    /// `AGENT_RECURSION_LIMIT`, `ALLOWED_ORIGINS`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the merged configuration is invalid.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(enabled) = bool_env("LANGGRAPH_CHECKPOINT_SAVER") {
            self.checkpoint.enabled = enabled;
        }
        if let Some(url) = str_env("LANGGRAPH_CHECKPOINT_DB_URL") {
            self.checkpoint.url = url;
        }
        if let Some(enabled) = bool_env("ENABLE_MCP_SERVER_CONFIGURATION") {
            self.features.mcp_enabled = enabled;
        }
        if let Some(raw) = str_env("AGENT_RECURSION_LIMIT") {
            self.recursion_limit = parse_recursion_limit(&raw, default_recursion_limit());
            info!(limit = self.recursion_limit, "recursion limit set");
        }
        if let Some(raw) = str_env("ALLOWED_ORIGINS") {
            self.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.recursion_limit == 0 {
            return Err(AppError::Config(
                "recursion_limit must be greater than zero".into(),
            ));
        }
        if self.mcp_timeout_seconds == 0 {
            return Err(AppError::Config(
                "mcp_timeout_seconds must be greater than zero".into(),
            ));
        }
        if self.retention_hours == 0 {
            return Err(AppError::Config(
                "retention_hours must be greater than zero".into(),
            ));
        }
        self.checkpoint.backend()?;
        Ok(())
    }
}

/// Parse a recursion limit, falling back to `default` for invalid or
/// non-positive values.
#[must_use]
pub fn parse_recursion_limit(raw: &str, default: u32) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => u32::try_from(value).unwrap_or(u32::MAX),
        Ok(value) => {
            warn!(value, default, "recursion limit must be positive, using default");
            default
        }
        Err(_) => {
            warn!(raw, default, "invalid recursion limit, using default");
            default
        }
    }
}

fn bool_env(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|value| TRUTHY.contains(&value.trim().to_lowercase().as_str()))
}

fn str_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_owned())
}
