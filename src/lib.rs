#![forbid(unsafe_code)]

//! Streaming session orchestrator for tool-using research workflows.

use std::future::Future;
use std::pin::Pin;

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod server;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};

/// Boxed future used at object-safe async trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
