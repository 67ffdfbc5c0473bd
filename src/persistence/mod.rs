//! Persistence layer modules.

pub mod chat_log;
pub mod db;
pub mod retention;
pub mod schema;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
