//! Relational checkpoint backend over `PostgreSQL`.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{BackendKind, BoxFuture, CheckpointConnector, CheckpointRecord, CheckpointSaver};
use crate::{AppError, Result};

const MAX_CONNECTIONS: u32 = 4;

const DDL: &str = r"
CREATE TABLE IF NOT EXISTS stream_checkpoint (
    thread_id   TEXT PRIMARY KEY NOT NULL,
    data        TEXT NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
";

/// Saver backed by a connection pool scoped to one streaming call.
pub struct PostgresSaver {
    pool: PgPool,
}

impl PostgresSaver {
    /// Wrap an open pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the checkpoint table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkpoint` if the DDL fails.
    pub async fn setup(&self) -> Result<()> {
        sqlx::raw_sql(DDL)
            .execute(&self.pool)
            .await
            .map_err(checkpoint_err)?;
        Ok(())
    }
}

fn checkpoint_err(err: sqlx::Error) -> AppError {
    AppError::Checkpoint(format!("postgres: {err}"))
}

impl CheckpointSaver for PostgresSaver {
    fn put<'a>(
        &'a self,
        thread_id: &'a str,
        record: CheckpointRecord,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let data = serde_json::to_string(&record)?;
            sqlx::query(
                "INSERT INTO stream_checkpoint (thread_id, data, updated_at)
                 VALUES ($1, $2, now())
                 ON CONFLICT (thread_id)
                 DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
            )
            .bind(thread_id)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(checkpoint_err)?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Option<CheckpointRecord>>> {
        Box::pin(async move {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT data FROM stream_checkpoint WHERE thread_id = $1")
                    .bind(thread_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(checkpoint_err)?;
            row.map(|(data,)| serde_json::from_str(&data).map_err(AppError::from))
                .transpose()
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.pool.close().await })
    }
}

/// Opens a fresh pool per streaming call.
pub struct PostgresConnector {
    url: String,
}

impl PostgresConnector {
    /// Connector for `url` (`postgresql://...`).
    #[must_use]
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl CheckpointConnector for PostgresConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn CheckpointSaver>>> {
        Box::pin(async move {
            info!("starting postgres checkpointer");
            let pool = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect(&self.url)
                .await
                .map_err(checkpoint_err)?;
            let saver = PostgresSaver::new(pool);
            if let Err(err) = saver.setup().await {
                saver.pool.close().await;
                return Err(err);
            }
            Ok(Arc::new(saver) as Arc<dyn CheckpointSaver>)
        })
    }
}
