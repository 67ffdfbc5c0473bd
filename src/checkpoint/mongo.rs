//! Document-store checkpoint backend over `MongoDB`.

use std::sync::Arc;

use mongodb::bson::{doc, DateTime, Document};
use mongodb::{Client, Collection, Database};
use tracing::info;

use super::{BackendKind, BoxFuture, CheckpointConnector, CheckpointRecord, CheckpointSaver};
use crate::{AppError, Result};

const DEFAULT_DATABASE: &str = "checkpointing_db";
const COLLECTION: &str = "stream_checkpoints";

/// Saver backed by a client scoped to one streaming call.
pub struct MongoSaver {
    client: Client,
    database: Database,
    collection: Collection<Document>,
}

impl MongoSaver {
    /// Wrap an open client, using the URL's default database when present.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        let collection = database.collection::<Document>(COLLECTION);
        Self {
            client,
            database,
            collection,
        }
    }
}

impl CheckpointSaver for MongoSaver {
    fn put<'a>(
        &'a self,
        thread_id: &'a str,
        record: CheckpointRecord,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let data = serde_json::to_string(&record)?;
            self.collection
                .replace_one(
                    doc! { "_id": thread_id },
                    doc! { "_id": thread_id, "data": data, "updated_at": DateTime::now() },
                )
                .upsert(true)
                .await?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, thread_id: &'a str) -> BoxFuture<'a, Result<Option<CheckpointRecord>>> {
        Box::pin(async move {
            let Some(found) = self.collection.find_one(doc! { "_id": thread_id }).await? else {
                return Ok(None);
            };
            let data = found
                .get_str("data")
                .map_err(|err| AppError::Checkpoint(format!("malformed checkpoint: {err}")))?;
            Ok(Some(serde_json::from_str(data)?))
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        let client = self.client.clone();
        Box::pin(async move { client.shutdown().await })
    }
}

/// Opens a fresh client per streaming call.
pub struct MongoConnector {
    url: String,
}

impl MongoConnector {
    /// Connector for `url` (`mongodb://...`).
    #[must_use]
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl CheckpointConnector for MongoConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn CheckpointSaver>>> {
        Box::pin(async move {
            info!("starting mongodb checkpointer");
            let client = Client::with_uri_str(&self.url).await?;
            let saver = MongoSaver::new(client);
            if let Err(err) = saver.database.run_command(doc! { "ping": 1 }).await {
                saver.close().await;
                return Err(err.into());
            }
            Ok(Arc::new(saver) as Arc<dyn CheckpointSaver>)
        })
    }
}
