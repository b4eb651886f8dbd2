use std::sync::Arc;

use blobdoc_backend::{BlobBackend, PutRequest};
use blobdoc_index::{
    validate_collection_name, validate_document_id, DocumentUpdate, EnsureOutcome, FieldSet,
    IndexEngine, MaintenanceFault,
};
use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreResult;

/// A stored document as read back from the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Document {
    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Documents addressed by (collection, id), with field indexes kept up to
/// date in the background.
///
/// Writes return once the document itself is stored. The markers they imply
/// are reconciled asynchronously on a bounded worker pool and converge
/// eventually; failures there are published on [`subscribe_faults`]
/// rather than returned.
///
/// [`subscribe_faults`]: DocumentStore::subscribe_faults
pub struct DocumentStore {
    backend: Arc<dyn BlobBackend>,
    engine: IndexEngine,
    config: StoreConfig,
}

impl DocumentStore {
    /// Open a store over `backend`. Fails if `config` does not validate.
    pub fn new(backend: Arc<dyn BlobBackend>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let engine = IndexEngine::new(
            Arc::clone(&backend),
            config.index.clone(),
            config.encrypt_at_rest,
        );
        Ok(Self {
            backend,
            engine,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn check_address(&self, collection: &str, id: &str) -> StoreResult<String> {
        validate_collection_name(collection, self.engine.keys().namespace())?;
        validate_document_id(id)?;
        Ok(self.engine.keys().document_key(collection, id))
    }

    /// Read a document. A missing document is `Ok(None)`.
    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let key = self.check_address(collection, id)?;
        let Some(blob) = self.backend.get(&key).await? else {
            return Ok(None);
        };
        Ok(Some(Document {
            collection: collection.to_string(),
            id: id.to_string(),
            content_type: blob.content_type,
            data: blob.data,
        }))
    }

    /// Store `payload` as the full content of a document and schedule index
    /// maintenance for it.
    ///
    /// The previous payload is read first to know which markers to retire.
    /// That read and the write are not atomic: concurrent writers of the same
    /// document may leave the index reflecting an overwritten value until the
    /// document is written again.
    pub async fn put(
        &self,
        collection: &str,
        id: &str,
        content_type: &str,
        payload: impl Into<Bytes>,
    ) -> StoreResult<()> {
        let key = self.check_address(collection, id)?;
        let payload = payload.into();
        let previous = self.backend.get(&key).await?.map(|blob| blob.data);

        self.backend
            .put(
                &key,
                PutRequest::new(payload.clone(), content_type).encrypted(self.config.encrypt_at_rest),
            )
            .await?;
        debug!(key = %key, bytes = payload.len(), "document written");

        self.engine
            .schedule(DocumentUpdate::new(collection, id, previous, Some(payload)));
        Ok(())
    }

    /// Delete a document and schedule removal of its markers. Deleting a
    /// missing document succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let key = self.check_address(collection, id)?;
        let previous = self.backend.get(&key).await?.map(|blob| blob.data);
        self.backend.delete(&key).await?;
        debug!(key = %key, existed = previous.is_some(), "document deleted");

        if previous.is_some() {
            self.engine
                .schedule(DocumentUpdate::new(collection, id, previous, None));
        }
        Ok(())
    }

    /// Declare `field` indexed on `collection`, returning once every existing
    /// document has been backfilled. Calling it again for the same field is a
    /// no-op.
    pub async fn ensure_indexed(&self, collection: &str, field: &str) -> StoreResult<EnsureOutcome> {
        Ok(self.engine.ensure_indexed(collection, field).await?)
    }

    /// The fields currently declared indexed on `collection`.
    pub async fn indexed_fields(&self, collection: &str) -> StoreResult<FieldSet> {
        Ok(self.engine.indexed_fields(collection).await?)
    }

    /// Resolve once no index maintenance is in flight.
    ///
    /// This says nothing about backend visibility of the markers written.
    pub async fn wait_for_maintenance(&self) {
        self.engine.wait_idle().await;
    }

    /// Number of maintenance tasks scheduled but not finished.
    pub fn pending_maintenance(&self) -> usize {
        self.engine.in_flight()
    }

    /// Receive every maintenance fault reported from now on.
    pub fn subscribe_faults(&self) -> broadcast::Receiver<MaintenanceFault> {
        self.engine.subscribe_faults()
    }

    /// Let in-flight maintenance finish, then release the worker pools.
    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("config", &self.config)
            .field("pending_maintenance", &self.pending_maintenance())
            .finish()
    }
}
