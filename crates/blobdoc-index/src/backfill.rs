//! Populate markers for a newly indexed field across a whole collection.
//!
//! Pages are walked in cursor order, one at a time. Documents within a page
//! are fetched and marked concurrently through the shared fan-out pool.
//! Writes racing the scan are covered by their own maintenance tasks, which
//! write the same idempotent marker keys. The one marker the scan can get
//! wrong is one it wrote for a value already replaced, so every marker is
//! followed by a re-read of its document and retracted if the value moved.

use std::sync::Arc;

use blobdoc_backend::{BlobBackend, PutRequest};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};
use crate::keys::KeySpace;
use crate::value::{parse_document, FieldValue};

/// Totals for one completed backfill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub pages: u64,
    pub documents_scanned: u64,
    pub markers_written: u64,
    /// Documents listed but gone by the time they were fetched.
    pub documents_vanished: u64,
    /// Markers deleted again because the document changed while being marked.
    pub markers_retracted: u64,
}

enum DocumentOutcome {
    Marked,
    NoValue,
    Vanished,
    Retracted,
}

/// Walks a collection and writes markers for one field.
#[derive(Clone)]
pub struct Backfill {
    backend: Arc<dyn BlobBackend>,
    keys: KeySpace,
    fanout: Arc<Semaphore>,
    encrypt: bool,
}

impl Backfill {
    pub fn new(
        backend: Arc<dyn BlobBackend>,
        keys: KeySpace,
        fanout: Arc<Semaphore>,
        encrypt: bool,
    ) -> Self {
        Self {
            backend,
            keys,
            fanout,
            encrypt,
        }
    }

    /// Scan every document of `collection` and mark its value for `field`.
    ///
    /// Returns once every page has been listed and every listed document has
    /// been processed. The first failure aborts the remaining work of the
    /// current page and is returned.
    pub async fn run(&self, collection: &str, field: &str) -> IndexResult<BackfillReport> {
        info!(collection, field, "backfill started");
        let prefix = self.keys.collection_prefix(collection);
        let mut report = BackfillReport::default();
        let mut cursor = None;

        loop {
            let page = self.backend.list_page(&prefix, cursor).await?;
            report.pages += 1;
            debug!(collection, field, keys = page.keys.len(), "backfill page listed");

            let mut tasks = JoinSet::new();
            for key in page.keys {
                let Some(id) = self.keys.document_id(collection, &key).map(str::to_string) else {
                    continue;
                };
                let this = self.clone();
                let collection = collection.to_string();
                let field = field.to_string();
                tasks.spawn(async move { this.mark_document(&collection, &field, &key, &id).await });
            }

            while let Some(joined) = tasks.join_next().await {
                let outcome = joined.map_err(|e| IndexError::TaskFailed(e.to_string()))??;
                report.documents_scanned += 1;
                match outcome {
                    DocumentOutcome::Marked => report.markers_written += 1,
                    DocumentOutcome::NoValue => {}
                    DocumentOutcome::Vanished => report.documents_vanished += 1,
                    DocumentOutcome::Retracted => report.markers_retracted += 1,
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            collection,
            field,
            pages = report.pages,
            documents = report.documents_scanned,
            markers = report.markers_written,
            "backfill complete"
        );
        Ok(report)
    }

    async fn mark_document(
        &self,
        collection: &str,
        field: &str,
        key: &str,
        id: &str,
    ) -> IndexResult<DocumentOutcome> {
        let _permit = self
            .fanout
            .acquire()
            .await
            .map_err(|_| IndexError::PoolClosed)?;

        let Some(blob) = self.backend.get(key).await? else {
            debug!(key, "document vanished before backfill fetched it");
            return Ok(DocumentOutcome::Vanished);
        };
        let Some(token) = token_of(&blob.data, field) else {
            return Ok(DocumentOutcome::NoValue);
        };

        let marker = self.keys.marker_key(collection, field, &token, id);
        self.backend
            .put(&marker, PutRequest::empty().encrypted(self.encrypt))
            .await?;

        let current = self.backend.get(key).await?;
        if current.as_ref().and_then(|blob| token_of(&blob.data, field)) == Some(token) {
            return Ok(DocumentOutcome::Marked);
        }
        debug!(key = %marker, "document changed during backfill, retracting marker");
        self.backend.delete(&marker).await?;
        Ok(DocumentOutcome::Retracted)
    }
}

fn token_of(payload: &[u8], field: &str) -> Option<String> {
    let document = parse_document(payload);
    FieldValue::extract(document.as_ref(), field).marker_token()
}

impl std::fmt::Debug for Backfill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backfill")
            .field("namespace", &self.keys.namespace())
            .finish()
    }
}
