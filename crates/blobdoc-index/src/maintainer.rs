//! Marker reconciliation for a single document transition.

use std::sync::Arc;

use blobdoc_backend::{BlobBackend, PutRequest};
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::catalog::IndexCatalog;
use crate::diff::{plan_changes, FieldChange};
use crate::error::{IndexError, IndexResult};
use crate::fault::{FaultKind, FaultScope, MaintenanceFault};
use crate::keys::KeySpace;
use crate::value::parse_document;

/// One document's state transition: its payload before and after a write.
///
/// `previous` is `None` for a first write, `current` is `None` for a delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub collection: String,
    pub id: String,
    pub previous: Option<Bytes>,
    pub current: Option<Bytes>,
}

impl DocumentUpdate {
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        previous: Option<Bytes>,
        current: Option<Bytes>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            previous,
            current,
        }
    }
}

/// What one reconciliation did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Indexed fields whose marker token changed.
    pub fields_changed: usize,
    pub markers_written: usize,
    pub markers_deleted: usize,
    /// Failures, at most one per field plus one for the document as a whole.
    pub faults: Vec<MaintenanceFault>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

#[derive(Default)]
struct Applied {
    deleted: bool,
    written: bool,
}

/// Keeps a document's markers in step with its content.
///
/// Each changed field is reconciled in its own task, bounded by the shared
/// fan-out pool. A failing field never prevents its siblings from
/// converging.
#[derive(Clone)]
pub struct IndexMaintainer {
    backend: Arc<dyn BlobBackend>,
    catalog: IndexCatalog,
    keys: KeySpace,
    fanout: Arc<Semaphore>,
    encrypt: bool,
}

impl IndexMaintainer {
    pub fn new(
        backend: Arc<dyn BlobBackend>,
        catalog: IndexCatalog,
        keys: KeySpace,
        fanout: Arc<Semaphore>,
        encrypt: bool,
    ) -> Self {
        Self {
            backend,
            catalog,
            keys,
            fanout,
            encrypt,
        }
    }

    /// Bring the markers of `update`'s document in line with its new content.
    ///
    /// Never fails as a whole: every problem is returned as a fault in the
    /// report so the caller can publish it.
    pub async fn reconcile(&self, update: &DocumentUpdate) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();
        let fields = match self.catalog.get(&update.collection).await {
            Ok(fields) => fields,
            Err(e) => {
                report.faults.push(self.fault(update, FaultScope::Document, e));
                return report;
            }
        };
        if fields.is_empty() {
            return report;
        }

        let previous = update.previous.as_deref().and_then(parse_document);
        let current = update.current.as_deref().and_then(parse_document);
        let changes = plan_changes(&fields, previous.as_ref(), current.as_ref());
        report.fields_changed = changes.len();

        let mut tasks = JoinSet::new();
        for change in changes {
            let this = self.clone();
            let collection = update.collection.clone();
            let id = update.id.clone();
            tasks.spawn(async move {
                let outcome = this.apply(&collection, &id, &change).await;
                (change.field, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(applied))) => {
                    report.markers_deleted += usize::from(applied.deleted);
                    report.markers_written += usize::from(applied.written);
                }
                Ok((field, Err(e))) => {
                    report.faults.push(self.fault(update, FaultScope::Field(field), e));
                }
                Err(e) => report.faults.push(MaintenanceFault::new(
                    &update.collection,
                    &update.id,
                    FaultScope::Document,
                    FaultKind::Aborted(e.to_string()),
                )),
            }
        }

        debug!(
            collection = %update.collection,
            id = %update.id,
            written = report.markers_written,
            deleted = report.markers_deleted,
            faults = report.faults.len(),
            "index maintenance finished"
        );
        report
    }

    /// Delete the old marker and write the new one. Both are attempted even if
    /// the first fails; the first error wins.
    async fn apply(&self, collection: &str, id: &str, change: &FieldChange) -> IndexResult<Applied> {
        let _permit = self
            .fanout
            .acquire()
            .await
            .map_err(|_| IndexError::PoolClosed)?;

        let mut applied = Applied::default();
        let mut first_error = None;

        if let Some(old) = &change.removed {
            let key = self.keys.marker_key(collection, &change.field, old, id);
            match self.backend.delete(&key).await {
                Ok(()) => {
                    debug!(key = %key, "marker deleted");
                    applied.deleted = true;
                }
                Err(e) => first_error = Some(IndexError::from(e)),
            }
        }

        if let Some(new) = &change.added {
            let key = self.keys.marker_key(collection, &change.field, new, id);
            match self
                .backend
                .put(&key, PutRequest::empty().encrypted(self.encrypt))
                .await
            {
                Ok(()) => {
                    debug!(key = %key, "marker written");
                    applied.written = true;
                }
                Err(e) => {
                    first_error.get_or_insert(IndexError::from(e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }

    fn fault(&self, update: &DocumentUpdate, scope: FaultScope, error: IndexError) -> MaintenanceFault {
        let kind = match error {
            IndexError::PoolClosed => FaultKind::PoolClosed,
            other => FaultKind::Backend(other.to_string()),
        };
        MaintenanceFault::new(&update.collection, &update.id, scope, kind)
    }
}

impl std::fmt::Debug for IndexMaintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMaintainer")
            .field("namespace", &self.keys.namespace())
            .field("fanout_available", &self.fanout.available_permits())
            .finish()
    }
}
