//! One handle over catalog, maintenance and backfill.

use std::sync::Arc;

use blobdoc_backend::BlobBackend;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tracing::info;

use crate::backfill::{Backfill, BackfillReport};
use crate::catalog::{BackfillStatus, FieldSet, IndexCatalog};
use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::fault::{FaultReporter, MaintenanceFault};
use crate::keys::KeySpace;
use crate::maintainer::{DocumentUpdate, IndexMaintainer};
use crate::names::{validate_collection_name, validate_field_name};
use crate::scheduler::MaintenanceScheduler;

/// What `ensure_indexed` had to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The field was already in the catalog; nothing ran.
    AlreadyIndexed,
    /// The field was added to the catalog and backfilled.
    Created(BackfillReport),
    /// The field was in the catalog but its backfill never finished; it ran
    /// again. Only possible with backfill status tracking enabled.
    Resumed(BackfillReport),
}

/// Index catalog, maintainer and backfill sharing one backend and one fan-out
/// pool.
#[derive(Debug)]
pub struct IndexEngine {
    catalog: IndexCatalog,
    backfill: Backfill,
    scheduler: MaintenanceScheduler,
    keys: KeySpace,
    config: IndexConfig,
    // Serializes catalog read-modify-write within this process.
    catalog_writes: Mutex<()>,
}

impl IndexEngine {
    /// Build the engine and its pools. `config` must already be validated.
    pub fn new(backend: Arc<dyn BlobBackend>, config: IndexConfig, encrypt: bool) -> Self {
        let keys = KeySpace::new(config.namespace.clone());
        let fanout = Arc::new(Semaphore::new(config.fanout_parallelism));
        let catalog = IndexCatalog::new(Arc::clone(&backend), keys.clone(), encrypt);
        let maintainer = IndexMaintainer::new(
            Arc::clone(&backend),
            catalog.clone(),
            keys.clone(),
            Arc::clone(&fanout),
            encrypt,
        );
        let backfill = Backfill::new(backend, keys.clone(), fanout, encrypt);
        let scheduler = MaintenanceScheduler::new(
            maintainer,
            config.maintenance_workers,
            config.maintenance_timeout(),
            FaultReporter::new(config.fault_channel_capacity),
        );
        Self {
            catalog,
            backfill,
            scheduler,
            keys,
            config,
            catalog_writes: Mutex::new(()),
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The indexed fields of `collection`.
    pub async fn indexed_fields(&self, collection: &str) -> IndexResult<FieldSet> {
        validate_collection_name(collection, self.keys.namespace())?;
        self.catalog.get(collection).await
    }

    /// Declare `field` indexed on `collection` and backfill it.
    ///
    /// Idempotent: a field already in the catalog returns
    /// [`EnsureOutcome::AlreadyIndexed`] without scanning. The catalog is
    /// persisted before the scan, so a failed scan leaves the field
    /// declared; without status tracking nothing will retry it.
    pub async fn ensure_indexed(&self, collection: &str, field: &str) -> IndexResult<EnsureOutcome> {
        validate_collection_name(collection, self.keys.namespace())?;
        validate_field_name(field)?;
        let _serialized = self.catalog_writes.lock().await;

        let fields = self.catalog.get(collection).await?;
        if fields.contains(field) {
            if self.config.track_backfill_status
                && self.catalog.status(collection, field).await? == Some(BackfillStatus::Building)
            {
                info!(collection, field, "resuming interrupted backfill");
                let report = self.backfill(collection, field).await?;
                return Ok(EnsureOutcome::Resumed(report));
            }
            return Ok(EnsureOutcome::AlreadyIndexed);
        }

        if self.config.track_backfill_status {
            self.catalog
                .set_status(collection, field, &BackfillStatus::Building)
                .await?;
        }
        let updated = fields.with_field(field);
        self.catalog.put(collection, &updated).await?;
        info!(collection, field, indexed = updated.len(), "index declared");

        let report = self.backfill(collection, field).await?;
        Ok(EnsureOutcome::Created(report))
    }

    async fn backfill(&self, collection: &str, field: &str) -> IndexResult<BackfillReport> {
        let report = self.backfill.run(collection, field).await?;
        if self.config.track_backfill_status {
            let status = BackfillStatus::Ready {
                documents_scanned: report.documents_scanned,
                markers_written: report.markers_written,
            };
            self.catalog.set_status(collection, field, &status).await?;
        }
        Ok(report)
    }

    /// Queue marker maintenance for a document transition.
    pub fn schedule(&self, update: DocumentUpdate) {
        self.scheduler.schedule(update);
    }

    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    pub fn subscribe_faults(&self) -> broadcast::Receiver<MaintenanceFault> {
        self.scheduler.subscribe_faults()
    }

    /// Wait for in-flight maintenance, then close the worker pool.
    pub async fn shutdown(&self) {
        self.scheduler.wait_idle().await;
        self.scheduler.close();
    }
}
