use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{IndexError, IndexResult};
use crate::keys::DEFAULT_NAMESPACE;

/// Largest accepted `fault_channel_capacity`. The channel allocates every
/// slot up front.
pub const MAX_FAULT_CHANNEL_CAPACITY: usize = 1 << 16;

/// Configuration for index maintenance and backfill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Reserved key namespace for catalog entries and markers.
    pub namespace: String,
    /// Maximum number of maintenance tasks running at once.
    pub maintenance_workers: usize,
    /// Maximum number of concurrent per-field or per-document index requests,
    /// shared by all maintenance tasks and backfills.
    pub fanout_parallelism: usize,
    /// Hard deadline for one maintenance task, once it holds a worker.
    pub maintenance_timeout_secs: u64,
    /// Buffer of the fault broadcast channel; slow subscribers lag past it.
    pub fault_channel_capacity: usize,
    /// Persist per-field backfill status so an interrupted backfill is re-run
    /// by the next `ensure_indexed` call.
    pub track_backfill_status: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            maintenance_workers: 10,
            fanout_parallelism: 10,
            maintenance_timeout_secs: 30,
            fault_channel_capacity: 256,
            track_backfill_status: false,
        }
    }
}

impl IndexConfig {
    pub fn maintenance_timeout(&self) -> Duration {
        Duration::from_secs(self.maintenance_timeout_secs)
    }

    /// Upper bound on concurrent index-side backend requests.
    ///
    /// Every running maintenance task may hold one catalog read outside the
    /// fan-out pool; all other index requests hold a fan-out permit.
    pub fn max_backend_concurrency(&self) -> usize {
        self.maintenance_workers + self.fanout_parallelism
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(IndexError::InvalidConfig(format!(
                "namespace {:?} must be a single non-empty key segment",
                self.namespace
            )));
        }
        for (name, value) in [
            ("maintenance_workers", self.maintenance_workers),
            ("fanout_parallelism", self.fanout_parallelism),
            ("fault_channel_capacity", self.fault_channel_capacity),
        ] {
            if value == 0 {
                return Err(IndexError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        for (name, value) in [
            ("maintenance_workers", self.maintenance_workers),
            ("fanout_parallelism", self.fanout_parallelism),
        ] {
            if value > Semaphore::MAX_PERMITS {
                return Err(IndexError::InvalidConfig(format!(
                    "{name} must be at most {}",
                    Semaphore::MAX_PERMITS
                )));
            }
        }
        if self.fault_channel_capacity > MAX_FAULT_CHANNEL_CAPACITY {
            return Err(IndexError::InvalidConfig(format!(
                "fault_channel_capacity must be at most {MAX_FAULT_CHANNEL_CAPACITY}"
            )));
        }
        if self.maintenance_timeout_secs == 0 {
            return Err(IndexError::InvalidConfig(
                "maintenance_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
