//! Out-of-band reporting of asynchronous maintenance failures.
//!
//! Maintenance runs after the triggering write has returned, so its failures
//! cannot be raised to that caller. They are logged and broadcast instead;
//! anyone interested (alerting, a repair job, tests) subscribes.

use std::fmt;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;

/// Which part of a document's maintenance failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultScope {
    /// The whole task, e.g. the catalog could not be read.
    Document,
    /// Reconciliation of a single indexed field.
    Field(String),
}

impl fmt::Display for FaultScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("all fields"),
            Self::Field(field) => write!(f, "field {field}"),
        }
    }
}

/// Why maintenance failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FaultKind {
    #[error("{0}")]
    Backend(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("worker pool closed")]
    PoolClosed,

    #[error("task aborted: {0}")]
    Aborted(String),
}

/// A failed reconciliation of one document's markers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("index maintenance of {collection}/{id} ({scope}) failed: {kind}")]
pub struct MaintenanceFault {
    pub collection: String,
    pub id: String,
    pub scope: FaultScope,
    pub kind: FaultKind,
}

impl MaintenanceFault {
    pub fn new(collection: &str, id: &str, scope: FaultScope, kind: FaultKind) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
            scope,
            kind,
        }
    }
}

/// Broadcasts maintenance faults to subscribers and logs each one.
#[derive(Clone, Debug)]
pub struct FaultReporter {
    sender: broadcast::Sender<MaintenanceFault>,
}

impl FaultReporter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every fault reported from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MaintenanceFault> {
        self.sender.subscribe()
    }

    pub fn report(&self, fault: MaintenanceFault) {
        warn!(
            collection = %fault.collection,
            id = %fault.id,
            scope = %fault.scope,
            "{}",
            fault.kind
        );
        // No subscribers is fine: the log line above is the record.
        let _ = self.sender.send(fault);
    }
}
