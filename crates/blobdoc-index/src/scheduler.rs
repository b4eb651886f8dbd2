//! Asynchronous, bounded execution of maintenance tasks.
//!
//! Scheduling spawns immediately and never blocks the caller. A spawned task
//! first waits for one of `maintenance_workers` permits, then reconciles
//! under a hard deadline. On expiry the task is dropped, which aborts its
//! outstanding per-field work and frees both its worker permit and any
//! fan-out permits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Notify, Semaphore};
use tracing::debug;

use crate::fault::{FaultKind, FaultReporter, FaultScope, MaintenanceFault};
use crate::maintainer::{DocumentUpdate, IndexMaintainer};

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a task ends, however it ends.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Runs one maintenance task per document write on a bounded worker pool.
#[derive(Clone, Debug)]
pub struct MaintenanceScheduler {
    maintainer: IndexMaintainer,
    workers: Arc<Semaphore>,
    timeout: Duration,
    faults: FaultReporter,
    in_flight: Arc<InFlight>,
}

impl MaintenanceScheduler {
    pub fn new(
        maintainer: IndexMaintainer,
        workers: usize,
        timeout: Duration,
        faults: FaultReporter,
    ) -> Self {
        Self {
            maintainer,
            workers: Arc::new(Semaphore::new(workers)),
            timeout,
            faults,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Queue maintenance for `update` and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, update: DocumentUpdate) {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let maintainer = self.maintainer.clone();
        let workers = Arc::clone(&self.workers);
        let faults = self.faults.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = workers.acquire_owned().await else {
                faults.report(MaintenanceFault::new(
                    &update.collection,
                    &update.id,
                    FaultScope::Document,
                    FaultKind::PoolClosed,
                ));
                return;
            };

            match tokio::time::timeout(timeout, maintainer.reconcile(&update)).await {
                Ok(report) => {
                    for fault in report.faults {
                        faults.report(fault);
                    }
                }
                Err(_) => faults.report(MaintenanceFault::new(
                    &update.collection,
                    &update.id,
                    FaultScope::Document,
                    FaultKind::TimedOut(timeout),
                )),
            }
        });
        debug!("index maintenance scheduled");
    }

    /// Number of scheduled tasks that have not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Resolve once no maintenance task is in flight.
    ///
    /// Tasks scheduled while waiting are waited for too.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn subscribe_faults(&self) -> broadcast::Receiver<MaintenanceFault> {
        self.faults.subscribe()
    }

    /// Stop accepting queued work: tasks still waiting for a worker report
    /// [`FaultKind::PoolClosed`]; running tasks finish.
    pub fn close(&self) {
        self.workers.close();
    }
}
