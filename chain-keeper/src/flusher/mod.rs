//! The metrics flusher
//!
//! On each interval the flusher swaps the scanner's buffer for an empty one
//! and persists the swapped-out snapshot on a background task. At most one
//! persist is in flight; while it runs the buffer keeps accumulating.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    db::store::MetricsStore,
    scanner::{buffer::MetricsSnapshot, BlockRangeScanner},
    telemetry::{FLUSHES_FAILED_METRIC, FLUSHES_SUCCEEDED_METRIC},
};

/// The outcome of persisting a snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The snapshot held no deltas, nothing was written
    Empty,
    /// The snapshot was persisted
    Persisted {
        /// The number of pair rows written
        pairs: usize,
        /// The scan cursor persisted alongside the rows
        scanned_through: u64,
    },
    /// The snapshot could not be persisted and was dropped
    Failed(String),
}

/// What happened on a flush interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalAction {
    /// The previous persist is still running, the buffer was left in place
    InFlight,
    /// The buffer was empty
    Empty,
    /// A snapshot was swapped out and its persist started
    Started,
}

/// Persists swapped-out metrics snapshots
pub struct MetricsFlusher {
    /// The metrics store
    store: Arc<dyn MetricsStore>,
    /// The persist currently running, if any
    in_flight: Option<JoinHandle<FlushOutcome>>,
}

impl MetricsFlusher {
    /// Create a new flusher
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store, in_flight: None }
    }

    /// Persist a snapshot as a single batched write
    ///
    /// A failed snapshot is dropped, never merged back into the live buffer
    pub async fn flush(&self, snapshot: MetricsSnapshot) -> FlushOutcome {
        persist(self.store.as_ref(), snapshot).await
    }

    /// Swap the scanner's buffer and persist it in the background
    pub fn on_interval(&mut self, scanner: &mut BlockRangeScanner) -> IntervalAction {
        if self.in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("previous flush still in flight, deferring");
            return IntervalAction::InFlight;
        }
        self.in_flight = None;

        if scanner.buffer().is_empty() {
            return IntervalAction::Empty;
        }

        let snapshot = scanner.take_snapshot();
        let store = self.store.clone();
        self.in_flight = Some(tokio::spawn(async move { persist(store.as_ref(), snapshot).await }));
        IntervalAction::Started
    }

    /// Await the in-flight persist, if any
    pub async fn wait_in_flight(&mut self) -> Option<FlushOutcome> {
        let handle = self.in_flight.take()?;
        let outcome = handle.await.unwrap_or_else(|e| {
            error!("flush task failed: {e}");
            FlushOutcome::Failed(e.to_string())
        });

        Some(outcome)
    }

    /// Await the in-flight persist, then flush whatever remains buffered
    pub async fn drain(&mut self, scanner: &mut BlockRangeScanner) -> FlushOutcome {
        self.wait_in_flight().await;
        let snapshot = scanner.take_snapshot();
        self.flush(snapshot).await
    }
}

/// Persist a snapshot, logging and recording the outcome
async fn persist(store: &dyn MetricsStore, snapshot: MetricsSnapshot) -> FlushOutcome {
    if snapshot.is_empty() {
        return FlushOutcome::Empty;
    }

    let pairs = snapshot.deltas.len();
    let scanned_through = snapshot.scanned_through;
    match store.persist_snapshot(&snapshot).await {
        Ok(()) => {
            metrics::counter!(FLUSHES_SUCCEEDED_METRIC).increment(1);
            info!(pairs, scanned_through, "persisted metrics snapshot");
            FlushOutcome::Persisted { pairs, scanned_through }
        },
        Err(e) => {
            metrics::counter!(FLUSHES_FAILED_METRIC).increment(1);
            error!(pairs, scanned_through, "dropping metrics snapshot: {e}");
            FlushOutcome::Failed(e.to_string())
        },
    }
}
