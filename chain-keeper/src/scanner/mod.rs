//! The block range scanner
//!
//! The scanner owns the scan cursor and the metrics buffer. Each trigger
//! computes the unprocessed range, fetches the logs of every monitored pair
//! over it, and folds the decoded events into the buffer.

use std::sync::Arc;

use alloy::{primitives::Address, rpc::types::Log};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{
    chain_client::LogSource,
    pairs::PairSource,
    scanner::{
        buffer::{MetricsBuffer, MetricsSnapshot},
        cursor::{BlockRange, CursorPolicy, ScanCursor},
        decode::decode_log,
    },
    telemetry::{
        BLOCKS_SCANNED_METRIC, LOGS_FOLDED_METRIC, LOGS_SKIPPED_METRIC,
        PAIR_QUERIES_FAILED_METRIC,
    },
};

pub mod buffer;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod worker;

// ---------
// | Types |
// ---------

/// The scanner configuration
#[derive(Clone, Copy, Debug)]
pub struct ScannerConfig {
    /// When the cursor advances relative to the fetch
    pub policy: CursorPolicy,
    /// The number of blocks behind a trigger to hold back
    pub confirmation_depth: u64,
    /// The maximum number of blocks per log query
    pub max_block_range: u64,
    /// The pair swap fee in basis points
    pub swap_fee_bps: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            policy: CursorPolicy::default(),
            confirmation_depth: 0,
            max_block_range: 2000,
            swap_fee_bps: 30,
        }
    }
}

/// A failed log query for one pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairFailure {
    /// The pair whose query failed
    pub pair: Address,
    /// The chunk that failed; later chunks for the pair were not queried
    pub chunk: BlockRange,
    /// The error message
    pub error: String,
}

/// The outcome of a scan over a block range
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeReport {
    /// The range scanned
    pub range: BlockRange,
    /// The number of pairs queried
    pub pairs_queried: usize,
    /// The pairs whose queries failed
    pub failures: Vec<PairFailure>,
    /// The number of logs folded into the buffer
    pub logs_folded: usize,
    /// The number of logs that failed to decode
    pub logs_skipped: usize,
    /// Whether the cursor now covers the range
    pub cursor_advanced: bool,
}

/// The outcome of a scan trigger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanReport {
    /// The trigger was at or behind the cursor
    Stale {
        /// The trigger block
        trigger: u64,
        /// The last block scanned
        last_block_scanned: u64,
    },
    /// The monitored pair set could not be loaded; the cursor did not move
    PairsUnavailable {
        /// The range that would have been scanned
        range: BlockRange,
        /// The error message
        error: String,
    },
    /// The range was scanned
    Scanned(RangeReport),
}

// -----------
// | Scanner |
// -----------

/// Scans block ranges for pair events and accumulates their metrics
pub struct BlockRangeScanner {
    /// The scanner configuration
    config: ScannerConfig,
    /// The last block scanned
    cursor: ScanCursor,
    /// The metrics accumulated since the last snapshot
    buffer: MetricsBuffer,
    /// When the current buffer was opened
    buffer_opened_at: Instant,
    /// The source of pair logs
    logs: Arc<dyn LogSource>,
    /// The source of the monitored pair set
    pairs: Arc<dyn PairSource>,
}

impl BlockRangeScanner {
    /// Create a new scanner positioned at the given cursor
    pub fn new(
        config: ScannerConfig,
        cursor: ScanCursor,
        logs: Arc<dyn LogSource>,
        pairs: Arc<dyn PairSource>,
    ) -> Self {
        Self {
            config,
            cursor,
            buffer: MetricsBuffer::default(),
            buffer_opened_at: Instant::now(),
            logs,
            pairs,
        }
    }

    /// The scan cursor
    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    /// The metrics buffer
    pub fn buffer(&self) -> &MetricsBuffer {
        &self.buffer
    }

    /// Scan the range up to the given trigger block
    #[instrument(skip(self), fields(last = self.cursor.last_block_scanned()))]
    pub async fn scan(&mut self, trigger: u64) -> ScanReport {
        let target = trigger.saturating_sub(self.config.confirmation_depth);
        let Some(range) = self.cursor.pending_range(target) else {
            debug!("stale trigger");
            return ScanReport::Stale {
                trigger,
                last_block_scanned: self.cursor.last_block_scanned(),
            };
        };

        let pairs = match self.pairs.load_monitored_pairs().await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(%range, "failed to load monitored pairs: {e}");
                return ScanReport::PairsUnavailable { range, error: e.to_string() };
            },
        };

        if self.config.policy == CursorPolicy::AdvanceBeforeFetch {
            self.cursor.advance_to(range.to);
        }

        let mut staged = Vec::new();
        let mut failures = Vec::new();
        for pair in pairs.iter().copied() {
            if let Err(failure) = self.fetch_pair(pair, range, &mut staged).await {
                failures.push(failure);
            }
        }
        metrics::counter!(PAIR_QUERIES_FAILED_METRIC).increment(failures.len() as u64);

        let mut report = RangeReport {
            range,
            pairs_queried: pairs.len(),
            failures,
            logs_folded: 0,
            logs_skipped: 0,
            cursor_advanced: true,
        };

        match self.config.policy {
            CursorPolicy::AdvanceBeforeFetch => self.fold_logs(&staged, &mut report),
            CursorPolicy::AdvanceAfterFetch if report.failures.is_empty() => {
                self.fold_logs(&staged, &mut report);
                self.cursor.advance_to(range.to);
            },
            CursorPolicy::AdvanceAfterFetch => {
                warn!(%range, "discarding {} staged logs, range will be retried", staged.len());
                report.cursor_advanced = false;
            },
        }

        if report.cursor_advanced {
            metrics::counter!(BLOCKS_SCANNED_METRIC).increment(range.block_count());
        }

        info!(
            %range,
            pairs = report.pairs_queried,
            failed = report.failures.len(),
            folded = report.logs_folded,
            skipped = report.logs_skipped,
            "scanned range"
        );
        ScanReport::Scanned(report)
    }

    /// Swap out the buffer for an empty one
    pub fn take_snapshot(&mut self) -> MetricsSnapshot {
        let window = self.buffer_opened_at.elapsed();
        self.buffer_opened_at = Instant::now();

        MetricsSnapshot {
            deltas: self.buffer.take(),
            scanned_through: self.cursor.last_block_scanned(),
            window,
        }
    }

    // -----------
    // | Helpers |
    // -----------

    /// Fetch a pair's logs over the range, chunk by chunk
    ///
    /// A failed chunk stops the remaining chunks for the pair
    async fn fetch_pair(
        &self,
        pair: Address,
        range: BlockRange,
        staged: &mut Vec<Log>,
    ) -> Result<(), PairFailure> {
        for chunk in range.chunks(self.config.max_block_range) {
            match self.logs.get_logs(pair, chunk).await {
                Ok(logs) => staged.extend(logs),
                Err(e) => {
                    warn!(%pair, %chunk, "log query failed: {e}");
                    return Err(PairFailure { pair, chunk, error: e.to_string() });
                },
            }
        }

        Ok(())
    }

    /// Decode and fold staged logs into the buffer
    fn fold_logs(&mut self, logs: &[Log], report: &mut RangeReport) {
        for log in logs {
            match decode_log(log) {
                Ok(event) => {
                    self.buffer.fold(&event, self.config.swap_fee_bps);
                    report.logs_folded += 1;
                },
                Err(e) => {
                    debug!(address = %log.address(), "skipping log: {e}");
                    report.logs_skipped += 1;
                },
            }
        }

        metrics::counter!(LOGS_FOLDED_METRIC).increment(report.logs_folded as u64);
        metrics::counter!(LOGS_SKIPPED_METRIC).increment(report.logs_skipped as u64);
    }
}
