//! Logging setup and metric names

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ----------------
// | Metric Names |
// ----------------

/// The number of logs folded into the metrics buffer
pub const LOGS_FOLDED_METRIC: &str = "scanner_logs_folded";
/// The number of logs skipped because they failed to decode
pub const LOGS_SKIPPED_METRIC: &str = "scanner_logs_skipped";
/// The number of per-pair log queries that failed
pub const PAIR_QUERIES_FAILED_METRIC: &str = "scanner_pair_queries_failed";
/// The number of blocks scanned
pub const BLOCKS_SCANNED_METRIC: &str = "scanner_blocks_scanned";
/// The number of snapshots persisted
pub const FLUSHES_SUCCEEDED_METRIC: &str = "flusher_snapshots_persisted";
/// The number of snapshots dropped after a persistence failure
pub const FLUSHES_FAILED_METRIC: &str = "flusher_snapshots_dropped";
/// The number of settlement transactions confirmed
pub const SETTLEMENTS_CONFIRMED_METRIC: &str = "keeper_settlements_confirmed";
/// The number of settlement attempts that failed
pub const SETTLEMENTS_FAILED_METRIC: &str = "keeper_settlements_failed";

/// The metric label for the settlement action kind
pub const ACTION_LABEL: &str = "action";

// -----------
// | Logging |
// -----------

/// Configure the logging subscriber
///
/// Datadog logging emits flattened JSON events with file and line numbers
pub fn setup_logging(datadog: bool) {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if datadog {
        registry
            .with(fmt::layer().with_file(true).with_line_number(true).json().flatten_event(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}
