//! The watcher worker, driving the scanner and the flusher

use std::{sync::Arc, time::Duration};

use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    chain_client::{heads::HeadSubscription, HeadSource},
    flusher::MetricsFlusher,
    scanner::BlockRangeScanner,
};

/// The watcher worker's timing configuration
#[derive(Clone, Debug)]
pub struct WatcherConfig {
    /// The websocket URL to subscribe to new heads on, if any
    pub ws_url: Option<String>,
    /// The interval at which the head is polled
    pub head_poll_interval: Duration,
    /// The interval at which buffered metrics are flushed
    pub flush_interval: Duration,
}

/// The watcher worker
///
/// Scans on every new head, from the websocket subscription when available
/// and from a poll timer regardless, and flushes on a fixed interval
pub struct WatcherWorker {
    /// The worker's configuration
    config: WatcherConfig,
    /// The block range scanner
    scanner: BlockRangeScanner,
    /// The metrics flusher
    flusher: MetricsFlusher,
    /// The source of the current head for polling
    heads: Arc<dyn HeadSource>,
    /// The shutdown signal
    cancel: CancellationToken,
}

impl WatcherWorker {
    /// Create a new watcher worker
    pub fn new(
        config: WatcherConfig,
        scanner: BlockRangeScanner,
        flusher: MetricsFlusher,
        heads: Arc<dyn HeadSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self { config, scanner, flusher, heads, cancel }
    }

    /// Run the worker until cancelled, then drain the buffer
    pub async fn run(mut self) {
        let mut subscription = match self.config.ws_url.as_deref() {
            Some(url) => match HeadSubscription::connect(url).await {
                Ok(sub) => Some(sub),
                Err(e) => {
                    warn!("head subscription failed, polling only: {e}");
                    None
                },
            },
            None => None,
        };

        let mut poll = interval(self.config.head_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let flush_interval = self.config.flush_interval;
        let mut flush = interval_at(Instant::now() + flush_interval, flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(last_block_scanned = self.scanner.cursor().last_block_scanned(), "watcher started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                head = next_head(&mut subscription) => match head {
                    Some(block) => {
                        self.scanner.scan(block).await;
                    },
                    None => {
                        warn!("head subscription ended, continuing on polling");
                        subscription = None;
                    },
                },
                _ = poll.tick() => self.poll_head().await,
                _ = flush.tick() => {
                    self.flusher.on_interval(&mut self.scanner);
                },
            }
        }

        info!("watcher shutting down, draining metrics");
        self.flusher.drain(&mut self.scanner).await;
    }

    /// Poll the chain head and scan up to it
    async fn poll_head(&mut self) {
        match self.heads.block_number().await {
            Ok(block) => {
                self.scanner.scan(block).await;
            },
            Err(e) => warn!("failed to poll head: {e}"),
        }
    }
}

/// Await the next head from the subscription, or never if there is none
async fn next_head(subscription: &mut Option<HeadSubscription>) -> Option<u64> {
    match subscription {
        Some(sub) => sub.next_head().await,
        None => std::future::pending().await,
    }
}
