//! The keeper worker, ticking the settlement keeper on an interval

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::keeper::SettlementKeeper;

/// The keeper worker
pub struct KeeperWorker {
    /// The settlement keeper
    keeper: SettlementKeeper,
    /// The interval between ticks
    interval: Duration,
    /// The shutdown signal
    cancel: CancellationToken,
}

impl KeeperWorker {
    /// Create a new keeper worker
    pub fn new(keeper: SettlementKeeper, interval: Duration, cancel: CancellationToken) -> Self {
        Self { keeper, interval, cancel }
    }

    /// Run the worker until cancelled
    ///
    /// A tick in progress always runs to completion, so a submitted
    /// transaction is awaited before shutdown
    pub async fn run(mut self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, "keeper started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.keeper.tick(unix_now()).await;
                },
            }
        }

        info!("keeper stopped");
    }
}

/// The current unix timestamp in seconds
fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_utils::{MemorySecretProvider, MockPrizeContract};

    /// Tests that the worker ticks until cancelled and settles due rounds
    #[tokio::test(start_paused = true)]
    async fn test_keeper_worker_ticks() {
        let contract = Arc::new(MockPrizeContract::new(600));
        contract.set_round(1, unix_now() - 10, false);
        let secrets = Arc::new(MemorySecretProvider::default());
        let keeper = SettlementKeeper::new(contract.clone(), secrets.clone());

        let cancel = CancellationToken::new();
        let worker = KeeperWorker::new(keeper, Duration::from_secs(5), cancel.clone());
        let handle = tokio::spawn(worker.run());

        // No secret yet, the first tick skips
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(contract.finalize_calls().is_empty());

        secrets.insert(1, "seed");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(contract.finalize_calls().len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }
}
