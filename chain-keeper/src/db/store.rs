//! The metrics store consumed by the flusher

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};

use crate::{
    db::{
        client::DbClient,
        error::DbError,
        models::{FlushContext, NewPairMetricsModel},
    },
    scanner::buffer::MetricsSnapshot,
};

/// A persistent store for metrics snapshots and the scan cursor
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Persist a snapshot and advance the stored cursor to the snapshot's
    /// scan position, atomically
    async fn persist_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<(), DbError>;
    /// Load the stored cursor, if one exists
    async fn load_cursor(&self) -> Result<Option<u64>, DbError>;
}

#[async_trait]
impl MetricsStore for DbClient {
    async fn persist_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<(), DbError> {
        let rows = snapshot_rows(snapshot, unix_now())?;
        let scanned_through = snapshot.scanned_through;

        let mut conn = self.get_db_conn().await?;
        conn.transaction(|conn| {
            async move {
                self.insert_pair_metrics(&rows, conn).await?;
                self.advance_scan_cursor(scanned_through, conn).await?;
                Ok::<_, DbError>(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn load_cursor(&self) -> Result<Option<u64>, DbError> {
        let mut conn = self.get_db_conn().await?;
        self.get_scan_cursor(&mut conn).await
    }
}

/// Build the rows for a snapshot, one per pair
pub fn snapshot_rows(
    snapshot: &MetricsSnapshot,
    flushed_at: u64,
) -> Result<Vec<NewPairMetricsModel>, DbError> {
    let ctx = FlushContext {
        scanned_through: snapshot.scanned_through,
        window_secs: snapshot.window.as_secs(),
        flushed_at,
    };

    snapshot
        .deltas
        .iter()
        .map(|(pair, delta)| {
            NewPairMetricsModel::from_delta(*pair, delta, delta.fee_apr(snapshot.window), ctx)
        })
        .collect()
}

/// The current unix timestamp in seconds
fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use std::{collections::HashMap, time::Duration};

    use alloy::primitives::{address, U256};

    use super::*;
    use crate::{
        db::{
            error::DbError,
            test_utils::{cleanup_test_db, setup_test_db_client},
            utils::bigdecimal_to_u256,
        },
        pairs::PairSource,
        scanner::buffer::PairDelta,
    };

    /// Build a snapshot with a single pair delta
    fn snapshot(scanned_through: u64, swaps: u64) -> MetricsSnapshot {
        let pair = address!("0x00000000000000000000000000000000000000aa");
        let mut delta = PairDelta::new(scanned_through);
        delta.swap_count = swaps;
        delta.volume0 = U256::MAX;

        MetricsSnapshot {
            deltas: HashMap::from([(pair, delta)]),
            scanned_through,
            window: Duration::from_secs(30),
        }
    }

    /// Tests that persisting a snapshot writes its rows and advances the
    /// cursor monotonically
    #[tokio::test(flavor = "multi_thread")]
    async fn test_persist_snapshot() -> Result<(), DbError> {
        let test_db = setup_test_db_client().await?;
        let client = test_db.get_client();

        assert_eq!(client.load_cursor().await?, None);

        client.persist_snapshot(&snapshot(150, 2)).await?;
        assert_eq!(client.load_cursor().await?, Some(150));

        // An older snapshot never moves the cursor backwards
        client.persist_snapshot(&snapshot(120, 1)).await?;
        assert_eq!(client.load_cursor().await?, Some(150));

        let pair = address!("0x00000000000000000000000000000000000000aa");
        let mut conn = client.get_db_conn().await?;
        let rows = client.get_pair_metrics(pair, &mut conn).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].swap_count, 2);
        assert_eq!(bigdecimal_to_u256(rows[0].volume0.clone())?, U256::MAX);
        drop(conn);

        cleanup_test_db(test_db).await
    }

    /// Tests that the pair source reads only active pairs
    #[tokio::test(flavor = "multi_thread")]
    async fn test_monitored_pairs() -> Result<(), DbError> {
        let test_db = setup_test_db_client().await?;
        let client = test_db.get_client();

        let a = address!("0x00000000000000000000000000000000000000aa");
        let b = address!("0x00000000000000000000000000000000000000bb");
        let mut conn = client.get_db_conn().await?;
        client.upsert_monitored_pair(a, true, &mut conn).await?;
        client.upsert_monitored_pair(b, true, &mut conn).await?;
        client.upsert_monitored_pair(b, false, &mut conn).await?;
        drop(conn);

        let pairs = client.load_monitored_pairs().await?;
        assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![a]);

        cleanup_test_db(test_db).await
    }
}
