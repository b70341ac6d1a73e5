//! Sources of the monitored pair set

use std::collections::BTreeSet;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::db::{client::DbClient, error::DbError};

/// A source of the set of pairs to monitor
///
/// The set is read once per scan iteration
#[async_trait]
pub trait PairSource: Send + Sync {
    /// Load the current monitored pair set
    async fn load_monitored_pairs(&self) -> Result<BTreeSet<Address>, DbError>;
}

/// A fixed pair set supplied at startup
#[derive(Clone, Debug)]
pub struct StaticPairSource {
    /// The monitored pairs
    pairs: BTreeSet<Address>,
}

impl StaticPairSource {
    /// Create a new static pair source
    pub fn new(pairs: impl IntoIterator<Item = Address>) -> Self {
        Self { pairs: pairs.into_iter().collect() }
    }
}

#[async_trait]
impl PairSource for StaticPairSource {
    async fn load_monitored_pairs(&self) -> Result<BTreeSet<Address>, DbError> {
        Ok(self.pairs.clone())
    }
}

#[async_trait]
impl PairSource for DbClient {
    async fn load_monitored_pairs(&self) -> Result<BTreeSet<Address>, DbError> {
        let mut conn = self.get_db_conn().await?;
        let pairs = self.get_active_monitored_pairs(&mut conn).await?;
        Ok(pairs.into_iter().collect())
    }
}
