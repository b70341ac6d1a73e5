//! Log queries against monitored pairs

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use async_trait::async_trait;

use crate::{
    chain_client::{
        abis::IPair::{Swap, Sync},
        error::ChainClientError,
        ChainClient, LogSource,
    },
    scanner::cursor::BlockRange,
};

/// Build the log filter for a pair over an inclusive block range
///
/// Both event signatures are queried as a single topic0 set
pub(crate) fn pair_filter(pair: Address, range: BlockRange) -> Filter {
    Filter::new()
        .address(pair)
        .event_signature(vec![Swap::SIGNATURE_HASH, Sync::SIGNATURE_HASH])
        .from_block(range.from)
        .to_block(range.to)
}

#[async_trait]
impl LogSource for ChainClient {
    async fn get_logs(
        &self,
        pair: Address,
        range: BlockRange,
    ) -> Result<Vec<Log>, ChainClientError> {
        let filter = pair_filter(pair, range);
        self.provider().get_logs(&filter).await.map_err(ChainClientError::from)
    }
}
