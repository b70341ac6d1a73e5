//! Reads and settlement writes against the prize round contract

use alloy::{
    contract::SolCallBuilder,
    network::{Ethereum, ReceiptResponse},
    primitives::{Bytes, TxHash, U256},
    providers::DynProvider,
    sol_types::SolCall,
};
use async_trait::async_trait;
use tracing::info;

use crate::chain_client::{error::ChainClientError, ChainClient, PrizeContract, RoundRecord};

impl ChainClient {
    /// Send a settlement call and wait for its receipt
    ///
    /// A timeout or a reverted receipt is a failure
    async fn send_and_confirm<C: SolCall>(
        &self,
        call: SolCallBuilder<&DynProvider, C, Ethereum>,
    ) -> Result<TxHash, ChainClientError> {
        let pending = call.send().await?;
        let tx_hash = *pending.tx_hash();
        info!("submitted {} tx {tx_hash:#x}", C::SIGNATURE);

        let receipt = pending
            .with_required_confirmations(self.confirmation.required_confirmations)
            .with_timeout(Some(self.confirmation.timeout))
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(ChainClientError::Reverted(format!("{tx_hash:#x}")));
        }

        Ok(tx_hash)
    }
}

#[async_trait]
impl PrizeContract for ChainClient {
    async fn current_round_id(&self) -> Result<u64, ChainClientError> {
        let id = self.prize.currentRoundId().call().await?;
        u256_to_u64(id)
    }

    async fn round(&self, round_id: u64) -> Result<RoundRecord, ChainClientError> {
        let round = self.prize.rounds(U256::from(round_id)).call().await?;
        Ok(RoundRecord { end_ts: u256_to_u64(round.endTs)?, finalized: round.finalized })
    }

    async fn claim_window_secs(&self) -> Result<u64, ChainClientError> {
        let window = self.prize.claimWindow().call().await?;
        u256_to_u64(window)
    }

    async fn finalize(&self, round_id: u64, secret: Bytes) -> Result<TxHash, ChainClientError> {
        info!(round_id, "submitting finalize");
        self.send_and_confirm(self.prize.finalize(secret)).await
    }

    async fn rollover(&self, round_id: u64) -> Result<TxHash, ChainClientError> {
        info!(round_id, "submitting rollover");
        self.send_and_confirm(self.prize.rolloverIfExpired(U256::from(round_id))).await
    }
}

/// Convert a contract integer into a `u64`
fn u256_to_u64(value: U256) -> Result<u64, ChainClientError> {
    u64::try_from(value).map_err(|_| ChainClientError::conversion(format!("{value} exceeds u64")))
}
