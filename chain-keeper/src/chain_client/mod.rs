//! A client for reading chain state and submitting settlement transactions
//!
//! The scanner and the keeper consume the chain through the traits defined
//! here so that both loops may be driven by in-memory sources in tests

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxHash},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::Log,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use crate::{
    chain_client::{abis::IPrizeRounds::IPrizeRoundsInstance, error::ChainClientError},
    scanner::cursor::BlockRange,
};

#[allow(missing_docs)]
#[allow(clippy::missing_docs_in_private_items)]
pub mod abis;
pub mod error;
pub mod heads;
mod logs;
mod prize;

// ----------
// | Traits |
// ----------

/// A source of pair event logs
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the swap and sync logs emitted by the given pair in the given
    /// inclusive block range
    async fn get_logs(
        &self,
        pair: Address,
        range: BlockRange,
    ) -> Result<Vec<Log>, ChainClientError>;
}

/// A source of the current chain head
#[async_trait]
pub trait HeadSource: Send + Sync {
    /// Get the latest block number
    async fn block_number(&self) -> Result<u64, ChainClientError>;
}

/// The on-chain record of a prize round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundRecord {
    /// The timestamp at which the round's deadline passes
    pub end_ts: u64,
    /// Whether the round has been finalized
    pub finalized: bool,
}

/// The prize round contract's read and write surface
#[async_trait]
pub trait PrizeContract: Send + Sync {
    /// Get the id of the current round, zero if no round has started
    async fn current_round_id(&self) -> Result<u64, ChainClientError>;
    /// Get the record of the round with the given id
    async fn round(&self, round_id: u64) -> Result<RoundRecord, ChainClientError>;
    /// Get the claim window length in seconds
    async fn claim_window_secs(&self) -> Result<u64, ChainClientError>;
    /// Finalize the given round with its secret, returning once the
    /// transaction is confirmed
    async fn finalize(&self, round_id: u64, secret: Bytes) -> Result<TxHash, ChainClientError>;
    /// Roll over the given expired round, returning once the transaction is
    /// confirmed
    async fn rollover(&self, round_id: u64) -> Result<TxHash, ChainClientError>;
}

// ----------
// | Client |
// ----------

/// The confirmation requirements for settlement transactions
#[derive(Clone, Copy, Debug)]
pub struct ConfirmationConfig {
    /// The number of confirmations to wait for
    pub required_confirmations: u64,
    /// The maximum time to wait for a receipt
    pub timeout: Duration,
}

/// A client for the chain, backed by a JSON-RPC provider
#[derive(Clone)]
pub struct ChainClient {
    /// The RPC provider, with the settlement signer attached
    provider: DynProvider,
    /// The prize round contract instance
    prize: IPrizeRoundsInstance<DynProvider>,
    /// The confirmation requirements for settlement transactions
    confirmation: ConfirmationConfig,
}

impl ChainClient {
    /// Create a new chain client
    pub async fn new(
        rpc_url: &str,
        prize_address: Address,
        signer: PrivateKeySigner,
        confirmation: ConfirmationConfig,
    ) -> Result<Self, ChainClientError> {
        let provider = ProviderBuilder::new().wallet(signer).connect(rpc_url).await?;
        let provider = DynProvider::new(provider);
        let prize = IPrizeRoundsInstance::new(prize_address, provider.clone());

        Ok(Self { provider, prize, confirmation })
    }

    /// Get a reference to the underlying RPC provider
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Get the address of the prize round contract
    pub fn prize_address(&self) -> Address {
        *self.prize.address()
    }
}

#[async_trait]
impl HeadSource for ChainClient {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        self.provider.get_block_number().await.map_err(ChainClientError::from)
    }
}
