//! Decoding of raw pair logs into typed events

use alloy::{
    primitives::{Address, TxHash, B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{
    chain_client::abis::IPair::{Swap, Sync},
    scanner::error::ScanError,
};

/// A decoded pair event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairEvent {
    /// A swap through the pair
    Swap {
        /// The amount of token0 sent into the pair
        amount0_in: U256,
        /// The amount of token1 sent into the pair
        amount1_in: U256,
        /// The amount of token0 sent out of the pair
        amount0_out: U256,
        /// The amount of token1 sent out of the pair
        amount1_out: U256,
    },
    /// A reserve update, a price sample
    Sync {
        /// The reserve of token0
        reserve0: U256,
        /// The reserve of token1
        reserve1: U256,
    },
}

/// A matched on-chain event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    /// The address that emitted the event
    pub emitting_address: Address,
    /// The event's topic0
    pub topic: B256,
    /// The block the event was emitted in
    pub block_number: u64,
    /// The hash of the transaction that emitted the event
    pub transaction_hash: Option<TxHash>,
    /// The decoded event fields
    pub event: PairEvent,
}

/// Decode a raw log into a pair event
pub fn decode_log(log: &Log) -> Result<LogEvent, ScanError> {
    let topic = *log.topic0().ok_or_else(|| ScanError::decode("log has no topics"))?;
    let block_number =
        log.block_number.ok_or_else(|| ScanError::decode("log has no block number"))?;

    let event = if topic == Swap::SIGNATURE_HASH {
        let swap = log.log_decode::<Swap>().map_err(ScanError::decode)?.inner.data;
        PairEvent::Swap {
            amount0_in: swap.amount0In,
            amount1_in: swap.amount1In,
            amount0_out: swap.amount0Out,
            amount1_out: swap.amount1Out,
        }
    } else if topic == Sync::SIGNATURE_HASH {
        let sync = log.log_decode::<Sync>().map_err(ScanError::decode)?.inner.data;
        PairEvent::Sync { reserve0: U256::from(sync.reserve0), reserve1: U256::from(sync.reserve1) }
    } else {
        return Err(ScanError::decode(format!("unexpected topic {topic}")));
    };

    Ok(LogEvent {
        emitting_address: log.address(),
        topic,
        block_number,
        transaction_hash: log.transaction_hash,
        event,
    })
}
