//! Per-pair metric deltas accumulated between flushes

use std::{collections::HashMap, time::Duration};

use alloy::primitives::{Address, U256};
use bigdecimal::{BigDecimal, ToPrimitive};

use crate::{
    db::utils::u256_to_bigdecimal,
    scanner::decode::{LogEvent, PairEvent},
};

/// The number of seconds in a year, used to annualize fee yield
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
/// The basis point denominator
const BPS_DENOMINATOR: u64 = 10_000;

// --------------
// | Pair Delta |
// --------------

/// The metrics accumulated for one pair since the last flush
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairDelta {
    /// The first block with an event folded into this delta
    pub first_block: u64,
    /// The last block with an event folded into this delta
    pub last_block: u64,
    /// The number of swaps
    pub swap_count: u64,
    /// The token0 volume, inflow plus outflow
    pub volume0: U256,
    /// The token1 volume, inflow plus outflow
    pub volume1: U256,
    /// The LP fees paid in token0
    pub fees0: U256,
    /// The LP fees paid in token1
    pub fees1: U256,
    /// The number of reserve updates observed
    pub sync_count: u64,
    /// The latest reserves observed, if any
    pub reserves: Option<(U256, U256)>,
}

impl PairDelta {
    /// Create an empty delta opened at the given block
    pub fn new(block: u64) -> Self {
        Self {
            first_block: block,
            last_block: block,
            swap_count: 0,
            volume0: U256::ZERO,
            volume1: U256::ZERO,
            fees0: U256::ZERO,
            fees1: U256::ZERO,
            sync_count: 0,
            reserves: None,
        }
    }

    /// Fold an event into the delta
    pub fn apply(&mut self, block: u64, event: &PairEvent, fee_bps: u64) {
        self.first_block = self.first_block.min(block);
        self.last_block = self.last_block.max(block);

        match *event {
            PairEvent::Swap { amount0_in, amount1_in, amount0_out, amount1_out } => {
                self.swap_count += 1;
                self.volume0 = self.volume0.saturating_add(amount0_in).saturating_add(amount0_out);
                self.volume1 = self.volume1.saturating_add(amount1_in).saturating_add(amount1_out);
                self.fees0 = self.fees0.saturating_add(fee_of(amount0_in, fee_bps));
                self.fees1 = self.fees1.saturating_add(fee_of(amount1_in, fee_bps));
            },
            PairEvent::Sync { reserve0, reserve1 } => {
                self.sync_count += 1;
                self.reserves = Some((reserve0, reserve1));
            },
        }
    }

    /// The annualized fee yield over the given window, in token0 terms
    ///
    /// Returns `None` without reserves on both sides or for an empty window
    pub fn fee_apr(&self, window: Duration) -> Option<f64> {
        let (reserve0, reserve1) = self.reserves?;
        let window_secs = window.as_secs();
        if reserve0.is_zero() || reserve1.is_zero() || window_secs == 0 {
            return None;
        }

        let r0 = u256_to_bigdecimal(reserve0);
        let r1 = u256_to_bigdecimal(reserve1);
        let fees_in_token0 =
            u256_to_bigdecimal(self.fees0) + u256_to_bigdecimal(self.fees1) * &r0 / &r1;
        let tvl_in_token0 = r0 * BigDecimal::from(2u8);

        let period_yield = fees_in_token0 / tvl_in_token0;
        let annualized = period_yield * BigDecimal::from(SECONDS_PER_YEAR)
            / BigDecimal::from(window_secs);
        annualized.to_f64()
    }
}

/// The LP fee charged on an input amount
fn fee_of(amount_in: U256, fee_bps: u64) -> U256 {
    amount_in.saturating_mul(U256::from(fee_bps)) / U256::from(BPS_DENOMINATOR)
}

// -----------------------
// | Buffer and Snapshot |
// -----------------------

/// The per-pair deltas accumulated since the last flush
#[derive(Debug, Default)]
pub struct MetricsBuffer {
    /// The deltas, keyed by pair address
    deltas: HashMap<Address, PairDelta>,
}

impl MetricsBuffer {
    /// Fold a decoded event into the emitting pair's delta
    pub fn fold(&mut self, event: &LogEvent, fee_bps: u64) {
        self.deltas
            .entry(event.emitting_address)
            .or_insert_with(|| PairDelta::new(event.block_number))
            .apply(event.block_number, &event.event, fee_bps);
    }

    /// Whether the buffer holds no deltas
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// The delta accumulated for a pair
    pub fn get(&self, pair: &Address) -> Option<&PairDelta> {
        self.deltas.get(pair)
    }

    /// Swap the deltas out for an empty map
    pub fn take(&mut self) -> HashMap<Address, PairDelta> {
        std::mem::take(&mut self.deltas)
    }
}

/// A swapped-out buffer, ready to be persisted
#[derive(Clone, Debug)]
pub struct MetricsSnapshot {
    /// The deltas, keyed by pair address
    pub deltas: HashMap<Address, PairDelta>,
    /// The scan cursor at the time of the swap
    pub scanned_through: u64,
    /// The wall-clock window the deltas were accumulated over
    pub window: Duration,
}

impl MetricsSnapshot {
    /// Whether the snapshot holds no deltas
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
