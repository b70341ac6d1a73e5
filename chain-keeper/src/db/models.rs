//! Type bindings for the keeper's database table records

use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use diesel::{
    prelude::{Insertable, Queryable},
    Selectable,
};

use crate::{
    db::{
        error::DbError,
        utils::{u256_to_bigdecimal, u64_to_i64},
    },
    scanner::buffer::PairDelta,
};

// ----------------
// | Table Models |
// ----------------

// === Pair Metrics Table ===

/// A pair metrics row to insert
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::db::schema::pair_metrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPairMetricsModel {
    /// The pair address
    pub pair_address: String,
    /// The first block with an event in the window
    pub first_block: i64,
    /// The last block with an event in the window
    pub last_block: i64,
    /// The scan cursor at the time of the flush
    pub scanned_through: i64,
    /// The number of swaps
    pub swap_count: i64,
    /// The token0 volume
    pub volume0: BigDecimal,
    /// The token1 volume
    pub volume1: BigDecimal,
    /// The LP fees paid in token0
    pub fees0: BigDecimal,
    /// The LP fees paid in token1
    pub fees1: BigDecimal,
    /// The number of reserve updates
    pub sync_count: i64,
    /// The latest token0 reserve
    pub reserve0: Option<BigDecimal>,
    /// The latest token1 reserve
    pub reserve1: Option<BigDecimal>,
    /// The annualized fee yield estimate
    pub fee_apr: Option<f64>,
    /// The length of the accumulation window in seconds
    pub window_secs: i64,
    /// The unix timestamp of the flush
    pub flushed_at: i64,
}

/// The snapshot-level fields shared by every row of a flush
#[derive(Clone, Copy, Debug)]
pub struct FlushContext {
    /// The scan cursor at the time of the flush
    pub scanned_through: u64,
    /// The length of the accumulation window in seconds
    pub window_secs: u64,
    /// The unix timestamp of the flush
    pub flushed_at: u64,
}

impl NewPairMetricsModel {
    /// Build a row from a pair's delta
    pub fn from_delta(
        pair: Address,
        delta: &PairDelta,
        fee_apr: Option<f64>,
        ctx: FlushContext,
    ) -> Result<Self, DbError> {
        let (reserve0, reserve1) = match delta.reserves {
            Some((r0, r1)) => (Some(u256_to_bigdecimal(r0)), Some(u256_to_bigdecimal(r1))),
            None => (None, None),
        };

        Ok(Self {
            pair_address: pair.to_string(),
            first_block: u64_to_i64(delta.first_block)?,
            last_block: u64_to_i64(delta.last_block)?,
            scanned_through: u64_to_i64(ctx.scanned_through)?,
            swap_count: u64_to_i64(delta.swap_count)?,
            volume0: u256_to_bigdecimal(delta.volume0),
            volume1: u256_to_bigdecimal(delta.volume1),
            fees0: u256_to_bigdecimal(delta.fees0),
            fees1: u256_to_bigdecimal(delta.fees1),
            sync_count: u64_to_i64(delta.sync_count)?,
            reserve0,
            reserve1,
            fee_apr,
            window_secs: u64_to_i64(ctx.window_secs)?,
            flushed_at: u64_to_i64(ctx.flushed_at)?,
        })
    }
}

/// A persisted pair metrics row
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::db::schema::pair_metrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PairMetricsModel {
    /// The row id
    pub id: i64,
    /// The pair address
    pub pair_address: String,
    /// The first block with an event in the window
    pub first_block: i64,
    /// The last block with an event in the window
    pub last_block: i64,
    /// The scan cursor at the time of the flush
    pub scanned_through: i64,
    /// The number of swaps
    pub swap_count: i64,
    /// The token0 volume
    pub volume0: BigDecimal,
    /// The token1 volume
    pub volume1: BigDecimal,
    /// The LP fees paid in token0
    pub fees0: BigDecimal,
    /// The LP fees paid in token1
    pub fees1: BigDecimal,
    /// The number of reserve updates
    pub sync_count: i64,
    /// The latest token0 reserve
    pub reserve0: Option<BigDecimal>,
    /// The latest token1 reserve
    pub reserve1: Option<BigDecimal>,
    /// The annualized fee yield estimate
    pub fee_apr: Option<f64>,
    /// The length of the accumulation window in seconds
    pub window_secs: i64,
    /// The unix timestamp of the flush
    pub flushed_at: i64,
}

// === Monitored Pairs Table ===

/// A monitored pair record
#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::db::schema::monitored_pairs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MonitoredPairModel {
    /// The pair address
    pub address: String,
    /// Whether the pair is currently monitored
    pub active: bool,
}
