//! Common database utilities

use alloy::primitives::U256;
use bigdecimal::{
    num_bigint::{BigInt, Sign},
    BigDecimal,
};

use crate::db::error::DbError;

/// Convert a `U256` to a `BigDecimal`
pub fn u256_to_bigdecimal(value: U256) -> BigDecimal {
    let bigint = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    BigDecimal::from(bigint)
}

/// Convert a `BigDecimal` to a `U256`
pub fn bigdecimal_to_u256(value: BigDecimal) -> Result<U256, DbError> {
    if !value.is_integer() {
        return Err(DbError::conversion("non-integral amount"));
    }

    let (bigint, _) = value.with_scale(0).into_bigint_and_exponent();
    let (sign, bytes) = bigint.to_bytes_be();
    if sign == Sign::Minus {
        return Err(DbError::conversion("negative amount"));
    }

    U256::try_from_be_slice(&bytes).ok_or_else(|| DbError::conversion("amount exceeds 256 bits"))
}

/// Convert a block number or count to its column type
pub fn u64_to_i64(value: u64) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_| DbError::conversion(format!("{value} exceeds i64")))
}
