//! Interface methods for interacting with the pair metrics table

use alloy::primitives::Address;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::db::{
    client::{DbClient, DbConn},
    error::DbError,
    models::{NewPairMetricsModel, PairMetricsModel},
    schema::pair_metrics,
};

impl DbClient {
    // -----------
    // | Setters |
    // -----------

    /// Insert a batch of pair metrics rows
    pub async fn insert_pair_metrics(
        &self,
        rows: &[NewPairMetricsModel],
        conn: &mut DbConn<'_>,
    ) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        diesel::insert_into(pair_metrics::table)
            .values(rows)
            .execute(conn)
            .await
            .map_err(DbError::from)
    }

    // -----------
    // | Getters |
    // -----------

    /// Get all metrics rows for a pair, oldest first
    pub async fn get_pair_metrics(
        &self,
        pair: Address,
        conn: &mut DbConn<'_>,
    ) -> Result<Vec<PairMetricsModel>, DbError> {
        pair_metrics::table
            .filter(pair_metrics::pair_address.eq(pair.to_string()))
            .order(pair_metrics::id.asc())
            .select(PairMetricsModel::as_select())
            .load(conn)
            .await
            .map_err(DbError::from)
    }
}
