//! Interface methods for interacting with the monitored pairs table

use std::str::FromStr;

use alloy::primitives::Address;
use diesel::{upsert::excluded, ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::db::{
    client::{DbClient, DbConn},
    error::DbError,
    models::MonitoredPairModel,
    schema::monitored_pairs,
};

impl DbClient {
    // -----------
    // | Setters |
    // -----------

    /// Insert a pair, or update its active flag if it already exists
    pub async fn upsert_monitored_pair(
        &self,
        pair: Address,
        active: bool,
        conn: &mut DbConn<'_>,
    ) -> Result<(), DbError> {
        let model = MonitoredPairModel { address: pair.to_string(), active };

        diesel::insert_into(monitored_pairs::table)
            .values(&model)
            .on_conflict(monitored_pairs::address)
            .do_update()
            .set(monitored_pairs::active.eq(excluded(monitored_pairs::active)))
            .execute(conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    // -----------
    // | Getters |
    // -----------

    /// Get the addresses of all active monitored pairs
    pub async fn get_active_monitored_pairs(
        &self,
        conn: &mut DbConn<'_>,
    ) -> Result<Vec<Address>, DbError> {
        let models: Vec<MonitoredPairModel> = monitored_pairs::table
            .filter(monitored_pairs::active.eq(true))
            .select(MonitoredPairModel::as_select())
            .load(conn)
            .await
            .map_err(DbError::from)?;

        models
            .into_iter()
            .map(|m| Address::from_str(&m.address).map_err(DbError::conversion))
            .collect()
    }
}
