//! Interface methods for interacting with the scan cursor table

use diesel::{
    sql_query,
    sql_types::{BigInt, Integer},
    ExpressionMethods, OptionalExtension, QueryDsl,
};
use diesel_async::RunQueryDsl;

use crate::db::{
    client::{DbClient, DbConn},
    error::DbError,
    schema::scan_cursor,
    utils::u64_to_i64,
    SINGLETON_ROW_ID,
};

/// Upsert the cursor row, never moving it backwards
const ADVANCE_CURSOR_QUERY: &str = r#"
    INSERT INTO scan_cursor (id, last_block_scanned)
    VALUES ($1, $2)
    ON CONFLICT (id) DO UPDATE
    SET last_block_scanned = GREATEST(scan_cursor.last_block_scanned, EXCLUDED.last_block_scanned)
"#;

impl DbClient {
    // -----------
    // | Setters |
    // -----------

    /// Advance the persisted scan cursor to the given block
    pub async fn advance_scan_cursor(
        &self,
        block: u64,
        conn: &mut DbConn<'_>,
    ) -> Result<(), DbError> {
        sql_query(ADVANCE_CURSOR_QUERY)
            .bind::<Integer, _>(SINGLETON_ROW_ID)
            .bind::<BigInt, _>(u64_to_i64(block)?)
            .execute(conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    // -----------
    // | Getters |
    // -----------

    /// Get the persisted scan cursor, if one exists
    pub async fn get_scan_cursor(&self, conn: &mut DbConn<'_>) -> Result<Option<u64>, DbError> {
        let block: Option<i64> = scan_cursor::table
            .filter(scan_cursor::id.eq(SINGLETON_ROW_ID))
            .select(scan_cursor::last_block_scanned)
            .first(conn)
            .await
            .optional()
            .map_err(DbError::from)?;

        block
            .map(|b| {
                u64::try_from(b).map_err(|_| DbError::conversion(format!("negative cursor {b}")))
            })
            .transpose()
    }
}
