//! The Postgres pool behind the metrics store and the database pair source
//!
//! The flusher holds one connection per snapshot transaction, and startup
//! borrows one to read the scan cursor. The scanner borrows one to reload the
//! monitored pairs. The pool is sized for those few concurrent borrowers.

use std::{sync::Arc, time::Duration};

use bb8::{Pool, PooledConnection};
use diesel::ConnectionError;
use diesel_async::{
    pooled_connection::{AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection,
};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tracing::error;

use crate::db::error::DbError;

// -------------
// | Constants |
// -------------

/// The maximum number of open connections
pub const DB_POOL_SIZE: u32 = 4;
/// How long a borrower waits for a free connection before failing
const DB_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------
// | Types |
// ---------

/// A pooled connection to the keeper database
pub type DbConn<'a> = PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;
/// The keeper's connection pool
pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

// ----------
// | Client |
// ----------

/// Shared handle to the keeper database
///
/// Cloning shares the pool
#[derive(Clone)]
pub struct DbClient {
    /// The pool every metrics write and pair read borrows from
    db_pool: Arc<DbPool>,
}

impl DbClient {
    /// Open a pool of TLS connections to the given database
    pub async fn new(db_url: &str) -> Result<Self, DbError> {
        let mut conf = ManagerConfig::default();
        conf.custom_setup = Box::new(move |url| Box::pin(Self::connect_tls(url)));

        let manager = AsyncDieselConnectionManager::new_with_config(db_url, conf);
        let db_pool = Pool::builder()
            .max_size(DB_POOL_SIZE)
            .connection_timeout(DB_CHECKOUT_TIMEOUT)
            .build(manager)
            .await
            .map_err(DbError::client_setup)?;

        Ok(Self { db_pool: Arc::new(db_pool) })
    }

    /// Open one TLS connection for the pool
    ///
    /// Server certificates are accepted unverified; the database is only
    /// reachable inside the deployment's private network
    async fn connect_tls(db_url: &str) -> Result<AsyncPgConnection, ConnectionError> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        let (client, conn) = tokio_postgres::connect(db_url, MakeTlsConnector::new(connector))
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        // The socket is serviced by its own task until the pool drops the client
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("keeper database connection closed: {e}");
            }
        });

        AsyncPgConnection::try_from(client).await
    }

    /// Borrow a connection, waiting up to the checkout timeout
    pub async fn get_db_conn(&self) -> Result<DbConn, DbError> {
        self.db_pool.get().await.map_err(DbError::pool_connection)
    }
}
