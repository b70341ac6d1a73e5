//! Top-level error definitions for the chain keeper

use crate::{chain_client::error::ChainClientError, db::error::DbError, keeper::error::SecretsError};

/// The top-level error type for the chain keeper
#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    /// A configuration fault, fatal at startup
    #[error("configuration error: {0}")]
    Config(String),
    /// An error interacting with the chain
    #[error("chain client error: {0}")]
    ChainClient(#[from] ChainClientError),
    /// An error interacting with the database
    #[error("database error: {0}")]
    Db(#[from] DbError),
    /// An error interacting with the secret store
    #[error("secrets error: {0}")]
    Secrets(#[from] SecretsError),
    /// A background task failed
    #[error("task error: {0}")]
    Task(String),
}

#[allow(clippy::needless_pass_by_value)]
impl KeeperError {
    /// Create a new configuration error
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a new task error
    pub fn task<T: ToString>(msg: T) -> Self {
        Self::Task(msg.to_string())
    }
}
