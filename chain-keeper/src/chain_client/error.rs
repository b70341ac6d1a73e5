//! Error definitions for the chain client

use std::fmt::Display;

/// Chain client errors
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    /// An error interacting with the RPC client
    #[error("RPC client error: {0}")]
    Rpc(String),
    /// A contract call failed
    #[error("contract call error: {0}")]
    ContractCall(String),
    /// A transaction was mined but reverted
    #[error("transaction {0} reverted")]
    Reverted(String),
    /// A transaction was not confirmed in time
    #[error("confirmation error: {0}")]
    Confirmation(String),
    /// A value returned by the chain does not fit the expected type
    #[error("value conversion error: {0}")]
    Conversion(String),
}

#[allow(clippy::needless_pass_by_value)]
impl ChainClientError {
    /// Create a new RPC error
    pub fn rpc<T: ToString>(msg: T) -> Self {
        Self::Rpc(msg.to_string())
    }

    /// Create a new contract call error
    pub fn contract_call<T: ToString>(msg: T) -> Self {
        Self::ContractCall(msg.to_string())
    }

    /// Create a new confirmation error
    pub fn confirmation<T: ToString>(msg: T) -> Self {
        Self::Confirmation(msg.to_string())
    }

    /// Create a new value conversion error
    pub fn conversion<T: ToString>(msg: T) -> Self {
        Self::Conversion(msg.to_string())
    }
}

impl<E: Display> From<alloy::transports::RpcError<E>> for ChainClientError {
    fn from(e: alloy::transports::RpcError<E>) -> Self {
        ChainClientError::Rpc(e.to_string())
    }
}

impl From<alloy::contract::Error> for ChainClientError {
    fn from(e: alloy::contract::Error) -> Self {
        ChainClientError::ContractCall(e.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for ChainClientError {
    fn from(e: alloy::providers::PendingTransactionError) -> Self {
        ChainClientError::Confirmation(e.to_string())
    }
}
