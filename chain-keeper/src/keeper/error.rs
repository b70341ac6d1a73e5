//! Error definitions for the round secret store

/// Secret store errors
///
/// An absent secret is not an error, it is reported as `None`
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    /// The secret store could not be reached or rejected the request
    #[error("secret retrieval error: {0}")]
    Retrieval(String),
    /// A consumed secret could not be erased
    #[error("secret erase error: {0}")]
    Erase(String),
}

#[allow(clippy::needless_pass_by_value)]
impl SecretsError {
    /// Create a new retrieval error
    pub fn retrieval<T: ToString>(msg: T) -> Self {
        Self::Retrieval(msg.to_string())
    }

    /// Create a new erase error
    pub fn erase<T: ToString>(msg: T) -> Self {
        Self::Erase(msg.to_string())
    }
}
