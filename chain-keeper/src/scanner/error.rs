//! Error definitions for the block range scanner

/// Scanner errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A log could not be decoded into a pair event
    #[error("decode error: {0}")]
    Decode(String),
}

#[allow(clippy::needless_pass_by_value)]
impl ScanError {
    /// Create a new decode error
    pub fn decode<T: ToString>(msg: T) -> Self {
        Self::Decode(msg.to_string())
    }
}
