use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty content identifier")]
    EmptyKey,

    #[error("invalid character {ch:?} in content identifier {key:?}")]
    InvalidKey { key: String, ch: char },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}
