//! Response store error types.

use thiserror::Error;

/// Result type for response store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by persistent response stores.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to determine cache directory")]
    CacheDirNotFound,
}
