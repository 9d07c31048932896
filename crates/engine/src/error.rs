//! Error types for state access.

use swapledger_types::KeyDecodeError;
use thiserror::Error;

/// Errors raised by the world state accessor or the cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing store rejected the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// A stored key is not a valid structured key.
    #[error("Invalid key: {0}")]
    Key(#[from] KeyDecodeError),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}
