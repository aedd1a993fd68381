//! Error types for storage operations

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while recording
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event serialization error
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
