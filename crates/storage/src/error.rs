//! Error types for staging storage.

use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("Failed to encode parquet batch: {0}")]
    Encode(String),

    #[error("Failed to decode parquet batch: {0}")]
    Decode(String),

    #[error("Failed to upload {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("Object storage error: {0}")]
    Object(String),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),
}
