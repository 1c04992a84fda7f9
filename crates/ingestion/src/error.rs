//! Error types for the ingestion crate.

use grib_extract::ExtractError;
use storage::StorageError;
use thiserror::Error;
use warehouse::WarehouseError;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Local file error: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestionError {
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
