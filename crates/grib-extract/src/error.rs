//! Error types for grid extraction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding a grid file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read grid file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode GRIB2 file {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("No 10 m wind components found in {}", .0.display())]
    MissingComponents(PathBuf),

    #[error("Grid cell outside valid latitude range in {}: {latitude}", path.display())]
    InvalidLatitude { path: PathBuf, latitude: f64 },
}

impl ExtractError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
