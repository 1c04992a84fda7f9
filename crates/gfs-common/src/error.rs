//! Error types for parsing cycle identifiers.

use thiserror::Error;

/// Result type alias using CycleParseError.
pub type CycleParseResult<T> = Result<T, CycleParseError>;

/// Errors raised when a run hour or issue date cannot be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleParseError {
    #[error("Invalid run hour '{0}': expected one of 00, 06, 12, 18")]
    InvalidRunHour(String),

    #[error("Invalid issue date '{0}': expected YYYY-MM-DD or YYYYMMDD")]
    InvalidDate(String),
}
