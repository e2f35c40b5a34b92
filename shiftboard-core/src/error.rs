//! Error types for the shiftboard ecosystem.

use thiserror::Error;

/// Errors that can occur in shiftboard operations.
#[derive(Error, Debug)]
pub enum ShiftboardError {
    /// Malformed partition-deriving attributes or payload fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mutation targeted a record id that does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Network or auth failure talking to the remote store.
    #[error("Remote store unavailable: {0}")]
    StoreUnavailable(String),

    /// Corrupt local cache contents. Only ever logged.
    #[error("Cache parse error: {0}")]
    ParseFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ShiftboardError {
    fn from(e: serde_json::Error) -> Self {
        ShiftboardError::Serialization(e.to_string())
    }
}

/// Result type alias for shiftboard operations.
pub type ShiftboardResult<T> = Result<T, ShiftboardError>;
