//! Knowledge base error types.

use thiserror::Error;

/// Result type alias for knowledge base operations.
pub type KbResult<T> = Result<T, KbError>;

/// Errors that can occur while reading or writing the knowledge base.
#[derive(Error, Debug)]
pub enum KbError {
    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid knowledge entry: {0}")]
    InvalidEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
