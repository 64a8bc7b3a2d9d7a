//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transfer id: {0}")]
    InvalidTransferId(String),

    #[error("invalid transfer mode: {0}")]
    InvalidTransferMode(String),

    #[error("invalid transfer status: {0}")]
    InvalidTransferStatus(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
