//! Error types for courier-core

use thiserror::Error;

/// Result type alias using courier-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in courier-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record with the same id already exists
    #[error("Record already exists: {0}")]
    Conflict(String),

    /// Caller input violates the content bounds
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP client construction or configuration error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
