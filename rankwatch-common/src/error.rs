//! Common error types for rankwatch

use thiserror::Error;

/// Common result type for rankwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the rankwatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider has no record for the requested identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream provider failure (transport, HTTP status, malformed body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Network call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
