//! Common error types for the timbre services

use thiserror::Error;

/// Common result type for timbre operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the timbre services
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, incomplete, or timed-out buffer transfer
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Requested preset path not present in the library
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or corrupt external resource (embedding table, cache file)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Configuration or data-shape error (e.g. feature dimension mismatch)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
