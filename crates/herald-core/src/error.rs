//! Error types for the Herald core library.

use thiserror::Error;

/// Result type alias using the Herald core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Herald CLI operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session store error (corrupt file, unwritable directory, ...)
    #[error("Session store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
