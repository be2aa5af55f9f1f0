//! Platform API error types.

/// Errors from the Herald platform API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform answered with a non-success status. The response body
    /// is preserved verbatim for diagnosis.
    #[error("API responded {status}: {body}")]
    Status { status: u16, body: String },

    /// The response decoded, but not into the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}
