//! Tunnel session error types.

/// Errors that can occur while issuing or connecting a tunnel.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// The tunnel issuer could not be reached at all.
    #[error("Tunnel issuer unreachable: {0}")]
    Request(#[from] reqwest::Error),

    /// The tunnel issuer answered with an error status.
    #[error("Tunnel issuer responded {status}: {body}")]
    Issuer { status: u16, body: String },

    /// The issued relay URL cannot be turned into a tunnel address.
    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    /// Connecting or re-connecting to the relay failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The per-attempt connection timeout elapsed.
    #[error("Connection attempt timed out")]
    ConnectTimeout,

    /// Reading or writing the session store failed.
    #[error(transparent)]
    Store(#[from] herald_core::Error),
}
