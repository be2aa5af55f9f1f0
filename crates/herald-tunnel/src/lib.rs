//! Tunnel session manager for the Herald setup wizard.
//!
//! Requests public relay endpoints from the tunnel issuer, opens a
//! persistent WebSocket connection that forwards relay traffic to the
//! local dev server, and tracks one active session per local port.

pub mod client;
pub mod config;
pub mod error;
pub mod issuer;
pub mod session;

pub use client::{TunnelClient, TunnelHandle};
pub use config::{ConnectionState, ReconnectPolicy, TunnelConfig};
pub use error::TunnelError;
pub use session::SessionState;
