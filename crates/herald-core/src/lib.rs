//! Herald Core Library
//!
//! Shared functionality for the Herald CLI components:
//! - Common error types
//! - Bounded retry primitive used by the readiness and health pollers
//! - On-disk session store (local port -> issued relay endpoint)
//! - Tracing initialisation

pub mod error;
pub mod retry;
pub mod store;
pub mod tracing_init;

pub use error::{Error, Result};
pub use retry::{RetryPolicy, retry_until};
pub use store::SessionStore;
