//! Herald platform API client.
//!
//! Thin `reqwest` wrapper over the three platform endpoints the setup
//! wizard touches: environment lookup (credential validation), bridge
//! sync, and event trigger.

pub mod client;
pub mod error;
pub mod sync;

pub use client::{ApiClient, EnvironmentMe};
pub use error::ApiError;
pub use sync::{SyncOutcome, sync};
