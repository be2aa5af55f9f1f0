//! Herald setup wizard.
//!
//! One-shot bootstrap flow: validate a platform credential, scaffold the
//! starter project, launch its dev server, expose it through a tunnel
//! relay, health-check the public bridge endpoint, and register it with
//! the platform.

pub mod cmd;
pub mod dev_server;
pub mod health;
pub mod port;
pub mod prompt;
pub mod scaffold;
pub mod wizard;
