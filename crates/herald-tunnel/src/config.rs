//! Tunnel client configuration.

use std::time::Duration;

/// State of the tunnel's relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Configuration for one tunnel session.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Public relay endpoint (e.g. `https://abc123.relay.herald.dev`).
    pub relay_url: String,

    /// Local origin forwarded traffic is delivered to
    /// (e.g. `http://localhost:4000`).
    pub local_origin: String,

    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,

    /// Reconnection policy after a dropped connection.
    pub reconnect: ReconnectPolicy,
}

impl TunnelConfig {
    /// Create a config with the default per-attempt timeout and
    /// reconnection policy.
    pub fn new(relay_url: impl Into<String>, local_origin: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            local_origin: local_origin.into(),
            connect_timeout: Duration::from_secs(2),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Exponential backoff reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Initial delay before first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,
    /// Multiplier applied to delay after each failed attempt.
    pub multiplier: f64,
    /// Maximum number of reconnect attempts (None = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Policy that gives up after `max_attempts` tries.
    pub fn capped(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Whether another attempt should be made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }
}
