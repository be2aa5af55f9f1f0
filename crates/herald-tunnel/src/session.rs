//! Session state: cached relay endpoints and active tunnel handles.
//!
//! Owned by the orchestrator and passed through the pipeline; there is no
//! process-global tunnel state. At most one session is active per local
//! port -- opening a new one supersedes (closes) any prior session on the
//! same port.

use std::collections::HashMap;

use tracing::{info, warn};

use herald_core::SessionStore;

use crate::client::{TunnelClient, TunnelHandle};
use crate::config::{ReconnectPolicy, TunnelConfig};
use crate::error::TunnelError;
use crate::issuer::issue_relay_endpoint;

/// Tunnel session state for one wizard run.
pub struct SessionState {
    store: SessionStore,
    http: reqwest::Client,
    reconnect: ReconnectPolicy,
    active: HashMap<u16, TunnelHandle>,
}

impl SessionState {
    /// Create session state over a loaded [`SessionStore`].
    ///
    /// `reconnect` governs connection attempts against freshly issued
    /// endpoints. The policy should be finite: an unreachable relay must
    /// eventually fail the setup step instead of retrying forever.
    pub fn new(store: SessionStore, reconnect: ReconnectPolicy) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            reconnect,
            active: HashMap::new(),
        }
    }

    /// Expose the local port at `local_origin` through a public relay
    /// endpoint and return that endpoint.
    ///
    /// A relay URL previously issued for this port is reconnected first;
    /// only when there is no cached URL, or the reconnect fails, is a
    /// fresh endpoint requested from the issuer. An unreachable issuer is
    /// fatal -- there is no local-only fallback.
    pub async fn create_tunnel(
        &mut self,
        local_port: u16,
        issuer_url: &str,
        api_key: &str,
    ) -> Result<String, TunnelError> {
        let local_origin = format!("http://localhost:{local_port}");

        if let Some(cached) = self.store.relay_url(local_port).map(str::to_string) {
            info!(relay = %cached, "Reconnecting to cached relay endpoint");
            let mut config = TunnelConfig::new(cached.clone(), local_origin.clone());
            config.reconnect = self.reconnect.clone();
            match TunnelClient::connect(config).await {
                Ok(handle) if handle.is_connected() => {
                    self.install(local_port, handle).await;
                    return Ok(cached);
                }
                Ok(handle) => handle.close().await,
                Err(e) => {
                    warn!(error = %e, relay = %cached, "Cached relay endpoint rejected reconnect");
                }
            }
            self.store.forget_relay_url(local_port)?;
        }

        let relay_url = issue_relay_endpoint(&self.http, issuer_url, api_key).await?;
        self.store.set_relay_url(local_port, &relay_url)?;

        let mut config = TunnelConfig::new(relay_url.clone(), local_origin);
        config.reconnect = self.reconnect.clone();
        let handle = TunnelClient::connect_with_retry(config).await?;
        self.install(local_port, handle).await;
        Ok(relay_url)
    }

    /// Register the new handle for `port`, closing any prior session.
    async fn install(&mut self, port: u16, handle: TunnelHandle) {
        if let Some(old) = self.active.insert(port, handle) {
            info!(port, "Superseding previous tunnel session");
            old.close().await;
        }
    }

    /// Active tunnel handle for `port`, if any.
    pub fn handle(&self, port: u16) -> Option<&TunnelHandle> {
        self.active.get(&port)
    }

    /// Close every active session.
    pub async fn close_all(&mut self) {
        for (_, handle) in self.active.drain() {
            handle.close().await;
        }
    }
}
