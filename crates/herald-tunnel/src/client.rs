//! Persistent WebSocket tunnel client.
//!
//! The relay forwards inbound HTTP traffic as JSON frames over a single
//! WebSocket. The client replays each frame against the local origin and
//! sends the response back on the same socket. A dropped connection is
//! re-established according to the configured [`ReconnectPolicy`].

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::{ConnectionState, TunnelConfig};
use crate::error::TunnelError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One inbound request forwarded by the relay.
#[derive(Debug, Serialize, Deserialize)]
struct TunnelRequest {
    id: String,
    method: String,
    path: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
    #[serde(default)]
    body: Option<String>,
}

/// Response frame sent back to the relay.
#[derive(Debug, Serialize, Deserialize)]
struct TunnelResponse {
    id: String,
    status: u16,
    headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

/// Handle to a running tunnel session.
#[derive(Debug)]
pub struct TunnelHandle {
    relay_url: String,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: tokio::task::JoinHandle<()>,
}

impl TunnelHandle {
    /// Public relay endpoint this session is bound to.
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Close the session and wait for the background task to finish.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Tunnel client: connects a relay endpoint to a local origin.
pub struct TunnelClient;

impl TunnelClient {
    /// Open a tunnel with a single connection attempt, bounded by the
    /// config's per-attempt timeout. Used for reconnecting to a cached
    /// relay endpoint, where a quick failure should fall back to issuing
    /// a fresh one.
    pub async fn connect(config: TunnelConfig) -> Result<TunnelHandle, TunnelError> {
        let ws = connect_once(&config).await?;
        Ok(spawn_session(config, ws))
    }

    /// Open a tunnel, retrying failed connection attempts according to
    /// the config's reconnect policy.
    pub async fn connect_with_retry(config: TunnelConfig) -> Result<TunnelHandle, TunnelError> {
        let mut attempt: u32 = 0;
        loop {
            match connect_once(&config).await {
                Ok(ws) => return Ok(spawn_session(config, ws)),
                Err(e) => {
                    if !config.reconnect.should_retry(attempt) {
                        return Err(e);
                    }
                    let delay = config.reconnect.delay_for_attempt(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis(), "Retrying tunnel connection");
                    sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

/// Derive the WebSocket tunnel address from a relay's public URL.
fn tunnel_address(relay_url: &str) -> Result<String, TunnelError> {
    let (scheme, rest) = if let Some(rest) = relay_url.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = relay_url.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(TunnelError::InvalidRelayUrl(relay_url.to_string()));
    };
    let host = rest.trim_end_matches('/');
    if host.is_empty() {
        return Err(TunnelError::InvalidRelayUrl(relay_url.to_string()));
    }
    Ok(format!("{scheme}://{host}/_tunnel"))
}

/// One connection attempt, bounded by the per-attempt timeout.
async fn connect_once(config: &TunnelConfig) -> Result<WsStream, TunnelError> {
    let address = tunnel_address(&config.relay_url)?;
    debug!(%address, "connecting tunnel");
    match timeout(config.connect_timeout, connect_async(&address)).await {
        Ok(Ok((ws, _response))) => Ok(ws),
        Ok(Err(e)) => Err(TunnelError::Connection(e.to_string())),
        Err(_) => Err(TunnelError::ConnectTimeout),
    }
}

/// Spawn the session's background task and hand out its handle.
fn spawn_session(config: TunnelConfig, ws: WsStream) -> TunnelHandle {
    let relay_url = config.relay_url.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);

    info!(relay = %relay_url, origin = %config.local_origin, "Tunnel connected");
    let task = tokio::spawn(run_session(config, ws, state_tx, shutdown_rx));

    TunnelHandle {
        relay_url,
        shutdown: shutdown_tx,
        state: state_rx,
        task,
    }
}

/// Serve the connection; reconnect on drop until the policy gives up or
/// shutdown is signalled.
async fn run_session(
    config: TunnelConfig,
    mut ws: WsStream,
    state: watch::Sender<ConnectionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let http = reqwest::Client::new();
    let mut attempt: u32 = 0;

    loop {
        let started = std::time::Instant::now();
        match serve(&mut ws, &http, &config.local_origin, &mut shutdown).await {
            Ok(()) => {
                info!("Tunnel session closed");
                let _ = state.send(ConnectionState::Disconnected);
                return;
            }
            Err(e) => {
                // Reset backoff if the connection was up for a while.
                if started.elapsed() > std::time::Duration::from_secs(60) {
                    attempt = 0;
                }
                let _ = state.send(ConnectionState::Connecting);
                warn!(error = %e, "Tunnel connection dropped");

                ws = loop {
                    if !config.reconnect.should_retry(attempt) {
                        warn!(attempt, "Max tunnel reconnect attempts reached");
                        let _ = state.send(ConnectionState::Failed);
                        return;
                    }
                    let delay = config.reconnect.delay_for_attempt(attempt);
                    tokio::select! {
                        () = sleep(delay) => {}
                        _ = shutdown.changed() => {
                            let _ = state.send(ConnectionState::Disconnected);
                            return;
                        }
                    }
                    attempt = attempt.saturating_add(1);

                    match connect_once(&config).await {
                        Ok(ws) => break ws,
                        Err(e) => {
                            warn!(error = %e, attempt, "Tunnel reconnect failed");
                        }
                    }
                };
                let _ = state.send(ConnectionState::Connected);
                info!(relay = %config.relay_url, "Tunnel reconnected");
            }
        }
    }
}

/// Forward frames until the socket drops (error) or shutdown (ok).
async fn serve(
    ws: &mut WsStream,
    http: &reqwest::Client,
    local_origin: &str,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), TunnelError> {
    loop {
        tokio::select! {
            message = ws.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let response = match serde_json::from_str::<TunnelRequest>(&text) {
                            Ok(request) => forward(http, local_origin, request).await,
                            Err(e) => {
                                warn!(error = %e, "Malformed tunnel frame");
                                continue;
                            }
                        };
                        let frame = serde_json::to_string(&response)
                            .map_err(|e| TunnelError::Connection(e.to_string()))?;
                        ws.send(Message::Text(frame))
                            .await
                            .map_err(|e| TunnelError::Connection(e.to_string()))?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(TunnelError::Connection("closed by relay".into()));
                    }
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                    Some(Err(e)) => {
                        return Err(TunnelError::Connection(e.to_string()));
                    }
                }
            }
            _ = shutdown.changed() => {
                let _ = ws.close(None).await;
                return Ok(());
            }
        }
    }
}

/// Replay one relayed request against the local origin.
async fn forward(
    http: &reqwest::Client,
    local_origin: &str,
    request: TunnelRequest,
) -> TunnelResponse {
    let url = format!("{local_origin}{}", request.path);
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut builder = http.request(method, &url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    match builder.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await.ok();
            TunnelResponse {
                id: request.id,
                status,
                headers,
                body,
            }
        }
        Err(e) => {
            debug!(error = %e, %url, "Local origin unreachable");
            TunnelResponse {
                id: request.id,
                status: 502,
                headers: Vec::new(),
                body: Some(format!("herald tunnel: local origin error: {e}")),
            }
        }
    }
}
