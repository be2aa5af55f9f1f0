//! Bridge sync outcome and argument validation.

use serde::Serialize;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::ApiError;

/// Result of one bridge sync attempt, reported to the user as-is.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    /// Response body on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure description, carrying the upstream response body when the
    /// platform answered with an error status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Register `bridge_url` with the platform at `api_url` using `secret_key`.
///
/// All three arguments are validated before any network I/O; a missing one
/// yields a structured failure, not an error. The sync itself is a single
/// attempt -- an error status (>= 400) becomes a failure outcome carrying
/// the response body.
pub async fn sync(bridge_url: &str, secret_key: &str, api_url: &str) -> SyncOutcome {
    for (name, value) in [
        ("bridge URL", bridge_url),
        ("secret key", secret_key),
        ("API URL", api_url),
    ] {
        if value.trim().is_empty() {
            return SyncOutcome::failed(format!("missing {name} -- nothing was synced"));
        }
    }

    debug!(%bridge_url, %api_url, "sync requested");
    let client = ApiClient::new(api_url, secret_key);
    match client.sync_bridge(bridge_url).await {
        Ok(data) => SyncOutcome::ok(data),
        Err(ApiError::Status { status, body }) => {
            SyncOutcome::failed(format!("sync rejected ({status}): {body}"))
        }
        Err(e) => SyncOutcome::failed(format!("sync request failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn missing_bridge_url_short_circuits() {
        // An unroutable api_url proves no request is attempted: the call
        // must come back as a validation failure, not a connect error.
        let outcome = sync("", "sk_test", "http://192.0.2.1:9").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("bridge URL"));
    }

    #[tokio::test]
    async fn missing_secret_key_short_circuits() {
        let outcome = sync("https://abc.relay.herald.dev", "", "http://192.0.2.1:9").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("secret key"));
    }

    #[tokio::test]
    async fn missing_api_url_short_circuits() {
        let outcome = sync("https://abc.relay.herald.dev", "sk_test", "  ").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("API URL"));
    }

    #[tokio::test]
    async fn error_status_becomes_failure_with_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 422 Unprocessable Entity\r\ncontent-length: 29\r\n\r\n\
                      {\"message\":\"no bridge route\"}",
                )
                .await;
        });

        let outcome = sync(
            "https://abc.relay.herald.dev",
            "sk_test",
            &format!("http://{addr}"),
        )
        .await;
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("422"));
        assert!(error.contains("no bridge route"));
    }

    #[tokio::test]
    async fn success_carries_response_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 16\r\n\r\n{\"workflows\":[]}",
                )
                .await;
        });

        let outcome = sync(
            "https://abc.relay.herald.dev",
            "sk_test",
            &format!("http://{addr}"),
        )
        .await;
        assert!(outcome.success);
        assert_eq!(
            outcome.data.unwrap(),
            serde_json::json!({ "workflows": [] })
        );
    }
}
