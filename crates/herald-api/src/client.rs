//! Authenticated client for the Herald platform API.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;

/// Environment details returned by `GET /v1/environments/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentMe {
    /// Application identifier, written into the scaffolded `.env` file.
    pub identifier: String,
    /// Human-readable environment name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Herald platform API client authenticated with a secret API key.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ApiClient {
    /// Create a client for `api_url` (no trailing slash) using `api_key`.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Base URL of the platform API.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn auth_header(&self) -> String {
        format!("ApiKey {}", self.api_key)
    }

    /// Validate the API key by fetching the environment it belongs to.
    pub async fn environment_me(&self) -> Result<EnvironmentMe, ApiError> {
        let url = format!("{}/v1/environments/me", self.api_url);
        debug!(%url, "fetching environment");

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<EnvironmentMe> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    /// Register `bridge_url` as the public bridge endpoint for this
    /// environment. Single attempt, no retry.
    pub async fn sync_bridge(&self, bridge_url: &str) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/v1/bridge/sync?source=cli", self.api_url);
        debug!(%url, %bridge_url, "syncing bridge endpoint");

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "bridgeUrl": bridge_url }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() >= 400 {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    /// Trigger `event` for a single subscriber with an empty payload.
    /// The platform acknowledges accepted triggers with `201 Created`.
    pub async fn trigger_event(
        &self,
        event: &str,
        subscriber_id: &str,
    ) -> Result<(), ApiError> {
        let url = format!("{}/v1/events/trigger", self.api_url);
        debug!(%url, %event, %subscriber_id, "triggering event");

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({
                "name": event,
                "to": { "subscriberId": subscriber_id },
                "payload": {},
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            let body = response.text().await?;
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a fixed HTTP/1.1 response for every connection.
    async fn stub_server(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn environment_me_decodes_envelope() {
        let addr = stub_server(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 54\r\n\r\n\
             {\"data\":{\"identifier\":\"app-123\",\"name\":\"Development\"}}",
        )
        .await;

        let client = ApiClient::new(format!("http://{addr}"), "sk_test");
        let env = client.environment_me().await.unwrap();
        assert_eq!(env.identifier, "app-123");
        assert_eq!(env.name, "Development");
    }

    #[tokio::test]
    async fn environment_me_preserves_error_body() {
        let addr = stub_server(
            "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: 31\r\n\r\n\
             {\"message\":\"invalid API key\"}  ",
        )
        .await;

        let client = ApiClient::new(format!("http://{addr}"), "bad-key");
        let err = client.environment_me().await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid API key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn trigger_requires_created_status() {
        let addr = stub_server("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}").await;

        let client = ApiClient::new(format!("http://{addr}"), "sk_test");
        let err = client.trigger_event("welcome", "sub-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 200, .. }));
    }
}
