//! Relay endpoint issuing.

use serde::Deserialize;
use tracing::debug;

use crate::error::TunnelError;

#[derive(Debug, Deserialize)]
struct IssuedEndpoint {
    url: String,
}

/// Request a fresh public relay endpoint from the tunnel issuer.
///
/// An unreachable issuer is fatal for the whole setup step; there is no
/// local-only fallback.
pub async fn issue_relay_endpoint(
    http: &reqwest::Client,
    issuer_url: &str,
    api_key: &str,
) -> Result<String, TunnelError> {
    debug!(%issuer_url, "requesting relay endpoint");

    let response = http
        .post(issuer_url)
        .bearer_auth(api_key)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TunnelError::Issuer {
            status: status.as_u16(),
            body,
        });
    }

    let issued: IssuedEndpoint = response
        .json()
        .await
        .map_err(|e| TunnelError::InvalidRelayUrl(e.to_string()))?;
    debug!(url = %issued.url, "relay endpoint issued");
    Ok(issued.url)
}
