//! Bridge endpoint health monitor.
//!
//! Polls the well-known health-check action through the tunnel until the
//! app's bridge route answers `{"status":"ok"}`. Exhaustion is a soft
//! failure: sync is skipped but the program continues.

use std::time::Duration;

use herald_core::{RetryPolicy, retry_until};

/// Health probe budget: 30 probes, one second apart.
const HEALTH_PROBES: u32 = 30;

/// After this many failed probes the status message starts carrying
/// remediation hints.
const HINT_AFTER: u32 = 10;

/// Poll `<origin><route>?action=health-check` until healthy.
///
/// `set_status` receives a fresh progress message before every probe.
pub async fn monitor_endpoint_health(
    origin: &str,
    route: &str,
    set_status: impl FnMut(String),
) -> bool {
    monitor_with_policy(
        origin,
        route,
        RetryPolicy {
            interval: Duration::from_secs(1),
            max_attempts: HEALTH_PROBES,
        },
        set_status,
    )
    .await
}

pub(crate) async fn monitor_with_policy(
    origin: &str,
    route: &str,
    policy: RetryPolicy,
    mut set_status: impl FnMut(String),
) -> bool {
    let http = reqwest::Client::new();
    let url = format!("{origin}{route}?action=health-check");
    let max_attempts = policy.max_attempts;

    retry_until(
        policy,
        || {
            let http = http.clone();
            let url = url.clone();
            async move { probe(&http, &url).await }
        },
        |attempt| set_status(status_message(attempt, max_attempts, route)),
    )
    .await
}

/// One health probe. Any error or non-ok status is a failed attempt.
async fn probe(http: &reqwest::Client, url: &str) -> bool {
    let Ok(response) = http.get(url).send().await else {
        return false;
    };
    let Ok(body) = response.json::<serde_json::Value>().await else {
        return false;
    };
    body.get("status").and_then(serde_json::Value::as_str) == Some("ok")
}

/// Progress message for the given 1-based attempt. Past [`HINT_AFTER`]
/// failures the message gains remediation hints; the counter keeps
/// running.
fn status_message(attempt: u32, max_attempts: u32, route: &str) -> String {
    let mut message = format!("Checking bridge endpoint health ({attempt}/{max_attempts})");
    if attempt > HINT_AFTER {
        message.push_str(&format!(
            " -- still no healthy answer on {route}. \
             If your app serves the bridge elsewhere, pass --route or --port; \
             or start from the starter project (herald --project-dir <new dir>)."
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(10),
            max_attempts,
        }
    }

    /// Bridge stub: `{"status":"down"}` until `ok_after` requests served,
    /// then `{"status":"ok"}`.
    async fn bridge_stub(ok_after: u32, hits: Arc<AtomicU32>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                let body = if n >= ok_after {
                    "{\"status\":\"ok\"}"
                } else {
                    "{\"status\":\"down\"}"
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{body}",
                    body.len()
                );
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn healthy_on_first_probe() {
        let hits = Arc::new(AtomicU32::new(0));
        let origin = bridge_stub(1, Arc::clone(&hits)).await;
        assert!(monitor_with_policy(&origin, "/api/herald", fast(30), |_| {}).await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn healthy_on_third_probe_after_exactly_three() {
        let hits = Arc::new(AtomicU32::new(0));
        let origin = bridge_stub(3, Arc::clone(&hits)).await;
        assert!(monitor_with_policy(&origin, "/api/herald", fast(30), |_| {}).await);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unhealthy_gives_up_after_budget() {
        let hits = Arc::new(AtomicU32::new(0));
        let origin = bridge_stub(u32::MAX, Arc::clone(&hits)).await;
        assert!(!monitor_with_policy(&origin, "/api/herald", fast(5), |_| {}).await);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_failed_probe_not_fatal() {
        assert!(!monitor_with_policy("http://127.0.0.1:1", "/api/herald", fast(3), |_| {}).await);
    }

    #[tokio::test]
    async fn hints_appear_after_tenth_attempt() {
        let mut messages = Vec::new();
        let _ = monitor_with_policy("http://127.0.0.1:1", "/api/herald", fast(12), |m| {
            messages.push(m);
        })
        .await;
        assert_eq!(messages.len(), 12);
        assert!(!messages[9].contains("--route"));
        assert!(messages[10].contains("--route"));
        assert!(messages[11].contains("starter project"));
    }

    #[test]
    fn status_message_counts_without_reset() {
        assert_eq!(
            status_message(1, 30, "/api/herald"),
            "Checking bridge endpoint health (1/30)"
        );
        assert!(status_message(11, 30, "/api/herald").starts_with("Checking bridge endpoint health (11/30)"));
    }
}
