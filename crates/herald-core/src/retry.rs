//! Bounded swallow-and-retry polling primitive.
//!
//! Both the dev-server readiness poller and the bridge health monitor are
//! the same loop: probe, swallow failure, sleep, try again, give up after a
//! fixed budget. This module is that loop, parameterised by the probe.

use std::time::Duration;

/// Fixed-interval retry budget for a polling loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay between consecutive probes.
    pub interval: Duration,
    /// Total number of probes before giving up.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Policy probing once per second for the given number of attempts.
    pub const fn per_second(max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts,
        }
    }
}

/// Run `probe` until it returns `true` or the policy's budget is exhausted.
///
/// `on_attempt` is invoked with the 1-based attempt number before each
/// probe, so callers can drive a progress indicator. Probe failures are
/// never fatal here; a probe that cannot distinguish "not yet" from
/// "broken" should map both to `false`.
///
/// Returns `true` as soon as a probe succeeds, `false` once exactly
/// `max_attempts` probes have failed. No sleep follows the final probe.
pub async fn retry_until<F, Fut>(
    policy: RetryPolicy,
    mut probe: F,
    mut on_attempt: impl FnMut(u32),
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.max_attempts {
        on_attempt(attempt);
        if probe().await {
            return true;
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_probe() {
        let count = AtomicU32::new(0);
        let ok = retry_until(
            fast(30),
            || {
                count.fetch_add(1, Ordering::SeqCst);
                async { true }
            },
            |_| {},
        )
        .await;
        assert!(ok);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_probe() {
        let count = AtomicU32::new(0);
        let ok = retry_until(
            fast(30),
            || {
                let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                async move { n == 3 }
            },
            |_| {},
        )
        .await;
        assert!(ok);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_exact_budget() {
        let count = AtomicU32::new(0);
        let ok = retry_until(
            fast(30),
            || {
                count.fetch_add(1, Ordering::SeqCst);
                async { false }
            },
            |_| {},
        )
        .await;
        assert!(!ok);
        assert_eq!(count.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn reports_one_based_attempt_numbers() {
        let mut seen = Vec::new();
        let ok = retry_until(fast(3), || async { false }, |n| seen.push(n)).await;
        assert!(!ok);
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
