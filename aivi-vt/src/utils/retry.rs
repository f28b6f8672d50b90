//! Exponential-backoff retry for transcription attempts
//!
//! Errors are classified before sleeping: terminal errors (authentication,
//! payload size, malformed request, unsupported format, validation) stop
//! immediately without consuming the remaining attempt budget; transient
//! errors (network, timeout, server-side) back off and retry.

use std::future::Future;
use std::time::Duration;

use crate::error::{ErrorClass, Result, VoiceError};

/// Attempt budget and backoff bounds for one retried operation
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Maximum attempts; 0 is treated as 1
    pub attempts: u32,
    /// First retry delay; doubles each attempt
    pub base_delay: Duration,
    /// Ceiling applied after jitter
    pub max_delay: Duration,
}

/// Run `operation` until it succeeds, a terminal error surfaces, or the
/// attempt budget is exhausted (surfacing the last error).
///
/// Backoff between failed attempts is `base_delay * 2^attempt` plus up to
/// 10% jitter, capped at `max_delay`.
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    policy: &BackoffPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    error = %err,
                    "attempt failed"
                );

                if err.class() == ErrorClass::Terminal {
                    tracing::warn!(
                        operation = operation_name,
                        error = %err,
                        "non-retryable error, stopping retries"
                    );
                    return Err(err);
                }

                last_error = Some(err);

                if attempt + 1 < attempts {
                    let wait = backoff_delay(policy, attempt);
                    tracing::info!(
                        operation = operation_name,
                        wait_seconds = wait.as_secs_f64(),
                        next_attempt = attempt + 2,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| VoiceError::Internal("retry loop ended without an error".to_string())))
}

/// `base * 2^attempt` plus up to 10% jitter, capped at `max_delay`.
fn backoff_delay(policy: &BackoffPolicy, attempt: u32) -> Duration {
    let base = policy.base_delay.mul_f64(2f64.powi(attempt as i32));
    let jitter_factor = 1.0 + 0.1 * rand::random::<f64>();
    base.mul_f64(jitter_factor).min(policy.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test_op", &policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<i32, VoiceError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_network_failures_then_success_uses_three_attempts() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test_op", &policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(VoiceError::Network("connection reset".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn authentication_error_stops_after_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = retry_with_backoff("test_op", &policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VoiceError::Authentication("Unauthorized: invalid API key".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(VoiceError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn terminal_service_wording_stops_after_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = retry_with_backoff("test_op", &policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VoiceError::Service("forbidden for this plan".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = retry_with_backoff("test_op", &policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(VoiceError::Network(format!("failure #{}", n + 1))) }
        })
        .await;

        match result {
            Err(VoiceError::Network(msg)) => assert_eq!(msg, "failure #3"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = BackoffPolicy {
            attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        };

        let first = backoff_delay(&policy, 0);
        assert!(first >= Duration::from_secs(2));
        assert!(first <= Duration::from_millis(2_200));

        let second = backoff_delay(&policy, 1);
        assert!(second >= Duration::from_secs(4));
        assert!(second <= Duration::from_millis(4_400));

        // 2 * 2^3 = 16s, capped at 10s
        let capped = backoff_delay(&policy, 3);
        assert_eq!(capped, Duration::from_secs(10));
    }
}
