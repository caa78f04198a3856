//! Timeout + retry wrapper shared by every remote call.
//!
//! HTTP 429 / 5xx errors from hosted model APIs are transient. Exponential
//! backoff (`backoff_ms * 2^attempt`) spaces the retries: with 500 ms base and
//! 2 retries the wait sequence is 500 ms → 1 s. A provider-reported
//! `retry-after` wins when it is longer than the computed delay.
//! Authentication and configuration errors are returned immediately.
//!
//! [`with_paced_retries`] also waits on a [`Pacer`] before every attempt, so
//! a retried image call takes its own slot like a fresh one.

use crate::config::PipelineConfig;
use crate::error::GenerationError;
use crate::pipeline::pacing::{NoPacing, Pacer};
use std::future::Future;
use tokio::time::{sleep, timeout, Duration};
use tracing::warn;

/// How often and how long to try one remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Delay before attempt number `attempt` (1-based retry count).
    fn backoff(&self, attempt: u32, error: &GenerationError) -> Duration {
        let computed = Duration::from_millis(
            self.backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        );
        match error {
            GenerationError::RateLimited {
                retry_after_secs: Some(secs),
            } => computed.max(Duration::from_secs(*secs)),
            _ => computed,
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or retries run out.
///
/// Each attempt is bounded by `policy.timeout_secs`; an elapsed attempt is
/// reported as [`GenerationError::Timeout`] and retried like any other
/// transient failure.
pub async fn with_retries<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    call: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    with_paced_retries(label, policy, &NoPacing, call).await
}

/// [`with_retries`], awaiting `pacer` before each attempt. The pacing wait
/// does not count against the attempt timeout.
pub async fn with_paced_retries<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    pacer: &dyn Pacer,
    mut call: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0u32;
    loop {
        pacer.wait().await;
        let result = match timeout(Duration::from_secs(policy.timeout_secs), call()).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                secs: policy.timeout_secs,
            }),
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= policy.max_retries {
            return Err(err);
        }

        attempt += 1;
        let wait = policy.backoff(attempt, &err);
        warn!(
            "{}: attempt {} failed: {}; retry {}/{} in {}ms",
            label,
            attempt,
            err,
            attempt,
            policy.max_retries,
            wait.as_millis()
        );
        sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_ms: 0,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retries("test", &policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GenerationError::Transport("reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retries("test", &policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::Auth("bad key".into())) }
        })
        .await;
        assert!(matches!(result, Err(GenerationError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retries("test", &policy(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::EmptyResponse) }
        })
        .await;
        assert_eq!(result, Err(GenerationError::EmptyResponse));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let p = RetryPolicy {
            max_retries: 0,
            backoff_ms: 0,
            timeout_secs: 1,
        };
        let result: Result<(), _> = with_retries("test", &p, || async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(GenerationError::Timeout { secs: 1 }));
    }

    #[test]
    fn backoff_doubles_and_honours_retry_after() {
        let p = RetryPolicy {
            max_retries: 3,
            backoff_ms: 500,
            timeout_secs: 60,
        };
        let transient = GenerationError::Transport("x".into());
        assert_eq!(p.backoff(1, &transient), Duration::from_millis(500));
        assert_eq!(p.backoff(2, &transient), Duration::from_millis(1000));
        assert_eq!(p.backoff(3, &transient), Duration::from_millis(2000));

        let limited = GenerationError::RateLimited {
            retry_after_secs: Some(7),
        };
        assert_eq!(p.backoff(1, &limited), Duration::from_secs(7));
    }
}
