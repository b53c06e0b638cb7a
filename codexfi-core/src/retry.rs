//! Retry kernel: exponential backoff with jitter and optional per-attempt
//! timeout.
//!
//! Two families of preset exist. The *write* profile has NO per-attempt
//! timeout: vector-table commits are non-cancellable native calls, and a
//! racing timeout would leave the write running while a retry inserts a
//! duplicate row. The *network* profiles carry a timeout because HTTP
//! calls are safely abortable.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::errors::{CodexfiError, CodexfiResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Each delay is multiplied by `1 + uniform(-jitter, +jitter)`.
    pub jitter: f64,
    /// When set, each attempt races this timeout. Never set for writes.
    pub per_attempt_timeout: Option<Duration>,
}

impl RetryConfig {
    /// Vector-table writes: no timeout, patient backoff.
    pub fn write() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: 0.25,
            per_attempt_timeout: None,
        }
    }

    /// HTTP calls that do not enforce their own abort.
    pub fn network() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.25,
            per_attempt_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// HTTP calls that already carry a request-level abort (LLM providers
    /// time out at 60s internally; stacking a second timer is forbidden).
    pub fn network_no_timeout() -> Self {
        Self {
            per_attempt_timeout: None,
            ..Self::network()
        }
    }

    /// Read-path variant: fewer attempts, shorter timeout.
    pub fn search() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter: 0.25,
            per_attempt_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Backoff before retry `attempt` (0-based), before jitter.
    fn raw_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let raw = self.raw_delay(attempt);
        if self.jitter <= 0.0 {
            return raw;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        raw.mul_f64(factor.max(0.0))
    }
}

/// Run `op` until it succeeds, a permanent error surfaces, or the attempt
/// budget is exhausted.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    config: &RetryConfig,
    mut op: F,
) -> CodexfiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CodexfiResult<T>>,
{
    let attempts = config.max_retries + 1;
    let mut last_err: Option<CodexfiError> = None;

    for attempt in 0..attempts {
        let result = match config.per_attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op()).await {
                Ok(r) => r,
                Err(_) => Err(CodexfiError::Timeout {
                    label: label.to_string(),
                    seconds: limit.as_secs(),
                }),
            },
            None => op().await,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                warn!(
                    label,
                    attempt = attempt + 1,
                    attempts,
                    error = %err,
                    "attempt failed"
                );
                last_err = Some(err);
                if attempt + 1 < attempts {
                    tokio::time::sleep(config.jittered_delay(attempt)).await;
                }
            }
        }
    }

    Err(CodexfiError::RetriesExhausted {
        label: label.to_string(),
        attempts,
        source: Box::new(last_err.expect("at least one attempt ran")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> CodexfiError {
        StorageError::WriteConflict {
            reason: "commit conflict".to_string(),
        }
        .into()
    }

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter: 0.0,
            per_attempt_timeout: None,
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let cfg = fast(5);
        assert_eq!(cfg.raw_delay(0), Duration::from_millis(1));
        assert_eq!(cfg.raw_delay(1), Duration::from_millis(2));
        assert_eq!(cfg.raw_delay(2), Duration::from_millis(4));
        assert_eq!(cfg.raw_delay(3), Duration::from_millis(4));
    }

    #[test]
    fn write_preset_has_no_timeout() {
        assert!(RetryConfig::write().per_attempt_timeout.is_none());
        assert!(RetryConfig::network_no_timeout().per_attempt_timeout.is_none());
        assert!(RetryConfig::network().per_attempt_timeout.is_some());
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &fast(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_bails_immediately() {
        let calls = AtomicU32::new(0);
        let result: CodexfiResult<()> = with_retry("test", &fast(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(CodexfiError::InvalidId {
                    field: "id".to_string(),
                    value: "bad id".to_string(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(CodexfiError::InvalidId { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts() {
        let result: CodexfiResult<()> =
            with_retry("test", &fast(2), || async { Err(transient()) }).await;
        match result {
            Err(CodexfiError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timed_out_attempt_counts_as_failure() {
        let cfg = RetryConfig {
            per_attempt_timeout: Some(Duration::from_millis(5)),
            ..fast(1)
        };
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &cfg, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok(n)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 1);
    }
}
