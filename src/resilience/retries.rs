//! Bounded retry of chain operations.
//!
//! # Responsibilities
//! - Re-run an operation on retryable errors with jittered backoff
//! - Stop immediately on errors that another attempt cannot fix
//! - Slow down on repeated reverts, and give up early on reads that keep reverting

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Reverts seen before the delay is escalated.
const REVERT_SLOWDOWN_AFTER: u32 = 2;
/// Floor for the escalated delay after repeated reverts.
const REVERT_MIN_DELAY: Duration = Duration::from_secs(5);

/// Retry policy for one kind of operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    max_attempts: u32,
    revert_limit: Option<u32>,
}

impl RetryPolicy {
    /// Policy using the configured attempt count.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            config: config.clone(),
            max_attempts: config.max_attempts.max(1),
            revert_limit: None,
        }
    }

    /// Override the attempt count.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Give up once this many attempts have reverted.
    pub fn abort_after_reverts(mut self, reverts: u32) -> Self {
        self.revert_limit = Some(reverts);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The last error is returned when every attempt failed.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> BlockchainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BlockchainResult<T>>,
    {
        let mut reverted = 0u32;
        let mut attempt = 1u32;

        loop {
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(op = label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                tracing::warn!(op = label, attempt, error = %err, "Operation failed, not retryable");
                return Err(err);
            }

            let mut delay = calculate_backoff(attempt, &self.config);
            if matches!(err, BlockchainError::Reverted(_)) {
                reverted += 1;
                tracing::warn!(op = label, attempt, max_attempts = self.max_attempts, "Operation reverted");
                if self.revert_limit.is_some_and(|limit| reverted >= limit) {
                    tracing::warn!(op = label, reverted, "Repeated reverts, giving up");
                    return Err(err);
                }
                if reverted >= REVERT_SLOWDOWN_AFTER {
                    delay = (delay * 2).max(REVERT_MIN_DELAY);
                }
            } else {
                tracing::warn!(
                    op = label,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %truncate(&err.to_string(), 150),
                    "Operation failed"
                );
            }

            if attempt >= self.max_attempts {
                tracing::error!(op = label, attempts = attempt, "Operation failed after all attempts");
                return Err(err);
            }

            metrics::record_retry(label);
            tracing::debug!(op = label, delay_ms = delay.as_millis() as u64, "Retrying");
            sleep(delay).await;
            attempt += 1;
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_attempts: 4,
            base_delay_ms: 10,
            max_delay_ms: 50,
            ..RetryConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result = policy()
            .run("flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(BlockchainError::Rpc("connection reset".into()))
                } else {
                    Ok(7u64)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: BlockchainResult<()> = policy()
            .with_attempts(3)
            .run("down", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BlockchainError::Timeout(1))
            })
            .await;

        assert!(matches!(result, Err(BlockchainError::Timeout(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: BlockchainResult<()> = policy()
            .run("broke", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BlockchainError::InsufficientFunds("need more".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_limit_stops_reads_early() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result: BlockchainResult<()> = policy()
            .with_attempts(10)
            .abort_after_reverts(3)
            .run("get fee", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BlockchainError::Reverted("execution reverted".into()))
            })
            .await;

        assert!(matches!(result, Err(BlockchainError::Reverted(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // The second revert escalates the delay to at least five seconds.
        assert!(started.elapsed() >= REVERT_MIN_DELAY);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
