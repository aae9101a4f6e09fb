use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::errors::RemoteError;
use crate::domain::models::RetryConfig;

/// Retry policy for the request phase of a remote call.
///
/// Only the request and status check are retried; once a response stream has
/// been handed to the caller nothing is resent. Backoff doubles per attempt up
/// to `max_backoff_ms`. With `max_retries == 0` every error surfaces as-is.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// A policy that never retries
    pub const fn disabled() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute `operation`, retrying transient failures.
    ///
    /// `rows` is the document count of the request, logged on every retry so
    /// that costly resubmissions are visible.
    pub async fn execute<F, Fut, T>(&self, rows: usize, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt, rows, "Remote request succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !self.should_retry(&err, attempt) {
                        return Err(err);
                    }
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        rows,
                        error = %err,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "Transient remote failure, resubmitting"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    fn should_retry(&self, err: &RemoteError, attempt: u32) -> bool {
        attempt < self.max_retries && err.is_transient()
    }

    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> RemoteError {
        RemoteError::Request {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "busy".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(5, 100, 350);
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(350));
        assert_eq!(policy.calculate_backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_disabled_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::disabled()
            .execute(10, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::new(3, 1, 5)
            .execute(10, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::new(3, 1, 5)
            .execute(10, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Request {
                    status: StatusCode::UNAUTHORIZED,
                    message: "bad key".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
