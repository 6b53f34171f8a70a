//! Bounded exponential backoff around model calls.
//!
//! Only errors whose status is temporary are retried. When the attempts run
//! out the last error is marked persistent and returned.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f32) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }
}

fn next_retry_delay(current: Duration, config: &RetryConfig) -> Duration {
    if current >= config.max_delay {
        return config.max_delay;
    }

    let multiplier = config.backoff_multiplier.max(1.0) as f64;
    Duration::try_from_secs_f64(current.as_secs_f64() * multiplier)
        .map(|scaled| scaled.min(config.max_delay))
        .unwrap_or(config.max_delay)
}

/// Run `operation` until it succeeds, fails permanently, or retries run out.
///
/// A `retry_after_secs` context value on the error (set for HTTP 429) raises
/// the wait to at least that long, still capped by `max_delay`.
pub async fn execute_with_retry<T, Op, Fut>(config: &RetryConfig, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !config.enabled {
        return operation().await;
    }

    let mut attempt: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < config.max_retries => {
                attempt += 1;

                let hinted = error
                    .context_value("retry_after_secs")
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(Duration::ZERO);
                let wait = delay.max(hinted).min(config.max_delay);

                tracing::warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = wait.as_millis() as u64,
                    error = %error,
                    "model call failed with retryable error; retrying"
                );
                tokio::time::sleep(wait).await;
                delay = next_retry_delay(delay, config);
            }
            Err(error) if error.is_retryable() => {
                return Err(error
                    .with_context("attempts", (attempt + 1).to_string())
                    .persist());
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorKind, ErrorStatus};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant() -> RetryConfig {
        RetryConfig::default()
            .with_initial_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_retries_temporary_errors_until_success() {
        let config = instant().with_max_retries(2);
        let attempts = Arc::new(AtomicU32::new(0));

        let result = execute_with_retry(&config, || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(Error::new(ErrorKind::RateLimited, "429"));
                }
                Ok("ok")
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let config = instant().with_max_retries(5);
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(&config, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::new(ErrorKind::AuthenticationFailed, "bad key"))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_error_persistent() {
        let config = instant().with_max_retries(2);
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(&config, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::new(ErrorKind::NetworkFailed, "reset"))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(error.status(), ErrorStatus::Persistent);
        assert_eq!(error.context_value("attempts"), Some("3"));
    }

    #[tokio::test]
    async fn test_disabled_config_runs_once() {
        let config = RetryConfig::disabled().with_max_retries(10);
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(&config, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::new(ErrorKind::RateLimited, "429"))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_next_delay_is_capped() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(next_retry_delay(Duration::from_secs(1), &config), Duration::from_secs(2));
        assert_eq!(next_retry_delay(Duration::from_secs(2), &config), Duration::from_secs(3));
        assert_eq!(next_retry_delay(Duration::from_secs(5), &config), Duration::from_secs(3));
    }

    #[test]
    fn test_non_finite_multiplier_falls_back_to_max_delay() {
        let config = RetryConfig::default()
            .with_max_delay(Duration::from_secs(3))
            .with_backoff_multiplier(f32::INFINITY);

        assert_eq!(next_retry_delay(Duration::from_secs(1), &config), Duration::from_secs(3));
        assert_eq!(next_retry_delay(Duration::ZERO, &config), Duration::from_secs(3));

        let config = config.with_backoff_multiplier(f32::NAN);
        assert_eq!(next_retry_delay(Duration::from_secs(1), &config), Duration::from_secs(1));
    }
}
