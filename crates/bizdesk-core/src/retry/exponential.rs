//! Exponential backoff with jitter: the retry loop behind [`RetryConfig`].

use super::classify::{ErrorCode, matches_any};
use super::config::{RetryConfig, RetryEvent};
use super::strategy::BackoffStrategy;
use async_trait::async_trait;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `operation` under `config`'s retry policy.
///
/// Shorthand for [`BackoffStrategy::execute`] on the configuration.
///
/// # Mathematical Formula
///
/// After attempt `k` fails (1-based) and another attempt is permitted:
/// ```text
/// base_delay   = min(initial_delay * multiplier^(k-1), max_delay)
/// final_delay  = base_delay * (1 + jitter * random[0, 1))
/// ```
///
/// # Examples
///
/// ```rust
/// use bizdesk_core::retry::{RetryConfig, execute_with_retry};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RetryConfig::default();
/// let value = execute_with_retry(|| async { Ok::<_, std::io::Error>("ok") }, &config).await?;
/// assert_eq!(value, "ok");
/// # Ok(())
/// # }
/// ```
pub async fn execute_with_retry<F, Fut, T, E>(operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: ErrorCode + Send + Sync + 'static,
{
    config.run(None, operation).await
}

impl RetryConfig {
    async fn run<F, Fut, T, E>(
        &self,
        token: Option<&CancellationToken>,
        operation: F,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            if !self.should_retry(&err, attempt) {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, error = %err, "error is not retryable");
                return Err(err);
            }
            let Some(delay) = self.next_delay(attempt) else {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, error = %err, "retry attempts exhausted");
                return Err(err);
            };

            self.notify(&RetryEvent {
                attempt,
                error: &err,
                delay,
            });

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after backoff"
            );

            match token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(err),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }

    fn notify(&self, event: &RetryEvent<'_>) {
        let Some(observer) = &self.on_retry else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(attempt = event.attempt, "retry observer panicked; continuing");
        }
    }

    fn apply_jitter(&self, base: Duration) -> Duration {
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let factor = 1.0 + self.jitter * rand::random::<f64>();
        Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

#[async_trait]
impl BackoffStrategy for RetryConfig {
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static,
    {
        self.run(None, operation).await
    }

    async fn execute_cancellable<F, Fut, T, E>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static,
    {
        self.run(Some(token), operation).await
    }

    fn should_retry(&self, error: &dyn ErrorCode, _attempt: u32) -> bool {
        self.retryable_errors.is_empty() || matches_any(error, &self.retryable_errors)
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.apply_jitter(self.base_delay(attempt)))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
