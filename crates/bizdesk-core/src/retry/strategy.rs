//! The `BackoffStrategy` trait.

use super::classify::ErrorCode;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A strategy for retrying failed operations with backoff.
///
/// Implementations decide whether a failure is retryable, how long to wait
/// before the next attempt, and when to give up. [`RetryConfig`] is the
/// exponential implementation used throughout bizdesk.
///
/// Attempt numbers are 1-based: attempt 1 is the initial call.
///
/// [`RetryConfig`]: super::RetryConfig
///
/// # Examples
///
/// ```rust
/// use bizdesk_core::retry::{BackoffStrategy, RetryConfig};
/// use std::time::Duration;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RetryConfig::builder()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(100))
///     .build()?;
///
/// let calls = AtomicU32::new(0);
/// let total = config
///     .execute(|| async {
///         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err(std::io::Error::other("retry me"))
///         } else {
///             Ok(42)
///         }
///     })
///     .await?;
/// assert_eq!(total, 42);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Execute an operation with retry logic.
    ///
    /// The operation is called until it succeeds, a non-retryable error
    /// occurs, or [`max_attempts`](Self::max_attempts) calls have failed.
    ///
    /// # Returns
    /// - `Ok(T)`: the first successful result
    /// - `Err(E)`: the non-retryable error, or the error of the final attempt
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static;

    /// Like [`execute`](Self::execute), but a cancelled `token` interrupts any
    /// pending backoff wait.
    ///
    /// On cancellation the failure that scheduled the wait is returned at once
    /// and no further attempt is made. The operation itself is expected to
    /// watch the same token if it wants to stop mid-flight.
    async fn execute_cancellable<F, Fut, T, E>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static;

    /// Determine if an error is retryable.
    ///
    /// Default implementation returns `true` for all errors.
    ///
    /// # Parameters
    /// - `error`: The error to evaluate
    /// - `attempt`: The attempt that produced it (1-based)
    fn should_retry(&self, error: &dyn ErrorCode, attempt: u32) -> bool {
        let _ = (error, attempt);
        true
    }

    /// Pre-jitter delay before attempt `attempt + 1`.
    fn base_delay(&self, attempt: u32) -> Duration;

    /// Delay to wait after `attempt` failed, jitter included.
    ///
    /// Returns `None` once `attempt` is the final permitted attempt: nothing
    /// follows it, so there is nothing to wait for.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of attempts, including the initial one.
    fn max_attempts(&self) -> u32;
}
