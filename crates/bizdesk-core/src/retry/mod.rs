//! Retry executor with exponential backoff, jitter and error classification.
//!
//! # Key Types
//!
//! - [`RetryConfig`] - Immutable policy: attempts, delays, allow-list, observer
//! - [`BackoffStrategy`] - Trait implemented by the policy, runs the retry loop
//! - [`ErrorCode`] - How a failure is matched against the allow-list
//!
//! # Examples
//!
//! ```rust
//! use bizdesk_core::retry::{RetryConfig, execute_with_retry};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .retryable_errors(["ECONNRESET", "timeout"])
//!     .build()?;
//!
//! let result = execute_with_retry(|| async {
//!     // Your operation here
//!     Ok::<_, std::io::Error>(42)
//! }, &config).await?;
//! # Ok(())
//! # }
//! ```

mod classify;
mod config;
mod exponential;
mod strategy;

pub use classify::{ErrorCode, matches_any};
pub use config::{
    DEFAULT_INITIAL_DELAY, DEFAULT_JITTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    DEFAULT_MULTIPLIER, RetryConfig, RetryConfigBuilder, RetryEvent, RetryObserver,
    RetrySettings,
};
pub use exponential::execute_with_retry;
pub use strategy::BackoffStrategy;
pub use tokio_util::sync::CancellationToken;
