#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions for bizdesk backend calls.
//!
//! This crate provides the retry executor shared by every bizdesk call site:
//!
//! - **Retry with exponential backoff** via [`retry::RetryConfig`] and the
//!   [`retry::BackoffStrategy`] trait
//!   - Jitter to decorrelate concurrent callers
//!   - Allow-list classification of retryable errors
//!   - Observer hook before each retry
//!   - Cancellation of pending backoff waits
//! - **Declarative error boundaries** via the `error_boundary!` macro
//!
//! The executor holds no state between calls and never wraps the caller's
//! error: the last failure is handed back exactly as the operation produced it.
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use bizdesk_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build()?;
//!
//! let result = config.execute(|| async {
//!     Ok::<_, std::io::Error>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod retry;

pub use error::ConfigError;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use bizdesk_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::ConfigError;
    pub use crate::error_boundary;
    pub use crate::retry::{
        BackoffStrategy, CancellationToken, ErrorCode, RetryConfig, RetryConfigBuilder,
        RetryEvent, RetrySettings, execute_with_retry,
    };
}
