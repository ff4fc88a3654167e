//! Error types and conversion helpers.

mod boundary;

use std::time::Duration;
use thiserror::Error;

/// Invalid retry configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `max_attempts` was 0; at least one attempt is always made.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    /// The multiplier does not grow the delay.
    #[error("multiplier must be a finite number greater than 1, got {0}")]
    InvalidMultiplier(f64),

    /// The jitter factor is not a number in `[0, 1]`.
    #[error("jitter must be a number between 0 and 1, got {0}")]
    InvalidJitter(f64),

    /// The cap is below the starting delay.
    #[error("max_delay ({max_delay:?}) must not be shorter than initial_delay ({initial_delay:?})")]
    DelayOrder {
        /// Configured initial delay
        initial_delay: Duration,
        /// Configured cap
        max_delay: Duration,
    },
}
