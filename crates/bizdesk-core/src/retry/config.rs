//! Retry configuration, its builder and the serde-friendly settings form.

use super::classify::ErrorCode;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
/// Default cap on any single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);
/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Default jitter factor: up to 30% of the base delay is added.
pub const DEFAULT_JITTER: f64 = 0.3;

/// What an observer sees before each backoff wait.
#[derive(Debug, Clone, Copy)]
pub struct RetryEvent<'a> {
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    /// The failure of that attempt.
    pub error: &'a dyn ErrorCode,
    /// The jittered delay about to be waited.
    pub delay: Duration,
}

/// Callback invoked synchronously before each backoff wait.
pub type RetryObserver = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Immutable retry configuration.
///
/// Built once per call site with [`RetryConfig::builder`] and shared freely
/// between concurrent invocations; it is never mutated after construction.
///
/// # Examples
///
/// ```rust
/// use bizdesk_core::retry::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .retryable_errors(["ECONNRESET", "timeout"])
///     .build()
///     .expect("valid retry config");
///
/// assert_eq!(config.max_attempts(), 5);
/// ```
#[derive(Clone)]
pub struct RetryConfig {
    pub(crate) max_attempts: u32,
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) multiplier: f64,
    pub(crate) jitter: f64,
    pub(crate) retryable_errors: Arc<[String]>,
    pub(crate) on_retry: Option<RetryObserver>,
}

impl RetryConfig {
    /// Create a new builder seeded with the default values.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Create a builder seeded with this configuration, for deriving variants.
    pub fn to_builder(&self) -> RetryConfigBuilder {
        RetryConfigBuilder {
            max_attempts: Some(self.max_attempts),
            initial_delay: Some(self.initial_delay),
            max_delay: Some(self.max_delay),
            multiplier: Some(self.multiplier),
            jitter: Some(self.jitter),
            retryable_errors: Some(self.retryable_errors.to_vec()),
            on_retry: self.on_retry.clone(),
        }
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Cap applied to every base delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Fraction of the base delay that may be added as random jitter.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Retryable-error markers. Empty means every failure is retryable.
    pub fn retryable_errors(&self) -> &[String] {
        &self.retryable_errors
    }

    /// Whether an observer is attached.
    pub fn has_observer(&self) -> bool {
        self.on_retry.is_some()
    }
}

impl Default for RetryConfig {
    /// Defaults: 3 attempts, 1s initial delay, 30s cap, multiplier 2.0,
    /// 30% jitter, no allow-list, no observer.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: DEFAULT_JITTER,
            retryable_errors: Arc::from(Vec::new()),
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_errors", &self.retryable_errors)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

/// Builder for [`RetryConfig`].
///
/// Unset fields fall back to the defaults; [`build`](Self::build) validates
/// the combination.
#[derive(Default, Clone)]
pub struct RetryConfigBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    retryable_errors: Option<Vec<String>>,
    on_retry: Option<RetryObserver>,
}

impl RetryConfigBuilder {
    /// Set the maximum number of attempts, including the first.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the delay before the first retry.
    ///
    /// Default: 1000ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the cap applied to every base delay.
    ///
    /// Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the growth factor between consecutive delays. Must be > 1.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    ///
    /// A jitter of 0.3 adds a random extra of up to 30% of the base delay.
    ///
    /// Default: 0.3
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Replace the retryable-error allow-list.
    ///
    /// ```rust
    /// use bizdesk_core::retry::RetryConfig;
    ///
    /// let config = RetryConfig::builder()
    ///     .retryable_errors(["ECONNRESET", "503"])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.retryable_errors().len(), 2);
    /// ```
    pub fn retryable_errors<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_errors = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Append one marker to the allow-list.
    pub fn retryable_error(mut self, marker: impl Into<String>) -> Self {
        self.retryable_errors
            .get_or_insert_with(Vec::new)
            .push(marker.into());
        self
    }

    /// Attach an observer invoked before each backoff wait.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Attach an already shared observer.
    pub fn observer(mut self, observer: RetryObserver) -> Self {
        self.on_retry = Some(observer);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroAttempts`] if `max_attempts` is 0
    /// - [`ConfigError::InvalidMultiplier`] unless the multiplier is finite and > 1
    /// - [`ConfigError::InvalidJitter`] if the jitter is NaN
    /// - [`ConfigError::DelayOrder`] if `max_delay < initial_delay`
    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let initial_delay = self.initial_delay.unwrap_or(DEFAULT_INITIAL_DELAY);
        let max_delay = self.max_delay.unwrap_or(DEFAULT_MAX_DELAY);
        let multiplier = self.multiplier.unwrap_or(DEFAULT_MULTIPLIER);
        let jitter = self.jitter.unwrap_or(DEFAULT_JITTER);

        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ConfigError::InvalidMultiplier(multiplier));
        }
        // NaN survives the setter's clamp
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::InvalidJitter(jitter));
        }
        if max_delay < initial_delay {
            return Err(ConfigError::DelayOrder {
                initial_delay,
                max_delay,
            });
        }

        Ok(RetryConfig {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier,
            jitter,
            retryable_errors: self.retryable_errors.unwrap_or_default().into(),
            on_retry: self.on_retry,
        })
    }
}

/// Serializable retry settings, e.g. a `[retry]` table in a config file.
///
/// Every field is optional; missing fields take the defaults.
///
/// ```rust
/// use bizdesk_core::retry::{RetryConfig, RetrySettings};
///
/// let settings: RetrySettings =
///     serde_json::from_str(r#"{ "max_attempts": 4, "initial_delay_ms": 250 }"#).unwrap();
/// let config = RetryConfig::try_from(settings).unwrap();
/// assert_eq!(config.max_attempts(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Maximum attempts including the first.
    pub max_attempts: Option<u32>,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: Option<u64>,
    /// Delay cap in milliseconds.
    pub max_delay_ms: Option<u64>,
    /// Backoff multiplier.
    pub multiplier: Option<f64>,
    /// Jitter factor (0.0 to 1.0).
    pub jitter: Option<f64>,
    /// Retryable-error markers.
    pub retryable_errors: Option<Vec<String>>,
}

impl RetrySettings {
    /// Turn the settings into a builder so an observer can still be attached.
    pub fn into_builder(self) -> RetryConfigBuilder {
        self.apply_to(RetryConfig::builder())
    }

    /// Layer the fields that are set on top of `builder`.
    pub fn apply_to(self, builder: RetryConfigBuilder) -> RetryConfigBuilder {
        let mut builder = builder;
        if let Some(n) = self.max_attempts {
            builder = builder.max_attempts(n);
        }
        if let Some(ms) = self.initial_delay_ms {
            builder = builder.initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            builder = builder.max_delay(Duration::from_millis(ms));
        }
        if let Some(m) = self.multiplier {
            builder = builder.multiplier(m);
        }
        if let Some(j) = self.jitter {
            builder = builder.jitter(j);
        }
        if let Some(markers) = self.retryable_errors {
            builder = builder.retryable_errors(markers);
        }
        builder
    }
}

impl TryFrom<RetrySettings> for RetryConfig {
    type Error = ConfigError;

    fn try_from(settings: RetrySettings) -> Result<Self, Self::Error> {
        settings.into_builder().build()
    }
}
