//! Per-call overrides for the retrying helpers

use bizdesk_core::ConfigError;
use bizdesk_core::retry::{
    BackoffStrategy, CancellationToken, ErrorCode, RetryConfig, RetryConfigBuilder, RetryEvent,
    RetryObserver, RetrySettings,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Overrides applied on top of a helper's default retry policy.
///
/// Only the fields that are set replace the defaults. Durations are kept at
/// millisecond precision.
///
/// ```rust
/// use bizdesk_backend::CallOptions;
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(250));
/// assert_eq!(options.settings().max_attempts, Some(5));
/// ```
#[derive(Clone, Default)]
pub struct CallOptions {
    retry: RetrySettings,
    observer: Option<RetryObserver>,
    cancel: Option<CancellationToken>,
}

/// Options for [`fetch_with_retry`](crate::fetch_with_retry).
pub type FetchOptions = CallOptions;

impl CallOptions {
    /// No overrides: the helper's defaults apply unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from settings loaded from a config file.
    pub fn from_settings(settings: RetrySettings) -> Self {
        Self {
            retry: settings,
            ..Self::default()
        }
    }

    /// Override the maximum number of attempts.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = Some(max_attempts);
        self
    }

    /// Override the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.retry.initial_delay_ms = Some(millis(delay));
        self
    }

    /// Override the cap on any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.retry.max_delay_ms = Some(millis(delay));
        self
    }

    /// Override the backoff multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.retry.multiplier = Some(multiplier);
        self
    }

    /// Override the jitter factor.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.retry.jitter = Some(jitter);
        self
    }

    /// Replace the retryable-error allow-list. An empty list retries every
    /// failure.
    pub fn retryable_errors<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retry.retryable_errors = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Observe every scheduled retry.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Observe every scheduled retry with an already shared observer.
    pub fn observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Abort pending backoff waits when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The retry overrides as plain settings.
    pub fn settings(&self) -> &RetrySettings {
        &self.retry
    }

    /// Whether an observer is attached.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Merge the overrides onto `defaults` and validate the result.
    pub fn resolve(&self, defaults: RetryConfigBuilder) -> Result<RetryConfig, ConfigError> {
        let mut builder = self.retry.clone().apply_to(defaults);
        if let Some(observer) = &self.observer {
            builder = builder.observer(Arc::clone(observer));
        }
        builder.build()
    }

    pub(crate) async fn run<F, Fut, T, E>(&self, config: &RetryConfig, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: ErrorCode + Send + Sync + 'static,
    {
        match &self.cancel {
            Some(token) => config.execute_cancellable(token, operation).await,
            None => config.execute(operation).await,
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("retry", &self.retry)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RetryConfigBuilder {
        RetryConfig::builder()
            .max_attempts(3)
            .initial_delay(Duration::from_millis(500))
            .retryable_errors(["ECONNRESET", "timeout"])
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = CallOptions::new().resolve(defaults()).unwrap();
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.retryable_errors(), ["ECONNRESET", "timeout"]);
        assert!(!config.has_observer());
    }

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let config = CallOptions::new()
            .max_attempts(5)
            .max_delay(Duration::from_secs(2))
            .on_retry(|_| {})
            .resolve(defaults())
            .unwrap();
        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.max_delay(), Duration::from_secs(2));
        assert_eq!(config.retryable_errors(), ["ECONNRESET", "timeout"]);
        assert!(config.has_observer());
    }

    #[test]
    fn test_allow_list_is_replaced_not_merged() {
        let config = CallOptions::new()
            .retryable_errors(["503"])
            .resolve(defaults())
            .unwrap();
        assert_eq!(config.retryable_errors(), ["503"]);

        let config = CallOptions::new()
            .retryable_errors(Vec::<String>::new())
            .resolve(defaults())
            .unwrap();
        assert!(config.retryable_errors().is_empty());
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let err = CallOptions::new()
            .max_attempts(0)
            .resolve(defaults())
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroAttempts);

        let err = CallOptions::new()
            .jitter(f64::NAN)
            .resolve(defaults())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJitter(_)));
    }

    #[test]
    fn test_from_settings() {
        let settings: RetrySettings =
            serde_json::from_str(r#"{ "max_attempts": 2, "jitter": 0.0 }"#).unwrap();
        let config = CallOptions::from_settings(settings)
            .resolve(defaults())
            .unwrap();
        assert_eq!(config.max_attempts(), 2);
        assert_eq!(config.jitter(), 0.0);
    }
}
