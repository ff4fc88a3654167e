//! Validated-fetch: retry a data fetch until it yields data

use crate::envelope::FetchResponse;
use crate::error::{InvocationError, NO_DATA_CODE, Result};
use crate::options::FetchOptions;
use bizdesk_core::retry::{RetryConfig, RetryConfigBuilder};
use std::future::Future;
use std::time::Duration;

/// Attempts made by [`fetch_with_retry`] unless overridden.
pub const FETCH_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry of [`fetch_with_retry`] unless overridden.
pub const FETCH_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Failures [`fetch_with_retry`] retries unless overridden: transient
/// network failures, the data API's connection-failure codes, and empty
/// results.
pub const FETCH_RETRYABLE_ERRORS: &[&str] = &[
    "ECONNRESET",
    "ETIMEDOUT",
    "ECONNREFUSED",
    "Failed to fetch",
    "NetworkError",
    "network",
    "timeout",
    "PGRST000",
    "PGRST001",
    "PGRST002",
    "PGRST003",
    NO_DATA_CODE,
];

/// Default policy of [`fetch_with_retry`], before call-site overrides.
pub fn fetch_defaults() -> RetryConfigBuilder {
    RetryConfig::builder()
        .max_attempts(FETCH_MAX_ATTEMPTS)
        .initial_delay(FETCH_INITIAL_DELAY)
        .retryable_errors(FETCH_RETRYABLE_ERRORS.iter().copied())
}

/// Run `fetch` until it returns data.
///
/// Each attempt's [`FetchResponse`] is validated:
/// - `Err(e)` fails the attempt with [`InvocationError::Backend`]
/// - `Ok(None)` fails the attempt with [`InvocationError::NoData`]
/// - `Ok(Some(data))` returns `data`
///
/// Failed attempts are retried under [`fetch_defaults`] merged with `options`.
///
/// # Errors
///
/// The failure of the last attempt made, or [`InvocationError::Config`] if
/// `options` produce an invalid policy.
///
/// # Examples
///
/// ```rust
/// use bizdesk_backend::{Envelope, FetchOptions, fetch_with_retry};
///
/// # async fn example() -> bizdesk_backend::Result<()> {
/// let invoices = fetch_with_retry(
///     || async { Envelope::ok(vec!["INV-001"]).into_response() },
///     &FetchOptions::new(),
/// )
/// .await?;
/// assert_eq!(invoices, ["INV-001"]);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_with_retry<F, Fut, T>(fetch: F, options: &FetchOptions) -> Result<T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = FetchResponse<T>> + Send,
    T: Send,
{
    let config = options.resolve(fetch_defaults())?;
    options
        .run(&config, || {
            let response = fetch();
            async move { validate(response.await) }
        })
        .await
}

fn validate<T>(response: FetchResponse<T>) -> Result<T> {
    match response {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(InvocationError::NoData),
        Err(e) => Err(InvocationError::Backend(e)),
    }
}
