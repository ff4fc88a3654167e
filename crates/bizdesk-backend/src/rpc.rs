//! Remote-procedure invocation with retries
//!
//! A remote procedure is a named backend function taking a JSON body and
//! answering with a `{ data, error }` envelope whose `data` may carry an
//! application-level `success: false` flag.

use crate::envelope::FetchResponse;
use crate::error::{InvocationError, NO_DATA_CODE, REJECTED_CODE, Result};
use crate::options::CallOptions;
use async_trait::async_trait;
use bizdesk_core::retry::{RetryConfig, RetryConfigBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Attempts made by [`invoke_with_retry`] unless overridden.
pub const RPC_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry of [`invoke_with_retry`] unless overridden.
pub const RPC_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Failures [`invoke_with_retry`] retries unless overridden: network
/// failures, rate limiting, gateway errors, empty replies and rejections.
///
/// Rejections only reach the retry loop for [`Idempotency::Idempotent`] calls.
pub const RPC_RETRYABLE_ERRORS: &[&str] = &[
    "Failed to fetch",
    "Failed to send a request",
    "NetworkError",
    "network",
    "ECONNRESET",
    "ETIMEDOUT",
    "429",
    "rate limit",
    "Too Many Requests",
    "503",
    "504",
    NO_DATA_CODE,
    REJECTED_CODE,
];

/// Message used when a rejection carries no usable `error` text.
pub const REJECTED_FALLBACK: &str = "Remote procedure reported failure";

/// Default policy of [`invoke_with_retry`], before call-site overrides.
pub fn rpc_defaults() -> RetryConfigBuilder {
    RetryConfig::builder()
        .max_attempts(RPC_MAX_ATTEMPTS)
        .initial_delay(RPC_INITIAL_DELAY)
        .retryable_errors(RPC_RETRYABLE_ERRORS.iter().copied())
}

/// Anything that can invoke a named remote procedure once.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `name` with `body`, without retrying.
    async fn invoke(&self, name: &str, body: &Value) -> FetchResponse<Value>;
}

/// Whether repeating a remote procedure is safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Idempotency {
    /// Repeating the call has no extra side effects; `success: false`
    /// replies are retried like transport failures.
    Idempotent,
    /// The call may have side effects; a `success: false` reply is returned
    /// as soon as it arrives. Transport failures are still retried.
    #[default]
    NonIdempotent,
}

/// Options for [`invoke_with_retry`].
#[derive(Debug, Clone, Default)]
pub struct RpcOptions {
    call: CallOptions,
    idempotency: Idempotency,
}

impl RpcOptions {
    /// Defaults: no retry overrides, non-idempotent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retry overrides.
    pub fn call(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }

    /// Declare whether the procedure is safe to repeat.
    pub fn idempotency(mut self, idempotency: Idempotency) -> Self {
        self.idempotency = idempotency;
        self
    }

    /// Shorthand for `idempotency(Idempotency::Idempotent)`.
    pub fn idempotent(self) -> Self {
        self.idempotency(Idempotency::Idempotent)
    }

    /// The retry overrides.
    pub fn call_options(&self) -> &CallOptions {
        &self.call
    }

    /// The declared idempotency.
    pub fn declared_idempotency(&self) -> Idempotency {
        self.idempotency
    }
}

impl From<CallOptions> for RpcOptions {
    fn from(call: CallOptions) -> Self {
        Self::new().call(call)
    }
}

/// Invoke a remote procedure, retrying failed attempts.
///
/// An attempt fails when the invoker reports an error
/// ([`InvocationError::Backend`]), when it returns no data
/// ([`InvocationError::NoData`]) or when the data is an object with
/// `"success": false` ([`InvocationError::Rejected`], message taken from
/// `data.error`). Failures are retried under [`rpc_defaults`] merged with
/// `options`; rejections of [`Idempotency::NonIdempotent`] calls are never
/// retried.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use bizdesk_backend::{FetchResponse, FunctionInvoker, RpcOptions, invoke_with_retry};
/// use serde_json::{Value, json};
///
/// struct Echo;
///
/// #[async_trait]
/// impl FunctionInvoker for Echo {
///     async fn invoke(&self, _name: &str, body: &Value) -> FetchResponse<Value> {
///         Ok(Some(json!({ "success": true, "echo": body })))
///     }
/// }
///
/// # async fn example() -> bizdesk_backend::Result<()> {
/// let reply = invoke_with_retry(&Echo, "echo", &json!({ "n": 1 }), &RpcOptions::new()).await?;
/// assert_eq!(reply["echo"]["n"], 1);
/// # Ok(())
/// # }
/// ```
pub async fn invoke_with_retry<I>(
    invoker: &I,
    name: &str,
    body: &Value,
    options: &RpcOptions,
) -> Result<Value>
where
    I: FunctionInvoker + ?Sized,
{
    let config = options.call.resolve(rpc_defaults())?;
    let attempt = || async move {
        match invoker.invoke(name, body).await {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(InvocationError::NoData),
            Err(e) => Err(InvocationError::Backend(e)),
        }
    };
    let attempt = &attempt;

    match options.idempotency {
        Idempotency::Idempotent => {
            options
                .call
                .run(&config, || async move {
                    match attempt().await {
                        Ok(data) => check_reply(data),
                        Err(e) => Err(e),
                    }
                })
                .await
        }
        // A rejection leaves the loop as an inner `Err`, outside the allow-list.
        Idempotency::NonIdempotent => {
            options
                .call
                .run(&config, || async move {
                    match attempt().await {
                        Ok(data) => Ok(check_reply(data)),
                        Err(e) => Err(e),
                    }
                })
                .await?
        }
    }
}

/// Like [`invoke_with_retry`], deserializing the reply into `T`.
///
/// Decoding happens once, after the retry loop; a reply that does not match
/// `T` is [`InvocationError::Decode`] and is not retried.
pub async fn invoke_typed_with_retry<I, T>(
    invoker: &I,
    name: &str,
    body: &Value,
    options: &RpcOptions,
) -> Result<T>
where
    I: FunctionInvoker + ?Sized,
    T: DeserializeOwned,
{
    let data = invoke_with_retry(invoker, name, body, options).await?;
    Ok(serde_json::from_value(data)?)
}

fn check_reply(data: Value) -> Result<Value> {
    if data.get("success").and_then(Value::as_bool) != Some(false) {
        return Ok(data);
    }

    let message = match data.get("error") {
        Some(Value::String(message)) if !message.is_empty() => message.clone(),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(REJECTED_FALLBACK)
            .to_string(),
        _ => REJECTED_FALLBACK.to_string(),
    };
    Err(InvocationError::Rejected { message })
}
