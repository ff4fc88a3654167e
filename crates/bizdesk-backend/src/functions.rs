//! Edge-function client
//!
//! Invokes named remote procedures with `POST {project}/functions/v1/{name}`.

use crate::config::BackendConfig;
use crate::envelope::FetchResponse;
use crate::error::{BackendError, Result};
use crate::observability::{AttemptCounter, RequestLog, tracing_observer};
use crate::rpc::{FunctionInvoker, RpcOptions, invoke_typed_with_retry, invoke_with_retry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Header set by the relay when it failed before reaching the function.
pub const RELAY_ERROR_HEADER: &str = "x-relay-error";

/// Client for the backend's edge functions.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct FunctionsClient {
    http: Arc<reqwest::Client>,
    config: Arc<BackendConfig>,
}

impl FunctionsClient {
    /// Create a client for `config`.
    pub fn new(config: BackendConfig) -> std::result::Result<Self, BackendError> {
        let http = config.http_client()?;
        Ok(Self {
            http: Arc::new(http),
            config: Arc::new(config),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Invoke `name` once, without retrying.
    ///
    /// - 2xx with a JSON body: `Ok(Some(body))`
    /// - 2xx with an empty or `null` body: `Ok(None)`
    /// - relay failure: [`BackendError::Relay`]
    /// - any other non-2xx: [`BackendError::Http`]
    /// - no response: [`BackendError::Network`] or [`BackendError::Timeout`]
    pub async fn invoke_once(&self, name: &str, body: &Value) -> FetchResponse<Value> {
        self.post(name, body, None).await
    }

    async fn post(&self, name: &str, body: &Value, attempt: Option<u32>) -> FetchResponse<Value> {
        let path = format!("functions/v1/{name}");
        let url = self.config.endpoint(&path)?;
        let payload = serde_json::to_vec(body)
            .map_err(|e| BackendError::Decode(format!("request body: {e}")))?;

        let request = RequestLog::start("POST", &path)
            .with_body_size(payload.len())
            .with_attempt(attempt);
        request.sent();

        let response = match self
            .http
            .post(url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                request.send_failed(&e.to_string());
                return Err(send_error(e));
            }
        };

        let status = response.status();
        let relay_error = response
            .headers()
            .get(RELAY_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            == Some("true");
        let bytes = response.bytes().await?;
        let meta = request.response(status.as_u16(), bytes.len());

        if relay_error {
            let err = BackendError::Relay(body_detail(&bytes).unwrap_or_else(|| status.to_string()));
            meta.log_error(&err.to_string());
            return Err(err);
        }

        if !status.is_success() {
            let mut message = format!(
                "Edge Function returned a non-2xx status code ({})",
                status.as_u16()
            );
            if let Some(detail) = body_detail(&bytes) {
                message.push_str(": ");
                message.push_str(&detail);
            }
            let err = BackendError::Http {
                status: status.as_u16(),
                message,
            };
            meta.log_error(&err.to_string());
            return Err(err);
        }

        meta.log_success();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(BackendError::Decode(e.to_string())),
        }
    }

    /// Invoke `name` with retries, logging every retry when `options` carry
    /// no observer of their own.
    pub async fn call(&self, name: &str, body: &Value, options: &RpcOptions) -> Result<Value> {
        let options = self.observed(name, options);
        invoke_with_retry(&self.numbered(), name, body, &options).await
    }

    /// Like [`call`](Self::call), deserializing the reply into `T`.
    pub async fn call_typed<T>(&self, name: &str, body: &Value, options: &RpcOptions) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let options = self.observed(name, options);
        invoke_typed_with_retry(&self.numbered(), name, body, &options).await
    }

    fn numbered(&self) -> NumberedInvoker<'_> {
        NumberedInvoker {
            client: self,
            attempts: AttemptCounter::default(),
        }
    }

    fn observed(&self, name: &str, options: &RpcOptions) -> RpcOptions {
        if options.call_options().has_observer() {
            return options.clone();
        }
        let call = options.call_options().clone().observer(tracing_observer(name));
        options.clone().call(call)
    }
}

#[async_trait]
impl FunctionInvoker for FunctionsClient {
    async fn invoke(&self, name: &str, body: &Value) -> FetchResponse<Value> {
        self.invoke_once(name, body).await
    }
}

/// Invoker for one retrying call; logs each request with its attempt number.
struct NumberedInvoker<'a> {
    client: &'a FunctionsClient,
    attempts: AttemptCounter,
}

#[async_trait]
impl FunctionInvoker for NumberedInvoker<'_> {
    async fn invoke(&self, name: &str, body: &Value) -> FetchResponse<Value> {
        let attempt = self.attempts.next();
        self.client.post(name, body, Some(attempt)).await
    }
}

fn send_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(e.to_string())
    } else {
        BackendError::Network(format!("Failed to send a request to the Edge Function: {e}"))
    }
}

/// `error` or `message` member of a JSON error body, or the raw text.
fn body_detail(bytes: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        for key in ["error", "message"] {
            match value.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Object(o)) => {
                    if let Some(s) = o.get("message").and_then(Value::as_str) {
                        return Some(s.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_detail() {
        assert_eq!(
            body_detail(br#"{"error":"Quota exceeded"}"#).as_deref(),
            Some("Quota exceeded")
        );
        assert_eq!(
            body_detail(br#"{"message":"Too Many Requests"}"#).as_deref(),
            Some("Too Many Requests")
        );
        assert_eq!(
            body_detail(br#"{"error":{"message":"boom"}}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(body_detail(b"upstream timeout").as_deref(), Some("upstream timeout"));
        assert_eq!(body_detail(b"  "), None);
    }

    #[tokio::test]
    async fn test_numbered_invoker_counts_each_request() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/sync-ledger"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let config = BackendConfig::new(&server.uri(), "anon").unwrap();
        let client = FunctionsClient::new(config).unwrap();
        let invoker = client.numbered();

        for _ in 0..2 {
            let reply = invoker.invoke("sync-ledger", &Value::Null).await;
            assert!(matches!(reply, Err(BackendError::Http { status: 503, .. })));
        }
        assert_eq!(invoker.attempts.next(), 3);
    }

    #[test]
    fn test_observer_is_attached_once() {
        let config = BackendConfig::new("http://localhost:54321", "anon").unwrap();
        let client = FunctionsClient::new(config).unwrap();

        let observed = client.observed("send-invoice", &RpcOptions::new());
        assert!(observed.call_options().has_observer());

        let own = RpcOptions::new().call(crate::CallOptions::new().on_retry(|_| {}));
        assert!(client.observed("send-invoice", &own).call_options().has_observer());
    }
}
