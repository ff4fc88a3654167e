//! Common test utilities and fixtures
//!
//! - rstest for parameterized cases
//! - wiremock for HTTP mocking (isolated, parallel-safe)
//! - paused tokio time for backoff schedules
#![allow(dead_code)]

use async_trait::async_trait;
use bizdesk_backend::{BackendConfig, BackendError, CallOptions, FetchResponse, FunctionInvoker};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Install a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Overrides that keep real-time tests fast and deterministic.
pub fn fast_options() -> CallOptions {
    CallOptions::new()
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .jitter(0.0)
}

/// Configuration pointing at a mock server.
pub fn backend_config(uri: &str) -> BackendConfig {
    BackendConfig::new(uri, "test-anon-key")
        .expect("valid mock config")
        .with_timeout(Duration::from_secs(5))
}

/// Invoker replaying scripted responses; the last one repeats forever.
pub struct ScriptedInvoker {
    script: Mutex<VecDeque<FetchResponse<Value>>>,
    last: Mutex<Option<FetchResponse<Value>>>,
    calls: AtomicU32,
}

impl ScriptedInvoker {
    pub fn new(script: impl IntoIterator<Item = FetchResponse<Value>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(response: FetchResponse<Value>) -> Self {
        Self::new([response])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FunctionInvoker for ScriptedInvoker {
    async fn invoke(&self, _name: &str, _body: &Value) -> FetchResponse<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            *last = Some(response);
        }
        last.clone().expect("script must not be empty")
    }
}

pub fn network_error() -> BackendError {
    BackendError::Network("TypeError: NetworkError when attempting to fetch resource".into())
}

pub fn unavailable() -> BackendError {
    BackendError::Http {
        status: 503,
        message: "Edge Function returned a non-2xx status code (503)".into(),
    }
}

pub fn rejected(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

pub fn accepted() -> Value {
    json!({ "success": true, "invoice_id": "INV-2024-0042" })
}

pub fn client_row() -> Value {
    json!({ "id": 7, "name": "Acme GmbH", "tenant_id": 42 })
}

pub fn postgrest_error(code: &str, message: &str) -> Value {
    json!({ "code": code, "details": null, "hint": null, "message": message })
}
