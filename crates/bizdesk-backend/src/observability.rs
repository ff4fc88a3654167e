//! Structured logging for backend calls
//!
//! Each HTTP exchange made by the clients is tracked by a [`RequestLog`] from
//! send to response. Exchanges made under a retry loop carry their attempt
//! number, and [`tracing_observer`] logs the retries scheduled between them.

use bizdesk_core::retry::{RetryEvent, RetryObserver};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One in-flight backend request.
///
/// Started right before the request is sent; the elapsed time of the
/// eventual [`ResponseMetadata`] is measured from here on the tokio clock.
#[derive(Debug, Clone)]
pub struct RequestLog {
    method: &'static str,
    path: String,
    body_size: Option<usize>,
    attempt: Option<u32>,
    started: Instant,
}

impl RequestLog {
    /// Start tracking a `method` request to `path`.
    pub fn start(method: &'static str, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body_size: None,
            attempt: None,
            started: Instant::now(),
        }
    }

    /// Size of the request body in bytes.
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// 1-based attempt number within a retrying call.
    pub fn with_attempt(mut self, attempt: Option<u32>) -> Self {
        self.attempt = attempt;
        self
    }

    /// Attempt number, if the request runs under a retry loop.
    pub fn attempt(&self) -> Option<u32> {
        self.attempt
    }

    /// Time since [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the request going out.
    pub fn sent(&self) {
        debug!(
            method = self.method,
            path = %self.path,
            body_size = self.body_size,
            attempt = self.attempt,
            "Sending backend request"
        );
    }

    /// Log a request that never produced a response.
    pub fn send_failed(&self, error: &str) {
        warn!(
            method = self.method,
            path = %self.path,
            attempt = self.attempt,
            elapsed_ms = self.elapsed().as_millis() as u64,
            error = %error,
            "Backend request could not be sent"
        );
    }

    /// Record the response to this request.
    pub fn response(&self, status: u16, body_size: usize) -> ResponseMetadata {
        ResponseMetadata {
            method: self.method,
            path: self.path.clone(),
            status,
            body_size,
            elapsed: self.elapsed(),
            attempt: self.attempt,
        }
    }
}

/// A backend response, ready to be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    /// HTTP method of the request
    pub method: &'static str,
    /// Request path relative to the project URL
    pub path: String,
    /// HTTP status code
    pub status: u16,
    /// Response body size in bytes
    pub body_size: usize,
    /// Time from send to a fully read body
    pub elapsed: Duration,
    /// Attempt number when the request ran under a retry loop
    pub attempt: Option<u32>,
}

impl ResponseMetadata {
    /// Log a usable response.
    pub fn log_success(&self) {
        info!(
            method = self.method,
            path = %self.path,
            status = self.status,
            attempt = self.attempt,
            elapsed_ms = self.elapsed.as_millis() as u64,
            body_size = self.body_size,
            "Backend request succeeded"
        );
    }

    /// Log a response that was turned into `error`.
    pub fn log_error(&self, error: &str) {
        warn!(
            method = self.method,
            path = %self.path,
            status = self.status,
            attempt = self.attempt,
            elapsed_ms = self.elapsed.as_millis() as u64,
            error = %error,
            "Backend request failed"
        );
    }
}

/// Numbers the attempts of one retrying call, starting at 1.
#[derive(Debug, Default)]
pub(crate) struct AttemptCounter(AtomicU32);

impl AttemptCounter {
    pub(crate) fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }
}

/// Retry observer that logs each scheduled retry at `warn` level.
///
/// `label` names the call site (a function name, a table) in the event.
pub fn tracing_observer(label: impl Into<String>) -> RetryObserver {
    let label: Arc<str> = label.into().into();
    Arc::new(move |event: &RetryEvent<'_>| {
        warn!(
            call = %label,
            attempt = event.attempt,
            delay_ms = event.delay.as_millis() as u64,
            error = %event.error,
            "Backend call failed, retrying"
        );
    })
}
