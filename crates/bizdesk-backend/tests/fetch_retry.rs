//! Validated-fetch retry tests
//!
//! Backoff schedules run on a paused tokio clock, so the default 500ms policy
//! is exercised without real waiting.

use bizdesk_backend::{
    BackendError, CancellationToken, Envelope, FetchOptions, InvocationError, fetch_with_retry,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

mod common;
use common::{fast_options, init_tracing};

#[tokio::test(start_paused = true)]
async fn test_empty_result_exhausts_default_attempts() {
    init_tracing();
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Envelope::<Value> {
                data: None,
                error: None,
            }
            .into_response()
        },
        &FetchOptions::new(),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, InvocationError::NoData));
    assert_eq!(err.to_string(), "No data returned");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // 500ms then 1000ms, each with up to 30% jitter
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1500), "waited {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(1960), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_transient_network_error_then_data() {
    let calls = AtomicU32::new(0);

    let rows = fetch_with_retry(
        || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BackendError::Network("connection reset by peer (ECONNRESET)".into()))
            } else {
                Ok(Some(vec![json!({ "id": 1 })]))
            }
        },
        &FetchOptions::new(),
    )
    .await
    .unwrap();

    assert_eq!(rows, vec![json!({ "id": 1 })]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connection_failure_codes_are_retried() {
    let calls = AtomicU32::new(0);

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Api {
                status: Some(503),
                code: "PGRST001".into(),
                message: "Database client error. Retrying the connection.".into(),
            })
        },
        &FetchOptions::new(),
    )
    .await;

    match result {
        Err(InvocationError::Backend(BackendError::Api { code, .. })) => {
            assert_eq!(code, "PGRST001");
        }
        other => panic!("expected the final API error, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_errors_fail_immediately() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Api {
                status: Some(406),
                code: "PGRST116".into(),
                message: "JSON object requested, multiple (or no) rows returned".into(),
            })
        },
        &FetchOptions::new(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_options_override_defaults() {
    let calls = AtomicU32::new(0);
    let options = FetchOptions::new()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(10));

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        },
        &options,
    )
    .await;

    assert!(matches!(result, Err(InvocationError::NoData)));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_custom_allow_list_can_exclude_empty_results() {
    let calls = AtomicU32::new(0);
    let options = FetchOptions::new().retryable_errors(["ECONNRESET"]);

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        },
        &options,
    )
    .await;

    assert!(matches!(result, Err(InvocationError::NoData)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_each_retry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = FetchOptions::new().on_retry(move |event| {
        sink.lock()
            .unwrap()
            .push((event.attempt, event.error.to_string(), event.delay));
    });

    let result: bizdesk_backend::Result<Value> =
        fetch_with_retry(|| async { Ok(None) }, &options).await;
    assert!(result.is_err());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, 1);
    assert_eq!(seen[1].0, 2);
    assert!(seen.iter().all(|(_, msg, _)| msg == "No data returned"));
    assert!(seen[0].2 >= Duration::from_millis(500) && seen[0].2 <= Duration::from_millis(650));
    assert!(seen[1].2 >= Duration::from_millis(1000) && seen[1].2 <= Duration::from_millis(1300));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_the_backoff() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Timeout("operation timed out".into()))
        },
        &FetchOptions::new().cancel_token(token),
    )
    .await;

    assert!(matches!(
        result,
        Err(InvocationError::Backend(BackendError::Timeout(_)))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_invalid_options_never_call_fetch() {
    let calls = AtomicU32::new(0);

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!(1)))
        },
        &fast_options().multiplier(1.0),
    )
    .await;

    assert!(matches!(result, Err(InvocationError::Config(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_envelope_error_flows_into_the_loop() {
    let calls = AtomicU32::new(0);

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let envelope: Envelope<Value> = serde_json::from_value(json!({
                "data": null,
                "error": { "message": "TypeError: Failed to fetch" }
            }))
            .unwrap();
            envelope.into_response()
        },
        &fast_options(),
    )
    .await;

    assert!(result.unwrap_err().to_string().contains("Failed to fetch"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_uncoded_envelope_error_is_tried_once() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: bizdesk_backend::Result<Value> = fetch_with_retry(
        || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let envelope: Envelope<Value> = serde_json::from_value(json!({
                "data": null,
                "error": { "message": "permission denied for table invoices" }
            }))
            .unwrap();
            envelope.into_response()
        },
        &FetchOptions::new(),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "permission denied for table invoices");
    assert!(matches!(
        err,
        InvocationError::Backend(BackendError::Remote(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}
