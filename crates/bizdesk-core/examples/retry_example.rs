//! Example: retrying a flaky ledger sync with `RetryConfig`
//!
//! This example demonstrates:
//! 1. Simple retry with exponential backoff
//! 2. Allow-list classification (only retry connection resets)
//! 3. Jitter impact (run multiple times to see variance)
//!
//! Run with:
//! ```bash
//! cargo run -p bizdesk-core --example retry_example
//! ```

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use bizdesk_core::prelude::*;

/// A simulated ledger sync that fails the first few times
struct FlakyLedger {
    attempts: Arc<AtomicU32>,
    fail_count: u32,
    kind: io::ErrorKind,
}

impl FlakyLedger {
    fn new(fail_count: u32, kind: io::ErrorKind) -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
            fail_count,
            kind,
        }
    }

    async fn sync(&self) -> Result<String, io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!("  Attempt {attempt}: FAILED ({:?})", self.kind);
            Err(io::Error::new(self.kind, format!("sync failed on attempt {attempt}")))
        } else {
            println!("  Attempt {attempt}: SUCCESS");
            Ok("42 invoices synced".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Simple retry with exponential backoff
async fn example_simple_retry() -> anyhow::Result<()> {
    println!("\n=== Example 1: Simple Retry with Exponential Backoff ===\n");

    let config = RetryConfig::builder()
        .max_attempts(3)
        .initial_delay(Duration::from_millis(100))
        .jitter(0.0) // No jitter for predictable output
        .on_retry(|event| {
            println!(
                "  -> attempt {} failed ({}), waiting {:?}",
                event.attempt, event.error, event.delay
            );
        })
        .build()?;

    let ledger = FlakyLedger::new(2, io::ErrorKind::TimedOut);
    let start = Instant::now();

    let result = config
        .execute(|| {
            let ledger = &ledger;
            async move { ledger.sync().await }
        })
        .await?;

    println!("\nResult: {result}");
    println!("Total attempts: {}", ledger.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 100ms + 200ms = ~300ms");

    Ok(())
}

/// Example 2: Allow-list classification
async fn example_allow_list() -> anyhow::Result<()> {
    println!("\n=== Example 2: Allow-List (Connection Resets Only) ===\n");

    let config = RetryConfig::builder()
        .max_attempts(3)
        .initial_delay(Duration::from_millis(10))
        .retryable_errors(["ECONNRESET"])
        .build()?;

    println!("Test 1: Permission error (should NOT retry)");
    let ledger = FlakyLedger::new(5, io::ErrorKind::PermissionDenied);
    let result = execute_with_retry(|| ledger.sync(), &config).await;
    assert!(result.is_err());
    println!("Total attempts: {}", ledger.total_attempts());

    println!("\nTest 2: Connection reset (should retry)");
    let ledger = FlakyLedger::new(2, io::ErrorKind::ConnectionReset);
    let result = execute_with_retry(|| ledger.sync(), &config).await;
    assert!(result.is_ok());
    println!("Total attempts: {}", ledger.total_attempts());

    Ok(())
}

/// Example 3: Jitter demonstration
async fn example_jitter_impact() -> anyhow::Result<()> {
    println!("\n=== Example 3: Jitter Impact (Run 10 Times) ===\n");

    let no_jitter = RetryConfig::builder()
        .max_attempts(2)
        .initial_delay(Duration::from_millis(100))
        .jitter(0.0)
        .build()?;
    let with_jitter = no_jitter.to_builder().jitter(0.3).build()?;

    for (label, config) in [("Without jitter", &no_jitter), ("With 30% jitter", &with_jitter)] {
        println!("{label} (10 runs):");
        let mut total = Duration::ZERO;
        for run in 1..=10 {
            let ledger = FlakyLedger::new(1, io::ErrorKind::TimedOut);
            let start = Instant::now();
            let _ = config.execute(|| ledger.sync()).await;
            let elapsed = start.elapsed();
            total += elapsed;
            println!("  Run {run}: {elapsed:?}");
        }
        println!("  Average: {:?}\n", total / 10);
    }

    println!("Without jitter every run waits ~100ms; with jitter waits spread over 100-130ms.");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("==============================================");
    println!("   bizdesk core: Retry Executor Examples");
    println!("==============================================");

    example_simple_retry().await?;
    example_allow_list().await?;
    example_jitter_impact().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
