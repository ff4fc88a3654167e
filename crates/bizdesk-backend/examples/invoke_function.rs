//! Example: invoking an edge function with retries
//!
//! Reads the project settings from the environment (or a `.env` file):
//!
//! ```bash
//! BIZDESK_SUPABASE_URL=https://project.supabase.co \
//! BIZDESK_SUPABASE_ANON_KEY=... \
//! RUST_LOG=bizdesk_backend=debug \
//! cargo run -p bizdesk-backend --example invoke_function -- generate-invoice-pdf '{"invoice_id":42}'
//! ```

use bizdesk_backend::{BackendConfig, CallOptions, FunctionsClient, Idempotency, RpcOptions};
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "health-check".to_string());
    let body = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::json!({}),
    };

    let functions = FunctionsClient::new(BackendConfig::from_env()?)?;

    // Only read-style functions are declared idempotent
    let options = RpcOptions::new()
        .call(CallOptions::new().max_delay(Duration::from_secs(5)))
        .idempotency(Idempotency::Idempotent);

    let reply = functions.call(&name, &body, &options).await?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    Ok(())
}
