#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Backend access for bizdesk.
//!
//! Two retrying call helpers built on [`bizdesk_core::retry`]:
//!
//! - [`fetch_with_retry`] for data fetches returning `{ data, error }`; an
//!   empty result counts as a failure
//! - [`invoke_with_retry`] for named remote procedures whose reply may carry
//!   `success: false`; such rejections are only retried for calls declared
//!   [`Idempotency::Idempotent`]
//!
//! plus the HTTP clients they are normally used with, [`FunctionsClient`] and
//! [`RestClient`], configured through an explicit [`BackendConfig`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use bizdesk_backend::{BackendConfig, FunctionsClient, Idempotency, RpcOptions};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackendConfig::new("https://project.supabase.co", "anon-key")?;
//! let functions = FunctionsClient::new(config)?;
//!
//! let reply = functions
//!     .call(
//!         "generate-invoice-pdf",
//!         &json!({ "invoice_id": 42 }),
//!         &RpcOptions::new().idempotency(Idempotency::Idempotent),
//!     )
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod functions;
pub mod observability;
pub mod options;
pub mod rest;
pub mod rpc;

pub use config::BackendConfig;
pub use envelope::{Envelope, EnvelopeError, FetchResponse};
pub use error::{BackendError, InvocationError, Result};
pub use fetch::{fetch_defaults, fetch_with_retry};
pub use functions::FunctionsClient;
pub use observability::tracing_observer;
pub use options::{CallOptions, FetchOptions};
pub use rest::{Query, RestClient};
pub use rpc::{
    FunctionInvoker, Idempotency, RpcOptions, invoke_typed_with_retry, invoke_with_retry,
    rpc_defaults,
};

// Re-export the core retry types callers need alongside the helpers
pub use bizdesk_core::retry::{CancellationToken, RetryEvent, RetrySettings};
