//! The `{ data, error }` response envelope and its tagged form

use crate::error::BackendError;
use serde::Deserialize;

/// Outcome of one backend call, as consumed by the retrying helpers.
///
/// - `Err(e)`: the backend reported an error
/// - `Ok(None)`: the call succeeded but carried no data
/// - `Ok(Some(data))`: the payload
pub type FetchResponse<T> = Result<Option<T>, BackendError>;

/// Untyped `{ data, error }` envelope as returned by backend SDKs and proxies.
///
/// Convert it with [`into_response`](Self::into_response) before handing it to
/// [`fetch_with_retry`](crate::fetch_with_retry).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    /// Payload, if any
    #[serde(default)]
    pub data: Option<T>,

    /// Error reported by the backend, if any
    #[serde(default)]
    pub error: Option<EnvelopeError>,
}

/// Error member of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeError {
    /// Structured error object
    Detailed {
        /// Human-readable message
        message: String,
        /// Optional backend error code
        #[serde(default)]
        code: Option<String>,
        /// Optional HTTP status
        #[serde(default)]
        status: Option<u16>,
    },
    /// Bare error string
    Message(String),
}

impl From<EnvelopeError> for BackendError {
    fn from(error: EnvelopeError) -> Self {
        match error {
            EnvelopeError::Detailed {
                message,
                code: Some(code),
                status,
            } => BackendError::Api {
                status,
                code,
                message,
            },
            EnvelopeError::Detailed {
                message,
                code: None,
                status: Some(status),
            } => BackendError::Http { status, message },
            EnvelopeError::Detailed { message, .. } | EnvelopeError::Message(message) => {
                BackendError::Remote(message)
            }
        }
    }
}

impl<T> Envelope<T> {
    /// Envelope carrying data.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Tag the envelope. A present error wins over present data.
    pub fn into_response(self) -> FetchResponse<T> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.data),
        }
    }
}
