//! Error types for backend calls
//!
//! [`BackendError`] describes what went wrong talking to the backend (network,
//! HTTP status, API error codes). [`InvocationError`] is what the retrying
//! helpers return: a backend error, or a response that arrived but is not
//! usable.

use bizdesk_core::error_boundary;
use bizdesk_core::retry::ErrorCode;
use bizdesk_core::ConfigError;
use thiserror::Error;

/// Result type alias for retrying backend calls.
pub type Result<T> = std::result::Result<T, InvocationError>;

/// Code of [`InvocationError::NoData`], usable as an allow-list marker.
pub const NO_DATA_CODE: &str = "NO_DATA";

/// Code of [`InvocationError::Rejected`], usable as an allow-list marker.
pub const REJECTED_CODE: &str = "REJECTED";

/// Failure reported by the backend or by the transport in front of it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, refused, reset, TLS).
    #[error("Failed to fetch: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-2xx response without a structured API error body.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Structured error from the data API (`{ code, message }`).
    #[error("[{code}] {message}")]
    Api {
        /// HTTP status code, when the error arrived with one
        status: Option<u16>,
        /// Backend error code, e.g. `PGRST001`
        code: String,
        /// Error message
        message: String,
    },

    /// Error reported by the backend with neither a code nor a status.
    ///
    /// Displayed as the backend's text, unchanged.
    #[error("{0}")]
    Remote(String),

    /// The edge-function relay failed before reaching the function.
    #[error("Relay error invoking the Edge Function: {0}")]
    Relay(String),

    /// The response body could not be parsed.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Missing or invalid backend configuration.
    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl ErrorCode for BackendError {
    fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Timeout(_) => Some("ETIMEDOUT"),
            _ => None,
        }
    }
}

error_boundary!(reqwest::Error => BackendError, |e| {
    if e.is_timeout() {
        BackendError::Timeout(e.to_string())
    } else if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else if e.is_builder() {
        BackendError::Config(e.to_string())
    } else {
        BackendError::Network(e.to_string())
    }
});

/// Failure of a retrying backend call.
///
/// Every variant except [`Config`](Self::Config) and [`Decode`](Self::Decode)
/// is produced inside the retry loop and is subject to the call's allow-list.
/// [`NoData`](Self::NoData) and [`Rejected`](Self::Rejected) carry the codes
/// [`NO_DATA_CODE`] and [`REJECTED_CODE`] so allow-lists can name them.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The backend or transport reported an error.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The call succeeded at the transport level but carried no data.
    #[error("No data returned")]
    NoData,

    /// The remote procedure answered with `success: false`.
    #[error("{message}")]
    Rejected {
        /// Message from the reply's `error` field
        message: String,
    },

    /// The data could not be converted into the requested type.
    #[error("Failed to decode response data: {0}")]
    Decode(String),

    /// The call options produced an invalid retry configuration.
    #[error("Invalid retry options: {0}")]
    Config(#[from] ConfigError),
}

impl InvocationError {
    /// The underlying backend error, if this is one.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl ErrorCode for InvocationError {
    fn code(&self) -> Option<&str> {
        match self {
            Self::Backend(e) => e.code(),
            Self::NoData => Some(NO_DATA_CODE),
            Self::Rejected { .. } => Some(REJECTED_CODE),
            Self::Decode(_) | Self::Config(_) => None,
        }
    }
}

error_boundary!(serde_json::Error => InvocationError, |e| {
    InvocationError::Decode(e.to_string())
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(InvocationError::NoData.to_string(), "No data returned");
        assert_eq!(
            InvocationError::Rejected {
                message: "Quota exceeded".into()
            }
            .to_string(),
            "Quota exceeded"
        );
        let http = BackendError::Http {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(http.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(
            InvocationError::from(http).to_string(),
            "HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn test_codes_flow_through_invocation_error() {
        let api = BackendError::Api {
            status: Some(503),
            code: "PGRST001".into(),
            message: "Database client error".into(),
        };
        assert_eq!(api.code(), Some("PGRST001"));
        assert_eq!(api.status(), Some(503));
        assert_eq!(InvocationError::from(api).code(), Some("PGRST001"));
        assert_eq!(InvocationError::NoData.code(), Some("NO_DATA"));
        assert_eq!(
            InvocationError::Decode("bad".into()).code(),
            None
        );
        assert_eq!(
            BackendError::Timeout("30s".into()).code(),
            Some("ETIMEDOUT")
        );
    }

    #[test]
    fn test_remote_error_has_no_code_or_status() {
        let err = BackendError::Remote("permission denied for table invoices".into());
        assert_eq!(err.to_string(), "permission denied for table invoices");
        assert_eq!(err.code(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_serde_boundary() {
        let err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err: InvocationError = err.into();
        assert!(matches!(err, InvocationError::Decode(_)));
    }
}
