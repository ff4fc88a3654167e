//! Error classification against a retryable-marker allow-list.

use std::error::Error;
use std::io;

/// An error that can be classified for retry decisions.
///
/// Classification looks at two things: the error's message (and the messages
/// of its `source()` chain) and an optional categorical code. Most error types
/// only need the empty impl:
///
/// ```rust
/// use bizdesk_core::retry::ErrorCode;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("ledger locked")]
/// struct LedgerLocked;
///
/// impl ErrorCode for LedgerLocked {}
/// ```
///
/// Types that carry a code (a POSIX errno name, a backend error code) return it
/// from [`code`](ErrorCode::code) so allow-list entries can match it exactly.
pub trait ErrorCode: Error {
    /// Categorical code of this error, compared by equality against markers.
    fn code(&self) -> Option<&str> {
        None
    }
}

impl ErrorCode for io::Error {
    fn code(&self) -> Option<&str> {
        let code = match self.kind() {
            io::ErrorKind::ConnectionReset => "ECONNRESET",
            io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
            io::ErrorKind::ConnectionAborted => "ECONNABORTED",
            io::ErrorKind::TimedOut => "ETIMEDOUT",
            io::ErrorKind::BrokenPipe => "EPIPE",
            io::ErrorKind::NotConnected => "ENOTCONN",
            io::ErrorKind::AddrInUse => "EADDRINUSE",
            io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
            io::ErrorKind::HostUnreachable => "EHOSTUNREACH",
            io::ErrorKind::NetworkUnreachable => "ENETUNREACH",
            io::ErrorKind::Interrupted => "EINTR",
            io::ErrorKind::WouldBlock => "EAGAIN",
            _ => return None,
        };
        Some(code)
    }
}

/// Returns `true` if any marker matches `error`.
///
/// A marker matches when it is a case-sensitive substring of the error's
/// message or of any message in its `source()` chain, or when it equals the
/// error's [`ErrorCode::code`].
pub fn matches_any(error: &dyn ErrorCode, markers: &[String]) -> bool {
    let code = error.code();
    let message = error.to_string();
    if markers
        .iter()
        .any(|m| code == Some(m.as_str()) || message.contains(m.as_str()))
    {
        return true;
    }

    let mut source = error.source();
    while let Some(inner) = source {
        let message = inner.to_string();
        if markers.iter().any(|m| message.contains(m.as_str())) {
            return true;
        }
        source = inner.source();
    }
    false
}
