/// Macro to define error boundaries with automatic `From` implementation.
///
/// Each boundary states how a lower-level error becomes a crate's own error
/// type, so `?` works across the boundary without `map_err()` chains.
///
/// # Syntax
///
/// ```ignore
/// error_boundary!(SourceError => TargetError, |err_var| {
///     // conversion logic returning TargetError
/// });
/// ```
///
/// # Example
///
/// ```
/// use bizdesk_core::error_boundary;
///
/// #[derive(Debug, thiserror::Error)]
/// enum InvoiceError {
///     #[error("Malformed amount: {0}")]
///     Amount(String),
///     #[error("Malformed line: {0}")]
///     Line(String),
/// }
///
/// error_boundary!(std::num::ParseIntError => InvoiceError, |e| {
///     InvoiceError::Amount(e.to_string())
/// });
///
/// error_boundary!(std::str::Utf8Error => InvoiceError, |e| {
///     InvoiceError::Line(e.to_string())
/// });
///
/// fn parse_cents(raw: &[u8]) -> Result<i64, InvoiceError> {
///     let text = std::str::from_utf8(raw)?;
///     Ok(text.trim().parse::<i64>()?)
/// }
///
/// assert_eq!(parse_cents(b" 1250 ").unwrap(), 1250);
/// assert!(matches!(parse_cents(b"12.50"), Err(InvoiceError::Amount(_))));
/// ```
#[macro_export]
macro_rules! error_boundary {
    ($inner:ty => $outer:ty, |$err:ident| $body:expr) => {
        impl ::std::convert::From<$inner> for $outer {
            fn from($err: $inner) -> $outer {
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::io;

    #[derive(Debug, thiserror::Error, PartialEq)]
    enum LedgerError {
        #[error("IO: {0}")]
        Io(String),
        #[error("Parse: {0}")]
        Parse(String),
    }

    error_boundary!(io::Error => LedgerError, |e| {
        LedgerError::Io(e.to_string())
    });

    error_boundary!(std::num::ParseFloatError => LedgerError, |e| {
        LedgerError::Parse(e.to_string())
    });

    #[test]
    fn test_direct_conversion_keeps_message() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "ledger.db is read-only");
        let err: LedgerError = io_error.into();

        assert_eq!(err, LedgerError::Io("ledger.db is read-only".to_string()));
    }

    #[test]
    fn test_question_mark_uses_boundary() {
        fn read_balance(path: &str) -> Result<f64, LedgerError> {
            let content = std::fs::read_to_string(path)?;
            Ok(content.trim().parse::<f64>()?)
        }

        let result = read_balance("/nonexistent/path/that/does/not/exist");
        assert!(matches!(result, Err(LedgerError::Io(_))));
    }

    #[test]
    fn test_second_boundary_for_same_target() {
        fn parse(s: &str) -> Result<f64, LedgerError> {
            Ok(s.parse::<f64>()?)
        }

        match parse("twelve") {
            Err(LedgerError::Parse(msg)) => assert!(msg.contains("invalid float")),
            other => panic!("expected Parse variant, got {other:?}"),
        }
    }
}
