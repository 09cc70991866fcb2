//! Error types module
//!
//! All errors surfaced by the engine are unified under the `AppError` enum.
//! Per-image conversion failures are deliberately *not* errors at this level:
//! the pipeline folds them into `ConversionOutcome::Failed` so a batch keeps
//! going. `AppError` covers the request-level failures that callers must see.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like expired sessions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SESSION_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Image encode error: {0}")]
    ImageEncode(String),

    #[error("Conversion timed out after {seconds}s")]
    ConversionTimeout { seconds: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::PayloadTooLarge(_) => 413,
            AppError::ImageDecode(_) => 422,
            AppError::ConversionTimeout { .. } => 504,
            AppError::ImageEncode(_)
            | AppError::Io(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            AppError::ImageEncode(_) => "IMAGE_ENCODE_ERROR",
            AppError::ConversionTimeout { .. } => "CONVERSION_TIMEOUT",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidInput(_) | AppError::NotFound(_) => LogLevel::Debug,
            AppError::PayloadTooLarge(_)
            | AppError::ImageDecode(_)
            | AppError::ConversionTimeout { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Internal details stay out of client responses
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::Io(_) => "I/O failure while handling the request".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(
            AppError::PayloadTooLarge("x".into()).http_status_code(),
            413
        );
        assert_eq!(AppError::Internal("x".into()).http_status_code(), 500);
        assert_eq!(
            AppError::ConversionTimeout { seconds: 20 }.http_status_code(),
            504
        );
    }

    #[test]
    fn test_internal_message_is_masked() {
        let err = AppError::Internal("secret detail".into());
        assert_eq!(err.client_message(), "Internal server error");

        let err = AppError::NotFound("Session expired or not found".into());
        assert!(err.client_message().contains("Session expired"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::ConversionTimeout { seconds: 20 }.error_code(),
            "CONVERSION_TIMEOUT"
        );
        assert_eq!(AppError::NotFound("x".into()).error_code(), "NOT_FOUND");
    }
}
