//! Error types module
//!
//! All errors in the upload/reconciliation subsystem are unified under the
//! `AppError` enum: client-local upload failures, webhook correlation
//! failures, and persistence failures. The `Database` variant and
//! `From<sqlx::Error>` are gated behind the `sqlx` feature so client-side
//! builds stay free of the database stack.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like degraded transports
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// Lets errors self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CORRELATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad file before any network call; the user corrects the input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ticket endpoint exhausted its retry budget.
    #[error("Upload ticket unavailable: {0}")]
    TicketUnavailable(String),

    /// The provider rejected or dropped the chunked transfer.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// A webhook event could not be matched to any content record.
    #[error("Correlation error: {0}")]
    Correlation(String),

    /// A record write failed after correlation succeeded; the provider's
    /// webhook redelivery redrives the event.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The push channel failed; recovered via reconnect or poll fallback.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The upstream video provider returned a failure.
    #[error("Provider error: {0}")]
    Provider(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Transfer(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata per variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Validation(_) => (400, "VALIDATION_ERROR", true, LogLevel::Debug),
        AppError::TicketUnavailable(_) => (503, "TICKET_UNAVAILABLE", true, LogLevel::Warn),
        AppError::Transfer(_) => (502, "TRANSFER_ERROR", true, LogLevel::Warn),
        AppError::Correlation(_) => (400, "CORRELATION_ERROR", false, LogLevel::Warn),
        AppError::Persistence(_) => (500, "PERSISTENCE_ERROR", true, LogLevel::Error),
        AppError::Stream(_) => (500, "STREAM_ERROR", true, LogLevel::Warn),
        AppError::Provider(_) => (502, "PROVIDER_ERROR", true, LogLevel::Error),
        #[cfg(feature = "sqlx")]
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::TicketUnavailable(_) => "TicketUnavailable",
            AppError::Transfer(_) => "Transfer",
            AppError::Correlation(_) => "Correlation",
            AppError::Persistence(_) => "Persistence",
            AppError::Stream(_) => "Stream",
            AppError::Provider(_) => "Provider",
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_correlation() {
        let err = AppError::Correlation("no record resolved".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "CORRELATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_persistence() {
        let err = AppError::Persistence("zero rows affected".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_ticket_unavailable() {
        let err = AppError::TicketUnavailable("3 attempts failed".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_type_names() {
        assert_eq!(
            AppError::Validation("bad mime".to_string()).error_type(),
            "Validation"
        );
        assert_eq!(
            AppError::Stream("reset".to_string()).error_type(),
            "Stream"
        );
    }
}
