//! Error types for the Argonaut pipeline
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes for client handling
//! - Retryability classification for the resilience layer

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,
    UnsafeQuery,

    // Translation errors (2xxx)
    TranslationFailed,

    // Rate limiting (3xxx)
    RateLimited,

    // Database errors (4xxx)
    DatabaseError,
    ConnectionError,

    // External AI service errors (5xxx)
    AiServiceError,
    AiTimeout,
    UpstreamError,
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1002,
            ErrorCode::UnsafeQuery => 1003,

            // Translation (2xxx)
            ErrorCode::TranslationFailed => 2001,

            // Rate limits (3xxx)
            ErrorCode::RateLimited => 3001,

            // Database (4xxx)
            ErrorCode::DatabaseError => 4001,
            ErrorCode::ConnectionError => 4002,

            // External (5xxx)
            ErrorCode::AiServiceError => 5001,
            ErrorCode::AiTimeout => 5002,
            ErrorCode::UpstreamError => 5003,
            ErrorCode::CacheError => 5004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors: surfaced to the caller, never retried
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Unsafe query rejected: {reason}")]
    UnsafeQuery { reason: String },

    // Translation errors
    #[error("No query template matches intent '{intent}'")]
    Translation { intent: String },

    // Rate limiting: surfaced with a retry-after hint, not retried internally
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External AI service errors: retried with backoff, then degraded
    #[error("{service} service error: {message}")]
    AiService { service: String, message: String },

    #[error("{service} timed out after {timeout_ms}ms")]
    AiTimeout { service: String, timeout_ms: u64 },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::UnsafeQuery { .. } => ErrorCode::UnsafeQuery,
            AppError::Translation { .. } => ErrorCode::TranslationFailed,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::AiService { .. } => ErrorCode::AiServiceError,
            AppError::AiTimeout { .. } => ErrorCode::AiTimeout,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the resilience layer may retry this error with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::AiService { .. } | AppError::AiTimeout { .. } | AppError::HttpClient(_)
        )
    }

    /// Whether this error is the caller's fault (bad input, unsafe query)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidFormat { .. }
                | AppError::UnsafeQuery { .. }
                | AppError::Translation { .. }
        )
    }

    /// Retry-after hint, present only for rate-limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

/// Structured error payload attached to degraded answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&AppError> for ErrorDetails {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            retry_after_secs: err.retry_after().map(|d| d.as_secs()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::UnsafeQuery {
            reason: "mutating keyword".into(),
        };
        assert_eq!(err.code(), ErrorCode::UnsafeQuery);
        assert_eq!(err.code().as_code(), 1003);
        assert!(err.is_user_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_ai_errors_are_retryable() {
        let err = AppError::AiService {
            service: "embedding".into(),
            message: "503".into(),
        };
        assert!(err.is_retryable());

        let err = AppError::AiTimeout {
            service: "generation".into(),
            timeout_ms: 30_000,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let err = AppError::RateLimited {
            retry_after_secs: 12,
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert!(!err.is_retryable());

        let details = ErrorDetails::from(&err);
        assert_eq!(details.retry_after_secs, Some(12));
    }
}
