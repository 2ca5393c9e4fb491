//! Error handling for Fixline
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for the Fixline application
#[derive(Error, Debug)]
pub enum FixlineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("CRM API error: status {status}: {body}")]
    Crm { status: u16, body: String },

    #[error("CRM response schema error: {0}")]
    CrmSchema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("User not found: {telegram_id}")]
    UserNotFound { telegram_id: String },

    #[error("Service request not found: {request_id}")]
    RequestNotFound { request_id: i64 },

    #[error("Invalid request state: expected {expected}, got {actual}")]
    InvalidRequestState { expected: String, actual: String },

    #[error("Duplicate key conflict: {0}")]
    Conflict(String),

    #[error("Downstream notifier error: status {status}")]
    DownstreamNotify { status: u16 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Fixline operations
pub type Result<T> = std::result::Result<T, FixlineError>;

impl FixlineError {
    /// Validation error shorthand
    pub fn validation(field: &str, message: &str) -> Self {
        FixlineError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            FixlineError::Database(_) => false,
            FixlineError::Migration(_) => false,
            FixlineError::Crm { .. } => true,
            FixlineError::CrmSchema(_) => false,
            FixlineError::Config(_) => false,
            FixlineError::Auth(_) => false,
            FixlineError::Validation { .. } => false,
            FixlineError::UserNotFound { .. } => false,
            FixlineError::RequestNotFound { .. } => false,
            FixlineError::InvalidRequestState { .. } => false,
            FixlineError::Conflict(_) => true,
            FixlineError::DownstreamNotify { .. } => true,
            FixlineError::Http(_) => true,
            FixlineError::Serialization(_) => false,
            FixlineError::Io(_) => true,
            FixlineError::UrlParse(_) => false,
            FixlineError::Internal(_) => false,
        }
    }

    /// True when the underlying cause is a unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            FixlineError::Database(sqlx::Error::Database(e)) => {
                e.code().as_deref() == Some("23505")
            }
            FixlineError::Conflict(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_shorthand() {
        let err = FixlineError::validation("phone", "is required");
        assert!(matches!(err, FixlineError::Validation { .. }));
        assert!(err.to_string().contains("phone"));
    }

    #[test]
    fn test_crm_error_display() {
        let err = FixlineError::Crm {
            status: 404,
            body: "{\"detail\":\"not found\"}".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.is_recoverable());
    }
}
