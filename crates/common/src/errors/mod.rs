//! Error types for shelter services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Field-level validation error maps for form redisplay
//! - HTTP status code mapping
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Field name to list of messages, ordered for stable output
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message shown for authorization failures
pub const ACCESS_DENIED: &str = "Access Denied";

/// Message shown for unexpected failures
pub const TRY_AGAIN: &str = "Something went wrong. Please try again.";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,
    PayloadTooLarge,
    InvalidTransition,

    // Authentication errors (2xxx)
    Unauthorized,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    Conflict,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    StorageError,
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
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,
            ErrorCode::InvalidTransition => 1005,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::ExpiredToken => 2003,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::StorageError => 8001,
            ErrorCode::CacheError => 8006,

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
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    // Conflict errors
    #[error("Conflict: {message}")]
    Conflict { message: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // External service errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
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
    /// Build a validation error for a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.clone()]);
        AppError::Validation { message, errors }
    }

    /// Build a validation error from a collected field map
    pub fn fields(errors: FieldErrors) -> Self {
        let message = errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation { message, errors }
    }

    /// Build a not-found error for a resource
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Build the standard access-denied error
    pub fn access_denied() -> Self {
        AppError::Forbidden {
            message: ACCESS_DENIED.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 422 Unprocessable Entity
            AppError::Validation { .. } |
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 401 Unauthorized
            AppError::Unauthorized { .. } |
            AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict { .. } => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::Migration(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Storage { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::CacheError { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Authentication and authorization failures cross the action boundary
    /// as errors instead of being folded into an action state.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized { .. } | AppError::ExpiredToken | AppError::Forbidden { .. }
        )
    }

    /// Field-level messages for form redisplay, if any
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation { errors, .. } => Some(errors.clone()),
            AppError::InvalidTransition { to, from, entity } => {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "status".to_string(),
                    vec![format!("Cannot move {} from {} to {}", entity, from, to)],
                );
                Some(errors)
            }
            _ => None,
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            TRY_AGAIN.to_string()
        } else if self.is_auth_error() {
            ACCESS_DENIED.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = self
            .field_errors()
            .and_then(|errors| serde_json::to_value(errors).ok());

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
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

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::fields(crate::forms::collect_field_errors(&errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("application", "abc");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::field("household_size", "must be at least 1");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());

        let errors = err.field_errors().unwrap();
        assert_eq!(errors["household_size"], vec!["must be at least 1".to_string()]);
    }

    #[test]
    fn test_transition_error_lands_on_status_field() {
        let err = AppError::InvalidTransition {
            entity: "application",
            from: "ADOPTED".into(),
            to: "PENDING".into(),
        };
        assert_eq!(err.code().as_code(), 1005);
        assert!(err.field_errors().unwrap().contains_key("status"));
    }

    #[test]
    fn test_server_error_hides_details() {
        let err = AppError::Internal {
            message: "pool exhausted".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert_eq!(err.public_message(), TRY_AGAIN);
    }

    #[test]
    fn test_auth_errors_are_access_denied() {
        let err = AppError::access_denied();
        assert!(err.is_auth_error());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message(), ACCESS_DENIED);
    }
}
