// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// API error types
///
/// Ownership refusals, lookups of unknown ids and invalid payloads keep the
/// catalog API's historical 200 + JSON body convention; authentication and
/// provider failures use real status codes.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    Restricted(String),
    BadRequest(String),
    NotFound(String),
    ValidationError(String),
    ProviderRejected(String),
    ProviderError(String),
    ProviderUnavailable(String),
    InternalServer(String),
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::Restricted(msg) => write!(f, "Restricted: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::ProviderRejected(msg) => write!(f, "Provider Rejected: {}", msg),
            ApiError::ProviderError(msg) => write!(f, "Provider Error: {}", msg),
            ApiError::ProviderUnavailable(msg) => write!(f, "Provider Unavailable: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Body used for ownership refusals and duplicate-resource notices
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Restricted(msg) => {
                return (StatusCode::OK, Json(MessageResponse { message: msg })).into_response();
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
            ApiError::BadRequest(msg) => (StatusCode::OK, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::OK, msg, "NOT_FOUND"),
            ApiError::ValidationError(msg) => (StatusCode::OK, msg, "VALIDATION_ERROR"),
            ApiError::ProviderRejected(msg) => {
                (StatusCode::UNAUTHORIZED, msg, "PROVIDER_REJECTED")
            }
            ApiError::ProviderError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "PROVIDER_ERROR")
            }
            ApiError::ProviderUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg, "PROVIDER_UNAVAILABLE")
            }
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}
