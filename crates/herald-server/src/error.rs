//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

use herald_core::error::HeraldError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

/// HTTP status for a herald error.
pub fn status_for(err: &HeraldError) -> StatusCode {
    match err {
        HeraldError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        HeraldError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        HeraldError::QuotaExceeded { .. } | HeraldError::RateLimit { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
        HeraldError::NotFound { .. } => StatusCode::NOT_FOUND,
        // Operator has to fix the provider setup.
        HeraldError::Authentication { .. }
        | HeraldError::Configuration(_)
        | HeraldError::UnsupportedProvider { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Convert from herald-core errors
impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        let status = status_for(&err);
        let code = err.code().as_str();

        let details = match &err {
            HeraldError::Validation {
                details,
                suggestion,
                ..
            } if !details.is_empty() || suggestion.is_some() => Some(serde_json::json!({
                "fields": details,
                "suggestion": suggestion,
            })),
            HeraldError::QuotaExceeded {
                current_usage,
                limit,
                ..
            } => Some(serde_json::json!({
                "currentUsage": current_usage,
                "limit": limit,
                "suggestion": err.suggestion(),
            })),
            _ => err.suggestion().map(|s| serde_json::json!({ "suggestion": s })),
        };

        // Do not leak storage or provider internals to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, code, "Request failed");
            "Internal server error".to_string()
        } else {
            err.to_string()
        };

        let api = ApiError::new(status, code, message);
        match details {
            Some(details) => api.with_details(details),
            None => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
