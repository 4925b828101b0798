//! Error handling for the Halal Marketplace
//!
//! Every error is rendered in the standard response envelope
//! `{success: false, message, code, field?, stack?}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    /// Unique-index violations surface as 409 instead of 500
    fn unique_violation(&self) -> Option<String> {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Some(
                    db_err
                        .constraint()
                        .unwrap_or("unique field")
                        .to_string(),
                )
            }
            _ => None,
        }
    }
}

/// Malformed client input becomes a validation error; a rejection that
/// reports a server fault (e.g. a route without the expected parameters)
/// stays a 500.
fn from_rejection(status: StatusCode, text: String) -> AppError {
    if status.is_server_error() {
        AppError::Internal(text)
    } else {
        AppError::ValidationError(text)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

/// Error response envelope
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.to_string(),
            message: message.into(),
            field: None,
            stack: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, mut body) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationError(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message.clone()),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorResponse::new("CONFLICT", message.clone()).with_field(resource.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::DatabaseError(_) => match self.unique_violation() {
                Some(constraint) => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "DUPLICATE_ENTRY",
                        format!("A record violating {} already exists", constraint),
                    )
                    .with_field(constraint),
                ),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred"),
                ),
            },
            AppError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", message.clone()),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
            if cfg!(debug_assertions) {
                body.stack = Some(format!("{:?}", self));
            }
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (AppError::validation("expiry_date", "bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Product".into()), StatusCode::NOT_FOUND),
            (AppError::forbidden("nope"), StatusCode::FORBIDDEN),
            (
                AppError::Conflict {
                    resource: "certificate_number".into(),
                    message: "taken".into(),
                },
                StatusCode::CONFLICT,
            ),
            (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn client_rejections_become_validation_errors() {
        let err = from_rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing field `product_id`".to_string(),
        );
        assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("product_id")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = from_rejection(StatusCode::INTERNAL_SERVER_ERROR, "no params".to_string());
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn row_not_found_is_a_server_error() {
        let response = AppError::DatabaseError(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
