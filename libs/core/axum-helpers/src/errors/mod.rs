pub mod handlers;
pub mod kinds;
pub mod responses;

pub use kinds::ErrorKind;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Inner error object for the response envelope.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error kind (e.g., "validation_error")
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Standard error response envelope.
///
/// All error responses share this shape so clients have a single
/// code path for error handling:
///
/// ```json
/// {
///   "error": {
///     "type": "duplicate",
///     "message": "A user with this email already exists"
///   }
/// }
/// ```
///
/// Validation failures additionally carry a `details` object with
/// per-field error lists.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    /// Optional structured error details (e.g., validation field errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                kind,
                message: message.into(),
            },
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Build the HTTP response, taking the status from the error kind.
    pub fn into_response(self) -> Response {
        let status = self.error.kind.status();
        (status, Json(self)).into_response()
    }
}

/// Application error type that can be converted to HTTP responses.
///
/// Integrates with common error types from dependencies and produces
/// the standard [`ErrorResponse`] envelope.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(e) => {
                tracing::info!("Validation error: {:?}", e);
                ErrorResponse::new(
                    ErrorKind::ValidationError,
                    ErrorKind::ValidationError.default_message(),
                )
                .with_details(validation_details(&e))
                .into_response()
            }
            AppError::JsonExtractorRejection(e) => {
                tracing::info!("JSON extraction error: {:?}", e);
                let body = Json(ErrorResponse::new(ErrorKind::ValidationError, e.body_text()));
                (e.status(), body).into_response()
            }
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", msg);
                ErrorResponse::new(ErrorKind::ValidationError, msg).into_response()
            }
            AppError::NotFound(msg) => {
                tracing::info!("Not found: {}", msg);
                ErrorResponse::new(ErrorKind::NotFound, msg).into_response()
            }
            AppError::Conflict(msg) => {
                tracing::info!("Conflict: {}", msg);
                ErrorResponse::new(ErrorKind::Duplicate, msg).into_response()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorResponse::new(
                    ErrorKind::InternalError,
                    ErrorKind::InternalError.default_message(),
                )
                .into_response()
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                ErrorResponse::new(
                    ErrorKind::InternalError,
                    ErrorKind::InternalError.default_message(),
                )
                .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                ErrorResponse::new(
                    ErrorKind::InternalError,
                    ErrorKind::InternalError.default_message(),
                )
                .into_response()
            }
        }
    }
}

/// Convert validator errors to a structured JSON details object:
/// field name -> list of { code, message, params }.
pub fn validation_details(errors: &ValidationErrors) -> serde_json::Value {
    let details = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<serde_json::Value> = errors
                .iter()
                .map(|err| {
                    serde_json::json!({
                        "code": err.code,
                        "message": err.message,
                        "params": err.params,
                    })
                })
                .collect();
            (field.to_string(), serde_json::json!(messages))
        })
        .collect::<serde_json::Map<_, _>>();

    serde_json::Value::Object(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_envelope_shape() {
        let response = ErrorResponse::new(ErrorKind::NotFound, "User not found");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error"]["type"], "not_found");
        assert_eq!(json["error"]["message"], "User not found");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let response = ErrorResponse::new(ErrorKind::ValidationError, "Request validation failed")
            .with_details(serde_json::json!({"email": ["must be a valid email"]}));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error"]["type"], "validation_error");
        assert_eq!(json["details"]["email"][0], "must be a valid email");
    }

    #[test]
    fn test_app_error_statuses() {
        let resp = AppError::NotFound("missing".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Conflict("duplicate".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::BadRequest("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
