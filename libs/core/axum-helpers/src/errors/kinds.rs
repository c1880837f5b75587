//! Type-safe error kinds for API responses.
//!
//! Each kind carries:
//! - A wire identifier clients can switch on (e.g., "validation_error")
//! - The HTTP status code it maps to
//! - A default human-readable message
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorKind;
//! use axum::http::StatusCode;
//!
//! let kind = ErrorKind::ValidationError;
//! assert_eq!(kind.as_str(), "validation_error");
//! assert_eq!(kind.status(), StatusCode::BAD_REQUEST);
//! ```

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standardized error kinds for API responses.
///
/// The wire representation is snake_case so clients can handle specific
/// error types programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request parameters or payload failed validation
    ValidationError,

    /// Requested resource was not found
    NotFound,

    /// Request conflicts with an existing resource (e.g., duplicate email)
    Duplicate,

    /// An unexpected internal server error occurred
    InternalError,
}

impl ErrorKind {
    /// Wire identifier for client consumption.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::NotFound => "not_found",
            Self::Duplicate => "duplicate",
            Self::InternalError => "internal_error",
        }
    }

    /// HTTP status code this kind maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Default user-facing message. Handlers can override with more
    /// specific details.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::NotFound => "Resource not found",
            Self::Duplicate => "Resource already exists",
            Self::InternalError => "An internal server error occurred",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_representation() {
        assert_eq!(ErrorKind::ValidationError.as_str(), "validation_error");
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::Duplicate.as_str(), "duplicate");
        assert_eq!(ErrorKind::InternalError.as_str(), "internal_error");
    }

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(ErrorKind::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Duplicate.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::ValidationError).unwrap();
        assert_eq!(json, "\"validation_error\"");
    }

    #[test]
    fn test_error_kind_deserialization() {
        let kind: ErrorKind = serde_json::from_str("\"duplicate\"").unwrap();
        assert_eq!(kind, ErrorKind::Duplicate);
    }
}
