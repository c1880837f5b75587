use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::DuplicateEmail(email) => {
                AppError::Conflict(format!("User with email '{}' already exists", email))
            }
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::Io(e) => AppError::Io(e),
            UserError::Csv(e) => AppError::Internal(format!("CSV encoding error: {}", e)),
            UserError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        // Convert to AppError for the standardized envelope
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
