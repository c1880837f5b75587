use axum::response::Response;

use super::{ErrorKind, ErrorResponse};

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    ErrorResponse::new(ErrorKind::NotFound, "The requested resource was not found")
        .into_response()
}

/// Handler for 405 Method Not Allowed errors.
pub async fn method_not_allowed() -> Response {
    use axum::{Json, http::StatusCode, response::IntoResponse};

    let body = Json(ErrorResponse::new(
        ErrorKind::ValidationError,
        "The HTTP method is not allowed for this resource",
    ));

    (StatusCode::METHOD_NOT_ALLOWED, body).into_response()
}
