//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - Validation Error",
    content_type = "application/json",
    example = json!({
        "error": {
            "type": "validation_error",
            "message": "Request validation failed"
        },
        "details": {
            "email": [{
                "code": "email",
                "message": "must be a valid email address",
                "params": {"value": "not-an-email"}
            }]
        }
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "error": {
            "type": "not_found",
            "message": "Resource not found"
        }
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Conflict - Resource already exists",
    content_type = "application/json",
    example = json!({
        "error": {
            "type": "duplicate",
            "message": "Resource already exists"
        }
    })
)]
pub struct ConflictResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "error": {
            "type": "internal_error",
            "message": "An internal server error occurred"
        }
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
