use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "User API",
        version = "0.1.0",
        description = "API for managing users with paginated listing and cached CSV export"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/users", api = domain_users::handlers::ApiDoc)
    )
)]
pub struct ApiDoc;
