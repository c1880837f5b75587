use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, ConflictResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::export::ExportService;
use crate::models::{CreateUser, Page, PageRequest, UpdateUser, User};
use crate::repository::UserRepository;
use crate::service::UserService;

const TAG: &str = "users";

/// OpenAPI documentation for Users API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        create_user,
        export_users,
        get_user,
        update_user,
        delete_user,
    ),
    components(
        schemas(User, CreateUser, UpdateUser, PageRequest, Page<User>),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "User management endpoints")
    )
)]
pub struct ApiDoc;

/// Shared handler state: business service plus the export service
pub struct UsersState<R: UserRepository> {
    pub service: UserService<R>,
    pub export: ExportService<R>,
}

/// Create the users router with all HTTP endpoints
pub fn router<R: UserRepository + 'static>(
    service: UserService<R>,
    export: ExportService<R>,
) -> Router {
    let state = Arc::new(UsersState { service, export });

    // "/export" is registered before "/{id}" so it never resolves as an id
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/export", get(export_users))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}

/// List users with pagination
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(PageRequest),
    responses(
        (status = 200, description = "One page of users, newest first", body = Page<User>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(state): State<Arc<UsersState<R>>>,
    Query(page): Query<PageRequest>,
) -> UserResult<Json<Page<User>>> {
    let page = state.service.list_users(page).await?;
    Ok(Json(page))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created successfully", body = User),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(state): State<Arc<UsersState<R>>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = state.service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Export all users as CSV
#[utoipa::path(
    get,
    path = "/export",
    tag = TAG,
    responses(
        (status = 200, description = "CSV export of all users", content_type = "text/csv"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn export_users<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
) -> UserResult<impl IntoResponse> {
    // The fingerprint query runs before the stream starts, so a failing
    // store surfaces as a 500 rather than a truncated body
    let digest = state.export.fingerprint().await?;

    let (reader, mut writer) = tokio::io::duplex(64 * 1024);
    let export = state.export.clone();

    // Generation runs concurrently with the response; a failure past this
    // point truncates the body
    tokio::spawn(async move {
        if let Err(e) = export.write_csv(&digest, &mut writer).await {
            tracing::error!("CSV export failed: {}", e);
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"users.csv\"",
            ),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    ))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(state): State<Arc<UsersState<R>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<User>> {
    let user = state.service.get_user(id).await?;
    Ok(Json(user))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated successfully", body = User),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(state): State<Arc<UsersState<R>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> UserResult<Json<User>> {
    let user = state.service.update_user(id, input).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(state): State<Arc<UsersState<R>>>,
    UuidPath(id): UuidPath,
) -> UserResult<impl IntoResponse> {
    state.service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
