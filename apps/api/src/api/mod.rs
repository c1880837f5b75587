use axum::Router;

pub mod health;

use crate::state::AppState;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix will be added by the `create_router` helper.
///
/// Returns a stateless Router (all sub-routers have state already applied).
pub fn routes(state: &AppState) -> Router {
    Router::new().nest(
        "/users",
        domain_users::handlers::router(state.users.clone(), state.export.clone()),
    )
}

/// Creates a router with the /ready endpoint that performs actual health checks.
///
/// This router has state applied and can be merged with the stateless app
/// router from `create_router`. The /ready endpoint checks the database
/// connection.
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
