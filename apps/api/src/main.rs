use axum_helpers::server::{close_postgres, create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use migration::Migrator;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

/// How often the stale export cache sweep runs
const EVICTION_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migration failed: {}", e))?;

    tokio::fs::create_dir_all(&config.export_cache_dir)
        .await
        .map_err(|e| eyre::eyre!("Failed to create export cache directory: {}", e))?;

    let state = AppState::new(config, db);

    // Periodic sweep of aged export cache files
    let sweeper = state.export.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.evict_stale().await {
                tracing::warn!("Export cache sweep failed: {}", e);
            }
        }
    });

    // Build router with API routes (pass reference, not ownership!)
    let api_routes = api::routes(&state);

    // create_router adds docs/middleware to our composed routes
    let router = create_router::<openapi::ApiDoc>(api_routes).await?;

    // Merge health endpoints into the app
    // - /health: liveness check with app name/version
    // - /ready: readiness check with an actual db health check
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!("Starting user API with production-ready shutdown (30s timeout)");

    // Production-ready server with graceful shutdown and cleanup
    // State moves into the cleanup future, so the server config is cloned out first
    let server_config = state.config.server.clone();
    create_production_app(
        app,
        &server_config,
        Duration::from_secs(30), // 30s graceful shutdown timeout
        async move {
            info!("Shutting down: closing database connection");
            close_postgres(state.db, "main").await;
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("User API shutdown complete");
    Ok(())
}
