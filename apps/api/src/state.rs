use database::postgres::DatabaseConnection;
use domain_users::{ExportService, PgUserRepository, UserService};

use crate::config::Config;

/// Shared application state
///
/// Cloning is cheap: the connection and services are Arc-backed.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DatabaseConnection,
    pub users: UserService<PgUserRepository>,
    pub export: ExportService<PgUserRepository>,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection) -> Self {
        let repository = std::sync::Arc::new(PgUserRepository::new(db.clone()));
        let users = UserService::new(repository.clone());
        let export = ExportService::new(repository, config.export_cache_dir.clone());

        Self {
            config,
            db,
            users,
            export,
        }
    }
}
