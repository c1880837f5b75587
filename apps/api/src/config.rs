use std::path::PathBuf;

use core_config::{AppInfo, FromEnv, app_info, env_or_default, server::ServerConfig};

// Import database config from the database library
use database::postgres::PostgresConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    /// Directory for cached CSV exports
    pub export_cache_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if DATABASE_URL is not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let export_cache_dir = PathBuf::from(env_or_default("EXPORT_CACHE_DIR", "exports_cache"));

        Ok(Self {
            app: app_info!(),
            database,
            server,
            environment,
            export_cache_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_with_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/users")),
                ("EXPORT_CACHE_DIR", None),
                ("PORT", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.export_cache_dir, PathBuf::from("exports_cache"));
                assert_eq!(config.server.port, 8080);
            },
        );
    }

    #[test]
    fn test_config_requires_database_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            assert!(Config::from_env().is_err());
        });
    }
}
