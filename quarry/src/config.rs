//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from `QUARRY_*` environment variables and configuration
//! files, e.g. `QUARRY_DATABASE_URL` or `QUARRY_CLEAN_ENABLED=true`.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::migration::MigrationConfig;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_SCHEMA: &str = "public";

/// Settings that cannot be turned into a working configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("database URL is not configured; set QUARRY_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("pool_max_size must be at least 1")]
    EmptyPool,
}

/// Database, pool and migration settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "QUARRY")]
pub struct QuarrySettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection before giving up.
    #[ortho_config(default = 30)]
    pub connection_timeout_secs: u64,
    /// Directory of `.sql` migrations; the bundled scripts are used when unset.
    pub migrations_dir: Option<PathBuf>,
    /// Schema migrations apply to.
    pub schema: Option<String>,
    /// Allow the destructive `clean` operation. Off when unset.
    pub clean_enabled: Option<bool>,
}

impl QuarrySettings {
    /// The configured database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabaseUrl`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)
    }

    /// The schema to migrate and query, `public` when unset or blank.
    pub fn schema(&self) -> &str {
        self.schema
            .as_deref()
            .map(str::trim)
            .filter(|schema| !schema.is_empty())
            .unwrap_or(DEFAULT_SCHEMA)
    }

    /// Pool settings for [`DbPool::new`](crate::outbound::persistence::DbPool::new).
    ///
    /// Pooled connections resolve unqualified table names in
    /// [`schema`](Self::schema), the schema migrations target.
    ///
    /// # Errors
    ///
    /// Fails when the database URL is missing or the pool size is zero.
    pub fn pool_config(&self) -> Result<PoolConfig, ConfigError> {
        if self.pool_max_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        Ok(PoolConfig::new(self.database_url()?)
            .with_max_size(self.pool_max_size)
            .with_min_idle(self.pool_min_idle)
            .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs))
            .with_schema(self.schema()))
    }

    /// Migration target and clean switch.
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new(self.schema())
            .with_clean_enabled(self.clean_enabled.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 7] = [
        "QUARRY_DATABASE_URL",
        "QUARRY_POOL_MAX_SIZE",
        "QUARRY_POOL_MIN_IDLE",
        "QUARRY_CONNECTION_TIMEOUT_SECS",
        "QUARRY_MIGRATIONS_DIR",
        "QUARRY_SCHEMA",
        "QUARRY_CLEAN_ENABLED",
    ];

    fn load_from_empty_args() -> QuarrySettings {
        QuarrySettings::load_from_iter([OsString::from("quarry")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), Err(ConfigError::MissingDatabaseUrl));
        assert_eq!(settings.pool_max_size, 10);
        assert_eq!(settings.connection_timeout_secs, 30);
        assert_eq!(settings.schema(), "public");
        assert_eq!(settings.clean_enabled, None);
        assert!(settings.migrations_dir.is_none());
        assert_eq!(settings.migration_config(), MigrationConfig::default());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("QUARRY_DATABASE_URL", Some("postgres://app@db/app".to_owned())),
            ("QUARRY_POOL_MAX_SIZE", Some("4".to_owned())),
            ("QUARRY_POOL_MIN_IDLE", Some("1".to_owned())),
            ("QUARRY_CONNECTION_TIMEOUT_SECS", Some("5".to_owned())),
            ("QUARRY_MIGRATIONS_DIR", Some("/srv/migrations".to_owned())),
            ("QUARRY_SCHEMA", Some("ledger".to_owned())),
            ("QUARRY_CLEAN_ENABLED", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        let pool = settings.pool_config().expect("pool config");
        assert_eq!(pool.database_url(), "postgres://app@db/app");
        assert_eq!(pool.max_size(), 4);
        assert_eq!(pool.min_idle(), Some(1));
        assert_eq!(pool.connection_timeout(), Duration::from_secs(5));
        assert_eq!(pool.schema(), Some("ledger"));
        assert_eq!(settings.migrations_dir, Some(PathBuf::from("/srv/migrations")));

        let migration = settings.migration_config();
        assert_eq!(migration.schema(), "ledger");
        assert!(migration.clean_enabled());
    }

    #[rstest]
    #[case(Some("true"), true)]
    #[case(Some("false"), false)]
    #[case(None, false)]
    fn clean_switch_follows_the_environment(#[case] value: Option<&str>, #[case] expected: bool) {
        let _guard = lock_env([
            ("QUARRY_CLEAN_ENABLED", value.map(str::to_owned)),
            ("QUARRY_SCHEMA", None),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.migration_config().clean_enabled(), expected);
    }

    #[rstest]
    fn blank_database_url_counts_as_missing() {
        let _guard = lock_env([
            ("QUARRY_DATABASE_URL", Some("   ".to_owned())),
            ("QUARRY_POOL_MAX_SIZE", None),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.pool_config().map(|_| ()),
            Err(ConfigError::MissingDatabaseUrl)
        );
    }

    #[rstest]
    fn zero_pool_size_is_rejected() {
        let _guard = lock_env([
            ("QUARRY_DATABASE_URL", Some("postgres://app@db/app".to_owned())),
            ("QUARRY_POOL_MAX_SIZE", Some("0".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.pool_config().map(|_| ()), Err(ConfigError::EmptyPool));
    }
}
