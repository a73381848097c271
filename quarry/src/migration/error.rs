//! Errors raised while loading, planning or applying migrations.

use std::fmt::Display;
use std::path::Path;

use thiserror::Error;
use tracing::error;

use crate::domain::ports::RepositoryError;

/// Failure of a migration-service operation.
///
/// Every variant is fatal to the operation that raised it; `migrate` stops
/// at the first one and leaves already-applied scripts committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("invalid migration file name {name}: {reason}")]
    InvalidFileName { name: String, reason: String },
    #[error("migration version {version} is declared by more than one script: {scripts:?}")]
    DuplicateVersion { version: String, scripts: Vec<String> },
    #[error("repeatable migration '{description}' is declared more than once")]
    DuplicateRepeatable { description: String },
    #[error("failed to read migrations from {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to connect to the migration database: {message}")]
    Connection { message: String },
    #[error("{operation} failed: {message}")]
    Database { operation: String, message: String },
    #[error(
        "checksum mismatch for applied migration {script}: recorded {applied}, found {current}"
    )]
    ChecksumMismatch {
        script: String,
        applied: String,
        current: String,
    },
    #[error("applied migration {script} is missing from the migration source")]
    MissingScript { script: String },
    #[error("migration {script} is older than the latest applied version {latest}")]
    OutOfOrder { script: String, latest: String },
    #[error("migration {script} previously failed; repair the history before migrating")]
    PreviouslyFailed { script: String },
    #[error("migration {script} failed: {message}")]
    ScriptFailed { script: String, message: String },
    #[error("clean is disabled for this configuration")]
    CleanDisabled,
}

impl MigrationError {
    pub(crate) fn io(path: &Path, error: impl Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn database(operation: impl Into<String>, error: impl Display) -> Self {
        Self::Database {
            operation: operation.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn script_failed(script: impl Into<String>, error: impl Display) -> Self {
        Self::ScriptFailed {
            script: script.into(),
            message: error.to_string(),
        }
    }
}

impl From<MigrationError> for RepositoryError {
    fn from(err: MigrationError) -> Self {
        let mapped = RepositoryError::migration_failure(err.to_string());
        error!(kind = mapped.kind(), error = %err, "migration failed");
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn converts_into_migration_failure() {
        let err = MigrationError::MissingScript {
            script: "V3__drop_legacy.sql".to_owned(),
        };
        let repository_error = RepositoryError::from(err);
        assert_eq!(
            repository_error,
            RepositoryError::migration_failure(
                "applied migration V3__drop_legacy.sql is missing from the migration source"
            )
        );
        assert!(!repository_error.is_retryable());
    }

    #[rstest]
    fn io_error_names_the_path() {
        let err = MigrationError::io(Path::new("/srv/migrations"), "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to read migrations from /srv/migrations: permission denied"
        );
    }
}
