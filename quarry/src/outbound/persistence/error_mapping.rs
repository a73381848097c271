//! Classification of pool and Diesel failures into [`RepositoryError`].
//!
//! This is the only place driver errors are inspected. Callers see the
//! constraint name for uniqueness violations and a generic message for
//! everything else; the raw driver message goes to the log only.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, error};

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map a pool failure. Timeouts are retryable; anything else means the
/// database could not be reached.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Exhausted { timeout } => {
            debug!(?timeout, "connection checkout timed out");
            RepositoryError::resource_exhausted(format!(
                "no connection available within {timeout:?}"
            ))
        }
        PoolError::Checkout { message } | PoolError::Build { message } => {
            let mapped = RepositoryError::persistence("database connection failed");
            error!(kind = mapped.kind(), %message, "database connection failed");
            mapped
        }
    }
}

/// Map a Diesel failure raised while running `operation`.
pub(crate) fn map_diesel_error(error: DieselError, operation: &'static str) -> RepositoryError {
    let mapped = classify(error, operation);
    debug!(operation, kind = mapped.kind(), "database error mapped");
    mapped
}

fn classify(error: DieselError, operation: &'static str) -> RepositoryError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unique constraint").to_owned();
            debug!(operation, %constraint, "unique constraint rejected write");
            RepositoryError::duplicate_key(constraint)
        }
        DieselError::DatabaseError(
            kind @ (DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::ForeignKeyViolation),
            info,
        ) => {
            debug!(operation, ?kind, message = info.message(), "constraint rejected write");
            let subject = info
                .constraint_name()
                .or_else(|| info.column_name())
                .unwrap_or("a schema constraint");
            RepositoryError::validation(format!("{operation} violates {subject}"))
        }
        DieselError::DatabaseError(kind, info) => {
            error!(operation, ?kind, message = info.message(), "database operation failed");
            RepositoryError::persistence(format!("{operation} failed"))
        }
        other => {
            error!(
                operation,
                error_type = %std::any::type_name_of_val(&other),
                error_message = %other,
                "diesel operation failed"
            );
            RepositoryError::persistence(format!("{operation} failed"))
        }
    }
}
