//! Shared helpers for quarry integration tests.
//!
//! Each file under `tests/` compiles as its own crate; this module is pulled
//! in with `mod support;` so the helpers are not copied between suites.

use postgres::{Client, NoTls};
use quarry::migration::EmbeddedSource;
use quarry::test_support::{EphemeralDatabase, handle_cluster_setup_failure};

/// Render a `postgres` error with SQLSTATE, detail and hint when available.
///
/// The plain `Display` output often collapses to `db error`, which is not
/// actionable in CI logs.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}

/// Run `sql` out of band and return its single `BIGINT` result.
pub fn query_scalar(url: &str, sql: &str) -> Result<i64, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(sql, &[])
        .map_err(|err| format_postgres_error(&err))?;
    row.try_get::<_, i64>(0)
        .map_err(|err| format_postgres_error(&err))
}

/// Start an empty database, or `None` when the cluster is skipped.
pub fn fresh_database() -> Option<EphemeralDatabase> {
    match EphemeralDatabase::start() {
        Ok(db) => Some(db),
        Err(err) => handle_cluster_setup_failure(err),
    }
}

/// Start a database with the bundled migrations applied.
#[allow(dead_code, reason = "not every suite needs the bundled schema")]
pub fn migrated_database() -> Option<EphemeralDatabase> {
    let db = fresh_database()?;
    match db.prepare(EmbeddedSource::bundled()) {
        Ok(_) => Some(db),
        Err(err) => handle_cluster_setup_failure(err),
    }
}
