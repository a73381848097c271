//! Versioned and repeatable SQL migrations with a checksummed history.
//!
//! [`MigrationService`] owns its own connection rather than borrowing the
//! repository pool, so it can run before the pool is built and never holds
//! pool capacity while DDL executes.

mod error;
mod history;
mod plan;
pub(crate) mod script;
mod source;

use std::time::Instant;

use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use query_spec::quote_identifier;
use tracing::{debug, info, warn};

pub use error::MigrationError;
pub use history::AppliedMigration;
pub use plan::{MigrationInfo, MigrationState};
pub use script::{MigrationKind, MigrationScript, Version, checksum};
pub use source::{DirectorySource, EmbeddedSource, MigrationSource};

#[cfg(test)]
pub use source::MockMigrationSource;

use plan::PlannedScript;
use script::order_scripts;

/// Target schema and safety switches for a [`MigrationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    schema: String,
    clean_enabled: bool,
}

impl MigrationConfig {
    /// Target `schema` with cleaning disabled.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            clean_enabled: false,
        }
    }

    /// Allow [`MigrationService::clean`]. Off unless set explicitly.
    pub fn with_clean_enabled(mut self, enabled: bool) -> Self {
        self.clean_enabled = enabled;
        self
    }

    /// Schema the service migrates, cleans and inspects.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Whether [`MigrationService::clean`] may run.
    pub fn clean_enabled(&self) -> bool {
        self.clean_enabled
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new("public")
    }
}

/// Outcome of one `migrate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    applied: Vec<String>,
    schema_version: Option<String>,
}

impl MigrationReport {
    /// Script file names applied by this call, in application order.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// Highest versioned migration recorded after this call.
    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// `true` when nothing needed applying.
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies, validates, describes and cleans the schema of one database.
///
/// # Examples
///
/// ```rust,no_run
/// use quarry::migration::{EmbeddedSource, MigrationConfig, MigrationService};
///
/// # async fn run() -> Result<(), quarry::migration::MigrationError> {
/// let service = MigrationService::new(
///     "postgres://app@localhost/app",
///     MigrationConfig::default(),
///     EmbeddedSource::bundled(),
/// );
/// let report = service.migrate().await?;
/// println!("schema at {:?}", report.schema_version());
/// # Ok(())
/// # }
/// ```
pub struct MigrationService<S> {
    database_url: String,
    config: MigrationConfig,
    source: S,
}

impl<S: MigrationSource> MigrationService<S> {
    /// Build a service; nothing connects until an operation runs.
    pub fn new(database_url: impl Into<String>, config: MigrationConfig, source: S) -> Self {
        Self {
            database_url: database_url.into(),
            config,
            source,
        }
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn scripts(&self) -> Result<Vec<MigrationScript>, MigrationError> {
        order_scripts(self.source.scripts()?)
    }

    async fn connect(&self) -> Result<AsyncPgConnection, MigrationError> {
        let mut conn = AsyncPgConnection::establish(&self.database_url)
            .await
            .map_err(|err| MigrationError::Connection {
                message: err.to_string(),
            })?;
        let schema = quote_identifier(self.config.schema());
        conn.batch_execute(&format!("SET search_path TO {schema}"))
            .await
            .map_err(|err| MigrationError::database("set search path", err))?;
        Ok(conn)
    }

    /// Apply every pending versioned script, then every new or changed
    /// repeatable script.
    ///
    /// Each script runs in its own transaction together with its history
    /// row. Concurrent callers against the same schema are serialised by a
    /// PostgreSQL advisory lock. Calling `migrate` again with no new scripts
    /// applies nothing.
    ///
    /// # Errors
    ///
    /// Fails without applying anything on a tampered, missing, out-of-order
    /// or previously failed migration. A failing script is rolled back and
    /// reported as [`MigrationError::ScriptFailed`]; scripts before it stay
    /// applied.
    pub async fn migrate(&self) -> Result<MigrationReport, MigrationError> {
        let scripts = self.scripts()?;
        let mut conn = self.connect().await?;

        let lock_key = format!("quarry.migrations.{}", self.config.schema());
        diesel::sql_query("SELECT pg_advisory_lock(hashtext($1))")
            .bind::<Text, _>(&lock_key)
            .execute(&mut conn)
            .await
            .map_err(|err| MigrationError::database("acquire migration lock", err))?;

        let outcome = self.migrate_locked(&mut conn, &scripts).await;

        if let Err(err) = diesel::sql_query("SELECT pg_advisory_unlock(hashtext($1))")
            .bind::<Text, _>(&lock_key)
            .execute(&mut conn)
            .await
        {
            warn!(error = %err, "failed to release migration lock; closing connection");
        }
        outcome
    }

    async fn migrate_locked(
        &self,
        conn: &mut AsyncPgConnection,
        scripts: &[MigrationScript],
    ) -> Result<MigrationReport, MigrationError> {
        let schema = quote_identifier(self.config.schema());
        conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
            .await
            .map_err(|err| MigrationError::database("create schema", err))?;
        history::ensure_table(conn).await?;

        let applied = history::read(conn).await?;
        let steps = plan::plan(scripts, &applied)?;

        let mut report = MigrationReport {
            applied: Vec::with_capacity(steps.len()),
            schema_version: applied
                .iter()
                .filter(|entry| entry.success)
                .filter_map(|entry| entry.version.as_ref())
                .max()
                .map(ToString::to_string),
        };
        if steps.is_empty() {
            info!(
                schema = self.config.schema(),
                version = report.schema_version().unwrap_or("none"),
                "schema is up to date"
            );
            return Ok(report);
        }

        for step in steps {
            apply(conn, step).await?;
            if let Some(version) = step.script.version() {
                report.schema_version = Some(version.to_string());
            }
            report.applied.push(step.script.script().to_owned());
        }
        info!(
            schema = self.config.schema(),
            applied = report.applied.len(),
            version = report.schema_version().unwrap_or("none"),
            "migrations applied"
        );
        Ok(report)
    }

    /// Drop and recreate the configured schema, history included.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::CleanDisabled`] unless the configuration
    /// enables cleaning; the database is not contacted in that case.
    pub async fn clean(&self) -> Result<(), MigrationError> {
        if !self.config.clean_enabled() {
            return Err(MigrationError::CleanDisabled);
        }
        let mut conn = self.connect().await?;
        let schema = quote_identifier(self.config.schema());
        conn.batch_execute(&format!(
            "DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}"
        ))
        .await
        .map_err(|err| MigrationError::database("clean schema", err))?;
        warn!(schema = self.config.schema(), "schema cleaned");
        Ok(())
    }

    /// Check the recorded history against the scripts on hand without
    /// changing anything. Pending scripts are not an error.
    pub async fn validate(&self) -> Result<(), MigrationError> {
        let scripts = self.scripts()?;
        let applied = self.read_history().await?;
        plan::check_history(&scripts, &applied)?;
        debug!(
            schema = self.config.schema(),
            scripts = scripts.len(),
            applied = applied.len(),
            "migration history validated"
        );
        Ok(())
    }

    /// Report the state of every script and every orphaned history entry.
    pub async fn info(&self) -> Result<Vec<MigrationInfo>, MigrationError> {
        let scripts = self.scripts()?;
        let applied = self.read_history().await?;
        Ok(plan::describe(&scripts, &applied))
    }

    async fn read_history(&self) -> Result<Vec<AppliedMigration>, MigrationError> {
        let mut conn = self.connect().await?;
        if !history::table_exists(&mut conn, self.config.schema()).await? {
            return Ok(Vec::new());
        }
        history::read(&mut conn).await
    }
}

async fn apply(
    conn: &mut AsyncPgConnection,
    step: PlannedScript<'_>,
) -> Result<(), MigrationError> {
    let script = step.script;
    let version = script.version().map_or("repeatable", Version::as_str);
    if step.reapply {
        info!(script = script.script(), version, "Reapplying");
    } else {
        info!(script = script.script(), version, "Applying");
    }

    let started = Instant::now();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            conn.batch_execute(script.sql()).await?;
            let elapsed = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
            history::record(conn, script, elapsed).await
        }
        .scope_boxed()
    })
    .await
    .map_err(|err| MigrationError::script_failed(script.script(), err))?;

    info!(
        script = script.script(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Applied"
    );
    Ok(())
}
