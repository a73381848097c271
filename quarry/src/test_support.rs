//! Embedded PostgreSQL harness for integration tests.
//!
//! Compiled with the `test-support` feature. Each [`EphemeralDatabase`]
//! owns a private cluster, a throwaway database and a Tokio runtime, and
//! holds a process-wide lock for its whole life, so tests in one binary
//! use databases one at a time. Dropping it (including during a panic)
//! removes the database, stops the cluster and releases the lock.
//!
//! ```rust,no_run
//! use quarry::migration::EmbeddedSource;
//! use quarry::test_support::EphemeralDatabase;
//!
//! let db = EphemeralDatabase::start()?;
//! db.prepare(EmbeddedSource::bundled())?;
//! let transactor = db.transactor()?;
//! # let _ = transactor;
//! # Ok::<(), quarry::test_support::HarnessError>(())
//! ```

mod bootstrap;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, OnceLock};

use pg_embedded_setup_unpriv::{TemporaryDatabase, TestCluster};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::debug;
use uuid::Uuid;

use crate::migration::{
    MigrationConfig, MigrationError, MigrationReport, MigrationService, MigrationSource,
};
use crate::outbound::persistence::{DbPool, PoolConfig, PoolError, Transactor};

static GROUP_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Failure to provide a ready database.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to build test runtime: {message}")]
    Runtime { message: String },
    #[error("embedded PostgreSQL failed to start: {message}")]
    Cluster { message: String },
    #[error("failed to create test database: {message}")]
    Database { message: String },
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A throwaway database on a private embedded cluster.
pub struct EphemeralDatabase {
    // Field order is drop order: database, cluster, runtime, then the lock.
    database: TemporaryDatabase,
    _cluster: TestCluster,
    runtime: Runtime,
    _group: MutexGuard<'static, ()>,
}

impl EphemeralDatabase {
    /// Wait for the group lock, boot a cluster and create an empty database.
    pub fn start() -> Result<Self, HarnessError> {
        let group = GROUP_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let runtime = Runtime::new().map_err(|err| HarnessError::Runtime {
            message: err.to_string(),
        })?;
        let cluster = bootstrap::start_cluster().map_err(|message| HarnessError::Cluster { message })?;
        let name = format!("quarry_{}", Uuid::new_v4().simple());
        let database = cluster
            .temporary_database(name.as_str())
            .map_err(|err| HarnessError::Database {
                message: format!("{err:?}"),
            })?;
        debug!(database = %name, "ephemeral database ready");

        Ok(Self {
            database,
            _cluster: cluster,
            runtime,
            _group: group,
        })
    }

    pub fn url(&self) -> &str {
        self.database.url()
    }

    /// Clean the database, then apply every script from `source`.
    pub fn prepare<S: MigrationSource>(&self, source: S) -> Result<MigrationReport, HarnessError> {
        let service = self.migration_service(source);
        self.block_on(async {
            service.clean().await?;
            Ok(service.migrate().await?)
        })
    }

    /// A migration service for this database with `clean` enabled.
    pub fn migration_service<S: MigrationSource>(&self, source: S) -> MigrationService<S> {
        MigrationService::new(
            self.url(),
            MigrationConfig::default().with_clean_enabled(true),
            source,
        )
    }

    /// A transactor over a small pool bound to this database.
    pub fn transactor(&self) -> Result<Transactor, HarnessError> {
        let config = PoolConfig::new(self.url())
            .with_max_size(4)
            .with_min_idle(Some(1));
        let pool = self.block_on(DbPool::new(config))?;
        Ok(Transactor::new(pool))
    }

    /// Drive `future` to completion on the harness runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// True when `SKIP_TEST_CLUSTER` is `1`, `true` or `yes` (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip (returning `None`) when `SKIP_TEST_CLUSTER` is set, otherwise panic
/// so a broken cluster fails CI instead of passing silently.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
