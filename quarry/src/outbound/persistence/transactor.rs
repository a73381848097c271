//! Unit-of-work execution over the connection pool.
//!
//! [`Transactor`] is the only owner of the pool. Callers hand it a body that
//! receives a [`DbConnection`]; the connection is checked out for exactly the
//! duration of that body and returned on every exit path.
//!
//! ```ignore
//! use diesel_async::scoped_futures::ScopedFutureExt;
//!
//! transactor
//!     .transact(|conn| {
//!         async move {
//!             account_statements::upsert(conn, &first).await?;
//!             account_statements::upsert(conn, &second).await?;
//!             Ok::<_, RepositoryError>(())
//!         }
//!         .scope_boxed()
//!     })
//!     .await?;
//! ```

use diesel::OptionalExtension;
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Bool, Text, Timestamptz};
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use query_spec::{ExecutableQuery, SqlValue};
use tracing::{debug, warn};

use crate::domain::ports::RepositoryError;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::pool::{DbPool, OwnedConnection};

/// A checked-out connection scoped to one `connect` or `transact` call.
///
/// Statements run only as parameterized queries: rendered specifications via
/// [`load`](Self::load), [`first`](Self::first) and
/// [`execute`](Self::execute), or Diesel's typed DSL inside this crate.
pub struct DbConnection {
    inner: OwnedConnection,
}

impl DbConnection {
    /// Run a rendered query and map every row.
    pub async fn load<R>(&mut self, query: &ExecutableQuery) -> Result<Vec<R>, RepositoryError>
    where
        R: QueryableByName<Pg> + Send + 'static,
    {
        bind(query)
            .load::<R>(self.diesel())
            .await
            .map_err(|err| map_diesel_error(err, "load rows"))
    }

    /// Run a rendered query and map the first row, if any.
    pub async fn first<R>(&mut self, query: &ExecutableQuery) -> Result<Option<R>, RepositoryError>
    where
        R: QueryableByName<Pg> + Send + 'static,
    {
        bind(query)
            .get_result::<R>(self.diesel())
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "load row"))
    }

    /// Run a rendered statement and return the affected row count.
    pub async fn execute(&mut self, query: &ExecutableQuery) -> Result<usize, RepositoryError> {
        bind(query)
            .execute(self.diesel())
            .await
            .map_err(|err| map_diesel_error(err, "execute statement"))
    }

    /// Diesel connection for typed DSL statements.
    pub(crate) fn diesel(&mut self) -> &mut AsyncPgConnection {
        &mut self.inner
    }
}

fn bind(query: &ExecutableQuery) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    query.binds().iter().fold(
        diesel::sql_query(query.sql()).into_boxed::<Pg>(),
        |statement, value| match value {
            SqlValue::Text(text) => statement.bind::<Text, _>(text.clone()),
            SqlValue::BigInt(number) => statement.bind::<BigInt, _>(*number),
            SqlValue::Bool(flag) => statement.bind::<Bool, _>(*flag),
            SqlValue::Timestamp(instant) => statement.bind::<Timestamptz, _>(*instant),
            SqlValue::Uuid(uuid) => statement.bind::<diesel::sql_types::Uuid, _>(*uuid),
        },
    )
}

/// Executes units of work against pooled connections.
///
/// `connect` runs a body without a transaction; `transact` wraps it in
/// `BEGIN`/`COMMIT`, rolling back when the body fails. Dropping either future
/// before it completes drops the connection; a connection abandoned inside a
/// transaction is discarded by the pool, which aborts the transaction on the
/// server.
#[derive(Clone)]
pub struct Transactor {
    pool: DbPool,
}

impl Transactor {
    /// Take ownership of `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn checkout(&self) -> Result<DbConnection, RepositoryError> {
        let inner = self.pool.get_owned().await.map_err(map_pool_error)?;
        Ok(DbConnection { inner })
    }

    /// Run `body` on a dedicated connection without a transaction.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or a checkout failure converted into `E`
    /// (`ResourceExhausted` on timeout, `Persistence` otherwise).
    pub async fn connect<'a, T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut DbConnection) -> ScopedBoxFuture<'a, 'c, Result<T, E>>
            + Send
            + 'a,
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
    {
        let mut connection = self.checkout().await?;
        body(&mut connection).await
    }

    /// Run `body` inside one transaction.
    ///
    /// Commits when the body returns `Ok`, rolls back when it returns `Err`.
    /// A rollback failure is logged and the body's error is returned; a
    /// commit failure is returned as the operation's error.
    pub async fn transact<'a, T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut DbConnection) -> ScopedBoxFuture<'a, 'c, Result<T, E>>
            + Send
            + 'a,
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
    {
        let mut connection = self.checkout().await?;
        AnsiTransactionManager::begin_transaction(connection.diesel())
            .await
            .map_err(|err| map_diesel_error(err, "begin transaction"))?;

        match body(&mut connection).await {
            Ok(value) => {
                AnsiTransactionManager::commit_transaction(connection.diesel())
                    .await
                    .map_err(|err| map_diesel_error(err, "commit transaction"))?;
                debug!("unit of work committed");
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) =
                    AnsiTransactionManager::rollback_transaction(connection.diesel()).await
                {
                    warn!(error = %rollback, "rollback failed; connection will be discarded");
                } else {
                    debug!("unit of work rolled back");
                }
                Err(error)
            }
        }
    }
}
