//! PostgreSQL-backed account repository.
//!
//! Reads run through [`Transactor::connect`], writes through
//! [`Transactor::transact`]. The SQL itself lives in
//! [`account_statements`](super::account_statements).

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;

use crate::domain::ports::{Count, Create, Find, Load, LoadAll, RepositoryError, Save};
use crate::domain::{Account, AccountFilter, AccountId, AccountInit};

use super::account_statements;
use super::transactor::Transactor;

/// Diesel-backed implementation of the account capability traits, and so of
/// [`AccountRepository`](crate::domain::ports::AccountRepository).
#[derive(Clone)]
pub struct DieselAccountRepository {
    transactor: Transactor,
}

impl DieselAccountRepository {
    /// Create a repository executing through `transactor`.
    pub fn new(transactor: Transactor) -> Self {
        Self { transactor }
    }
}

#[async_trait]
impl Load<AccountId, Account> for DieselAccountRepository {
    async fn load(&self, key: &AccountId) -> Result<Option<Account>, RepositoryError> {
        self.transactor
            .connect(|conn| account_statements::load(conn, key).scope_boxed())
            .await
    }
}

#[async_trait]
impl LoadAll<AccountId, Account> for DieselAccountRepository {
    async fn load_all(&self, keys: &[AccountId]) -> Result<Vec<Account>, RepositoryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.transactor
            .connect(|conn| account_statements::load_all(conn, keys).scope_boxed())
            .await
    }
}

#[async_trait]
impl Find<Account, AccountFilter> for DieselAccountRepository {
    async fn find(&self, filter: &AccountFilter) -> Result<Vec<Account>, RepositoryError> {
        self.transactor
            .connect(|conn| account_statements::find(conn, filter).scope_boxed())
            .await
    }
}

#[async_trait]
impl Count<AccountFilter> for DieselAccountRepository {
    async fn count(&self, filter: &AccountFilter) -> Result<u64, RepositoryError> {
        self.transactor
            .connect(|conn| account_statements::count(conn, filter).scope_boxed())
            .await
    }
}

#[async_trait]
impl Save<AccountId, Account> for DieselAccountRepository {
    async fn save(&self, key: &AccountId, value: &Account) -> Result<(), RepositoryError> {
        if key != value.id() {
            return Err(RepositoryError::validation(format!(
                "key {key} does not match account id {}",
                value.id()
            )));
        }
        self.transactor
            .transact(|conn| account_statements::upsert(conn, value).scope_boxed())
            .await
    }
}

#[async_trait]
impl Create<AccountId, AccountInit> for DieselAccountRepository {
    async fn create(&self, init: &AccountInit) -> Result<AccountId, RepositoryError> {
        self.transactor
            .transact(|conn| account_statements::insert(conn, init).scope_boxed())
            .await
    }
}
