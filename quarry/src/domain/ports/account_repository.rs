//! Account repository contract and its in-memory implementation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Account, AccountFilter, AccountId, AccountInit, AccountSort, AccountSortField,
    AccountValidationError, Email, SortOrder,
};

use super::{
    Count, Create, Entity, Find, Load, LoadAll, RepositoryError, RepositoryWithCreate, Save,
};

/// Name of the unique constraint on account emails, reported by
/// [`RepositoryError::DuplicateKey`].
pub const ACCOUNT_EMAIL_CONSTRAINT: &str = "accounts_email_key";

impl Entity for Account {
    const NAME: &'static str = "account";
}

impl From<AccountValidationError> for RepositoryError {
    fn from(error: AccountValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

/// Everything an account store offers: the full read/write contract,
/// key-generating creation and counting.
///
/// Implemented automatically for any type providing the capabilities, so
/// adapters only implement the individual traits.
pub trait AccountRepository:
    RepositoryWithCreate<AccountId, Account, AccountFilter, AccountInit> + Count<AccountFilter>
{
}

impl<T> AccountRepository for T where
    T: RepositoryWithCreate<AccountId, Account, AccountFilter, AccountInit> + Count<AccountFilter>
{
}

/// Process-local account store with the same observable semantics as the
/// database adapter: email uniqueness, upsert on save, generated ids on
/// create and id-ascending default order.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<BTreeMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, replacing accounts with the same id.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts
            .into_iter()
            .map(|account| (account.id().clone(), account))
            .collect();
        Self {
            accounts: Mutex::new(map),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AccountId, Account>> {
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ensure_unique_email(
    accounts: &BTreeMap<AccountId, Account>,
    id: Option<&AccountId>,
    email: &Email,
) -> Result<(), RepositoryError> {
    let taken = accounts
        .values()
        .any(|other| other.email() == email && Some(other.id()) != id);
    if taken {
        return Err(RepositoryError::duplicate_key(ACCOUNT_EMAIL_CONSTRAINT));
    }
    Ok(())
}

fn compare_by(sort: AccountSort, left: &Account, right: &Account) -> Ordering {
    let by_field = match sort.field {
        AccountSortField::Id => left.id().cmp(right.id()),
        AccountSortField::Email => left.email().cmp(right.email()),
        AccountSortField::HolderName => left.holder_name().cmp(right.holder_name()),
        AccountSortField::Balance => left.balance().cmp(&right.balance()),
        AccountSortField::CreatedAt => left.created_at().cmp(&right.created_at()),
    };
    let directed = match sort.order {
        SortOrder::Ascending => by_field,
        SortOrder::Descending => by_field.reverse(),
    };
    directed.then_with(|| left.id().cmp(right.id()))
}

fn page<T>(items: Vec<T>, offset: Option<u64>, limit: Option<u64>) -> Vec<T> {
    let skip = offset.map_or(0, |rows| usize::try_from(rows).unwrap_or(usize::MAX));
    let take = limit.map_or(usize::MAX, |rows| usize::try_from(rows).unwrap_or(usize::MAX));
    items.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl Load<AccountId, Account> for InMemoryAccountRepository {
    async fn load(&self, key: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.lock().get(key).cloned())
    }
}

#[async_trait]
impl LoadAll<AccountId, Account> for InMemoryAccountRepository {
    async fn load_all(&self, keys: &[AccountId]) -> Result<Vec<Account>, RepositoryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let accounts = self.lock();
        Ok(keys
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|key| accounts.get(key).cloned())
            .collect())
    }
}

#[async_trait]
impl Find<Account, AccountFilter> for InMemoryAccountRepository {
    async fn find(&self, filter: &AccountFilter) -> Result<Vec<Account>, RepositoryError> {
        let mut matched: Vec<Account> = self
            .lock()
            .values()
            .filter(|account| filter.matches(account))
            .cloned()
            .collect();
        if let Some(sort) = filter.sort {
            matched.sort_by(|left, right| compare_by(sort, left, right));
        }
        Ok(page(matched, filter.offset, filter.limit))
    }
}

#[async_trait]
impl Count<AccountFilter> for InMemoryAccountRepository {
    async fn count(&self, filter: &AccountFilter) -> Result<u64, RepositoryError> {
        let matched = self
            .lock()
            .values()
            .filter(|account| filter.matches(account))
            .count();
        Ok(u64::try_from(matched).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl Save<AccountId, Account> for InMemoryAccountRepository {
    async fn save(&self, key: &AccountId, value: &Account) -> Result<(), RepositoryError> {
        if key != value.id() {
            return Err(RepositoryError::validation(format!(
                "key {key} does not match account id {}",
                value.id()
            )));
        }
        let mut accounts = self.lock();
        ensure_unique_email(&accounts, Some(key), value.email())?;
        accounts.insert(key.clone(), value.clone());
        Ok(())
    }
}

#[async_trait]
impl Create<AccountId, AccountInit> for InMemoryAccountRepository {
    async fn create(&self, init: &AccountInit) -> Result<AccountId, RepositoryError> {
        let mut accounts = self.lock();
        ensure_unique_email(&accounts, None, init.email())?;
        let id = AccountId::new(Uuid::new_v4().to_string())?;
        let account = init.clone().into_account(id.clone(), Utc::now());
        accounts.insert(id.clone(), account);
        Ok(id)
    }
}
