//! Account statements runnable on any [`DbConnection`].
//!
//! These are the building blocks of [`DieselAccountRepository`]; callers that
//! need several writes in one unit of work run them directly inside
//! [`Transactor::transact`].
//!
//! [`DieselAccountRepository`]: super::DieselAccountRepository
//! [`Transactor::transact`]: super::Transactor::transact

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::RepositoryError;
use crate::domain::{Account, AccountFilter, AccountId, AccountInit};

use super::account_table::account_specification;
use super::error_mapping::map_diesel_error;
use super::mapping::RecordMapping;
use super::models::{AccountRecord, CountRow, NewAccountRecord};
use super::schema::accounts;
use super::transactor::DbConnection;

fn map_records(records: Vec<AccountRecord>) -> Result<Vec<Account>, RepositoryError> {
    records
        .into_iter()
        .map(|record| Account::from_record(record).map_err(RepositoryError::from))
        .collect()
}

/// Load one account by id.
pub async fn load(
    conn: &mut DbConnection,
    id: &AccountId,
) -> Result<Option<Account>, RepositoryError> {
    let record = accounts::table
        .find(id.as_str())
        .select(AccountRecord::as_select())
        .first(conn.diesel())
        .await
        .optional()
        .map_err(|err| map_diesel_error(err, "load account"))?;
    record
        .map(Account::from_record)
        .transpose()
        .map_err(RepositoryError::from)
}

/// Load every stored account among `ids`. Missing ids are skipped.
pub async fn load_all(
    conn: &mut DbConnection,
    ids: &[AccountId],
) -> Result<Vec<Account>, RepositoryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let keys: Vec<&str> = ids.iter().map(AccountId::as_str).collect();
    let records = accounts::table
        .filter(accounts::id.eq_any(keys))
        .select(AccountRecord::as_select())
        .load(conn.diesel())
        .await
        .map_err(|err| map_diesel_error(err, "load accounts"))?;
    map_records(records)
}

/// Run `filter` as a specification.
pub async fn find(
    conn: &mut DbConnection,
    filter: &AccountFilter,
) -> Result<Vec<Account>, RepositoryError> {
    let query = account_specification(filter).build();
    let records = conn.load::<AccountRecord>(&query).await?;
    map_records(records)
}

/// Count accounts matching `filter`, ignoring its pagination.
pub async fn count(conn: &mut DbConnection, filter: &AccountFilter) -> Result<u64, RepositoryError> {
    let query = account_specification(filter).build_count();
    let row = conn.first::<CountRow>(&query).await?;
    let total = row.map_or(0, |row| row.count);
    u64::try_from(total).map_err(|_| RepositoryError::mapping(format!("negative count {total}")))
}

/// Insert `account`, or replace every column of the row with the same id.
///
/// A single `INSERT … ON CONFLICT (id) DO UPDATE`, so concurrent saves of the
/// same id never observe a half-written row.
pub async fn upsert(conn: &mut DbConnection, account: &Account) -> Result<(), RepositoryError> {
    let record = account.to_record();
    diesel::insert_into(accounts::table)
        .values(&record)
        .on_conflict(accounts::id)
        .do_update()
        .set((
            accounts::email.eq(excluded(accounts::email)),
            accounts::holder_name.eq(excluded(accounts::holder_name)),
            accounts::balance.eq(excluded(accounts::balance)),
            accounts::status.eq(excluded(accounts::status)),
            accounts::created_at.eq(excluded(accounts::created_at)),
        ))
        .execute(conn.diesel())
        .await
        .map(|_| ())
        .map_err(|err| map_diesel_error(err, "save account"))
}

/// Insert a new account and return its generated id.
pub async fn insert(conn: &mut DbConnection, init: &AccountInit) -> Result<AccountId, RepositoryError> {
    let record = NewAccountRecord::from(init);
    let id: String = diesel::insert_into(accounts::table)
        .values(&record)
        .returning(accounts::id)
        .get_result(conn.diesel())
        .await
        .map_err(|err| map_diesel_error(err, "create account"))?;
    AccountId::new(id.as_str()).map_err(|err| {
        RepositoryError::mapping(format!("generated id {id:?} is not a valid account id: {err}"))
    })
}

