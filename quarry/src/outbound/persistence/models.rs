//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and never
//! leave it: repositories convert them through
//! [`RecordMapping`](super::mapping::RecordMapping) before returning.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use super::schema::accounts;

/// One `accounts` row, every column.
///
/// Loadable both through the typed DSL (`Selectable`) and from rendered
/// specifications (`QueryableByName`).
#[derive(Debug, Clone, PartialEq, Eq, Queryable, QueryableByName, Selectable, Insertable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRecord {
    pub id: String,
    pub email: String,
    pub holder_name: String,
    pub balance: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Creation record: [`AccountRecord`] minus the generated `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRecord {
    pub email: String,
    pub holder_name: String,
    pub balance: i64,
    pub status: String,
}

/// Result row of a rendered `COUNT(*)` specification.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}
