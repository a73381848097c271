//! The `schema_history` table recording every applied script.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};

use super::{MigrationError, MigrationScript, Version};

diesel::table! {
    schema_history (installed_rank) {
        installed_rank -> Int4,
        version -> Nullable<Text>,
        description -> Text,
        kind -> Text,
        script -> Text,
        checksum -> Text,
        installed_on -> Timestamptz,
        execution_time_ms -> Int8,
        success -> Bool,
    }
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_history (
    installed_rank SERIAL PRIMARY KEY,
    version TEXT,
    description TEXT NOT NULL,
    kind TEXT NOT NULL,
    script TEXT NOT NULL,
    checksum TEXT NOT NULL,
    installed_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    execution_time_ms BIGINT NOT NULL,
    success BOOLEAN NOT NULL
)";

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct HistoryRow {
    installed_rank: i32,
    version: Option<String>,
    description: String,
    script: String,
    checksum: String,
    installed_on: DateTime<Utc>,
    success: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema_history)]
struct NewHistoryRow<'a> {
    version: Option<&'a str>,
    description: &'a str,
    kind: &'a str,
    script: &'a str,
    checksum: &'a str,
    execution_time_ms: i64,
    success: bool,
}

#[derive(QueryableByName)]
struct Presence {
    #[diesel(sql_type = Bool)]
    present: bool,
}

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub installed_rank: i32,
    /// `None` for repeatable scripts.
    pub version: Option<Version>,
    pub description: String,
    pub script: String,
    pub checksum: String,
    pub installed_on: DateTime<Utc>,
    pub success: bool,
}

impl TryFrom<HistoryRow> for AppliedMigration {
    type Error = MigrationError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let version = row
            .version
            .as_deref()
            .map(|text| {
                Version::parse(text).ok_or_else(|| {
                    MigrationError::database(
                        "read schema history",
                        format!("recorded version {text:?} of {} is not numeric", row.script),
                    )
                })
            })
            .transpose()?;
        Ok(Self {
            installed_rank: row.installed_rank,
            version,
            description: row.description,
            script: row.script,
            checksum: row.checksum,
            installed_on: row.installed_on,
            success: row.success,
        })
    }
}

pub(crate) async fn ensure_table(conn: &mut AsyncPgConnection) -> Result<(), MigrationError> {
    conn.batch_execute(CREATE_TABLE)
        .await
        .map_err(|err| MigrationError::database("create schema history", err))
}

pub(crate) async fn table_exists(
    conn: &mut AsyncPgConnection,
    schema: &str,
) -> Result<bool, MigrationError> {
    let presence: Presence = diesel::sql_query(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = $1 AND table_name = 'schema_history') AS present",
    )
    .bind::<Text, _>(schema)
    .get_result(conn)
    .await
    .map_err(|err| MigrationError::database("inspect schema history", err))?;
    Ok(presence.present)
}

/// Every history row in installation order.
pub(crate) async fn read(
    conn: &mut AsyncPgConnection,
) -> Result<Vec<AppliedMigration>, MigrationError> {
    let rows = schema_history::table
        .order(schema_history::installed_rank.asc())
        .select(HistoryRow::as_select())
        .load(conn)
        .await
        .map_err(|err| MigrationError::database("read schema history", err))?;
    rows.into_iter().map(AppliedMigration::try_from).collect()
}

/// Append a successful application of `script`.
pub(crate) async fn record(
    conn: &mut AsyncPgConnection,
    script: &MigrationScript,
    execution_time_ms: i64,
) -> Result<(), diesel::result::Error> {
    let row = NewHistoryRow {
        version: script.version().map(Version::as_str),
        description: script.description(),
        kind: script.kind().label(),
        script: script.script(),
        checksum: script.checksum(),
        execution_time_ms,
        success: true,
    };
    diesel::insert_into(schema_history::table)
        .values(&row)
        .execute(conn)
        .await
        .map(|_| ())
}
