//! Bind values carried alongside rendered SQL.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A value bound to a `$n` placeholder.
///
/// The variants mirror the PostgreSQL types the persistence layer binds:
/// `text`, `bigint`, `boolean`, `timestamptz`, and `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlValue {
    /// Bound as `text`.
    Text(String),
    /// Bound as `bigint`.
    BigInt(i64),
    /// Bound as `boolean`.
    Bool(bool),
    /// Bound as `timestamptz`.
    Timestamp(DateTime<Utc>),
    /// Bound as `uuid`.
    Uuid(Uuid),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::BigInt(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SqlValue::from("active"), SqlValue::Text("active".to_owned()))]
    #[case(SqlValue::from(7_i32), SqlValue::BigInt(7))]
    #[case(SqlValue::from(-3_i64), SqlValue::BigInt(-3))]
    #[case(SqlValue::from(true), SqlValue::Bool(true))]
    fn conversions_pick_the_expected_variant(#[case] actual: SqlValue, #[case] expected: SqlValue) {
        assert_eq!(actual, expected);
    }
}
