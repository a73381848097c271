//! The specification builder and its rendered form.

use crate::condition::{Column, Condition, push_placeholder, quote_identifier};
use crate::value::SqlValue;

/// A table and the columns a specification selects from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table {
    name: &'static str,
    columns: &'static [Column],
}

impl Table {
    /// Declare a table. An empty column list selects `*`.
    #[must_use]
    pub const fn new(name: &'static str, columns: &'static [Column]) -> Self {
        Self { name, columns }
    }

    /// The physical table name, unquoted.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The selected columns in projection order.
    #[must_use]
    pub const fn columns(&self) -> &'static [Column] {
        self.columns
    }
}

/// Sort direction for [`Specification::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ordering {
    /// Sort column.
    pub column: Column,
    /// Sort direction.
    pub direction: SortDirection,
}

/// An immutable description of a `SELECT` over one table.
///
/// Every builder method consumes the value and returns a new one, so a
/// specification can be shared as a base and refined independently.
/// Predicates are combined with `AND` in insertion order; `order_by`,
/// `limit` and `offset` keep only the last value supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    table: Table,
    predicates: Vec<Condition>,
    ordering: Option<Ordering>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Specification {
    /// Start an unconstrained specification over `table`.
    #[must_use]
    pub const fn select(table: Table) -> Self {
        Self {
            table,
            predicates: Vec::new(),
            ordering: None,
            limit: None,
            offset: None,
        }
    }

    /// Append `condition` when present; `None` leaves the specification
    /// unchanged.
    #[must_use]
    pub fn and_where(mut self, condition: Option<Condition>) -> Self {
        if let Some(predicate) = condition {
            self.predicates.push(predicate);
        }
        self
    }

    /// Set the ordering, replacing any earlier one.
    #[must_use]
    pub const fn order_by(mut self, column: Column, direction: SortDirection) -> Self {
        self.ordering = Some(Ordering { column, direction });
        self
    }

    /// Cap the number of rows, replacing any earlier cap. `limit(0)` yields
    /// no rows.
    #[must_use]
    pub const fn limit(mut self, rows: u64) -> Self {
        self.limit = Some(rows);
        self
    }

    /// Skip leading rows, replacing any earlier offset.
    #[must_use]
    pub const fn offset(mut self, rows: u64) -> Self {
        self.offset = Some(rows);
        self
    }

    /// The accumulated predicates in insertion order.
    #[must_use]
    pub fn predicates(&self) -> &[Condition] {
        &self.predicates
    }

    /// True when no predicate constrains the scan.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render the row query.
    #[must_use]
    pub fn build(&self) -> ExecutableQuery {
        let mut sql = String::from("SELECT ");
        sql.push_str(&self.projection());
        let mut binds = Vec::new();
        self.render_from_where(&mut sql, &mut binds);

        if let Some(ordering) = self.ordering {
            sql.push_str(" ORDER BY ");
            sql.push_str(&ordering.column.quoted());
            sql.push(' ');
            sql.push_str(ordering.direction.keyword());
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            push_placeholder(&mut sql, &mut binds, SqlValue::BigInt(clamp_to_bigint(limit)));
        }
        if let Some(offset) = self.offset {
            sql.push_str(" OFFSET ");
            push_placeholder(&mut sql, &mut binds, SqlValue::BigInt(clamp_to_bigint(offset)));
        }

        ExecutableQuery { sql, binds }
    }

    /// Render `SELECT COUNT(*)` over the same predicates. Ordering and
    /// pagination do not apply.
    #[must_use]
    pub fn build_count(&self) -> ExecutableQuery {
        let mut sql = String::from(r#"SELECT COUNT(*) AS "count""#);
        let mut binds = Vec::new();
        self.render_from_where(&mut sql, &mut binds);
        ExecutableQuery { sql, binds }
    }

    fn projection(&self) -> String {
        if self.table.columns.is_empty() {
            return "*".to_owned();
        }
        self.table
            .columns
            .iter()
            .map(|column| column.quoted())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_from_where(&self, sql: &mut String, binds: &mut Vec<SqlValue>) {
        sql.push_str(" FROM ");
        sql.push_str(&quote_identifier(self.table.name));
        for (index, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            predicate.render(sql, binds);
        }
    }
}

fn clamp_to_bigint(rows: u64) -> i64 {
    i64::try_from(rows).unwrap_or(i64::MAX)
}

/// Rendered SQL plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableQuery {
    sql: String,
    binds: Vec<SqlValue>,
}

impl ExecutableQuery {
    /// The statement text with `$n` placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Values for `$1..=$n`.
    #[must_use]
    pub fn binds(&self) -> &[SqlValue] {
        &self.binds
    }

    /// Split into statement text and bind values.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.binds)
    }
}
