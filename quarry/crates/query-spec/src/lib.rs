//! Composable query specifications for PostgreSQL.
//!
//! A [`Specification`] accumulates typed [`Condition`] values, optional
//! ordering and pagination, and renders them into an [`ExecutableQuery`]: SQL
//! text with `$n` placeholders plus the ordered list of bind values. Filter
//! values never appear in the SQL text, so a specification built from
//! untrusted input cannot change the shape of the statement.
//!
//! ```
//! use query_spec::{Column, SortDirection, Specification, SqlValue, Table};
//!
//! const STATUS: Column = Column::new("status");
//! const BALANCE: Column = Column::new("balance");
//! const ACCOUNTS: Table = Table::new("accounts", &[STATUS, BALANCE]);
//!
//! let query = Specification::select(ACCOUNTS)
//!     .and_where(Some(STATUS.equals("active")))
//!     .and_where(None)
//!     .order_by(BALANCE, SortDirection::Desc)
//!     .limit(10)
//!     .build();
//!
//! assert_eq!(
//!     query.sql(),
//!     r#"SELECT "status", "balance" FROM "accounts" WHERE "status" = $1 ORDER BY "balance" DESC LIMIT $2"#
//! );
//! assert_eq!(query.binds(), &[SqlValue::from("active"), SqlValue::BigInt(10)]);
//! ```

mod condition;
pub mod naming;
mod specification;
mod value;

pub use condition::{Column, Comparison, Condition, quote_identifier};
pub use specification::{ExecutableQuery, Ordering, SortDirection, Specification, Table};
pub use value::SqlValue;
