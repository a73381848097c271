//! Composable data-access layer for PostgreSQL.
//!
//! - [`domain`] holds entities, filters and the repository capability traits.
//! - [`outbound::persistence`] implements them with Diesel, and owns the
//!   [`Transactor`](outbound::persistence::Transactor) that scopes every
//!   connection to one unit of work.
//! - [`migration`] applies versioned and repeatable SQL scripts.
//! - [`config`] loads `QUARRY_*` settings.

pub mod config;
pub mod domain;
pub mod migration;
pub mod outbound;

#[cfg(feature = "test-support")]
pub mod test_support;
