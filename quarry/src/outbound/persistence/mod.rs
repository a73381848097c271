//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the domain repository
//! ports backed by PostgreSQL via Diesel with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repository implementations only translate between
//!   records and domain types. No business logic resides here.
//! - **Internal records**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) never leave this module.
//! - **One pool owner**: the [`Transactor`] owns the pool and scopes every
//!   connection to a single `connect` or `transact` call.
//! - **Strongly typed errors**: driver errors are classified into
//!   `RepositoryError` in `error_mapping.rs`.
//!
//! # Example
//!
//! ```ignore
//! use quarry::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig, Transactor};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/mydb")).await?;
//! let repo = DieselAccountRepository::new(Transactor::new(pool));
//! ```

pub mod account_statements;
mod account_table;
mod diesel_account_repository;
mod error_mapping;
mod mapping;
mod models;
mod pool;
mod schema;
mod transactor;

pub use diesel_account_repository::DieselAccountRepository;
pub use mapping::MappingError;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use transactor::{DbConnection, Transactor};
