//! Domain aggregates and the ports persistence adapters implement.
//!
//! Public surface:
//! - Account (alias to `account::Account`) — the sample aggregate every
//!   repository contract is exercised with.
//! - AccountFilter (alias to `account_filter::AccountFilter`) — optional
//!   criteria plus ordering and pagination for `Find`.
//! - ports — capability traits, `RepositoryError` and the in-memory
//!   account repository.

pub mod account;
pub mod account_filter;
pub mod ports;

pub use self::account::{
    Account, AccountDraft, AccountId, AccountInit, AccountStatus, AccountValidationError, Email,
};
pub use self::account_filter::{AccountFilter, AccountSort, AccountSortField, SortOrder};
