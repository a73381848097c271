//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod repository;
mod repository_error;

pub use account_repository::{
    ACCOUNT_EMAIL_CONSTRAINT, AccountRepository, InMemoryAccountRepository,
};
pub use repository::{
    Count, Create, Entity, Find, Load, LoadAll, LoadExt, Repository, RepositoryWithCreate, Save,
};
pub use repository_error::RepositoryError;
