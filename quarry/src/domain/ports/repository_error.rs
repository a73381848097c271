//! The closed error taxonomy shared by every repository port.

use super::define_port_error;

define_port_error! {
    /// Errors surfaced at the repository boundary.
    ///
    /// Driver errors never cross this boundary: adapters classify them into
    /// one of these variants and keep SQL text and raw driver messages out of
    /// the caller-visible message.
    pub enum RepositoryError {
        /// A key the caller required to exist is absent.
        NotFound { entity: String, key: String } => "{entity} not found: {key}",
        /// A uniqueness constraint rejected a create or update.
        DuplicateKey { constraint: String } => "duplicate key violates {constraint}",
        /// Caller-supplied data violates a domain or schema invariant.
        Validation { message: String } => "validation failed: {message}",
        /// The connection pool is saturated or checkout timed out.
        ResourceExhausted { message: String } => "resource exhausted: {message}",
        /// Persisted data cannot be converted into a valid entity.
        Mapping { message: String } => "stored data could not be mapped: {message}",
        /// Schema migration failed; startup must not proceed.
        MigrationFailure { message: String } => "migration failed: {message}",
        /// Unclassified storage failure.
        Persistence { message: String } => "persistence failure: {message}",
    }
}

impl RepositoryError {
    /// True when retrying with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }

    /// True for failures treated as defects unless a caller explicitly
    /// recovers them.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Mapping { .. } | Self::Persistence { .. })
    }

    /// True for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RepositoryError::resource_exhausted("pool timed out"), true, false)]
    #[case(RepositoryError::persistence("connection reset"), false, true)]
    #[case(RepositoryError::mapping("status 'dormant'"), false, true)]
    #[case(RepositoryError::duplicate_key("accounts_email_key"), false, false)]
    #[case(RepositoryError::validation("balance must not be negative"), false, false)]
    #[case(RepositoryError::not_found("account", "A1"), false, false)]
    #[case(RepositoryError::migration_failure("checksum mismatch"), false, false)]
    fn classification_follows_the_propagation_policy(
        #[case] error: RepositoryError,
        #[case] retryable: bool,
        #[case] defect: bool,
    ) {
        assert_eq!(error.is_retryable(), retryable);
        assert_eq!(error.is_defect(), defect);
    }

    #[rstest]
    fn not_found_names_entity_and_key() {
        let error = RepositoryError::not_found("account", "A1");
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "account not found: A1");
        assert_eq!(error.kind(), "NotFound");
    }
}
