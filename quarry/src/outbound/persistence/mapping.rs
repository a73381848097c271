//! Conversion between domain entities and persistence records.
//!
//! Mapping is pure and total over persisted fields: every field an entity
//! stores goes into its record and comes back unchanged. Malformed stored
//! data is rejected with a [`MappingError`] naming the offending column; it
//! is never replaced with a default.

use std::fmt;

use tracing::error;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    Account, AccountDraft, AccountId, AccountInit, AccountStatus, AccountValidationError, Email,
};

use super::models::{AccountRecord, NewAccountRecord};

/// Stored data that does not satisfy the entity's invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column {column} holds invalid value {value:?}: {reason}")]
pub struct MappingError {
    pub column: &'static str,
    pub value: String,
    pub reason: String,
}

impl MappingError {
    fn invalid(
        column: &'static str,
        value: impl fmt::Display,
        reason: AccountValidationError,
    ) -> Self {
        Self {
            column,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<MappingError> for RepositoryError {
    fn from(mapping: MappingError) -> Self {
        // Stored values stay out of the caller-visible message.
        error!(
            column = mapping.column,
            value = %mapping.value,
            reason = %mapping.reason,
            "stored row failed to map"
        );
        Self::mapping(format!("column {}: {}", mapping.column, mapping.reason))
    }
}

/// Bidirectional mapping between an entity and its persistence record.
pub(crate) trait RecordMapping: Sized {
    type Record;

    fn to_record(&self) -> Self::Record;

    fn from_record(record: Self::Record) -> Result<Self, MappingError>;
}

impl RecordMapping for Account {
    type Record = AccountRecord;

    fn to_record(&self) -> AccountRecord {
        AccountRecord {
            id: self.id().as_str().to_owned(),
            email: self.email().as_str().to_owned(),
            holder_name: self.holder_name().to_owned(),
            balance: self.balance(),
            status: self.status().as_str().to_owned(),
            created_at: self.created_at(),
        }
    }

    fn from_record(record: AccountRecord) -> Result<Self, MappingError> {
        let AccountRecord {
            id,
            email,
            holder_name,
            balance,
            status,
            created_at,
        } = record;

        let id = AccountId::new(id.as_str()).map_err(|err| MappingError::invalid("id", &id, err))?;
        let email =
            Email::new(email.as_str()).map_err(|err| MappingError::invalid("email", &email, err))?;
        let status = status
            .parse::<AccountStatus>()
            .map_err(|err| MappingError::invalid("status", &status, err))?;

        Account::new(AccountDraft {
            id,
            email,
            holder_name: holder_name.clone(),
            balance,
            status,
            created_at,
        })
        .map_err(|err| match err {
            AccountValidationError::NegativeBalance { .. } => {
                MappingError::invalid("balance", balance, err)
            }
            other => MappingError::invalid("holder_name", &holder_name, other),
        })
    }
}

impl From<&AccountInit> for NewAccountRecord {
    fn from(init: &AccountInit) -> Self {
        Self {
            email: init.email().as_str().to_owned(),
            holder_name: init.holder_name().to_owned(),
            balance: init.balance(),
            status: init.status().as_str().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{SubsecRound, Utc};

    use super::*;
    use rstest::rstest;

    fn record() -> AccountRecord {
        AccountRecord {
            id: "A1".to_owned(),
            email: "ada@example.com".to_owned(),
            holder_name: "Ada Lovelace".to_owned(),
            balance: 100,
            status: "frozen".to_owned(),
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    #[rstest]
    fn records_map_to_accounts_and_back() {
        let record = record();
        let account = Account::from_record(record.clone()).expect("valid record");
        assert_eq!(account.status(), AccountStatus::Frozen);
        assert_eq!(account.to_record(), record);
    }

    #[rstest]
    #[case::unknown_status(AccountRecord { status: "dormant".to_owned(), ..record() }, "status")]
    #[case::negative_balance(AccountRecord { balance: -5, ..record() }, "balance")]
    #[case::invalid_email(AccountRecord { email: "nobody".to_owned(), ..record() }, "email")]
    #[case::invalid_id(AccountRecord { id: String::new(), ..record() }, "id")]
    #[case::blank_holder(AccountRecord { holder_name: "  ".to_owned(), ..record() }, "holder_name")]
    fn malformed_records_are_rejected(#[case] record: AccountRecord, #[case] column: &str) {
        let error = Account::from_record(record).expect_err("malformed record");
        assert_eq!(error.column, column);
    }

    #[rstest]
    fn mapping_errors_become_mapping_defects() {
        let error = Account::from_record(AccountRecord {
            status: "dormant".to_owned(),
            ..record()
        })
        .expect_err("unknown status");
        let repository_error = RepositoryError::from(error);

        assert!(repository_error.is_defect());
        assert_eq!(repository_error.kind(), "Mapping");
    }

    #[rstest]
    fn creation_records_carry_the_init_fields() {
        let init = AccountInit::new(
            Email::new("grace@example.com").expect("valid email"),
            "Grace Hopper",
            7,
            AccountStatus::Active,
        )
        .expect("valid init");

        assert_eq!(
            NewAccountRecord::from(&init),
            NewAccountRecord {
                email: "grace@example.com".to_owned(),
                holder_name: "Grace Hopper".to_owned(),
                balance: 7,
                status: "active".to_owned(),
            }
        );
    }
}
