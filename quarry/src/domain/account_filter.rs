//! Query filter for accounts.
//!
//! Every criterion is optional and an absent criterion never constrains the
//! result. Present criteria are combined with AND.

use chrono::{DateTime, Utc};

use super::account::{Account, AccountId, AccountStatus, Email};

/// Account fields a result set can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountSortField {
    Id,
    Email,
    HolderName,
    Balance,
    CreatedAt,
}

impl AccountSortField {
    /// All sortable fields.
    pub const ALL: [Self; 5] = [
        Self::Id,
        Self::Email,
        Self::HolderName,
        Self::Balance,
        Self::CreatedAt,
    ];

    /// Domain field name in camelCase, as exposed to callers.
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::HolderName => "holderName",
            Self::Balance => "balance",
            Self::CreatedAt => "createdAt",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Requested ordering of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountSort {
    pub field: AccountSortField,
    pub order: SortOrder,
}

impl AccountSort {
    pub const fn ascending(field: AccountSortField) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub const fn descending(field: AccountSortField) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }
}

/// Criteria for [`Find`](crate::domain::ports::Find) over accounts.
///
/// `AccountFilter::default()` matches every account. `ids: Some(vec![])`
/// is an explicit empty set and matches nothing. Adding a criterion never
/// widens the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub status: Option<AccountStatus>,
    pub email: Option<Email>,
    /// Case-sensitive prefix of the holder name.
    pub holder_name_prefix: Option<String>,
    /// Inclusive lower balance bound.
    pub min_balance: Option<i64>,
    /// Inclusive upper balance bound.
    pub max_balance: Option<i64>,
    pub ids: Option<Vec<AccountId>>,
    /// Strict lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    pub sort: Option<AccountSort>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl AccountFilter {
    /// Filter matching every account.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_holder_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.holder_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_min_balance(mut self, min_balance: i64) -> Self {
        self.min_balance = Some(min_balance);
        self
    }

    pub fn with_max_balance(mut self, max_balance: i64) -> Self {
        self.max_balance = Some(max_balance);
        self
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = AccountId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    pub fn sorted_by(mut self, sort: AccountSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Copy of this filter with ordering and pagination removed, the shape
    /// used for counting.
    pub fn without_paging(&self) -> Self {
        Self {
            sort: None,
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// True when `account` satisfies every present criterion. Ordering and
    /// pagination are not considered.
    pub fn matches(&self, account: &Account) -> bool {
        self.status.is_none_or(|status| account.status() == status)
            && self.email.as_ref().is_none_or(|email| account.email() == email)
            && self
                .holder_name_prefix
                .as_deref()
                .is_none_or(|prefix| account.holder_name().starts_with(prefix))
            && self.min_balance.is_none_or(|min| account.balance() >= min)
            && self.max_balance.is_none_or(|max| account.balance() <= max)
            && self
                .ids
                .as_ref()
                .is_none_or(|ids| ids.contains(account.id()))
            && self
                .created_after
                .is_none_or(|instant| account.created_at() > instant)
    }
}
