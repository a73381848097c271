//! Query-specification view of the `accounts` table.

use query_spec::{Column, SortDirection, Specification, Table};

use crate::domain::{AccountFilter, AccountId, AccountSortField, SortOrder};

/// Persisted account fields and their physical columns.
///
/// Column names follow the fixed convention: the snake_case form of the
/// camelCase domain field (`holderName` → `holder_name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccountColumn {
    Id,
    Email,
    HolderName,
    Balance,
    Status,
    CreatedAt,
}

impl AccountColumn {
    pub(crate) const ALL: [Self; 6] = [
        Self::Id,
        Self::Email,
        Self::HolderName,
        Self::Balance,
        Self::Status,
        Self::CreatedAt,
    ];

    pub(crate) const fn field_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::HolderName => "holderName",
            Self::Balance => "balance",
            Self::Status => "status",
            Self::CreatedAt => "createdAt",
        }
    }

    pub(crate) const fn column(self) -> Column {
        match self {
            Self::Id => ID,
            Self::Email => EMAIL,
            Self::HolderName => HOLDER_NAME,
            Self::Balance => BALANCE,
            Self::Status => STATUS,
            Self::CreatedAt => CREATED_AT,
        }
    }
}

impl From<AccountSortField> for AccountColumn {
    fn from(field: AccountSortField) -> Self {
        match field {
            AccountSortField::Id => Self::Id,
            AccountSortField::Email => Self::Email,
            AccountSortField::HolderName => Self::HolderName,
            AccountSortField::Balance => Self::Balance,
            AccountSortField::CreatedAt => Self::CreatedAt,
        }
    }
}

const ID: Column = Column::new("id");
const EMAIL: Column = Column::new("email");
const HOLDER_NAME: Column = Column::new("holder_name");
const BALANCE: Column = Column::new("balance");
const STATUS: Column = Column::new("status");
const CREATED_AT: Column = Column::new("created_at");

/// The `accounts` table projected in [`AccountRecord`](super::models::AccountRecord)
/// field order.
pub(crate) const ACCOUNTS: Table = Table::new(
    "accounts",
    &[ID, EMAIL, HOLDER_NAME, BALANCE, STATUS, CREATED_AT],
);

/// Translate a filter into a specification. Absent criteria add no
/// predicate; without an explicit sort rows come back in id order.
pub(crate) fn account_specification(filter: &AccountFilter) -> Specification {
    let spec = Specification::select(ACCOUNTS)
        .and_where(filter.status.map(|status| STATUS.equals(status.as_str())))
        .and_where(filter.email.as_ref().map(|email| EMAIL.equals(email.as_str())))
        .and_where(
            filter
                .holder_name_prefix
                .as_deref()
                .map(|prefix| HOLDER_NAME.starts_with(prefix)),
        )
        .and_where(filter.min_balance.map(|min| BALANCE.gte(min)))
        .and_where(filter.max_balance.map(|max| BALANCE.lte(max)))
        .and_where(
            filter
                .ids
                .as_ref()
                .map(|ids| ID.one_of(ids.iter().map(AccountId::as_str))),
        )
        .and_where(filter.created_after.map(|instant| CREATED_AT.gt(instant)));

    let spec = match filter.sort {
        Some(sort) => spec.order_by(
            AccountColumn::from(sort.field).column(),
            match sort.order {
                SortOrder::Ascending => SortDirection::Asc,
                SortOrder::Descending => SortDirection::Desc,
            },
        ),
        None => spec.order_by(ID, SortDirection::Asc),
    };
    let spec = match filter.limit {
        Some(rows) => spec.limit(rows),
        None => spec,
    };
    match filter.offset {
        Some(rows) => spec.offset(rows),
        None => spec,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use query_spec::SqlValue;
    use query_spec::naming::to_snake_case;

    use super::*;
    use crate::domain::{AccountSort, AccountStatus, Email};
    use rstest::rstest;

    #[rstest]
    fn columns_follow_the_snake_case_convention() {
        for column in AccountColumn::ALL {
            assert_eq!(column.column().name(), to_snake_case(column.field_name()));
        }
    }

    #[rstest]
    fn every_sort_field_names_a_projected_column() {
        for field in AccountSortField::ALL {
            let column = AccountColumn::from(field);
            assert_eq!(column.field_name(), field.field_name());
            assert!(ACCOUNTS.columns().contains(&column.column()));
        }
    }

    #[rstest]
    fn empty_filter_scans_in_id_order() {
        let query = account_specification(&AccountFilter::all()).build();
        insta::assert_snapshot!(
            query.sql(),
            @r#"SELECT "id", "email", "holder_name", "balance", "status", "created_at" FROM "accounts" ORDER BY "id" ASC"#
        );
        assert!(query.binds().is_empty());
    }

    #[rstest]
    fn every_criterion_becomes_a_bound_predicate() {
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid instant");
        let filter = AccountFilter::all()
            .with_status(AccountStatus::Active)
            .with_email(Email::new("ada@example.com").expect("valid email"))
            .with_holder_name_prefix("Ada_")
            .with_min_balance(10)
            .with_max_balance(20)
            .with_ids([AccountId::new("A1").expect("valid id")])
            .with_created_after(after)
            .sorted_by(AccountSort::descending(AccountSortField::HolderName))
            .with_limit(5)
            .with_offset(15);

        let query = account_specification(&filter).build();

        insta::assert_snapshot!(
            query.sql(),
            @r#"SELECT "id", "email", "holder_name", "balance", "status", "created_at" FROM "accounts" WHERE "status" = $1 AND "email" = $2 AND "holder_name" LIKE $3 ESCAPE '\' AND "balance" >= $4 AND "balance" <= $5 AND "id" IN ($6) AND "created_at" > $7 ORDER BY "holder_name" DESC LIMIT $8 OFFSET $9"#
        );
        assert_eq!(
            query.binds(),
            &[
                SqlValue::from("active"),
                SqlValue::from("ada@example.com"),
                SqlValue::from("Ada\\_%"),
                SqlValue::BigInt(10),
                SqlValue::BigInt(20),
                SqlValue::from("A1"),
                SqlValue::Timestamp(after),
                SqlValue::BigInt(5),
                SqlValue::BigInt(15),
            ]
        );
    }

    #[rstest]
    fn explicit_empty_id_set_renders_false() {
        let filter = AccountFilter::all().with_ids(Vec::new());
        let query = account_specification(&filter).build();
        assert!(query.sql().contains("WHERE FALSE"));
    }

    #[rstest]
    fn count_drops_ordering_and_pagination() {
        let filter = AccountFilter::all()
            .with_status(AccountStatus::Closed)
            .with_limit(1);
        let query = account_specification(&filter).build_count();
        assert_eq!(
            query.sql(),
            r#"SELECT COUNT(*) AS "count" FROM "accounts" WHERE "status" = $1"#
        );
    }
}
