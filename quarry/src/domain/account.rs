//! Account aggregate.
//!
//! Accounts are immutable values: constructors validate every invariant and
//! state changes return new instances. Persisted field names map to columns
//! through the snake_case convention (`holderName` → `holder_name`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_ID_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;
const MAX_HOLDER_NAME_LEN: usize = 120;

/// Validation errors raised by account constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyId,
    IdTooLong { max: usize },
    InvalidIdCharacters,
    InvalidEmail,
    EmailTooLong { max: usize },
    EmptyHolderName,
    HolderNameTooLong { max: usize },
    NegativeBalance { balance: i64 },
    UnknownStatus { value: String },
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "account id must not be empty"),
            Self::IdTooLong { max } => write!(f, "account id must be at most {max} characters"),
            Self::InvalidIdCharacters => write!(
                f,
                "account id may only contain ASCII letters, digits, '-' or '_'",
            ),
            Self::InvalidEmail => write!(f, "email must look like local@domain"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
            Self::EmptyHolderName => write!(f, "holder name must not be empty"),
            Self::HolderNameTooLong { max } => {
                write!(f, "holder name must be at most {max} characters")
            }
            Self::NegativeBalance { balance } => {
                write!(f, "balance must not be negative (got {balance})")
            }
            Self::UnknownStatus { value } => write!(f, "unknown account status '{value}'"),
        }
    }
}

impl std::error::Error for AccountValidationError {}

/// Account identifier.
///
/// Either generated by storage on create or chosen by the caller on save.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validate and construct an [`AccountId`].
    pub fn new(id: impl Into<String>) -> Result<Self, AccountValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(AccountValidationError::EmptyId);
        }
        if id.len() > MAX_ID_LEN {
            return Err(AccountValidationError::IdTooLong { max: MAX_ID_LEN });
        }
        if !id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(AccountValidationError::InvalidIdCharacters);
        }
        Ok(Self(id))
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

/// Normalised (trimmed, lower-cased) email address; the account business
/// key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Normalise and validate an email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.len() > MAX_EMAIL_LEN {
            return Err(AccountValidationError::EmailTooLong { max: MAX_EMAIL_LEN });
        }
        let mut parts = normalised.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AccountValidationError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || normalised.chars().any(char::is_whitespace) {
            return Err(AccountValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }

    /// Borrow the normalised address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    /// Stable storage spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = AccountValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "frozen" => Ok(Self::Frozen),
            "closed" => Ok(Self::Closed),
            other => Err(AccountValidationError::UnknownStatus {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_holder_name(raw: String) -> Result<String, AccountValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AccountValidationError::EmptyHolderName);
    }
    if trimmed.chars().count() > MAX_HOLDER_NAME_LEN {
        return Err(AccountValidationError::HolderNameTooLong {
            max: MAX_HOLDER_NAME_LEN,
        });
    }
    if trimmed.len() == raw.len() {
        Ok(raw)
    } else {
        Ok(trimmed.to_owned())
    }
}

fn validate_balance(balance: i64) -> Result<i64, AccountValidationError> {
    if balance < 0 {
        return Err(AccountValidationError::NegativeBalance { balance });
    }
    Ok(balance)
}

/// Input for [`Account::new`].
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub id: AccountId,
    pub email: Email,
    pub holder_name: String,
    pub balance: i64,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// A persisted account.
///
/// ## Invariants
/// - `holder_name` is trimmed, non-empty and at most 120 characters.
/// - `balance` (minor currency units) is never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    email: Email,
    holder_name: String,
    balance: i64,
    status: AccountStatus,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Validate a draft into an account.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use quarry::domain::{Account, AccountDraft, AccountId, AccountStatus, Email};
    ///
    /// let account = Account::new(AccountDraft {
    ///     id: AccountId::new("A1").expect("valid id"),
    ///     email: Email::new("ada@example.com").expect("valid email"),
    ///     holder_name: "Ada Lovelace".to_owned(),
    ///     balance: 100,
    ///     status: AccountStatus::Active,
    ///     created_at: Utc::now(),
    /// })
    /// .expect("valid account");
    ///
    /// let topped_up = account.clone().with_balance(150).expect("valid balance");
    /// assert_eq!(account.balance(), 100);
    /// assert_eq!(topped_up.balance(), 150);
    /// ```
    pub fn new(draft: AccountDraft) -> Result<Self, AccountValidationError> {
        let AccountDraft {
            id,
            email,
            holder_name,
            balance,
            status,
            created_at,
        } = draft;
        Ok(Self {
            id,
            email,
            holder_name: validate_holder_name(holder_name)?,
            balance: validate_balance(balance)?,
            status,
            created_at,
        })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Return a copy carrying `balance`.
    pub fn with_balance(self, balance: i64) -> Result<Self, AccountValidationError> {
        Ok(Self {
            balance: validate_balance(balance)?,
            ..self
        })
    }

    /// Return a copy carrying `status`.
    pub fn with_status(self, status: AccountStatus) -> Self {
        Self { status, ..self }
    }

    /// Return a copy carrying `email`.
    pub fn with_email(self, email: Email) -> Self {
        Self { email, ..self }
    }
}

/// Creation input: an account without its storage-generated `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInit {
    email: Email,
    holder_name: String,
    balance: i64,
    status: AccountStatus,
}

impl AccountInit {
    /// Validate creation input.
    pub fn new(
        email: Email,
        holder_name: impl Into<String>,
        balance: i64,
        status: AccountStatus,
    ) -> Result<Self, AccountValidationError> {
        Ok(Self {
            email,
            holder_name: validate_holder_name(holder_name.into())?,
            balance: validate_balance(balance)?,
            status,
        })
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    /// Attach generated fields, yielding the full account.
    pub fn into_account(self, id: AccountId, created_at: DateTime<Utc>) -> Account {
        Account {
            id,
            email: self.email,
            holder_name: self.holder_name,
            balance: self.balance,
            status: self.status,
            created_at,
        }
    }
}
