//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `quarry/migrations` exactly. Column names are
//! the snake_case form of the domain field names.

diesel::table! {
    /// Accounts table.
    ///
    /// `id` defaults to `gen_random_uuid()::text` for rows inserted through
    /// `Create`; `email` carries the `accounts_email_key` unique constraint.
    accounts (id) {
        id -> Text,
        email -> Text,
        holder_name -> Text,
        /// Minor currency units, checked non-negative.
        balance -> Int8,
        /// One of `active`, `frozen`, `closed`.
        status -> Text,
        created_at -> Timestamptz,
    }
}
