//! The fixed field-to-column naming convention.
//!
//! Domain field names are camelCase (or already snake_case); physical column
//! names are their snake_case form. The conversion is stable: adapters
//! declare their columns as literals and test them against this function so
//! a rename on either side is caught.

/// Convert a camelCase or PascalCase field name to its snake_case column
/// name.
///
/// Runs of capitals are treated as one word (`accountID` → `account_id`),
/// digits stay attached to the preceding word, and names that are already
/// snake_case are returned unchanged.
///
/// ```
/// use query_spec::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("holderName"), "holder_name");
/// assert_eq!(to_snake_case("createdAt"), "created_at");
/// assert_eq!(to_snake_case("balance"), "balance");
/// ```
#[must_use]
pub fn to_snake_case(field: &str) -> String {
    let chars: Vec<char> = field.chars().collect();
    let mut column = String::with_capacity(field.len() + 4);

    for (index, ch) in chars.iter().copied().enumerate() {
        if ch.is_ascii_uppercase() {
            let previous = index.checked_sub(1).and_then(|prev| chars.get(prev)).copied();
            let next = chars.get(index + 1).copied();
            let starts_word = match previous {
                None | Some('_') => false,
                Some(prev) if prev.is_ascii_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if starts_word {
                column.push('_');
            }
            column.push(ch.to_ascii_lowercase());
        } else {
            column.push(ch);
        }
    }

    column
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("id", "id")]
    #[case("holderName", "holder_name")]
    #[case("createdAt", "created_at")]
    #[case("HolderName", "holder_name")]
    #[case("accountID", "account_id")]
    #[case("HTTPStatusCode", "http_status_code")]
    #[case("address2Line", "address2_line")]
    #[case("already_snake", "already_snake")]
    fn converts_field_names(#[case] field: &str, #[case] expected: &str) {
        assert_eq!(to_snake_case(field), expected);
    }
}
