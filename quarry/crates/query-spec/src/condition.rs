//! Columns and the typed predicates built from them.

use crate::value::SqlValue;

/// A column identifier from a statically known schema.
///
/// Identifiers are always rendered double-quoted with embedded quotes
/// doubled, so a column name can never terminate the identifier early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column(&'static str);

impl Column {
    /// Declare a column by its physical name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The physical column name, unquoted.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }

    /// The column rendered as a quoted SQL identifier.
    #[must_use]
    pub fn quoted(self) -> String {
        quote_identifier(self.0)
    }

    /// `column = value`.
    #[must_use]
    pub fn equals(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::Eq, value)
    }

    /// `column <> value`.
    #[must_use]
    pub fn not_equals(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::NotEq, value)
    }

    /// `column < value`.
    #[must_use]
    pub fn lt(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::Lt, value)
    }

    /// `column <= value`.
    #[must_use]
    pub fn lte(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::Lte, value)
    }

    /// `column > value`.
    #[must_use]
    pub fn gt(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::Gt, value)
    }

    /// `column >= value`.
    #[must_use]
    pub fn gte(self, value: impl Into<SqlValue>) -> Condition {
        self.compare(Comparison::Gte, value)
    }

    /// `column IN (values…)`. An empty set matches no rows.
    #[must_use]
    pub fn one_of<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::In {
            column: self,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column IS NULL`.
    #[must_use]
    pub const fn is_null(self) -> Condition {
        Condition::IsNull(self)
    }

    /// `column IS NOT NULL`.
    #[must_use]
    pub const fn is_not_null(self) -> Condition {
        Condition::IsNotNull(self)
    }

    /// Case-sensitive prefix match. `%`, `_` and `\` in `prefix` match
    /// literally.
    #[must_use]
    pub fn starts_with(self, prefix: impl Into<String>) -> Condition {
        Condition::StartsWith {
            column: self,
            prefix: prefix.into(),
        }
    }

    fn compare(self, op: Comparison, value: impl Into<SqlValue>) -> Condition {
        Condition::Compare {
            column: self,
            op,
            value: value.into(),
        }
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl Comparison {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// A single typed predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `column <op> $n`.
    Compare {
        /// Constrained column.
        column: Column,
        /// Comparison operator.
        op: Comparison,
        /// Bound right-hand side.
        value: SqlValue,
    },
    /// `column IN ($n, …)`.
    In {
        /// Constrained column.
        column: Column,
        /// Accepted values; empty matches nothing.
        values: Vec<SqlValue>,
    },
    /// `column IS NULL`.
    IsNull(Column),
    /// `column IS NOT NULL`.
    IsNotNull(Column),
    /// `column LIKE $n ESCAPE '\'` with a literal prefix.
    StartsWith {
        /// Constrained column.
        column: Column,
        /// Literal prefix, escaped before binding.
        prefix: String,
    },
    /// Disjunction of the nested conditions; empty matches nothing.
    Any(Vec<Condition>),
}

impl Condition {
    /// Build a disjunction.
    #[must_use]
    pub fn any(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    pub(crate) fn render(&self, sql: &mut String, binds: &mut Vec<SqlValue>) {
        match self {
            Self::Compare { column, op, value } => {
                sql.push_str(&column.quoted());
                sql.push(' ');
                sql.push_str(op.symbol());
                sql.push(' ');
                push_placeholder(sql, binds, value.clone());
            }
            Self::In { values, .. } if values.is_empty() => sql.push_str("FALSE"),
            Self::In { column, values } => {
                sql.push_str(&column.quoted());
                sql.push_str(" IN (");
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(", ");
                    }
                    push_placeholder(sql, binds, value.clone());
                }
                sql.push(')');
            }
            Self::IsNull(column) => {
                sql.push_str(&column.quoted());
                sql.push_str(" IS NULL");
            }
            Self::IsNotNull(column) => {
                sql.push_str(&column.quoted());
                sql.push_str(" IS NOT NULL");
            }
            Self::StartsWith { column, prefix } => {
                sql.push_str(&column.quoted());
                sql.push_str(" LIKE ");
                push_placeholder(sql, binds, SqlValue::Text(like_prefix_pattern(prefix)));
                sql.push_str(" ESCAPE '\\'");
            }
            Self::Any(conditions) if conditions.is_empty() => sql.push_str("FALSE"),
            Self::Any(conditions) => {
                sql.push('(');
                for (index, condition) in conditions.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" OR ");
                    }
                    condition.render(sql, binds);
                }
                sql.push(')');
            }
        }
    }
}

pub(crate) fn push_placeholder(sql: &mut String, binds: &mut Vec<SqlValue>, value: SqlValue) {
    binds.push(value);
    sql.push('$');
    sql.push_str(&binds.len().to_string());
}

/// Render `name` as a double-quoted SQL identifier, doubling embedded quotes.
///
/// ```
/// assert_eq!(query_spec::quote_identifier("ledger"), "\"ledger\"");
/// ```
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
