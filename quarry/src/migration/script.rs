//! Migration scripts, their file-name grammar and checksums.
//!
//! - `V{version}__{description}.sql` is applied once, in version order.
//!   Versions are numbers separated by `.` or `_` and compare numerically
//!   segment by segment, so `V1_10` sorts after `V1_9` and `V1.0` equals `V1`.
//! - `R__{description}.sql` is reapplied whenever its checksum changes.
//!
//! Underscores in descriptions render as spaces.

use std::cmp::Ordering;
use std::fmt;

use sha2::{Digest, Sha256};

use super::MigrationError;

/// A numeric, multi-segment migration version.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
    text: String,
}

impl Version {
    /// Parse version text such as `1`, `1.2` or `2_0_1`.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut segments = text
            .split(['.', '_'])
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
                    return None;
                }
                segment.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()?;
        while segments.len() > 1 && segments.last() == Some(&0) {
            segments.pop();
        }
        Some(Self {
            segments,
            text: text.to_owned(),
        })
    }

    /// The version as written in the file name.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Whether a script runs once or on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationKind {
    Versioned(Version),
    Repeatable,
}

impl MigrationKind {
    /// Storage spelling used in the history table.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Versioned(_) => "versioned",
            Self::Repeatable => "repeatable",
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Versioned(version) => Some(version),
            Self::Repeatable => None,
        }
    }
}

/// One parsed migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    kind: MigrationKind,
    description: String,
    script: String,
    sql: String,
    checksum: String,
}

impl MigrationScript {
    /// Parse `file_name` and fingerprint `sql`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::InvalidFileName`] when the name does not
    /// follow the versioned or repeatable pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::migration::{MigrationKind, MigrationScript};
    ///
    /// let script = MigrationScript::parse("V1_2__add_status_index.sql", "SELECT 1;")?;
    /// assert_eq!(script.description(), "add status index");
    /// assert_eq!(script.kind().version().map(|v| v.as_str()), Some("1_2"));
    /// # Ok::<(), quarry::migration::MigrationError>(())
    /// ```
    pub fn parse(file_name: &str, sql: impl Into<String>) -> Result<Self, MigrationError> {
        let invalid = |reason: &str| MigrationError::InvalidFileName {
            name: file_name.to_owned(),
            reason: reason.to_owned(),
        };

        let stem = file_name
            .strip_suffix(".sql")
            .ok_or_else(|| invalid("expected a .sql extension"))?;
        let (prefix, description) = stem
            .split_once("__")
            .ok_or_else(|| invalid("expected '__' between prefix and description"))?;
        if description.is_empty() {
            return Err(invalid("description must not be empty"));
        }

        let kind = if prefix == "R" {
            MigrationKind::Repeatable
        } else if let Some(version) = prefix.strip_prefix('V') {
            MigrationKind::Versioned(
                Version::parse(version).ok_or_else(|| invalid("version must be numeric"))?,
            )
        } else {
            return Err(invalid("expected a 'V<version>' or 'R' prefix"));
        };

        let sql = sql.into();
        Ok(Self {
            kind,
            description: description.replace('_', " "),
            script: file_name.to_owned(),
            checksum: checksum(&sql),
            sql,
        })
    }

    pub fn kind(&self) -> &MigrationKind {
        &self.kind
    }

    pub fn version(&self) -> Option<&Version> {
        self.kind.version()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// File name the script was loaded from.
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Lower-case hex SHA-256 of the normalised script text.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// SHA-256 of `sql` with `\r\n` line endings folded to `\n`, so a checkout
/// with different line-ending settings does not look like a tampered file.
pub fn checksum(sql: &str) -> String {
    let normalised = sql.replace("\r\n", "\n");
    hex::encode(Sha256::digest(normalised.as_bytes()))
}

/// Order scripts for application (versioned ascending, then repeatables by
/// description) and reject duplicates.
pub(crate) fn order_scripts(
    mut scripts: Vec<MigrationScript>,
) -> Result<Vec<MigrationScript>, MigrationError> {
    scripts.sort_by(|left, right| match (left.version(), right.version()) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.description.cmp(&right.description),
    });

    for pair in scripts.windows(2) {
        let [first, second] = pair else { continue };
        match (first.version(), second.version()) {
            (Some(a), Some(b)) if a == b => {
                return Err(MigrationError::DuplicateVersion {
                    version: b.to_string(),
                    scripts: vec![first.script.clone(), second.script.clone()],
                });
            }
            (None, None) if first.description == second.description => {
                return Err(MigrationError::DuplicateRepeatable {
                    description: second.description.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("V1__init.sql", Some("1"), "init")]
    #[case("V1_10__wide_index.sql", Some("1_10"), "wide index")]
    #[case("V2.3.4__tidy_up.sql", Some("2.3.4"), "tidy up")]
    #[case("R__account_summary_view.sql", None, "account summary view")]
    fn parses_valid_names(
        #[case] name: &str,
        #[case] version: Option<&str>,
        #[case] description: &str,
    ) {
        let script = MigrationScript::parse(name, "SELECT 1;").expect("valid name");
        assert_eq!(script.version().map(Version::as_str), version);
        assert_eq!(script.description(), description);
        assert_eq!(script.script(), name);
    }

    #[rstest]
    #[case("V1__init.txt")]
    #[case("V1_init.sql")]
    #[case("Vx__init.sql")]
    #[case("V__init.sql")]
    #[case("V1..2__init.sql")]
    #[case("U1__undo.sql")]
    #[case("R__.sql")]
    fn rejects_malformed_names(#[case] name: &str) {
        let error = MigrationScript::parse(name, "").expect_err("malformed name");
        assert!(matches!(error, MigrationError::InvalidFileName { .. }));
    }

    #[rstest]
    #[case("1_9", "1_10", Ordering::Less)]
    #[case("2", "10", Ordering::Less)]
    #[case("1.0", "1", Ordering::Equal)]
    #[case("1.1", "1_1", Ordering::Equal)]
    #[case("3", "2.99", Ordering::Greater)]
    fn versions_compare_numerically(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: Ordering,
    ) {
        let left = Version::parse(left).expect("valid version");
        let right = Version::parse(right).expect("valid version");
        assert_eq!(left.cmp(&right), expected);
    }

    #[rstest]
    fn checksum_ignores_line_ending_style() {
        assert_eq!(checksum("SELECT 1;\r\nSELECT 2;\r\n"), checksum("SELECT 1;\nSELECT 2;\n"));
        assert_ne!(checksum("SELECT 1;"), checksum("SELECT 2;"));
        assert_eq!(checksum("").len(), 64);
    }

    #[rstest]
    fn ordering_puts_versions_first_then_repeatables() {
        let scripts = ["R__b.sql", "V1_10__c.sql", "R__a.sql", "V1_9__d.sql", "V2__e.sql"]
            .into_iter()
            .map(|name| MigrationScript::parse(name, "").expect("valid name"))
            .collect();
        let ordered = order_scripts(scripts).expect("no duplicates");
        let names: Vec<_> = ordered.iter().map(MigrationScript::script).collect();
        assert_eq!(
            names,
            ["V1_9__d.sql", "V1_10__c.sql", "V2__e.sql", "R__a.sql", "R__b.sql"]
        );
    }

    #[rstest]
    fn duplicate_versions_are_rejected() {
        let scripts = vec![
            MigrationScript::parse("V1__a.sql", "").expect("valid name"),
            MigrationScript::parse("V1.0__b.sql", "").expect("valid name"),
        ];
        let error = order_scripts(scripts).expect_err("duplicate version");
        assert!(matches!(error, MigrationError::DuplicateVersion { .. }));
    }

    #[rstest]
    fn duplicate_repeatables_are_rejected() {
        let scripts = vec![
            MigrationScript::parse("R__same_name.sql", "").expect("valid name"),
            MigrationScript::parse("R__same name.sql", "").expect("valid name"),
        ];
        let error = order_scripts(scripts).expect_err("duplicate description");
        assert_eq!(
            error,
            MigrationError::DuplicateRepeatable {
                description: "same name".to_owned()
            }
        );
    }
}
