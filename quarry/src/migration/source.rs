//! Where migration scripts come from.

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};

use super::{MigrationError, MigrationScript};

/// Supplies the migration scripts known to this build or deployment.
///
/// Implementations return scripts in any order; the service sorts them and
/// rejects duplicates.
#[cfg_attr(test, mockall::automock)]
pub trait MigrationSource: Send + Sync {
    /// Load and parse every script.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Io`] when scripts cannot be read and
    /// [`MigrationError::InvalidFileName`] for a misnamed `.sql` file.
    fn scripts(&self) -> Result<Vec<MigrationScript>, MigrationError>;
}

/// Reads `*.sql` files from one directory. Other files and subdirectories
/// are ignored.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MigrationSource for DirectorySource {
    fn scripts(&self) -> Result<Vec<MigrationScript>, MigrationError> {
        let dir = Dir::open_ambient_dir(&self.path, ambient_authority())
            .map_err(|err| MigrationError::io(&self.path, err))?;
        let entries = dir
            .entries()
            .map_err(|err| MigrationError::io(&self.path, err))?;

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| MigrationError::io(&self.path, err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| MigrationError::io(&self.path, err))?;
            if !file_type.is_file() {
                continue;
            }
            let raw_name = entry.file_name();
            let Some(name) = raw_name.to_str() else {
                if Path::new(&raw_name).extension().is_some_and(|ext| ext == "sql") {
                    return Err(MigrationError::InvalidFileName {
                        name: raw_name.to_string_lossy().into_owned(),
                        reason: "file name is not valid UTF-8".to_owned(),
                    });
                }
                continue;
            };
            if !name.ends_with(".sql") {
                continue;
            }
            let sql = dir
                .read_to_string(name)
                .map_err(|err| MigrationError::io(&self.path.join(name), err))?;
            scripts.push(MigrationScript::parse(name, sql)?);
        }
        Ok(scripts)
    }
}

/// Scripts compiled into the binary as `(file name, contents)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedSource {
    files: &'static [(&'static str, &'static str)],
}

const BUNDLED: &[(&str, &str)] = &[
    (
        "V1__create_accounts.sql",
        include_str!("../../migrations/V1__create_accounts.sql"),
    ),
    (
        "V2__index_accounts_status.sql",
        include_str!("../../migrations/V2__index_accounts_status.sql"),
    ),
    (
        "R__account_summary_view.sql",
        include_str!("../../migrations/R__account_summary_view.sql"),
    ),
];

impl EmbeddedSource {
    pub const fn new(files: &'static [(&'static str, &'static str)]) -> Self {
        Self { files }
    }

    /// The migrations shipped in this crate's `migrations/` directory.
    pub const fn bundled() -> Self {
        Self::new(BUNDLED)
    }
}

impl MigrationSource for EmbeddedSource {
    fn scripts(&self) -> Result<Vec<MigrationScript>, MigrationError> {
        self.files
            .iter()
            .map(|(name, sql)| MigrationScript::parse(name, *sql))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::script::order_scripts;
    use rstest::rstest;

    fn names(scripts: &[MigrationScript]) -> Vec<&str> {
        scripts.iter().map(MigrationScript::script).collect()
    }

    #[rstest]
    fn directory_source_reads_sql_files_only() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open dir");
        dir.write("V1__init.sql", "CREATE TABLE t (id INT);").expect("write");
        dir.write("R__view.sql", "SELECT 1;").expect("write");
        dir.write("README.md", "notes").expect("write");
        dir.create_dir("V9__nested.sql").expect("mkdir");

        let scripts = DirectorySource::new(temp.path()).scripts().expect("scripts");
        let ordered = order_scripts(scripts).expect("ordered");

        assert_eq!(names(&ordered), ["V1__init.sql", "R__view.sql"]);
        assert_eq!(ordered[0].sql(), "CREATE TABLE t (id INT);");
    }

    #[rstest]
    fn directory_source_rejects_misnamed_sql() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open dir");
        dir.write("create_users.sql", "SELECT 1;").expect("write");

        let error = DirectorySource::new(temp.path())
            .scripts()
            .expect_err("misnamed file");
        assert!(matches!(error, MigrationError::InvalidFileName { name, .. } if name == "create_users.sql"));
    }

    #[rstest]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent");

        let error = DirectorySource::new(&missing).scripts().expect_err("missing dir");
        assert!(matches!(error, MigrationError::Io { .. }));
    }

    #[rstest]
    fn bundled_scripts_parse_and_order() {
        let scripts = EmbeddedSource::bundled().scripts().expect("bundled scripts");
        let ordered = order_scripts(scripts).expect("no duplicates");
        assert_eq!(
            names(&ordered),
            [
                "V1__create_accounts.sql",
                "V2__index_accounts_status.sql",
                "R__account_summary_view.sql",
            ]
        );
    }

    #[rstest]
    fn bundled_scripts_match_the_migrations_directory() {
        let on_disk = DirectorySource::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations"))
            .scripts()
            .expect("directory scripts");
        let mut on_disk: Vec<_> = on_disk
            .iter()
            .map(|script| (script.script().to_owned(), script.checksum().to_owned()))
            .collect();
        let mut bundled: Vec<_> = EmbeddedSource::bundled()
            .scripts()
            .expect("bundled scripts")
            .iter()
            .map(|script| (script.script().to_owned(), script.checksum().to_owned()))
            .collect();
        on_disk.sort();
        bundled.sort();
        assert_eq!(on_disk, bundled);
    }
}
