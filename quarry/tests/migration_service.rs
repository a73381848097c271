//! Migration service behaviour on embedded PostgreSQL.

use cap_std::{ambient_authority, fs::Dir};
use quarry::migration::{
    DirectorySource, EmbeddedSource, MigrationConfig, MigrationError, MigrationService,
    MigrationState,
};
use quarry::test_support::EphemeralDatabase;
use rstest::{fixture, rstest};
use tempfile::TempDir;

mod support;

use support::{fresh_database, query_scalar};

struct Scripts {
    dir: Dir,
    temp: TempDir,
}

impl Scripts {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open dir");
        Self { dir, temp }
    }

    fn write(&self, name: &str, sql: &str) {
        self.dir.write(name, sql).expect("write script");
    }

    fn remove(&self, name: &str) {
        self.dir.remove_file(name).expect("remove script");
    }

    fn source(&self) -> DirectorySource {
        DirectorySource::new(self.temp.path())
    }
}

fn history_rows(db: &EphemeralDatabase) -> i64 {
    query_scalar(db.url(), "SELECT COUNT(*) FROM schema_history").expect("history count")
}

fn table_count(db: &EphemeralDatabase, table: &str) -> i64 {
    query_scalar(
        db.url(),
        &format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = '{table}'"
        ),
    )
    .expect("table lookup")
}

#[fixture]
fn database() -> Option<EphemeralDatabase> {
    fresh_database()
}

#[rstest]
fn bundled_migrations_apply_once(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let service = db.migration_service(EmbeddedSource::bundled());

    let first = db.block_on(service.migrate()).expect("first migrate");
    assert_eq!(
        first.applied(),
        [
            "V1__create_accounts.sql",
            "V2__index_accounts_status.sql",
            "R__account_summary_view.sql",
        ]
    );
    assert_eq!(first.schema_version(), Some("2"));

    let second = db.block_on(service.migrate()).expect("second migrate");
    assert!(second.is_up_to_date());
    assert_eq!(second.schema_version(), Some("2"));
    assert_eq!(history_rows(&db), 3);

    db.block_on(service.validate()).expect("history is valid");
    let info = db.block_on(service.info()).expect("info");
    assert!(info.iter().all(|row| row.state == MigrationState::Applied));
}

#[rstest]
fn tampered_script_is_rejected(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let scripts = Scripts::new();
    scripts.write("V1__create_t.sql", "CREATE TABLE t (id INT);");
    let service = db.migration_service(scripts.source());
    db.block_on(service.migrate()).expect("initial migrate");

    scripts.write("V1__create_t.sql", "CREATE TABLE t (id BIGINT);");

    let error = db.block_on(service.migrate()).expect_err("tampered script");
    assert!(matches!(error, MigrationError::ChecksumMismatch { ref script, .. } if script == "V1__create_t.sql"));
    let error = db.block_on(service.validate()).expect_err("tampered script");
    assert!(matches!(error, MigrationError::ChecksumMismatch { .. }));
    let info = db.block_on(service.info()).expect("info");
    assert_eq!(info[0].state, MigrationState::ChecksumMismatch);
    assert_eq!(history_rows(&db), 1);
}

#[rstest]
fn changed_repeatable_runs_again(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let scripts = Scripts::new();
    scripts.write("V1__create_t.sql", "CREATE TABLE t (id INT);");
    scripts.write("R__t_view.sql", "CREATE OR REPLACE VIEW t_view AS SELECT id FROM t;");
    let service = db.migration_service(scripts.source());
    db.block_on(service.migrate()).expect("initial migrate");

    scripts.write(
        "R__t_view.sql",
        "CREATE OR REPLACE VIEW t_view AS SELECT id, id * 2 AS doubled FROM t;",
    );
    let info = db.block_on(service.info()).expect("info");
    assert_eq!(info[1].state, MigrationState::Stale);

    let report = db.block_on(service.migrate()).expect("reapply");
    assert_eq!(report.applied(), ["R__t_view.sql"]);
    assert_eq!(history_rows(&db), 3);
    assert!(db.block_on(service.migrate()).expect("no-op").is_up_to_date());
}

#[rstest]
fn failing_script_is_rolled_back_and_stops_the_run(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let scripts = Scripts::new();
    scripts.write("V1__create_t.sql", "CREATE TABLE t (id INT);");
    scripts.write(
        "V2__broken.sql",
        "CREATE TABLE t2 (id INT); INSERT INTO no_such_table VALUES (1);",
    );
    scripts.write("V3__create_t3.sql", "CREATE TABLE t3 (id INT);");
    let service = db.migration_service(scripts.source());

    let error = db.block_on(service.migrate()).expect_err("broken script");

    assert!(matches!(error, MigrationError::ScriptFailed { ref script, .. } if script == "V2__broken.sql"));
    assert_eq!(table_count(&db, "t"), 1);
    assert_eq!(table_count(&db, "t2"), 0);
    assert_eq!(table_count(&db, "t3"), 0);
    assert_eq!(history_rows(&db), 1);
}

#[rstest]
fn history_must_match_the_source(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let scripts = Scripts::new();
    scripts.write("V2__create_t.sql", "CREATE TABLE t (id INT);");
    let service = db.migration_service(scripts.source());
    db.block_on(service.migrate()).expect("initial migrate");

    scripts.write("V1__late.sql", "CREATE TABLE late (id INT);");
    let error = db.block_on(service.migrate()).expect_err("out of order");
    assert_eq!(
        error,
        MigrationError::OutOfOrder {
            script: "V1__late.sql".to_owned(),
            latest: "2".to_owned(),
        }
    );

    scripts.remove("V1__late.sql");
    scripts.remove("V2__create_t.sql");
    let error = db.block_on(service.validate()).expect_err("missing script");
    assert_eq!(
        error,
        MigrationError::MissingScript {
            script: "V2__create_t.sql".to_owned()
        }
    );
}

#[rstest]
fn clean_requires_opt_in_and_resets_the_schema(database: Option<EphemeralDatabase>) {
    let Some(db) = database else {
        return;
    };
    let guarded = MigrationService::new(
        db.url(),
        MigrationConfig::default(),
        EmbeddedSource::bundled(),
    );
    db.block_on(guarded.migrate()).expect("migrate");

    let error = db.block_on(guarded.clean()).expect_err("clean disabled");
    assert_eq!(error, MigrationError::CleanDisabled);
    assert_eq!(table_count(&db, "accounts"), 1);

    let service = db.migration_service(EmbeddedSource::bundled());
    db.block_on(service.clean()).expect("clean");
    assert_eq!(table_count(&db, "accounts"), 0);
    assert_eq!(table_count(&db, "schema_history"), 0);

    let info = db.block_on(service.info()).expect("info after clean");
    assert!(info.iter().all(|row| row.state == MigrationState::Pending));
}
