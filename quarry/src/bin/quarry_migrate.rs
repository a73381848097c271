#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! Apply, inspect or reset the database schema.
//!
//! Settings come from `QUARRY_*` variables (see `quarry::config`).
//!
//! ```sh
//! QUARRY_DATABASE_URL=postgres://app@localhost/app quarry-migrate migrate
//! ```

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use quarry::config::QuarrySettings;
use quarry::migration::{
    DirectorySource, EmbeddedSource, MigrationInfo, MigrationService, MigrationSource,
};
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `quarry-migrate` command arguments.
#[derive(Debug, Parser)]
#[command(name = "quarry-migrate", about = "Manage quarry schema migrations", version)]
struct CliArgs {
    /// Overrides `QUARRY_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Apply pending versioned and changed repeatable migrations.
    Migrate,
    /// Check applied migrations against the scripts on hand.
    Validate,
    /// List every migration and its state.
    Info,
    /// Drop and recreate the schema. Requires `QUARRY_CLEAN_ENABLED=true`.
    Clean,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = QuarrySettings::load_from_iter([OsString::from("quarry-migrate")])
        .wrap_err("failed to load QUARRY_* settings")?;
    let database_url = match args.database_url {
        Some(url) => url,
        None => settings.database_url()?.to_owned(),
    };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;

    match &settings.migrations_dir {
        Some(dir) => runtime.block_on(run(
            args.command,
            MigrationService::new(
                database_url,
                settings.migration_config(),
                DirectorySource::new(dir),
            ),
        )),
        None => runtime.block_on(run(
            args.command,
            MigrationService::new(
                database_url,
                settings.migration_config(),
                EmbeddedSource::bundled(),
            ),
        )),
    }
}

async fn run<S: MigrationSource>(command: Command, service: MigrationService<S>) -> Result<()> {
    let schema = service.config().schema().to_owned();
    match command {
        Command::Migrate => {
            let report = service
                .migrate()
                .await
                .wrap_err_with(|| format!("migrating schema {schema}"))?;
            for script in report.applied() {
                println!("applied {script}");
            }
            println!(
                "schema {schema} at version {}",
                report.schema_version().unwrap_or("<none>")
            );
        }
        Command::Validate => {
            service
                .validate()
                .await
                .wrap_err_with(|| format!("validating schema {schema}"))?;
            println!("schema {schema} history is valid");
        }
        Command::Info => {
            let rows = service
                .info()
                .await
                .wrap_err_with(|| format!("describing schema {schema}"))?;
            print_info(&rows);
        }
        Command::Clean => {
            service
                .clean()
                .await
                .wrap_err_with(|| format!("cleaning schema {schema}"))?;
            info!(schema = %schema, "clean finished");
            println!("schema {schema} cleaned");
        }
    }
    Ok(())
}

fn print_info(rows: &[MigrationInfo]) {
    println!("{:<10} {:<16} {:<40} installed on", "version", "state", "description");
    for row in rows {
        let installed_on = row
            .installed_on
            .map(|instant| instant.to_rfc3339())
            .unwrap_or_default();
        println!(
            "{:<10} {:<16} {:<40} {installed_on}",
            row.version.as_deref().unwrap_or("R"),
            format!("{:?}", row.state),
            row.description,
        );
    }
}
