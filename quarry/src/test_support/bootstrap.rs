//! Embedded PostgreSQL bootstrap with workspace-local directories.
//!
//! `pg-embed-setup-unpriv` installs into `/var/tmp` by default, which
//! sandboxed runners may not allow. When `PG_RUNTIME_DIR` or `PG_DATA_DIR`
//! is unset both are pointed at a fresh directory under the target dir for
//! the duration of the bootstrap.

use std::path::PathBuf;
use std::time::Duration;

use cap_std::{ambient_authority, fs::Dir};
use pg_embedded_setup_unpriv::TestCluster;
use uuid::Uuid;

const MAX_RETRIES: u32 = 3;

/// Doubles with each retry.
const RETRY_DELAY_MS: u64 = 500;

fn pg_embed_target_dir() -> PathBuf {
    if let Some(target_dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return PathBuf::from(target_dir).join("pg-embed");
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("target")
        .join("pg-embed")
}

fn create_unique_dirs() -> Result<(PathBuf, PathBuf), std::io::Error> {
    let unique = format!("bootstrap-{}-{}", std::process::id(), Uuid::new_v4());
    let base = pg_embed_target_dir().join(unique);
    let runtime_dir = base.join("install");
    let data_dir = base.join("data");

    Dir::create_ambient_dir_all(&runtime_dir, ambient_authority())?;
    Dir::create_ambient_dir_all(&data_dir, ambient_authority())?;

    Ok((runtime_dir, data_dir))
}

/// Whether a bootstrap failure looks like a flaky download or socket.
pub(super) fn is_transient_error(err: &str) -> bool {
    const PATTERNS: [&str; 9] = [
        "error decoding response body",
        "connection reset",
        "connection refused",
        "timeout",
        "timed out",
        "temporarily unavailable",
        "network unreachable",
        "dns error",
        "failed to lookup",
    ];

    let err_lower = err.to_lowercase();
    PATTERNS.iter().any(|pattern| err_lower.contains(pattern))
}

/// Start a [`TestCluster`], retrying transient failures with backoff.
pub(super) fn start_cluster() -> Result<TestCluster, String> {
    let needs_override =
        std::env::var_os("PG_RUNTIME_DIR").is_none() || std::env::var_os("PG_DATA_DIR").is_none();

    let _env_guard = if needs_override {
        let (runtime_dir, data_dir) = create_unique_dirs().map_err(|err| err.to_string())?;
        Some(env_lock::lock_env([
            ("PG_RUNTIME_DIR", Some(runtime_dir.to_string_lossy().into_owned())),
            ("PG_DATA_DIR", Some(data_dir.to_string_lossy().into_owned())),
        ]))
    } else {
        None
    };

    let mut last_error = String::new();
    for attempt in 0..=MAX_RETRIES {
        match TestCluster::new() {
            Ok(cluster) => return Ok(cluster),
            Err(err) => {
                last_error = format!("{err:?}");
                if attempt < MAX_RETRIES && is_transient_error(&last_error) {
                    let delay = Duration::from_millis(RETRY_DELAY_MS * (1 << attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = MAX_RETRIES + 1,
                        ?delay,
                        error = %last_error,
                        "embedded PostgreSQL bootstrap failed; retrying"
                    );
                    std::thread::sleep(delay);
                } else {
                    break;
                }
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Connection reset by peer", true)]
    #[case("operation timed out", true)]
    #[case("dns error: failed to lookup address", true)]
    #[case("permission denied", false)]
    #[case("initdb: invalid locale", false)]
    fn classifies_bootstrap_errors(#[case] message: &str, #[case] transient: bool) {
        assert_eq!(is_transient_error(message), transient);
    }
}
