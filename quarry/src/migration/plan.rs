//! Compare the scripts on hand with the recorded history.
//!
//! Everything here is pure so the rules can be tested without a database.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::history::AppliedMigration;
use super::{MigrationError, MigrationKind, MigrationScript, Version};

/// Per-script state reported by `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Not applied yet and will be applied by the next `migrate`.
    Pending,
    /// Applied with the checksum currently on hand.
    Applied,
    /// Repeatable script whose contents changed since it last ran.
    Stale,
    /// Versioned script whose contents changed after it was applied.
    ChecksumMismatch,
    /// Recorded in the history but absent from the source.
    Missing,
    /// Pending version lower than the latest applied one.
    OutOfOrder,
    /// Last recorded attempt did not succeed.
    Failed,
}

/// One line of `info` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub version: Option<String>,
    pub description: String,
    pub script: String,
    pub state: MigrationState,
    pub installed_on: Option<DateTime<Utc>>,
}

/// A script `migrate` will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlannedScript<'a> {
    pub(crate) script: &'a MigrationScript,
    /// `true` for a repeatable script that already ran with other contents.
    pub(crate) reapply: bool,
}

/// Latest history entry per versioned script and per repeatable description.
struct History<'a> {
    versioned: BTreeMap<&'a Version, &'a AppliedMigration>,
    repeatable: BTreeMap<&'a str, &'a AppliedMigration>,
}

impl<'a> History<'a> {
    fn index(applied: &'a [AppliedMigration]) -> Self {
        let mut versioned = BTreeMap::new();
        let mut repeatable = BTreeMap::new();
        let mut ordered: Vec<&AppliedMigration> = applied.iter().collect();
        ordered.sort_by_key(|entry| entry.installed_rank);
        for entry in ordered {
            match &entry.version {
                Some(version) => {
                    versioned.insert(version, entry);
                }
                None => {
                    repeatable.insert(entry.description.as_str(), entry);
                }
            }
        }
        Self {
            versioned,
            repeatable,
        }
    }

    fn latest(&self, script: &MigrationScript) -> Option<&'a AppliedMigration> {
        match script.kind() {
            MigrationKind::Versioned(version) => self.versioned.get(version).copied(),
            MigrationKind::Repeatable => self.repeatable.get(script.description()).copied(),
        }
    }

    fn latest_version(&self) -> Option<&'a Version> {
        self.versioned
            .iter()
            .rev()
            .find(|(_, entry)| entry.success)
            .map(|(version, _)| *version)
    }

    fn entries(&self) -> impl Iterator<Item = &'a AppliedMigration> + '_ {
        self.versioned
            .values()
            .chain(self.repeatable.values())
            .copied()
    }
}

fn missing_entries<'a>(
    scripts: &[MigrationScript],
    history: &History<'a>,
) -> Vec<&'a AppliedMigration> {
    let versions: BTreeSet<&Version> = scripts.iter().filter_map(MigrationScript::version).collect();
    let repeatables: BTreeSet<&str> = scripts
        .iter()
        .filter(|script| script.version().is_none())
        .map(MigrationScript::description)
        .collect();
    history
        .entries()
        .filter(|entry| match &entry.version {
            Some(version) => !versions.contains(version),
            None => !repeatables.contains(entry.description.as_str()),
        })
        .collect()
}

/// Reject failed entries, applied scripts missing from the source and
/// changed versioned scripts. `scripts` must already be ordered.
pub(crate) fn check_history(
    scripts: &[MigrationScript],
    applied: &[AppliedMigration],
) -> Result<(), MigrationError> {
    let history = History::index(applied);

    if let Some(failed) = history.entries().find(|entry| !entry.success) {
        return Err(MigrationError::PreviouslyFailed {
            script: failed.script.clone(),
        });
    }
    if let Some(missing) = missing_entries(scripts, &history).first() {
        return Err(MigrationError::MissingScript {
            script: missing.script.clone(),
        });
    }
    let tampered = scripts
        .iter()
        .filter(|script| script.version().is_some())
        .find_map(|script| {
            history
                .latest(script)
                .filter(|entry| entry.checksum != script.checksum())
                .map(|entry| (script, entry))
        });
    match tampered {
        Some((script, entry)) => Err(MigrationError::ChecksumMismatch {
            script: script.script().to_owned(),
            applied: entry.checksum.clone(),
            current: script.checksum().to_owned(),
        }),
        None => Ok(()),
    }
}

/// Scripts to run, in order: pending versions ascending, then new or changed
/// repeatables by description.
pub(crate) fn plan<'s>(
    scripts: &'s [MigrationScript],
    applied: &[AppliedMigration],
) -> Result<Vec<PlannedScript<'s>>, MigrationError> {
    check_history(scripts, applied)?;
    let history = History::index(applied);
    let latest = history.latest_version();

    let mut steps = Vec::new();
    for script in scripts {
        match (script.kind(), history.latest(script)) {
            (MigrationKind::Versioned(_), Some(_)) => {}
            (MigrationKind::Versioned(version), None) => {
                if let Some(latest) = latest.filter(|latest| version < *latest) {
                    return Err(MigrationError::OutOfOrder {
                        script: script.script().to_owned(),
                        latest: latest.to_string(),
                    });
                }
                steps.push(PlannedScript {
                    script,
                    reapply: false,
                });
            }
            (MigrationKind::Repeatable, None) => steps.push(PlannedScript {
                script,
                reapply: false,
            }),
            (MigrationKind::Repeatable, Some(entry)) if entry.checksum != script.checksum() => {
                steps.push(PlannedScript {
                    script,
                    reapply: true,
                });
            }
            (MigrationKind::Repeatable, Some(_)) => {}
        }
    }
    Ok(steps)
}

/// Describe every script on hand plus history entries without a script.
pub(crate) fn describe(
    scripts: &[MigrationScript],
    applied: &[AppliedMigration],
) -> Vec<MigrationInfo> {
    let history = History::index(applied);
    let latest = history.latest_version();

    let mut rows: Vec<MigrationInfo> = scripts
        .iter()
        .map(|script| {
            let entry = history.latest(script);
            let state = match (script.kind(), entry) {
                (_, Some(entry)) if !entry.success => MigrationState::Failed,
                (MigrationKind::Versioned(_), Some(entry)) if entry.checksum != script.checksum() => {
                    MigrationState::ChecksumMismatch
                }
                (MigrationKind::Repeatable, Some(entry)) if entry.checksum != script.checksum() => {
                    MigrationState::Stale
                }
                (_, Some(_)) => MigrationState::Applied,
                (MigrationKind::Versioned(version), None)
                    if latest.is_some_and(|latest| version < latest) =>
                {
                    MigrationState::OutOfOrder
                }
                (_, None) => MigrationState::Pending,
            };
            MigrationInfo {
                version: script.version().map(ToString::to_string),
                description: script.description().to_owned(),
                script: script.script().to_owned(),
                state,
                installed_on: entry.map(|entry| entry.installed_on),
            }
        })
        .collect();

    rows.extend(missing_entries(scripts, &history).into_iter().map(|entry| {
        MigrationInfo {
            version: entry.version.as_ref().map(ToString::to_string),
            description: entry.description.clone(),
            script: entry.script.clone(),
            state: MigrationState::Missing,
            installed_on: Some(entry.installed_on),
        }
    }));
    rows
}
