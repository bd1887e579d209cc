//! Transactional apply: snapshot, mutate, roll up, regenerate, persist, then
//! sync.
//!
//! The local documents either all reflect the mutation or are all restored
//! byte-for-byte from the snapshot. Tracker sync runs only after the commit
//! and can never undo it.

use std::path::PathBuf;

use serde::Serialize;

use crate::changelog::ChangeLog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::integrations::{push_changes, IssueTracker, SyncReport};
use crate::mutation::{apply_operation, Operation};
use crate::render;
use crate::rollup::{self, WeeklyRollup};
use crate::snapshot::Snapshot;
use crate::storage::Storage;
use crate::stores::Stores;

/// Outcome of one committed mutation
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub operation: Operation,
    pub changes: ChangeLog,
    /// Snapshot taken before the mutation
    pub backup: PathBuf,
    pub weeks: usize,
    /// Problems after the commit that did not undo it
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commit_warnings: Vec<String>,
    /// `None` when sync was skipped
    pub sync: Option<SyncReport>,
}

impl ApplyReport {
    /// Commit warnings followed by sync warnings
    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        let sync = self
            .sync
            .as_ref()
            .map(|sync| sync.warnings.as_slice())
            .unwrap_or(&[]);
        self.commit_warnings.iter().chain(sync)
    }
}

/// Apply `operation` to `stores` and the documents behind `storage`.
///
/// On success `stores` holds the committed state. On failure `stores` is
/// left as it was, and so are the documents.
pub fn apply(
    storage: &Storage,
    config: &Config,
    stores: &mut Stores,
    operation: &Operation,
    tracker: Option<&mut dyn IssueTracker>,
) -> Result<ApplyReport> {
    let snapshot = Snapshot::capture(
        storage.backups_dir(),
        &storage.tracked_files(),
        Some(&operation.to_string()),
    )?;

    let mut working = stores.clone();
    let changes = match apply_operation(&mut working, operation, &config.schedule) {
        Ok(changes) => changes,
        Err(err) if err.is_pre_mutation() => {
            snapshot.discard()?;
            return Err(err);
        }
        Err(err) => return Err(roll_back(snapshot, err)),
    };

    let rollup = match write_documents(storage, config, &mut working, operation) {
        Ok(rollup) => rollup,
        Err(err) => return Err(roll_back(snapshot, err)),
    };

    let (backup, commit_warnings) = commit_snapshot(snapshot, config.backups.retain);
    *stores = working;
    tracing::info!(
        operation = operation.name(),
        task_id = operation.task_id(),
        changes = changes.len(),
        backup = %backup.display(),
        "mutation committed"
    );

    let sync = tracker.map(|tracker| push_changes(tracker, &config.github, stores, &changes));

    Ok(ApplyReport {
        operation: operation.clone(),
        changes,
        backup,
        weeks: rollup.map_or(stores.schedule.weeks().len(), |r| r.len()),
        commit_warnings,
        sync,
    })
}

/// Steps after the in-memory mutation that touch the disk.
fn write_documents(
    storage: &Storage,
    config: &Config,
    stores: &mut Stores,
    operation: &Operation,
) -> Result<Option<WeeklyRollup>> {
    let rollup = if operation.affects_schedule() {
        Some(rollup::refresh(&mut stores.schedule, config.schedule.max_weeks))
    } else {
        None
    };
    render::regenerate(storage, stores)?;
    storage.persist(stores)?;
    Ok(rollup)
}

/// Keep the snapshot. Retention pruning that fails becomes a warning since
/// the documents are already written.
fn commit_snapshot(snapshot: Snapshot, retain: usize) -> (PathBuf, Vec<String>) {
    let committed = snapshot.commit(retain);
    let warnings = committed
        .prune_error
        .iter()
        .map(|err| format!("old backups were not pruned: {err}"))
        .collect();
    (committed.dir, warnings)
}

fn roll_back(snapshot: Snapshot, err: Error) -> Error {
    tracing::warn!(error = %err, "mutation failed; restoring documents");
    match snapshot.restore() {
        Ok(backup) => Error::RolledBack {
            backup,
            source: Box::new(err),
        },
        Err(restore_err) => {
            tracing::error!(error = %restore_err, "restore from snapshot failed");
            Error::OperationFailed(format!(
                "{err}; restoring the documents also failed: {restore_err}"
            ))
        }
    }
}
