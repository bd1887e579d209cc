//! Pre-mutation snapshots of every tracked document.
//!
//! A snapshot directory holds a byte copy of each tracked file plus a
//! `manifest.json` recording which files did not exist. Restoring rewrites
//! the copies and deletes files that were absent at capture time.
//!
//! A [`Snapshot`] that is dropped without being committed or discarded
//! restores itself.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    id: Uuid,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    original: PathBuf,
    /// File name inside the snapshot; `None` when the original was absent
    backup: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Armed,
    Settled,
}

/// A committed snapshot
#[derive(Debug)]
pub struct Committed {
    pub dir: PathBuf,
    /// Set when removing old snapshots failed; the commit itself stands
    pub prune_error: Option<Error>,
}

/// Guard over one captured snapshot
#[derive(Debug)]
pub struct Snapshot {
    dir: PathBuf,
    manifest: Manifest,
    state: State,
}

impl Snapshot {
    /// Copy `files` into a fresh directory under `backups_root`.
    pub fn capture(backups_root: &Path, files: &[PathBuf], label: Option<&str>) -> Result<Self> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let dir = backups_root.join(snapshot_dir_name(created_at, id));
        fs::create_dir_all(&dir)?;

        let mut entries = Vec::with_capacity(files.len());
        for (index, original) in files.iter().enumerate() {
            let backup = if original.is_file() {
                let name = backup_name(index, original);
                fs::copy(original, dir.join(&name))?;
                Some(name)
            } else {
                None
            };
            entries.push(ManifestEntry {
                original: original.clone(),
                backup,
            });
        }

        let manifest = Manifest {
            id,
            created_at,
            label: label.map(str::to_string),
            files: entries,
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        lock::write_atomic(dir.join(MANIFEST_FILE), &json)?;

        tracing::debug!(dir = %dir.display(), files = files.len(), "snapshot captured");
        Ok(Self {
            dir,
            manifest,
            state: State::Armed,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keep the snapshot and prune the oldest beyond `retain`.
    ///
    /// Pruning is best-effort: its failure is logged and returned in
    /// [`Committed::prune_error`].
    pub fn commit(mut self, retain: usize) -> Committed {
        self.state = State::Settled;
        let dir = self.dir.clone();
        let prune_error = dir
            .parent()
            .and_then(|root| prune(root, retain, Some(&dir)).err());
        if let Some(err) = &prune_error {
            tracing::warn!(error = %err, dir = %dir.display(), "pruning old snapshots failed");
        }
        Committed { dir, prune_error }
    }

    /// Drop the snapshot without restoring; the documents were never touched.
    pub fn discard(mut self) -> Result<()> {
        self.state = State::Settled;
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Put every tracked file back as it was at capture time.
    ///
    /// The snapshot directory is kept for inspection.
    pub fn restore(mut self) -> Result<PathBuf> {
        self.state = State::Settled;
        self.restore_files()?;
        Ok(self.dir.clone())
    }

    fn restore_files(&self) -> Result<()> {
        for entry in &self.manifest.files {
            match &entry.backup {
                Some(name) => restore_file(&self.dir.join(name), &entry.original)?,
                None => {
                    if entry.original.exists() {
                        fs::remove_file(&entry.original)?;
                    }
                }
            }
        }
        tracing::info!(dir = %self.dir.display(), "documents restored from snapshot");
        Ok(())
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if self.state == State::Armed {
            if let Err(err) = self.restore_files() {
                tracing::error!(error = %err, dir = %self.dir.display(), "snapshot restore failed");
            }
        }
    }
}

/// Committed snapshots under `root`, oldest first
pub fn list(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(MANIFEST_FILE).is_file())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Remove the oldest snapshots so at most `retain` remain. `keep` is never
/// removed.
pub fn prune(root: &Path, retain: usize, keep: Option<&Path>) -> Result<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = list(root)?
        .into_iter()
        .filter(|dir| Some(dir.as_path()) != keep)
        .collect();
    let retain_others = if keep.is_some() {
        retain.saturating_sub(1)
    } else {
        retain
    };
    let excess = dirs.len().saturating_sub(retain_others);
    let removed: Vec<PathBuf> = dirs.into_iter().take(excess).collect();
    for dir in &removed {
        fs::remove_dir_all(dir)?;
        tracing::debug!(dir = %dir.display(), "pruned snapshot");
    }
    Ok(removed)
}

/// Copy `backup` over `original` through a staging file distinct from the
/// one used by ordinary writes, which may be what failed.
fn restore_file(backup: &Path, original: &Path) -> Result<()> {
    let mut staging = original.as_os_str().to_owned();
    staging.push(format!(".restore.{}", std::process::id()));
    let staging = PathBuf::from(staging);
    if let Some(parent) = original.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(backup, &staging)?;
    fs::rename(&staging, original)?;
    Ok(())
}

fn snapshot_dir_name(created_at: DateTime<Utc>, id: Uuid) -> String {
    let ts = created_at.format("%Y%m%dT%H%M%S%.6fZ");
    let short = id.simple().to_string();
    format!("{ts}-{}", &short[..8])
}

fn backup_name(index: usize, original: &Path) -> String {
    let name = original
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{index:02}-{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        files: Vec<PathBuf>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let tasks = temp.path().join("tasks.json");
            let plan = temp.path().join("PLAN.md");
            let missing = temp.path().join("github-issue-mapping.json");
            fs::write(&tasks, "{\"tasks\": []}\n").unwrap();
            fs::write(&plan, "# Plan\n").unwrap();
            Self {
                temp,
                files: vec![tasks, plan, missing],
            }
        }

        fn backups(&self) -> PathBuf {
            self.temp.path().join(".backups")
        }
    }

    #[test]
    fn restore_puts_bytes_back_and_removes_new_files() {
        let fx = Fixture::new();
        let snapshot = Snapshot::capture(&fx.backups(), &fx.files, None).unwrap();

        fs::write(&fx.files[0], "garbage").unwrap();
        fs::remove_file(&fx.files[1]).unwrap();
        fs::write(&fx.files[2], "{}").unwrap();

        let dir = snapshot.restore().unwrap();
        assert!(dir.exists());
        assert_eq!(fs::read_to_string(&fx.files[0]).unwrap(), "{\"tasks\": []}\n");
        assert_eq!(fs::read_to_string(&fx.files[1]).unwrap(), "# Plan\n");
        assert!(!fx.files[2].exists());
    }

    #[test]
    fn drop_without_commit_restores() {
        let fx = Fixture::new();
        {
            let _snapshot = Snapshot::capture(&fx.backups(), &fx.files, Some("test")).unwrap();
            fs::write(&fx.files[0], "half written").unwrap();
        }
        assert_eq!(fs::read_to_string(&fx.files[0]).unwrap(), "{\"tasks\": []}\n");
    }

    #[test]
    fn commit_keeps_changes_and_snapshot() {
        let fx = Fixture::new();
        let snapshot = Snapshot::capture(&fx.backups(), &fx.files, None).unwrap();
        fs::write(&fx.files[0], "new").unwrap();

        let committed = snapshot.commit(5);
        assert!(committed.prune_error.is_none());
        assert!(committed.dir.join(MANIFEST_FILE).is_file());
        assert_eq!(fs::read_to_string(&fx.files[0]).unwrap(), "new");
    }

    #[test]
    fn discard_removes_snapshot_dir() {
        let fx = Fixture::new();
        let snapshot = Snapshot::capture(&fx.backups(), &fx.files, None).unwrap();
        let dir = snapshot.dir().to_path_buf();
        snapshot.discard().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn commit_prunes_beyond_retention() {
        let fx = Fixture::new();
        let mut last = PathBuf::new();
        for _ in 0..4 {
            let snapshot = Snapshot::capture(&fx.backups(), &fx.files, None).unwrap();
            last = snapshot.commit(2).dir;
        }
        let remaining = list(&fx.backups()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(last.exists());
    }

    #[test]
    fn prune_ignores_foreign_directories() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.backups().join("notes")).unwrap();
        Snapshot::capture(&fx.backups(), &fx.files, None)
            .unwrap()
            .commit(1);
        assert!(fx.backups().join("notes").exists());
    }

    #[test]
    fn failed_prune_still_commits() {
        let fx = Fixture::new();
        let snapshot = Snapshot::capture(&fx.backups(), &fx.files, None).unwrap();
        fs::write(&fx.files[0], "new").unwrap();

        // A file where the backups directory was makes listing fail
        fs::remove_dir_all(fx.backups()).unwrap();
        fs::write(fx.backups(), "not a directory").unwrap();

        let committed = snapshot.commit(1);
        assert!(matches!(committed.prune_error, Some(Error::Io(_))));
        assert_eq!(fs::read_to_string(&fx.files[0]).unwrap(), "new");
    }
}
