//! Storage layer for plansync
//!
//! All documents live in one project directory:
//!
//! ```text
//! <dir>/
//!   .plansync.toml              # Optional configuration
//!   .plansync.lock              # Advisory run lock
//!   tasks.json                  # Task Store
//!   schedule.json               # Schedule Store (+ weekly rollup)
//!   github-issue-mapping.json   # External Reference Map
//!   PLAN.md                     # Generated plan document
//!   SCHEDULE.md                 # Generated schedule narrative
//!   .backups/
//!     <timestamp>-<id>/         # One snapshot per mutation
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::{Config, DocumentsConfig};
use crate::error::{Error, Result};
use crate::lock;
use crate::refmap::ReferenceMap;
use crate::schedule::ScheduleStore;
use crate::stores::Stores;
use crate::task::TaskStore;

/// Name of the run lock file
pub const LOCK_FILE: &str = ".plansync.lock";

/// Storage manager for the project documents
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    documents: DocumentsConfig,
    backups_dir: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        let backups_dir = root.join(&config.backups.dir);
        Self {
            root,
            documents: config.documents.clone(),
            backups_dir,
        }
    }

    /// Storage with default document names
    pub fn for_dir(root: PathBuf) -> Self {
        Self::new(root, &Config::default())
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join(&self.documents.tasks)
    }

    pub fn schedule_file(&self) -> PathBuf {
        self.root.join(&self.documents.schedule)
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.root.join(&self.documents.mapping)
    }

    pub fn plan_file(&self) -> PathBuf {
        self.root.join(&self.documents.plan)
    }

    pub fn narrative_file(&self) -> PathBuf {
        self.root.join(&self.documents.schedule_narrative)
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Every file a mutation may rewrite, in snapshot order
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        vec![
            self.tasks_file(),
            self.schedule_file(),
            self.narrative_file(),
            self.plan_file(),
            self.mapping_file(),
        ]
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let mut json = serde_json::to_string_pretty(data)?;
        json.push('\n');
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Write a generated text document atomically
    pub fn write_document(&self, path: &Path, content: &str) -> Result<()> {
        lock::write_atomic_str(path, content)
    }

    // =========================================================================
    // Store loading and persistence
    // =========================================================================

    /// Load and validate all three stores.
    ///
    /// The task and schedule documents are required; a missing reference map
    /// is treated as empty.
    pub fn load_stores(&self) -> Result<Stores> {
        let tasks_path = self.tasks_file();
        let schedule_path = self.schedule_file();
        let mapping_path = self.mapping_file();

        let tasks: TaskStore = serde_json::from_value(read_document(&tasks_path)?)
            .map_err(|err| invalid_document(&tasks_path, err.to_string()))?;

        let schedule = ScheduleStore::from_value(read_document(&schedule_path)?)
            .map_err(|message| invalid_document(&schedule_path, message))?;

        let refs: ReferenceMap = if mapping_path.exists() {
            serde_json::from_value(read_document(&mapping_path)?)
                .map_err(|err| invalid_document(&mapping_path, err.to_string()))?
        } else {
            tracing::debug!(path = %mapping_path.display(), "no reference map; starting empty");
            ReferenceMap::new()
        };

        let stores = Stores::new(tasks, schedule, refs);
        stores.validate(&tasks_path, &schedule_path)?;
        tracing::debug!(
            tasks = stores.tasks.tasks.len(),
            scheduled = stores.schedule.tasks.len(),
            mapped = stores.refs.len(),
            "stores loaded"
        );
        Ok(stores)
    }

    /// Persist the Task Store, Schedule Store and Reference Map, in that order
    pub fn persist(&self, stores: &Stores) -> Result<()> {
        self.write_json(&self.tasks_file(), &stores.tasks)?;
        self.write_json(&self.schedule_file(), &stores.schedule)?;
        self.write_json(&self.mapping_file(), &stores.refs)?;
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(invalid_document(path, "file not found".to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    serde_json::from_str(&content).map_err(|err| invalid_document(path, err.to_string()))
}

fn invalid_document(path: &Path, message: String) -> Error {
    Error::InvalidDocument {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(path: &Path, value: &Value) {
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn seed(temp: &TempDir) -> Storage {
        let storage = Storage::for_dir(temp.path().to_path_buf());
        write(
            &storage.tasks_file(),
            &json!({
                "project": { "name": "Migration", "startDate": "2026-01-06" },
                "tasks": [
                    { "id": "TASK-001", "title": "Inventory", "priority": "high",
                      "effort": 3, "effortHours": 12, "weight": 10, "dependencies": [],
                      "status": "completed" },
                    { "id": "TASK-002", "title": "Design", "priority": "medium",
                      "effort": 2, "weight": 5.5, "dependencies": ["TASK-001"],
                      "status": "not_started" }
                ],
                "pdcaCycles": []
            }),
        );
        write(
            &storage.schedule_file(),
            &json!({
                "projectStartDate": "2026-01-06",
                "tasks": [
                    { "id": "TASK-001", "title": "Inventory", "startDate": "2026-01-06",
                      "endDate": "2026-01-08", "weekNumber": "Week 1", "effort": 3,
                      "weight": 10, "dependencies": [] },
                    { "id": "TASK-002", "title": "Design", "startDate": "2026-01-09",
                      "endDate": "2026-01-12", "weekNumber": "Week 1-2", "effort": 2,
                      "weight": 5.5, "dependencies": ["TASK-001"] }
                ],
                "weeklySchedule": [
                    { "week": "Week 1", "dateRange": "2026-01-06 〜 2026-01-10",
                      "tasks": ["TASK-001", "TASK-002"], "cumulativeProgress": 10 }
                ],
                "criticalPath": ["TASK-001", "TASK-002"]
            }),
        );
        write(&storage.mapping_file(), &json!({ "TASK-001": "11", "TASK-002": "12" }));
        storage
    }

    #[test]
    fn storage_paths() {
        let storage = Storage::for_dir(PathBuf::from("/work/project"));
        assert_eq!(storage.tasks_file(), PathBuf::from("/work/project/tasks.json"));
        assert_eq!(
            storage.mapping_file(),
            PathBuf::from("/work/project/github-issue-mapping.json")
        );
        assert_eq!(storage.backups_dir(), Path::new("/work/project/.backups"));
        assert_eq!(storage.lock_file(), PathBuf::from("/work/project/.plansync.lock"));
        assert_eq!(storage.tracked_files().len(), 5);
    }

    #[test]
    fn load_then_persist_preserves_content() {
        let temp = TempDir::new().unwrap();
        let storage = seed(&temp);
        let before: Vec<Value> = [storage.tasks_file(), storage.schedule_file(), storage.mapping_file()]
            .iter()
            .map(|path| storage.read_json(path).unwrap())
            .collect();

        let stores = storage.load_stores().unwrap();
        storage.persist(&stores).unwrap();

        let after: Vec<Value> = [storage.tasks_file(), storage.schedule_file(), storage.mapping_file()]
            .iter()
            .map(|path| storage.read_json(path).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn missing_mapping_loads_empty() {
        let temp = TempDir::new().unwrap();
        let storage = seed(&temp);
        fs::remove_file(storage.mapping_file()).unwrap();

        let stores = storage.load_stores().unwrap();
        assert!(stores.refs.is_empty());
    }

    #[test]
    fn missing_tasks_document_is_invalid_document() {
        let temp = TempDir::new().unwrap();
        let storage = seed(&temp);
        fs::remove_file(storage.tasks_file()).unwrap();

        let err = storage.load_stores().unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
        assert_eq!(err.exit_code(), crate::error::exit_codes::USER_ERROR);
    }

    #[test]
    fn malformed_json_names_the_file() {
        let temp = TempDir::new().unwrap();
        let storage = seed(&temp);
        fs::write(storage.schedule_file(), "{ not json").unwrap();

        let err = storage.load_stores().unwrap_err();
        match err {
            Error::InvalidDocument { path, .. } => assert_eq!(path, storage.schedule_file()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
