#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// A project directory seeded with a small, consistent set of documents:
///
/// - TASK-A (3 days, weight 10) from 2026-01-06
/// - TASK-B (2 days, weight 5) after TASK-A, from 2026-01-09
/// - TASK-C (4 days, weight 20) after TASK-B, from 2026-01-11
///
/// TASK-A and TASK-B are linked to issues 11 and 12.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let project = Self { dir };
        project.write_json("tasks.json", &tasks());
        project.write_json("schedule.json", &schedule());
        project.write_json(
            "github-issue-mapping.json",
            &json!({ "TASK-A": "11", "TASK-B": "12" }),
        );
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        self.write_file(name, &serde_json::to_string_pretty(value).expect("json"))
    }

    pub fn read_json(&self, name: &str) -> Value {
        let content = fs::read_to_string(self.file(name)).expect("read document");
        serde_json::from_str(&content).expect("parse document")
    }

    /// Raw bytes of every tracked document, `None` when absent
    pub fn snapshot_bytes(&self) -> Vec<Option<Vec<u8>>> {
        [
            "tasks.json",
            "schedule.json",
            "SCHEDULE.md",
            "PLAN.md",
            "github-issue-mapping.json",
        ]
        .iter()
        .map(|name| fs::read(self.file(name)).ok())
        .collect()
    }

    pub fn scheduled(&self, task_id: &str) -> Value {
        self.read_json("schedule.json")["tasks"]
            .as_array()
            .expect("tasks array")
            .iter()
            .find(|task| task["id"] == task_id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn backups(&self) -> Vec<PathBuf> {
        let root = self.file(".backups");
        if !root.exists() {
            return Vec::new();
        }
        let mut dirs: Vec<PathBuf> = fs::read_dir(root)
            .expect("read backups")
            .map(|entry| entry.expect("entry").path())
            .collect();
        dirs.sort();
        dirs
    }
}

fn tasks() -> Value {
    json!({
        "project": { "name": "Dashboard migration", "owner": "platform" },
        "tasks": [
            {
                "id": "TASK-A",
                "title": "Export legacy data",
                "phase": "Phase 1: Foundation",
                "priority": "high",
                "category": "Data",
                "effort": 3,
                "weight": 10,
                "dependencies": []
            },
            {
                "id": "TASK-B",
                "title": "Transform records",
                "phase": "Phase 1: Foundation",
                "priority": "medium",
                "category": "Data",
                "effort": 2,
                "weight": 5,
                "dependencies": ["TASK-A"]
            },
            {
                "id": "TASK-C",
                "title": "Build dashboards",
                "phase": "Phase 2: Delivery",
                "priority": "low",
                "effort": 4,
                "weight": 20,
                "dependencies": ["TASK-B"],
                "notes": "kept as-is"
            }
        ]
    })
}

fn schedule() -> Value {
    json!({
        "projectStartDate": "2026-01-06",
        "tasks": [
            {
                "id": "TASK-A",
                "startDate": "2026-01-06",
                "endDate": "2026-01-08",
                "weekNumber": "Week 1",
                "dependencies": [],
                "effort": 3,
                "weight": 10,
                "priority": "high"
            },
            {
                "id": "TASK-B",
                "startDate": "2026-01-09",
                "endDate": "2026-01-10",
                "weekNumber": "Week 1",
                "dependencies": ["TASK-A"],
                "effort": 2,
                "weight": 5,
                "priority": "medium"
            },
            {
                "id": "TASK-C",
                "plannedStartDate": "2026-01-11",
                "plannedEndDate": "2026-01-14",
                "weekNumber": "Week 1-2",
                "dependencies": ["TASK-B"],
                "effort": 4,
                "weight": 20,
                "priority": "low"
            }
        ],
        "weeklySchedule": [],
        "criticalPath": ["TASK-A", "TASK-B", "TASK-C"],
        "generatedBy": "planner"
    })
}
