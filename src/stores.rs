//! The three in-memory stores a mutation works on, plus the referential
//! checks run once at load time.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::refmap::ReferenceMap;
use crate::schedule::ScheduleStore;
use crate::task::TaskStore;

/// Task Store, Schedule Store and External Reference Map, owned together.
#[derive(Debug, Clone, PartialEq)]
pub struct Stores {
    pub tasks: TaskStore,
    pub schedule: ScheduleStore,
    pub refs: ReferenceMap,
}

/// Counts reported by `plansync check`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub tasks: usize,
    pub scheduled: usize,
    pub unscheduled: Vec<String>,
    pub mapped: usize,
    pub stale_refs: Vec<String>,
    pub weeks: usize,
}

impl Stores {
    pub fn new(tasks: TaskStore, schedule: ScheduleStore, refs: ReferenceMap) -> Self {
        Self {
            tasks,
            schedule,
            refs,
        }
    }

    /// Check the invariants every mutation relies on.
    ///
    /// `tasks_path` / `schedule_path` only label the error.
    pub fn validate(&self, tasks_path: &Path, schedule_path: &Path) -> Result<()> {
        let invalid = |path: &Path, message: String| Error::InvalidDocument {
            path: path.to_path_buf(),
            message,
        };

        let mut task_ids = HashSet::new();
        for task in &self.tasks.tasks {
            if task.id.trim().is_empty() {
                return Err(invalid(tasks_path, "task with empty id".to_string()));
            }
            if !task_ids.insert(task.id.as_str()) {
                return Err(invalid(tasks_path, format!("duplicate task id {}", task.id)));
            }
        }

        for task in &self.tasks.tasks {
            if let Some(dep) = task.dependencies().iter().find(|dep| !task_ids.contains(dep.as_str())) {
                return Err(invalid(
                    tasks_path,
                    format!("{} depends on unknown task {dep}", task.id),
                ));
            }
        }

        let mut scheduled_ids = HashSet::new();
        for task in &self.schedule.tasks {
            if !scheduled_ids.insert(task.id.as_str()) {
                return Err(invalid(
                    schedule_path,
                    format!("duplicate scheduled task id {}", task.id),
                ));
            }
            if !task_ids.contains(task.id.as_str()) {
                return Err(invalid(
                    schedule_path,
                    format!("scheduled task {} has no entry in the task list", task.id),
                ));
            }
            if task.end_date < task.start_date {
                return Err(invalid(
                    schedule_path,
                    format!(
                        "{} ends ({}) before it starts ({})",
                        task.id, task.end_date, task.start_date
                    ),
                ));
            }
            if let Some(dep) = task.dependencies().iter().find(|dep| !task_ids.contains(dep.as_str())) {
                return Err(invalid(
                    schedule_path,
                    format!("{} depends on unknown task {dep}", task.id),
                ));
            }
        }

        if let Some(id) = self
            .schedule
            .critical_path()
            .iter()
            .find(|id| !task_ids.contains(id.as_str()))
        {
            return Err(invalid(
                schedule_path,
                format!("critical path references unknown task {id}"),
            ));
        }

        for (task_id, _) in self.refs.iter() {
            if !task_ids.contains(task_id) {
                tracing::warn!(task_id, "reference map entry has no task");
            }
        }

        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            tasks: self.tasks.tasks.len(),
            scheduled: self.schedule.tasks.len(),
            unscheduled: self
                .tasks
                .tasks
                .iter()
                .filter(|task| !self.schedule.contains(&task.id))
                .map(|task| task.id.clone())
                .collect(),
            mapped: self.refs.len(),
            stale_refs: self
                .refs
                .iter()
                .filter(|(task_id, _)| !self.tasks.contains(task_id))
                .map(|(task_id, _)| task_id.to_string())
                .collect(),
            weeks: self.schedule.weeks().len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use serde_json::Map;

    use super::*;
    use crate::document::Quantity;
    use crate::schedule::ScheduledTask;
    use crate::task::{ProjectMeta, Task};

    pub fn date(raw: &str) -> NaiveDate {
        crate::schedule::parse_date(raw).unwrap()
    }

    /// Builder for small consistent store sets
    pub struct StoresBuilder {
        stores: Stores,
    }

    impl StoresBuilder {
        pub fn new(project_start: &str) -> Self {
            Self {
                stores: Stores::new(
                    TaskStore {
                        project: ProjectMeta {
                            name: "Dashboard migration".to_string(),
                            extra: Map::new(),
                        },
                        tasks: Vec::new(),
                        extra: Map::new(),
                    },
                    ScheduleStore::new(date(project_start)),
                    ReferenceMap::new(),
                ),
            }
        }

        /// Add a task scheduled from `start` for `effort` days
        pub fn task(mut self, id: &str, effort: f64, weight: f64, start: &str, deps: &[&str]) -> Self {
            let mut task = Task::new(id, format!("{id} title"), effort, weight);
            task.dependencies.set(deps.iter().map(|d| d.to_string()).collect());
            let start = date(start);
            let end = start + chrono::Duration::days(crate::task::effort_days(effort) - 1);
            let mut scheduled = ScheduledTask::new(id, start, end);
            scheduled.effort.set(Quantity::from(effort));
            scheduled.weight.set(Quantity::from(weight));
            scheduled.priority.set(task.priority);
            scheduled.dependencies = task.dependencies.clone();
            self.stores.tasks.tasks.push(task);
            self.stores.schedule.tasks.push(scheduled);
            self
        }

        /// Add a task that only exists in the task store
        pub fn unscheduled(mut self, id: &str, deps: &[&str]) -> Self {
            let mut task = Task::new(id, format!("{id} title"), 1.0, 1.0);
            task.dependencies.set(deps.iter().map(|d| d.to_string()).collect());
            self.stores.tasks.tasks.push(task);
            self
        }

        pub fn issue(mut self, id: &str, number: &str) -> Self {
            self.stores.refs.insert(id, number);
            self
        }

        pub fn build(self) -> Stores {
            self.stores
        }
    }
}
