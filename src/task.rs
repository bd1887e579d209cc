//! Task Store: the task list plus project metadata (`tasks.json`).
//!
//! Fields the orchestrator does not interpret (status, progress, PDCA data
//! read by the reporting scripts) ride along in `extra` so a load/save cycle
//! never drops them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Field, Quantity};
use crate::error::{Error, Result};

/// Valid priority names
pub const PRIORITIES: [&str; 3] = ["high", "medium", "low"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(Error::Validation(format!(
                "invalid priority '{other}' (expected {})",
                PRIORITIES.join(", ")
            ))),
        }
    }
}

/// Round a work-day effort up to whole calendar days, minimum one.
pub fn effort_days(effort: f64) -> i64 {
    if !effort.is_finite() || effort <= 1.0 {
        return 1;
    }
    effort.ceil() as i64
}

/// A unit of project work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub phase: Field<String>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub category: Field<String>,
    /// Duration in work-days
    pub effort: Quantity,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub effort_hours: Field<Quantity>,
    /// Share of total project completion credited on finish
    pub weight: Quantity,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub dependencies: Field<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Minimal task, mostly for fixtures and provisioning tools
    pub fn new(id: impl Into<String>, title: impl Into<String>, effort: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: Field::Absent,
            phase: Field::Absent,
            priority: Priority::Medium,
            category: Field::Absent,
            effort: Quantity::from(effort),
            effort_hours: Field::Absent,
            weight: Quantity::from(weight),
            dependencies: Field::Value(Vec::new()),
            extra: Map::new(),
        }
    }

    pub fn effort(&self) -> f64 {
        self.effort.get()
    }

    pub fn effort_hours(&self) -> Option<f64> {
        self.effort_hours.get().map(Quantity::get)
    }

    pub fn weight(&self) -> f64 {
        self.weight.get()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.get().map(String::as_str)
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.get().map(String::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.category.get().map(String::as_str)
    }

    pub fn dependencies(&self) -> &[String] {
        self.dependencies.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn depends_on(&self, task_id: &str) -> bool {
        self.dependencies().iter().any(|dep| dep == task_id)
    }

    /// Remove `task_id` from the dependency list; returns whether it was there
    pub fn remove_dependency(&mut self, task_id: &str) -> bool {
        let Some(dependencies) = self.dependencies.get_mut() else {
            return false;
        };
        let before = dependencies.len();
        dependencies.retain(|dep| dep != task_id);
        before != dependencies.len()
    }
}

/// Project metadata header of the task document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMeta {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole task document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStore {
    pub project: ProjectMeta,
    pub tasks: Vec<Task>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskStore {
    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn get_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.get(task_id).is_some()
    }

    /// Remove a task, returning it when present
    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    pub fn total_weight(&self) -> f64 {
        self.tasks.iter().map(Task::weight).sum()
    }
}
