//! Change log produced by mutations: one entry per field changed, cascades
//! included.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::task::Priority;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    EndDate {
        task_id: String,
        old: NaiveDate,
        new: NaiveDate,
    },
    StartDate {
        task_id: String,
        old_start: NaiveDate,
        new_start: NaiveDate,
        old_end: NaiveDate,
        new_end: NaiveDate,
    },
    /// Shift applied because an upstream task moved
    Cascade {
        task_id: String,
        cause: String,
        days: i64,
        old_start: NaiveDate,
        old_end: NaiveDate,
        new_start: NaiveDate,
        new_end: NaiveDate,
    },
    Deleted {
        task_id: String,
        scheduled: bool,
    },
    DependencyRemoved {
        task_id: String,
        removed: String,
    },
    ReferenceRemoved {
        task_id: String,
        external_id: String,
    },
    Priority {
        task_id: String,
        old: Priority,
        new: Priority,
    },
}

impl Change {
    pub fn task_id(&self) -> &str {
        match self {
            Change::EndDate { task_id, .. }
            | Change::StartDate { task_id, .. }
            | Change::Cascade { task_id, .. }
            | Change::Deleted { task_id, .. }
            | Change::DependencyRemoved { task_id, .. }
            | Change::ReferenceRemoved { task_id, .. }
            | Change::Priority { task_id, .. } => task_id,
        }
    }

    /// Whether the task's dates moved
    pub fn moves_dates(&self) -> bool {
        matches!(
            self,
            Change::EndDate { .. } | Change::StartDate { .. } | Change::Cascade { .. }
        )
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::EndDate { task_id, old, new } => {
                write!(f, "{task_id}: end date {old} -> {new}")
            }
            Change::StartDate {
                task_id,
                old_start,
                new_start,
                old_end,
                new_end,
            } => write!(
                f,
                "{task_id}: start date {old_start} -> {new_start} (end {old_end} -> {new_end})"
            ),
            Change::Cascade {
                task_id,
                cause,
                days,
                old_start,
                old_end,
                new_start,
                new_end,
            } => write!(
                f,
                "{task_id}: shifted {days:+} day(s) after {cause}: {old_start}..{old_end} -> {new_start}..{new_end}"
            ),
            Change::Deleted { task_id, scheduled } => {
                if *scheduled {
                    write!(f, "{task_id}: deleted from task list and schedule")
                } else {
                    write!(f, "{task_id}: deleted from task list")
                }
            }
            Change::DependencyRemoved { task_id, removed } => {
                write!(f, "{task_id}: dependency on {removed} removed")
            }
            Change::ReferenceRemoved {
                task_id,
                external_id,
            } => write!(f, "{task_id}: unlinked from issue #{external_id}"),
            Change::Priority { task_id, old, new } => {
                write!(f, "{task_id}: priority {old} -> {new}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeLog {
    entries: Vec<Change>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        tracing::debug!(change = %change, "change recorded");
        self.entries.push(change);
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = Change>) {
        for change in changes {
            self.push(change);
        }
    }

    pub fn entries(&self) -> &[Change] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable lines, one per change
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Tasks whose dates moved, first occurrence order
    pub fn rescheduled(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for change in self.entries.iter().filter(|c| c.moves_dates()) {
            if !ids.iter().any(|id| id == change.task_id()) {
                ids.push(change.task_id().to_string());
            }
        }
        ids
    }

    /// Tasks touched by any change, first occurrence order
    pub fn touched(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for change in &self.entries {
            if !ids.iter().any(|id| id == change.task_id()) {
                ids.push(change.task_id().to_string());
            }
        }
        ids
    }

    /// Issues unlinked by deletions: (task id, external id)
    pub fn unlinked(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|change| match change {
                Change::ReferenceRemoved {
                    task_id,
                    external_id,
                } => Some((task_id.clone(), external_id.clone())),
                _ => None,
            })
            .collect()
    }
}
