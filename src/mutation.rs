//! The four mutation operations.
//!
//! Every operation validates its input and plans all date shifts before the
//! first field is written, so a validation or lookup failure leaves the
//! stores exactly as they were.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::changelog::{Change, ChangeLog};
use crate::config::ScheduleConfig;
use crate::error::{Error, Result, StoreKind};
use crate::propagate;
use crate::schedule::parse_date;
use crate::stores::Stores;
use crate::task::{effort_days, Priority, Task};

/// A requested change to the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Move the end date by `days` (negative pulls it in)
    ExtendDeadline { task_id: String, days: i64 },
    /// Move the start date; the end date follows the task's effort
    ChangeStartDate { task_id: String, start_date: String },
    DeleteTask { task_id: String },
    ChangePriority { task_id: String, priority: String },
}

impl Operation {
    pub fn task_id(&self) -> &str {
        match self {
            Operation::ExtendDeadline { task_id, .. }
            | Operation::ChangeStartDate { task_id, .. }
            | Operation::DeleteTask { task_id }
            | Operation::ChangePriority { task_id, .. } => task_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ExtendDeadline { .. } => "extend_deadline",
            Operation::ChangeStartDate { .. } => "change_start_date",
            Operation::DeleteTask { .. } => "delete_task",
            Operation::ChangePriority { .. } => "change_priority",
        }
    }

    /// Whether the weekly rollup must be recomputed afterwards
    pub fn affects_schedule(&self) -> bool {
        !matches!(self, Operation::ChangePriority { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ExtendDeadline { task_id, days } => {
                write!(f, "extend {task_id} deadline by {days:+} day(s)")
            }
            Operation::ChangeStartDate {
                task_id,
                start_date,
            } => write!(f, "move {task_id} start to {start_date}"),
            Operation::DeleteTask { task_id } => write!(f, "delete {task_id}"),
            Operation::ChangePriority { task_id, priority } => {
                write!(f, "set {task_id} priority to {priority}")
            }
        }
    }
}

/// Apply `operation` to the stores and return what changed.
pub fn apply_operation(
    stores: &mut Stores,
    operation: &Operation,
    policy: &ScheduleConfig,
) -> Result<ChangeLog> {
    tracing::debug!(operation = %operation, "applying mutation");
    match operation {
        Operation::ExtendDeadline { task_id, days } => extend_deadline(stores, task_id, *days),
        Operation::ChangeStartDate {
            task_id,
            start_date,
        } => change_start_date(stores, task_id, start_date, policy.propagate_start_changes),
        Operation::DeleteTask { task_id } => delete_task(stores, task_id),
        Operation::ChangePriority { task_id, priority } => {
            change_priority(stores, task_id, priority)
        }
    }
}

/// Move a task's end date by `days` and cascade the shift to its dependents.
pub fn extend_deadline(stores: &mut Stores, task_id: &str, days: i64) -> Result<ChangeLog> {
    let task = stores
        .schedule
        .get(task_id)
        .ok_or_else(|| Error::not_found(StoreKind::Schedule, task_id))?;
    let old_end = task.end_date;
    let new_end = propagate::add_days(old_end, days)?;
    if new_end < task.start_date {
        return Err(Error::Validation(format!(
            "{task_id} would end ({new_end}) before it starts ({})",
            task.start_date
        )));
    }
    let shifts = if days == 0 {
        Vec::new()
    } else {
        propagate::plan(&stores.schedule, task_id, days)?
    };

    let mut log = ChangeLog::new();
    if let Some(task) = stores.schedule.get_mut(task_id) {
        task.end_date = new_end;
    }
    log.push(Change::EndDate {
        task_id: task_id.to_string(),
        old: old_end,
        new: new_end,
    });
    log.extend(propagate::apply(&mut stores.schedule, shifts, days));
    Ok(log)
}

/// Move a task's start date, recomputing its end from the scheduled effort
/// (the task list's effort when the schedule entry has none).
///
/// When `cascade` is set, dependents shift by the change of the end date.
pub fn change_start_date(
    stores: &mut Stores,
    task_id: &str,
    raw_date: &str,
    cascade: bool,
) -> Result<ChangeLog> {
    let new_start = parse_date(raw_date)?;
    let task = stores
        .schedule
        .get(task_id)
        .ok_or_else(|| Error::not_found(StoreKind::Schedule, task_id))?;
    let effort = task
        .effort()
        .or_else(|| stores.tasks.get(task_id).map(Task::effort))
        .map_or(1, effort_days);
    let new_end = propagate::add_days(new_start, effort - 1)?;
    let (old_start, old_end) = (task.start_date, task.end_date);
    let delta = days_between(old_end, new_end);
    let shifts = if cascade && delta != 0 {
        propagate::plan(&stores.schedule, task_id, delta)?
    } else {
        Vec::new()
    };

    let mut log = ChangeLog::new();
    if let Some(task) = stores.schedule.get_mut(task_id) {
        task.start_date = new_start;
        task.end_date = new_end;
    }
    log.push(Change::StartDate {
        task_id: task_id.to_string(),
        old_start,
        new_start,
        old_end,
        new_end,
    });
    log.extend(propagate::apply(&mut stores.schedule, shifts, delta));
    Ok(log)
}

/// Remove a task from both stores, every dependency list, the critical path
/// and the reference map.
pub fn delete_task(stores: &mut Stores, task_id: &str) -> Result<ChangeLog> {
    if !stores.tasks.contains(task_id) {
        return Err(Error::not_found(StoreKind::Tasks, task_id));
    }

    let mut log = ChangeLog::new();
    stores.tasks.remove(task_id);
    let scheduled = stores.schedule.remove(task_id).is_some();
    log.push(Change::Deleted {
        task_id: task_id.to_string(),
        scheduled,
    });

    let mut unlinked: Vec<String> = Vec::new();
    for task in &mut stores.tasks.tasks {
        if task.remove_dependency(task_id) {
            unlinked.push(task.id.clone());
        }
    }
    for task in &mut stores.schedule.tasks {
        if task.remove_dependency(task_id) && !unlinked.contains(&task.id) {
            unlinked.push(task.id.clone());
        }
    }
    for dependent in unlinked {
        log.push(Change::DependencyRemoved {
            task_id: dependent,
            removed: task_id.to_string(),
        });
    }

    if let Some(path) = stores.schedule.critical_path.get_mut() {
        path.retain(|id| id != task_id);
    }

    if let Some(external_id) = stores.refs.remove(task_id) {
        log.push(Change::ReferenceRemoved {
            task_id: task_id.to_string(),
            external_id,
        });
    }
    Ok(log)
}

/// Set the priority in the Task Store and the Schedule Store.
pub fn change_priority(stores: &mut Stores, task_id: &str, raw_priority: &str) -> Result<ChangeLog> {
    let priority: Priority = raw_priority.parse()?;
    let task = stores
        .tasks
        .get_mut(task_id)
        .ok_or_else(|| Error::not_found(StoreKind::Tasks, task_id))?;
    let old = task.priority;
    task.priority = priority;
    if let Some(scheduled) = stores.schedule.get_mut(task_id) {
        scheduled.priority.set(priority);
    }

    let mut log = ChangeLog::new();
    log.push(Change::Priority {
        task_id: task_id.to_string(),
        old,
        new: priority,
    });
    Ok(log)
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
