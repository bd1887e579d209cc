//! Transitive propagation of date shifts to dependent tasks.
//!
//! Dependents are discovered depth-first over the reverse dependency edges of
//! the Schedule Store. Every task is shifted at most once per call, even when
//! it is reachable through several paths, and a cycle is rejected before any
//! date moves.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};

use crate::changelog::Change;
use crate::error::{Error, Result};
use crate::schedule::ScheduleStore;

/// Planned shift for one dependent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub task_id: String,
    /// Task through which this one was reached
    pub cause: String,
    pub new_start: NaiveDate,
    pub new_end: NaiveDate,
}

/// All dependents of `root`, in depth-first discovery order.
///
/// Fails with a validation error when `root` reaches itself.
pub fn plan_dependents(schedule: &ScheduleStore, root: &str) -> Result<Vec<(String, String)>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut path = vec![root.to_string()];
    visit(schedule, root, &mut path, &mut visited, &mut order)?;
    Ok(order)
}

fn visit(
    schedule: &ScheduleStore,
    task_id: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
    order: &mut Vec<(String, String)>,
) -> Result<()> {
    for dependent in schedule.direct_dependents(task_id) {
        if let Some(pos) = path.iter().position(|id| *id == dependent) {
            let mut cycle: Vec<&str> = path[pos..].iter().map(String::as_str).collect();
            cycle.push(&dependent);
            return Err(Error::Validation(format!(
                "dependency cycle: {}",
                cycle.join(" -> ")
            )));
        }
        if !visited.insert(dependent.clone()) {
            continue;
        }
        order.push((dependent.clone(), task_id.to_string()));
        path.push(dependent.clone());
        visit(schedule, &dependent, path, visited, order)?;
        path.pop();
    }
    Ok(())
}

/// Compute the shifted dates of every dependent of `root` without touching
/// the store. Date overflow is a validation error.
pub fn plan(schedule: &ScheduleStore, root: &str, days: i64) -> Result<Vec<Shift>> {
    let dependents = plan_dependents(schedule, root)?;
    let mut shifts = Vec::with_capacity(dependents.len());
    for (task_id, cause) in dependents {
        let Some(task) = schedule.get(&task_id) else {
            continue;
        };
        shifts.push(Shift {
            new_start: add_days(task.start_date, days)?,
            new_end: add_days(task.end_date, days)?,
            task_id,
            cause,
        });
    }
    Ok(shifts)
}

/// Apply a plan produced by [`plan`], returning one cascade entry per task.
pub fn apply(schedule: &mut ScheduleStore, shifts: Vec<Shift>, days: i64) -> Vec<Change> {
    let mut changes = Vec::with_capacity(shifts.len());
    for shift in shifts {
        let Some(task) = schedule.get_mut(&shift.task_id) else {
            continue;
        };
        let (old_start, old_end) = (task.start_date, task.end_date);
        task.start_date = shift.new_start;
        task.end_date = shift.new_end;
        changes.push(Change::Cascade {
            task_id: shift.task_id,
            cause: shift.cause,
            days,
            old_start,
            old_end,
            new_start: shift.new_start,
            new_end: shift.new_end,
        });
    }
    changes
}

/// Shift every transitive dependent of `root` by `days`.
///
/// A zero shift is a no-op. The store is left untouched on error.
pub fn propagate(schedule: &mut ScheduleStore, root: &str, days: i64) -> Result<Vec<Change>> {
    if days == 0 {
        return Ok(Vec::new());
    }
    let shifts = plan(schedule, root, days)?;
    Ok(apply(schedule, shifts, days))
}

/// `date + days`, rejecting results outside the representable range
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| Error::Validation(format!("shifting {date} by {days} day(s) overflows")))
}
