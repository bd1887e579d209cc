//! Generated Markdown documents: the plan (`PLAN.md`) and the schedule
//! narrative (`SCHEDULE.md`).
//!
//! Both are pure functions of the stores so a rerun with unchanged stores
//! produces identical bytes.

use std::fmt::Write as _;

use crate::document::Quantity;
use crate::error::Result;
use crate::schedule::ScheduledTask;
use crate::storage::Storage;
use crate::stores::Stores;
use crate::task::{Priority, Task};

const UNPHASED: &str = "Unphased";
const UNCATEGORIZED: &str = "Other";

fn priority_marker(priority: Option<Priority>) -> &'static str {
    match priority {
        Some(Priority::High) => "🔴",
        Some(Priority::Medium) => "🟡",
        Some(Priority::Low) => "🟢",
        None => "⚪",
    }
}

/// Task joined with its schedule entry, if any
struct Row<'a> {
    task: &'a Task,
    scheduled: Option<&'a ScheduledTask>,
}

impl Row<'_> {
    fn dates(&self) -> String {
        match self.scheduled {
            Some(s) => format!("{} 〜 {}", s.start_date, s.end_date),
            None => "unscheduled".to_string(),
        }
    }

    fn dependencies(&self) -> String {
        let dependencies = self.task.dependencies();
        if dependencies.is_empty() {
            "-".to_string()
        } else {
            dependencies.join(", ")
        }
    }
}

fn rows(stores: &Stores) -> Vec<Row<'_>> {
    stores
        .tasks
        .tasks
        .iter()
        .map(|task| Row {
            task,
            scheduled: stores.schedule.get(&task.id),
        })
        .collect()
}

/// Group values by key, keeping first-appearance order of keys
fn group_by<'a, T>(items: &'a [T], key: impl Fn(&T) -> &'a str) -> Vec<(&'a str, Vec<&'a T>)> {
    let mut groups: Vec<(&str, Vec<&T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(name, _)| *name == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

/// Render `PLAN.md`
pub fn render_plan(stores: &Stores) -> String {
    let mut out = String::new();
    let name = &stores.tasks.project.name;
    let rows = rows(stores);

    let _ = writeln!(out, "# {name} - Project Plan\n");
    let _ = writeln!(out, "## Overview\n");
    let _ = writeln!(out, "- **Project**: {name}");
    match stores.schedule.span() {
        Some((start, end)) => {
            let days = (end - start).num_days() + 1;
            let _ = writeln!(out, "- **Start**: {start}");
            let _ = writeln!(out, "- **End**: {end}");
            let _ = writeln!(
                out,
                "- **Duration**: {} week(s), {days} day(s)",
                stores.schedule.weeks().len()
            );
        }
        None => {
            let _ = writeln!(out, "- **Start**: TBD");
            let _ = writeln!(out, "- **End**: TBD");
        }
    }
    let effort: f64 = stores.tasks.tasks.iter().map(Task::effort).sum();
    let hours: f64 = stores.tasks.tasks.iter().filter_map(Task::effort_hours).sum();
    let _ = writeln!(out, "- **Tasks**: {}", stores.tasks.tasks.len());
    let _ = writeln!(
        out,
        "- **Total effort**: {} day(s) ({} hour(s))",
        Quantity::from(effort),
        Quantity::from(hours)
    );
    let _ = writeln!(out, "- **Total weight**: {}%\n", Quantity::from(stores.tasks.total_weight()));

    let _ = writeln!(out, "## Work Breakdown Structure\n");
    for (phase, members) in group_by(&rows, |row| row.task.phase().unwrap_or(UNPHASED)) {
        let phase_effort: f64 = members.iter().map(|row| row.task.effort()).sum();
        let phase_weight: f64 = members.iter().map(|row| row.task.weight()).sum();
        let _ = writeln!(
            out,
            "### {phase} ({} day(s), {}%)\n",
            Quantity::from(phase_effort),
            Quantity::from(phase_weight)
        );

        for (category, tasks) in group_by(&members, |row| {
            row.task.category().unwrap_or(UNCATEGORIZED)
        }) {
            let _ = writeln!(out, "#### {category}\n");
            let _ = writeln!(out, "| ID | Task | Priority | Effort | Dates | Depends on |");
            let _ = writeln!(out, "|----|------|----------|--------|-------|------------|");
            for row in tasks {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {}d | {} | {} |",
                    row.task.id,
                    row.task.title,
                    row.task.priority,
                    Quantity::from(row.task.effort()),
                    row.dates(),
                    row.dependencies()
                );
            }
            out.push('\n');
        }
    }

    let _ = writeln!(out, "## Milestones\n");
    if stores.schedule.weeks().is_empty() {
        let _ = writeln!(out, "No scheduled weeks.\n");
    } else {
        let _ = writeln!(out, "| Week | Dates | Tasks | Cumulative progress |");
        let _ = writeln!(out, "|------|-------|-------|---------------------|");
        for week in stores.schedule.weeks() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {}% |",
                week.week,
                week.date_range,
                week.tasks().len(),
                Quantity::from(week.cumulative_progress.get())
            );
        }
        out.push('\n');
    }

    let critical_path = stores.schedule.critical_path();
    if !critical_path.is_empty() {
        let _ = writeln!(out, "## Critical Path\n");
        let _ = writeln!(out, "{}\n", critical_path.join(" → "));
    }

    out
}

/// Render `SCHEDULE.md`
pub fn render_schedule(stores: &Stores) -> String {
    let mut out = String::new();
    let name = &stores.tasks.project.name;

    let _ = writeln!(out, "# {name} - Schedule\n");
    let _ = writeln!(out, "## Project Period\n");
    match stores.schedule.span() {
        Some((start, end)) => {
            let _ = writeln!(out, "- **Start**: {start}");
            let _ = writeln!(out, "- **End**: {end}");
        }
        None => {
            let _ = writeln!(out, "- **Start**: TBD");
            let _ = writeln!(out, "- **End**: TBD");
        }
    }
    let _ = writeln!(out, "- **Scheduled tasks**: {}", stores.schedule.tasks.len());
    let _ = writeln!(out, "- **Weeks**: {}\n", stores.schedule.weeks().len());

    let _ = writeln!(out, "## Weekly Schedule\n");
    for week in stores.schedule.weeks() {
        let _ = writeln!(out, "### {} ({})\n", week.week, week.date_range);
        let _ = writeln!(
            out,
            "- **Cumulative progress**: {}%",
            Quantity::from(week.cumulative_progress.get())
        );
        let _ = writeln!(out, "- **Tasks**: {}\n", week.tasks().len());
        for task_id in week.tasks() {
            let Some(scheduled) = stores.schedule.get(task_id) else {
                continue;
            };
            let task = stores.tasks.get(task_id);
            let title = task.map(|t| t.title.as_str()).unwrap_or("");
            let priority = task.map(|t| t.priority).or(scheduled.priority());
            let _ = writeln!(out, "- {} **{task_id}**: {title}", priority_marker(priority));
            if let Some(category) = task.and_then(Task::category) {
                let _ = writeln!(out, "  - Category: {category}");
            }
            let _ = writeln!(
                out,
                "  - Dates: {} 〜 {} ({} day(s))",
                scheduled.start_date,
                scheduled.end_date,
                scheduled.effort_days()
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Task Details\n");
    for row in rows(stores) {
        let task = row.task;
        let _ = writeln!(
            out,
            "### {} {}: {}\n",
            priority_marker(Some(task.priority)),
            task.id,
            task.title
        );
        if let Some(description) = task.description().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "{description}\n");
        }
        let _ = writeln!(out, "- **Phase**: {}", task.phase().unwrap_or(UNPHASED));
        if let Some(category) = task.category() {
            let _ = writeln!(out, "- **Category**: {category}");
        }
        let _ = writeln!(out, "- **Priority**: {}", task.priority);
        let _ = writeln!(out, "- **Effort**: {} day(s)", Quantity::from(task.effort()));
        let _ = writeln!(out, "- **Weight**: {}%", Quantity::from(task.weight()));
        let _ = writeln!(out, "- **Dates**: {}", row.dates());
        if let Some(week) = row.scheduled.and_then(|s| s.week_number()) {
            let _ = writeln!(out, "- **Week**: {week}");
        }
        if !task.dependencies().is_empty() {
            let _ = writeln!(out, "- **Depends on**: {}", task.dependencies().join(", "));
        }
        out.push('\n');
    }

    out
}

/// Rewrite both generated documents.
pub fn regenerate(storage: &Storage, stores: &Stores) -> Result<()> {
    storage.write_document(&storage.plan_file(), &render_plan(stores))?;
    storage.write_document(&storage.narrative_file(), &render_schedule(stores))?;
    tracing::debug!("plan documents regenerated");
    Ok(())
}
