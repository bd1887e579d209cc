//! plansync rollup command implementation
//!
//! Recomputes the weekly rollup from the current schedule and prints it.
//! Nothing is written.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::Project;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::rollup::{self, WeeklyRollup};

/// Options for the rollup command
pub struct RollupOptions {
    pub dir: PathBuf,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct RollupReport {
    project_start: chrono::NaiveDate,
    weeks: WeeklyRollup,
    /// True when the stored `weeklySchedule` differs from the recomputed one
    stale: bool,
}

pub fn run(options: RollupOptions) -> Result<()> {
    let project = Project::open(&options.dir)?;
    let stores = project.storage.load_stores()?;
    let schedule = &stores.schedule;

    let weeks = rollup::recalculate(
        schedule,
        schedule.project_start_date,
        project.config.schedule.max_weeks,
    );
    let stale = weeks.to_entries() != schedule.weeks();

    let mut human = HumanOutput::new("plansync rollup");
    human.push_summary("project start", schedule.project_start_date.to_string());
    human.push_summary("weeks", weeks.len().to_string());
    human.push_summary("final progress", format!("{}%", weeks.final_progress()));
    for week in &weeks.weeks {
        human.push_detail(format!(
            "{} ({}): {} task(s), {}%",
            week.label(),
            week.date_range(),
            week.tasks.len(),
            week.cumulative_progress
        ));
    }
    if stale {
        human.push_warning("stored weekly schedule is out of date");
        human.push_next_step("apply any update to rewrite it");
    }

    let report = RollupReport {
        project_start: schedule.project_start_date,
        weeks,
        stale,
    };
    emit_success(options.output, "rollup", &report, Some(&human))
}
