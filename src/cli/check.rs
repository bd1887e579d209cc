//! plansync check command implementation

use std::path::PathBuf;

use crate::cli::Project;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the check command
pub struct CheckOptions {
    pub dir: PathBuf,
    pub output: OutputOptions,
}

pub fn run(options: CheckOptions) -> Result<()> {
    let project = Project::open(&options.dir)?;
    let stores = project.storage.load_stores()?;
    let stats = stores.stats();

    let mut human = HumanOutput::new("plansync check: documents are valid");
    human.push_summary("project", stores.tasks.project.name.clone());
    human.push_summary("tasks", stats.tasks.to_string());
    human.push_summary("scheduled", stats.scheduled.to_string());
    human.push_summary("linked issues", stats.mapped.to_string());
    human.push_summary("weeks", stats.weeks.to_string());
    for task_id in &stats.unscheduled {
        human.push_warning(format!("{task_id} has no schedule entry"));
    }
    for task_id in &stats.stale_refs {
        human.push_warning(format!("issue mapping for unknown task {task_id}"));
    }
    if project.config.github.is_configured() && stats.mapped < stats.tasks {
        human.push_next_step("link the remaining tasks in the issue mapping to sync them");
    }

    emit_success(options.output, "check", &stats, Some(&human))
}
