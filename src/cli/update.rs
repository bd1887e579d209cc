//! plansync update command implementation
//!
//! Applies a single operation under the run lock, then reports the change
//! log, the backup taken and any sync warnings.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::apply::{apply, ApplyReport};
use crate::cli::{Project, TaskAction};
use crate::error::{Error, Result};
use crate::integrations::{GhCli, IssueTracker};
use crate::lock::FileLock;
use crate::mutation::Operation;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the update command
pub struct UpdateOptions {
    pub task: String,
    pub extend_deadline: Option<i64>,
    pub start_date: Option<String>,
    pub action: Option<TaskAction>,
    pub priority: Option<String>,
    pub yes: bool,
    pub dir: PathBuf,
    pub no_sync: bool,
    pub output: OutputOptions,
}

impl UpdateOptions {
    fn operation(&self) -> Result<Operation> {
        let task_id = self.task.trim().to_string();
        if task_id.is_empty() {
            return Err(Error::InvalidArgument("--task cannot be empty".to_string()));
        }
        if let Some(days) = self.extend_deadline {
            return Ok(Operation::ExtendDeadline { task_id, days });
        }
        if let Some(start_date) = &self.start_date {
            return Ok(Operation::ChangeStartDate {
                task_id,
                start_date: start_date.trim().to_string(),
            });
        }
        if let Some(TaskAction::Delete) = self.action {
            return Ok(Operation::DeleteTask { task_id });
        }
        if let Some(priority) = &self.priority {
            return Ok(Operation::ChangePriority {
                task_id,
                priority: priority.clone(),
            });
        }
        Err(Error::InvalidArgument(
            "one of --extend-deadline, --start-date, --action, --priority is required".to_string(),
        ))
    }
}

pub fn run(options: UpdateOptions) -> Result<()> {
    let operation = options.operation()?;

    if matches!(operation, Operation::DeleteTask { .. }) && !options.yes {
        let stdin = io::stdin();
        let mut stderr = io::stderr();
        let confirmed = confirm_delete(&mut stdin.lock(), &mut stderr, operation.task_id())?;
        if !confirmed {
            return emit_cancelled(options.output, &operation);
        }
    }

    execute(&options.dir, &operation, options.no_sync, options.output)
}

/// Lock the project, apply `operation` and print the report.
pub(crate) fn execute(
    dir: &std::path::Path,
    operation: &Operation,
    no_sync: bool,
    output: OutputOptions,
) -> Result<()> {
    let project = Project::open(dir)?;
    let _lock = FileLock::acquire(project.storage.lock_file(), project.config.lock.timeout_ms)?;
    let mut stores = project.storage.load_stores()?;

    let github = &project.config.github;
    let unconfigured = !no_sync && github.enabled && !github.is_configured();
    let mut tracker = if !no_sync && github.is_configured() {
        Some(GhCli::new(github))
    } else {
        None
    };

    let report = apply(
        &project.storage,
        &project.config,
        &mut stores,
        operation,
        tracker.as_mut().map(|t| t as &mut dyn IssueTracker),
    )?;

    let mut human = human_report(&report);
    if unconfigured {
        tracing::debug!("github.repo not set; sync skipped");
        human.push_next_step("set github.repo in .plansync.toml to sync issues");
    }
    emit_success(output, "update", &report, Some(&human))
}

fn human_report(report: &ApplyReport) -> HumanOutput {
    let mut human = HumanOutput::new(format!("plansync update: {}", report.operation));
    human.push_summary("task", report.operation.task_id());
    human.push_summary("changes", report.changes.len().to_string());
    human.push_summary("weeks", report.weeks.to_string());
    human.push_summary("backup", report.backup.display().to_string());
    match &report.sync {
        Some(sync) => human.push_summary(
            "sync",
            format!("{} updated, {} closed", sync.updated.len(), sync.closed.len()),
        ),
        None => human.push_summary("sync", "skipped"),
    }

    for line in report.changes.lines() {
        human.push_detail(line);
    }
    for warning in report.warnings() {
        human.push_warning(warning.clone());
    }
    human
}

fn emit_cancelled(output: OutputOptions, operation: &Operation) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Cancelled<'a> {
        operation: &'a Operation,
        cancelled: bool,
    }

    let mut human = HumanOutput::new("plansync update: cancelled");
    human.push_summary("task", operation.task_id());
    human.push_next_step(format!(
        "plansync update --task {} --action delete --yes",
        operation.task_id()
    ));
    emit_success(
        output,
        "update",
        &Cancelled {
            operation,
            cancelled: true,
        },
        Some(&human),
    )
}

/// Ask before deleting; only an explicit `yes` confirms. End of input
/// counts as a refusal.
pub(crate) fn confirm_delete<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
    task_id: &str,
) -> Result<bool> {
    write!(prompt, "Really delete {task_id}? (yes/no): ")?;
    prompt.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn options() -> UpdateOptions {
        UpdateOptions {
            task: " TASK-7 ".to_string(),
            extend_deadline: None,
            start_date: None,
            action: None,
            priority: None,
            yes: false,
            dir: PathBuf::from("."),
            no_sync: true,
            output: OutputOptions {
                json: false,
                quiet: true,
            },
        }
    }

    #[test]
    fn flags_map_to_operations() {
        let mut opts = options();
        opts.extend_deadline = Some(-3);
        assert_eq!(
            opts.operation().unwrap(),
            Operation::ExtendDeadline {
                task_id: "TASK-7".to_string(),
                days: -3
            }
        );

        let mut opts = options();
        opts.action = Some(TaskAction::Delete);
        assert_eq!(
            opts.operation().unwrap(),
            Operation::DeleteTask {
                task_id: "TASK-7".to_string()
            }
        );
    }

    #[test]
    fn missing_change_is_rejected() {
        let err = options().operation().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn delete_needs_explicit_yes() {
        let mut prompt = Vec::new();
        assert!(confirm_delete(&mut Cursor::new("yes\n"), &mut prompt, "TASK-1").unwrap());
        assert!(!confirm_delete(&mut Cursor::new("y\n"), &mut prompt, "TASK-1").unwrap());
        assert!(!confirm_delete(&mut Cursor::new(""), &mut prompt, "TASK-1").unwrap());
        let shown = String::from_utf8(prompt).unwrap();
        assert!(shown.starts_with("Really delete TASK-1? (yes/no): "));
    }
}
