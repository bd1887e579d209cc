//! Best-effort push of committed changes to the issue tracker.
//!
//! Every tracker call is attempted once. Failures become warnings; nothing
//! here can fail the run or touch the local documents.

use serde::Serialize;

use crate::changelog::ChangeLog;
use crate::config::GithubConfig;
use crate::error::Error;
use crate::integrations::github::{IssueTracker, ProjectBoard};
use crate::rollup::first_week;
use crate::stores::Stores;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// Tasks whose issue was updated without error
    pub updated: Vec<String>,
    /// Tasks whose issue was closed
    pub closed: Vec<String>,
    pub warnings: Vec<String>,
}

impl SyncReport {
    fn warn(&mut self, task_id: &str, message: impl Into<String>) {
        let warning = Error::ExternalSync {
            task_id: task_id.to_string(),
            message: message.into(),
        };
        tracing::warn!(%warning, "tracker sync");
        self.warnings.push(warning.to_string());
    }
}

enum Board {
    NotFetched,
    Ready(ProjectBoard),
    Unavailable,
}

/// Push milestones and board dates for every rescheduled task and close the
/// issues of deleted tasks.
pub fn push_changes(
    tracker: &mut dyn IssueTracker,
    config: &GithubConfig,
    stores: &Stores,
    changes: &ChangeLog,
) -> SyncReport {
    let mut report = SyncReport::default();
    let mut board = Board::NotFetched;

    for task_id in changes.rescheduled() {
        let Some(issue) = stores.refs.get(&task_id) else {
            report.warn(&task_id, "no linked issue; skipped");
            continue;
        };
        let Some(scheduled) = stores.schedule.get(&task_id) else {
            continue;
        };

        let mut ok = true;
        match scheduled.week_number().and_then(first_week) {
            Some(week) => {
                let milestone = format!("Week {week}");
                if let Err(err) = tracker.set_milestone(issue, &milestone) {
                    report.warn(&task_id, format!("milestone {milestone}: {err}"));
                    ok = false;
                }
            }
            None => {
                report.warn(&task_id, "no week label; milestone not updated");
                ok = false;
            }
        }

        if config.has_board() {
            if let Board::NotFetched = board {
                board = match tracker.project_board() {
                    Ok(fetched) => Board::Ready(fetched),
                    Err(err) => {
                        report.warn(&task_id, format!("project board unavailable: {err}"));
                        Board::Unavailable
                    }
                };
            }
            match &board {
                Board::Ready(fetched) => {
                    let dates = [
                        (config.start_field.as_str(), scheduled.start_date),
                        (config.end_field.as_str(), scheduled.end_date),
                    ];
                    match fetched.item_for_issue(issue) {
                        Some(item) => {
                            for (field_name, date) in dates {
                                let Some(field) = fetched.field(field_name) else {
                                    report.warn(&task_id, format!("board has no '{field_name}' field"));
                                    ok = false;
                                    continue;
                                };
                                if let Err(err) =
                                    tracker.set_date_field(&fetched.project_id, item, field, date)
                                {
                                    report.warn(&task_id, format!("{field_name}: {err}"));
                                    ok = false;
                                }
                            }
                        }
                        None => {
                            report.warn(&task_id, format!("issue #{issue} is not on the project board"));
                            ok = false;
                        }
                    }
                }
                Board::Unavailable | Board::NotFetched => ok = false,
            }
        }

        if ok {
            report.updated.push(task_id);
        }
    }

    for (task_id, issue) in changes.unlinked() {
        let comment = config.render_close_comment(&task_id);
        match tracker.close_issue(&issue, &comment) {
            Ok(()) => report.closed.push(task_id),
            Err(err) => report.warn(&task_id, format!("closing issue #{issue}: {err}")),
        }
    }

    tracing::info!(
        updated = report.updated.len(),
        closed = report.closed.len(),
        warnings = report.warnings.len(),
        "tracker sync finished"
    );
    report
}
