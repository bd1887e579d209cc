//! Weekly rollup: one five-day working window per week from the project
//! start, the tasks active in each and the cumulative weight completed by its
//! end.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Map;

use crate::document::{Field, Quantity};
use crate::propagate::add_days;
use crate::schedule::{ScheduleStore, ScheduledTask, WeekEntry};

/// Separator between the two dates of a persisted week range
pub const RANGE_SEPARATOR: &str = " 〜 ";

/// Days covered by one window, start inclusive
const WINDOW_DAYS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    /// 1-based week number
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tasks: Vec<String>,
    pub cumulative_progress: f64,
}

impl WeekSummary {
    pub fn label(&self) -> String {
        format!("Week {}", self.index)
    }

    pub fn date_range(&self) -> String {
        format!("{}{RANGE_SEPARATOR}{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeeklyRollup {
    pub weeks: Vec<WeekSummary>,
}

impl WeeklyRollup {
    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// Persisted form for `weeklySchedule`
    pub fn to_entries(&self) -> Vec<WeekEntry> {
        self.weeks
            .iter()
            .map(|week| WeekEntry {
                week: week.label(),
                date_range: week.date_range(),
                tasks: Field::Value(week.tasks.clone()),
                cumulative_progress: Quantity::from(week.cumulative_progress),
                extra: Map::new(),
            })
            .collect()
    }

    /// Progress reached by the final week
    pub fn final_progress(&self) -> f64 {
        self.weeks
            .last()
            .map(|week| week.cumulative_progress)
            .unwrap_or(0.0)
    }
}

/// Build the rollup for `schedule`, starting at `project_start`.
///
/// Weeks are emitted until one covers the latest end date, capped at
/// `max_weeks`. An empty schedule yields an empty rollup.
pub fn recalculate(schedule: &ScheduleStore, project_start: NaiveDate, max_weeks: u32) -> WeeklyRollup {
    let Some(last_end) = schedule.tasks.iter().map(|task| task.end_date).max() else {
        return WeeklyRollup::default();
    };

    let mut weeks = Vec::new();
    for index in 1..=max_weeks {
        let offset = i64::from(index - 1) * 7;
        let (Ok(start), Ok(end)) = (
            add_days(project_start, offset),
            add_days(project_start, offset + WINDOW_DAYS - 1),
        ) else {
            break;
        };

        let tasks = schedule
            .tasks
            .iter()
            .filter(|task| task.overlaps(start, end))
            .map(|task| task.id.clone())
            .collect();
        let completed: f64 = schedule
            .tasks
            .iter()
            .filter(|task| task.end_date <= end)
            .map(ScheduledTask::weight)
            .sum();

        weeks.push(WeekSummary {
            index,
            start,
            end,
            tasks,
            cumulative_progress: round_tenth(completed),
        });

        if end >= last_end {
            break;
        }
    }

    if weeks.last().is_some_and(|week| week.end < last_end) {
        tracing::warn!(max_weeks, %last_end, "schedule runs past the rollup week cap");
    }
    WeeklyRollup { weeks }
}

/// Recompute the rollup and write it back into the store, refreshing every
/// task's week label as well.
pub fn refresh(schedule: &mut ScheduleStore, max_weeks: u32) -> WeeklyRollup {
    let project_start = schedule.project_start_date;
    let rollup = recalculate(schedule, project_start, max_weeks);
    for task in &mut schedule.tasks {
        task.week_number.set(week_label(project_start, task.start_date, task.end_date));
    }
    schedule.weekly_schedule.set(rollup.to_entries());
    rollup
}

/// 1-based week containing `date`; dates before the project start count as
/// week 1
pub fn week_of(project_start: NaiveDate, date: NaiveDate) -> i64 {
    ((date - project_start).num_days().div_euclid(7) + 1).max(1)
}

/// `Week N` when a task fits in one week, `Week N-M` otherwise
pub fn week_label(project_start: NaiveDate, start: NaiveDate, end: NaiveDate) -> String {
    let first = week_of(project_start, start);
    let last = week_of(project_start, end);
    if first == last {
        format!("Week {first}")
    } else {
        format!("Week {first}-{last}")
    }
}

/// First week number in a label such as `Week 3` or `Week 3-4`
pub fn first_week(label: &str) -> Option<u32> {
    let rest = label.trim().strip_prefix("Week")?.trim_start();
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::fixtures::{date, StoresBuilder};

    #[test]
    fn empty_schedule_has_no_weeks() {
        let schedule = ScheduleStore::new(date("2026-01-05"));
        assert!(recalculate(&schedule, date("2026-01-05"), 52).is_empty());
    }

    #[test]
    fn weeks_cover_every_task_and_progress_is_monotonic() {
        let stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 3.0, 10.0, "2026-01-05", &[])
            .task("TASK-B", 4.0, 25.5, "2026-01-09", &["TASK-A"])
            .task("TASK-C", 2.0, 14.5, "2026-01-20", &["TASK-B"])
            .build();
        let rollup = recalculate(&stores.schedule, date("2026-01-05"), 52);

        assert_eq!(rollup.len(), 3);
        let first = &rollup.weeks[0];
        assert_eq!(first.start, date("2026-01-05"));
        assert_eq!(first.end, date("2026-01-09"));
        assert_eq!(first.tasks, vec!["TASK-A", "TASK-B"]);
        assert_eq!(first.cumulative_progress, 10.0);
        assert_eq!(rollup.weeks[1].tasks, vec!["TASK-B"]);
        assert_eq!(rollup.weeks[2].tasks, vec!["TASK-C"]);
        assert_eq!(rollup.weeks[1].cumulative_progress, 35.5);
        assert_eq!(rollup.final_progress(), 50.0);

        for pair in rollup.weeks.windows(2) {
            assert!(pair[0].cumulative_progress <= pair[1].cumulative_progress);
        }
    }

    #[test]
    fn gap_weeks_are_kept_empty() {
        let stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 1.0, 10.0, "2026-01-05", &[])
            .task("TASK-B", 1.0, 10.0, "2026-01-26", &[])
            .build();
        let rollup = recalculate(&stores.schedule, date("2026-01-05"), 52);
        assert_eq!(rollup.len(), 4);
        assert!(rollup.weeks[1].tasks.is_empty());
        assert_eq!(rollup.weeks[1].cumulative_progress, 10.0);
    }

    #[test]
    fn week_cap_is_honoured() {
        let stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 1.0, 10.0, "2026-06-01", &[])
            .build();
        let rollup = recalculate(&stores.schedule, date("2026-01-05"), 4);
        assert_eq!(rollup.len(), 4);
    }

    #[test]
    fn progress_is_rounded_to_one_decimal() {
        let stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 1.0, 0.1, "2026-01-05", &[])
            .task("TASK-B", 1.0, 0.2, "2026-01-05", &[])
            .build();
        let rollup = recalculate(&stores.schedule, date("2026-01-05"), 52);
        assert_eq!(rollup.weeks[0].cumulative_progress, 0.3);
    }

    #[test]
    fn entries_use_label_and_range_format() {
        let stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 2.0, 10.0, "2026-01-05", &[])
            .build();
        let entries = recalculate(&stores.schedule, date("2026-01-05"), 52).to_entries();
        assert_eq!(entries[0].week, "Week 1");
        assert_eq!(entries[0].date_range, "2026-01-05 〜 2026-01-09");
    }

    #[test]
    fn refresh_rewrites_week_labels() {
        let mut stores = StoresBuilder::new("2026-01-05")
            .task("TASK-A", 3.0, 10.0, "2026-01-05", &[])
            .task("TASK-B", 4.0, 10.0, "2026-01-10", &["TASK-A"])
            .build();
        let rollup = refresh(&mut stores.schedule, 52);

        assert_eq!(stores.schedule.weeks().len(), rollup.len());
        assert_eq!(
            stores.schedule.get("TASK-A").unwrap().week_number(),
            Some("Week 1")
        );
        assert_eq!(
            stores.schedule.get("TASK-B").unwrap().week_number(),
            Some("Week 1-2")
        );
    }

    #[test]
    fn first_week_parses_labels() {
        assert_eq!(first_week("Week 3"), Some(3));
        assert_eq!(first_week("Week 3-4"), Some(3));
        assert_eq!(first_week("Sprint 3"), None);
        assert_eq!(week_of(date("2026-01-05"), date("2026-01-01")), 1);
    }
}
