//! Schedule Store: dated projection of the task list (`schedule.json`).
//!
//! Holds per-task start/end dates and week buckets, the precomputed critical
//! path and the derived weekly rollup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Field, Quantity};
use crate::error::{Error, Result};
use crate::task::{effort_days, Priority};

/// Date format used by every document
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Legacy key spellings accepted at load and their canonical names
const LEGACY_KEYS: [(&str, &str); 2] = [
    ("plannedStartDate", "startDate"),
    ("plannedEndDate", "endDate"),
];

/// Parse a `YYYY-MM-DD` date, mapping failures to a validation error
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        Error::Validation(format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
    })
}

/// The dated projection of a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Bucket label such as `Week 2` or `Week 2-3`
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub week_number: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub dependencies: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub effort: Field<Quantity>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub weight: Field<Quantity>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub priority: Field<Priority>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduledTask {
    pub fn new(id: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            start_date,
            end_date,
            week_number: Field::Absent,
            dependencies: Field::Absent,
            effort: Field::Absent,
            weight: Field::Absent,
            priority: Field::Absent,
            extra: Map::new(),
        }
    }

    pub fn effort(&self) -> Option<f64> {
        self.effort.get().map(Quantity::get)
    }

    /// Effort in whole calendar days (at least one)
    pub fn effort_days(&self) -> i64 {
        effort_days(self.effort().unwrap_or(1.0))
    }

    pub fn weight(&self) -> f64 {
        self.weight.get().map_or(0.0, Quantity::get)
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority.get().copied()
    }

    pub fn week_number(&self) -> Option<&str> {
        self.week_number.get().map(String::as_str)
    }

    pub fn dependencies(&self) -> &[String] {
        self.dependencies.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn depends_on(&self, task_id: &str) -> bool {
        self.dependencies().iter().any(|dep| dep == task_id)
    }

    pub fn remove_dependency(&mut self, task_id: &str) -> bool {
        let Some(dependencies) = self.dependencies.get_mut() else {
            return false;
        };
        let before = dependencies.len();
        dependencies.retain(|dep| dep != task_id);
        before != dependencies.len()
    }

    /// Whether `[start, end]` intersects `[from, to]`
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date >= from
    }
}

/// One persisted week of the weekly rollup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntry {
    pub week: String,
    pub date_range: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub tasks: Field<Vec<String>>,
    pub cumulative_progress: Quantity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeekEntry {
    pub fn tasks(&self) -> &[String] {
        self.tasks.get().map(Vec::as_slice).unwrap_or_default()
    }
}

/// The whole schedule document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStore {
    pub project_start_date: NaiveDate,
    pub tasks: Vec<ScheduledTask>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub weekly_schedule: Field<Vec<WeekEntry>>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub critical_path: Field<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduleStore {
    pub fn new(project_start_date: NaiveDate) -> Self {
        Self {
            project_start_date,
            tasks: Vec::new(),
            weekly_schedule: Field::Absent,
            critical_path: Field::Absent,
            extra: Map::new(),
        }
    }

    /// Parse a schedule document, normalizing legacy key spellings first
    pub fn from_value(mut value: Value) -> std::result::Result<Self, String> {
        normalize_legacy_keys(&mut value)?;
        serde_json::from_value(value).map_err(|err| err.to_string())
    }

    /// Stored weekly rollup, empty when the document has none
    pub fn weeks(&self) -> &[WeekEntry] {
        self.weekly_schedule.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn critical_path(&self) -> &[String] {
        self.critical_path.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn get(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn get_mut(&mut self, task_id: &str) -> Option<&mut ScheduledTask> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.get(task_id).is_some()
    }

    pub fn remove(&mut self, task_id: &str) -> Option<ScheduledTask> {
        let index = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    /// Ids of tasks listing `task_id` as a direct dependency, in document order
    pub fn direct_dependents(&self, task_id: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|task| task.depends_on(task_id))
            .map(|task| task.id.clone())
            .collect()
    }

    /// Earliest start and latest end across all scheduled tasks
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.tasks.iter().map(|task| task.start_date).min()?;
        let end = self.tasks.iter().map(|task| task.end_date).max()?;
        Some((start, end))
    }
}

/// Rewrite legacy date keys on every scheduled task to their canonical names.
///
/// A record that carries both spellings is rejected rather than guessed at.
fn normalize_legacy_keys(value: &mut Value) -> std::result::Result<(), String> {
    let Some(tasks) = value.get_mut("tasks").and_then(Value::as_array_mut) else {
        return Ok(());
    };

    for task in tasks {
        let Some(record) = task.as_object_mut() else {
            continue;
        };
        for (legacy, canonical) in LEGACY_KEYS {
            let Some(legacy_value) = record.remove(legacy) else {
                continue;
            };
            if record.contains_key(canonical) {
                let id = record
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown>");
                return Err(format!(
                    "task {id} has both '{legacy}' and '{canonical}'"
                ));
            }
            record.insert(canonical.to_string(), legacy_value);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn parse_date_rejects_impossible_dates() {
        assert_eq!(date("2026-02-10"), NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());
        assert!(matches!(parse_date("2026-13-40"), Err(Error::Validation(_))));
        assert!(matches!(parse_date("10/02/2026"), Err(Error::Validation(_))));
    }

    #[test]
    fn legacy_keys_are_normalized() {
        let raw = json!({
            "projectStartDate": "2026-01-06",
            "tasks": [
                { "id": "TASK-001", "plannedStartDate": "2026-01-06", "plannedEndDate": "2026-01-08" }
            ]
        });
        let store = ScheduleStore::from_value(raw).unwrap();
        let task = store.get("TASK-001").unwrap();
        assert_eq!(task.start_date, date("2026-01-06"));
        assert_eq!(task.end_date, date("2026-01-08"));

        let written = serde_json::to_value(&store).unwrap();
        assert!(written["tasks"][0].get("plannedStartDate").is_none());
        assert_eq!(written["tasks"][0]["startDate"], json!("2026-01-06"));
    }

    #[test]
    fn both_spellings_are_rejected() {
        let raw = json!({
            "projectStartDate": "2026-01-06",
            "tasks": [{
                "id": "TASK-001",
                "startDate": "2026-01-06",
                "plannedStartDate": "2026-01-07",
                "endDate": "2026-01-08"
            }]
        });
        let err = ScheduleStore::from_value(raw).unwrap_err();
        assert!(err.contains("TASK-001"));
    }

    #[test]
    fn untouched_document_writes_back_unchanged() {
        let raw = json!({
            "projectStartDate": "2026-01-06",
            "tasks": [{
                "id": "TASK-001",
                "title": "Inventory",
                "startDate": "2026-01-06",
                "endDate": "2026-01-07",
                "weekNumber": null,
                "effort": 2.0
            }]
        });
        let store = ScheduleStore::from_value(raw.clone()).unwrap();
        let task = store.get("TASK-001").unwrap();
        assert!(task.dependencies().is_empty());
        assert_eq!(task.effort_days(), 2);
        assert!(store.weeks().is_empty());
        assert!(store.critical_path().is_empty());
        assert_eq!(serde_json::to_value(&store).unwrap(), raw);
        assert!(serde_json::to_string(&store).unwrap().contains(r#""effort":2.0"#));
    }

    #[test]
    fn missing_project_start_fails() {
        let raw = json!({ "tasks": [] });
        assert!(ScheduleStore::from_value(raw).is_err());
    }

    #[test]
    fn direct_dependents_follow_document_order() {
        let mut store = ScheduleStore::new(date("2026-01-06"));
        let mut b = ScheduledTask::new("TASK-B", date("2026-01-09"), date("2026-01-10"));
        b.dependencies.set(vec!["TASK-A".to_string()]);
        let mut c = ScheduledTask::new("TASK-C", date("2026-01-09"), date("2026-01-10"));
        c.dependencies.set(vec!["TASK-A".to_string()]);
        store.tasks.push(ScheduledTask::new("TASK-A", date("2026-01-06"), date("2026-01-08")));
        store.tasks.push(c);
        store.tasks.push(b);

        assert_eq!(store.direct_dependents("TASK-A"), vec!["TASK-C", "TASK-B"]);
        assert_eq!(store.span(), Some((date("2026-01-06"), date("2026-01-10"))));
    }
}
