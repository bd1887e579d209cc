//! External Reference Map: task id -> issue number in the tracker
//! (`github-issue-mapping.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReferenceMap {
    entries: BTreeMap<String, String>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task_id: &str) -> Option<&str> {
        self.entries.get(task_id).map(String::as_str)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.entries.contains_key(task_id)
    }

    pub fn insert(&mut self, task_id: impl Into<String>, external_id: impl Into<String>) {
        self.entries.insert(task_id.into(), external_id.into());
    }

    pub fn remove(&mut self, task_id: &str) -> Option<String> {
        self.entries.remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
