//! Configuration loading and management
//!
//! Handles parsing of the optional `.plansync.toml` file in the project
//! directory. Every key has a default, so a missing file is a valid setup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the config file inside the project directory
pub const CONFIG_FILE: &str = ".plansync.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Document file names, relative to the project directory
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Rollup and propagation policy
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Snapshot location and retention
    #[serde(default)]
    pub backups: BackupsConfig,

    /// GitHub issue tracker bridge
    #[serde(default)]
    pub github: GithubConfig,

    /// Run lock
    #[serde(default)]
    pub lock: LockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_tasks_file")]
    pub tasks: String,
    #[serde(default = "default_schedule_file")]
    pub schedule: String,
    #[serde(default = "default_mapping_file")]
    pub mapping: String,
    #[serde(default = "default_plan_file")]
    pub plan: String,
    #[serde(default = "default_narrative_file")]
    pub schedule_narrative: String,
}

fn default_tasks_file() -> String {
    "tasks.json".to_string()
}

fn default_schedule_file() -> String {
    "schedule.json".to_string()
}

fn default_mapping_file() -> String {
    "github-issue-mapping.json".to_string()
}

fn default_plan_file() -> String {
    "PLAN.md".to_string()
}

fn default_narrative_file() -> String {
    "SCHEDULE.md".to_string()
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            tasks: default_tasks_file(),
            schedule: default_schedule_file(),
            mapping: default_mapping_file(),
            plan: default_plan_file(),
            schedule_narrative: default_narrative_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hard cap on the number of rollup weeks
    #[serde(default = "default_max_weeks")]
    pub max_weeks: u32,

    /// Cascade start-date changes to dependents like deadline extensions do
    #[serde(default = "default_true")]
    pub propagate_start_changes: bool,
}

fn default_max_weeks() -> u32 {
    52
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_weeks: default_max_weeks(),
            propagate_start_changes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupsConfig {
    /// Snapshot root, relative to the project directory
    #[serde(default = "default_backups_dir")]
    pub dir: String,

    /// Number of committed snapshots kept on disk
    #[serde(default = "default_retain")]
    pub retain: usize,
}

fn default_backups_dir() -> String {
    ".backups".to_string()
}

fn default_retain() -> usize {
    20
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            dir: default_backups_dir(),
            retain: default_retain(),
        }
    }
}

/// Owner of the Projects V2 board
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    #[default]
    User,
    Organization,
}

impl OwnerKind {
    /// GraphQL root field for this owner kind
    pub fn graphql_field(self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Organization => "organization",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Sync is skipped entirely when false
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `owner/name` of the repository holding the issues
    #[serde(default)]
    pub repo: String,

    /// Login owning the Projects V2 board
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub owner_kind: OwnerKind,

    /// Projects V2 board number; 0 disables date field sync
    #[serde(default)]
    pub project_number: u32,

    /// Path or name of the GitHub CLI binary
    #[serde(default = "default_gh_bin")]
    pub gh_bin: String,

    #[serde(default = "default_start_field")]
    pub start_field: String,

    #[serde(default = "default_end_field")]
    pub end_field: String,

    /// Comment posted when closing the issue of a deleted task; `{task_id}`
    /// is substituted
    #[serde(default = "default_close_comment")]
    pub close_comment: String,
}

fn default_gh_bin() -> String {
    "gh".to_string()
}

fn default_start_field() -> String {
    "Start Date".to_string()
}

fn default_end_field() -> String {
    "End Date".to_string()
}

fn default_close_comment() -> String {
    "Task {task_id} was deleted from the plan; closing this issue.".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo: String::new(),
            owner: String::new(),
            owner_kind: OwnerKind::default(),
            project_number: 0,
            gh_bin: default_gh_bin(),
            start_field: default_start_field(),
            end_field: default_end_field(),
            close_comment: default_close_comment(),
        }
    }
}

impl GithubConfig {
    /// Sync needs at least a repository to address issues
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.repo.trim().is_empty()
    }

    /// Date field sync additionally needs a board
    pub fn has_board(&self) -> bool {
        self.project_number > 0 && !self.owner.trim().is_empty()
    }

    pub fn render_close_comment(&self, task_id: &str) -> String {
        self.close_comment.replace("{task_id}", task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `.plansync.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the project directory, or return defaults
    /// when no config file exists. A present but invalid file is an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        self.documents.validate()?;
        if self.schedule.max_weeks == 0 {
            return Err(Error::InvalidConfig(
                "schedule.max_weeks must be >= 1".to_string(),
            ));
        }
        if self.backups.dir.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "backups.dir cannot be empty".to_string(),
            ));
        }
        if self.backups.retain == 0 {
            return Err(Error::InvalidConfig(
                "backups.retain must be >= 1".to_string(),
            ));
        }
        self.github.validate()?;
        Ok(())
    }
}

impl DocumentsConfig {
    fn validate(&self) -> Result<()> {
        let entries = [
            ("documents.tasks", &self.tasks),
            ("documents.schedule", &self.schedule),
            ("documents.mapping", &self.mapping),
            ("documents.plan", &self.plan),
            ("documents.schedule_narrative", &self.schedule_narrative),
        ];
        let mut seen = std::collections::HashSet::new();
        for (field, value) in entries {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
            }
            if !seen.insert(trimmed) {
                return Err(Error::InvalidConfig(format!(
                    "{field} duplicates another document path: {trimmed}"
                )));
            }
        }
        Ok(())
    }
}

impl GithubConfig {
    fn validate(&self) -> Result<()> {
        let repo = self.repo.trim();
        if !repo.is_empty() {
            let valid = repo
                .split_once('/')
                .map(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
                .unwrap_or(false);
            if !valid {
                return Err(Error::InvalidConfig(format!(
                    "github.repo must be owner/name (got '{repo}')"
                )));
            }
        }
        if self.gh_bin.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "github.gh_bin cannot be empty".to_string(),
            ));
        }
        if self.start_field.trim().is_empty() || self.end_field.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "github.start_field and github.end_field cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.documents.tasks, "tasks.json");
        assert_eq!(cfg.documents.schedule, "schedule.json");
        assert_eq!(cfg.documents.mapping, "github-issue-mapping.json");
        assert_eq!(cfg.documents.plan, "PLAN.md");
        assert_eq!(cfg.documents.schedule_narrative, "SCHEDULE.md");
        assert_eq!(cfg.schedule.max_weeks, 52);
        assert!(cfg.schedule.propagate_start_changes);
        assert_eq!(cfg.backups.dir, ".backups");
        assert_eq!(cfg.backups.retain, 20);
        assert!(cfg.github.enabled);
        assert_eq!(cfg.github.gh_bin, "gh");
        assert_eq!(cfg.github.start_field, "Start Date");
        assert_eq!(cfg.github.end_field, "End Date");
        assert_eq!(cfg.github.owner_kind, OwnerKind::User);
        assert!(!cfg.github.is_configured());
        assert!(!cfg.github.has_board());
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[documents]
tasks = "data/tasks.json"

[schedule]
max_weeks = 26
propagate_start_changes = false

[backups]
retain = 3

[github]
repo = "acme/migration"
owner = "acme"
owner_kind = "organization"
project_number = 3
close_comment = "closing {task_id}"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load");
        assert_eq!(cfg.documents.tasks, "data/tasks.json");
        assert_eq!(cfg.documents.schedule, "schedule.json");
        assert_eq!(cfg.schedule.max_weeks, 26);
        assert!(!cfg.schedule.propagate_start_changes);
        assert_eq!(cfg.backups.retain, 3);
        assert!(cfg.github.is_configured());
        assert!(cfg.github.has_board());
        assert_eq!(cfg.github.owner_kind.graphql_field(), "organization");
        assert_eq!(cfg.github.render_close_comment("TASK-010"), "closing TASK-010");
    }

    #[test]
    fn invalid_repo_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[github]\nrepo = \"no-slash\"").expect("write config");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn duplicate_document_paths_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[documents]\nplan = \"tasks.json\"").expect("write config");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn load_from_dir_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_dir(dir.path()).expect("load");
        assert_eq!(cfg.schedule.max_weeks, 52);
    }

    #[test]
    fn load_from_dir_surfaces_invalid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), "[schedule]\nmax_weeks = 0").expect("write");
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[github]\nrepo = \"acme/migration\"\n").expect("write");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.github.repo, "acme/migration");
    }
}
