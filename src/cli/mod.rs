//! Command-line interface for plansync
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::storage::Storage;

mod check;
mod interactive;
mod rollup;
mod update;

pub use interactive::prompt_operation;

/// plansync - schedule update orchestrator
///
/// Applies one change to the project's task and schedule documents,
/// cascades it through dependent tasks, regenerates the plan documents and
/// pushes the new dates to GitHub.
#[derive(Parser, Debug)]
#[command(name = "plansync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project directory holding the plan documents
    #[arg(long, global = true, env = "PLANSYNC_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Skip pushing changes to GitHub
    #[arg(long, global = true)]
    pub no_sync: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply one change to a task
    #[command(group(
        ArgGroup::new("change")
            .required(true)
            .args(["extend_deadline", "start_date", "action", "priority"])
    ))]
    Update {
        /// Target task ID (e.g. TASK-007)
        #[arg(long)]
        task: String,

        /// Move the task's end date by N days (negative shortens)
        #[arg(long, allow_negative_numbers = true, value_name = "DAYS")]
        extend_deadline: Option<i64>,

        /// New start date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        start_date: Option<String>,

        /// Action to perform on the task
        #[arg(long, value_enum)]
        action: Option<TaskAction>,

        /// New priority: high, medium or low
        #[arg(long)]
        priority: Option<String>,

        /// Do not ask for confirmation before deleting
        #[arg(short, long)]
        yes: bool,
    },

    /// Choose an operation from a menu
    Interactive,

    /// Print the recomputed weekly rollup without writing anything
    Rollup,

    /// Load and validate every document
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskAction {
    /// Remove the task from every store
    Delete,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Update {
                task,
                extend_deadline,
                start_date,
                action,
                priority,
                yes,
            } => update::run(update::UpdateOptions {
                task,
                extend_deadline,
                start_date,
                action,
                priority,
                yes,
                dir: self.dir,
                no_sync: self.no_sync,
                output,
            }),
            Commands::Interactive => interactive::run(interactive::InteractiveOptions {
                dir: self.dir,
                no_sync: self.no_sync,
                output,
            }),
            Commands::Rollup => rollup::run(rollup::RollupOptions {
                dir: self.dir,
                output,
            }),
            Commands::Check => check::run(check::CheckOptions {
                dir: self.dir,
                output,
            }),
        }
    }
}

/// Configuration and document locations for one project directory
pub(crate) struct Project {
    pub config: Config,
    pub storage: Storage,
}

impl Project {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "project directory not found: {}",
                dir.display()
            )));
        }
        let config = Config::load_from_dir(dir)?;
        let storage = Storage::new(dir.to_path_buf(), &config);
        tracing::debug!(dir = %dir.display(), "project opened");
        Ok(Self { config, storage })
    }
}
