//! plansync - Schedule Update Library
//!
//! This library provides the core of the plansync CLI: applying a change to
//! a project's plan documents, cascading it through dependent tasks and
//! pushing the result to GitHub.
//!
//! # Core Concepts
//!
//! - **Stores**: the task store, the schedule store and the issue mapping,
//!   loaded together and validated as one consistent set
//! - **Operations**: extend a deadline, move a start date, delete a task or
//!   change its priority
//! - **Propagation**: date shifts cascade once to every transitive dependent
//! - **Rollup**: five-day weekly windows with cumulative progress
//! - **Transactions**: every mutation is snapshotted and either fully
//!   committed or restored byte-for-byte
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.plansync.toml`
//! - `error`: Error types and result aliases
//! - `document`: Value types that keep documents byte-stable
//! - `task`, `schedule`, `refmap`, `stores`: document models
//! - `storage`: Document locations, loading and persistence
//! - `propagate`: Dependency cascade planning
//! - `mutation`: The four operations
//! - `changelog`: Record of applied changes
//! - `rollup`: Weekly schedule recalculation
//! - `render`: PLAN.md and SCHEDULE.md generation
//! - `snapshot`: Pre-mutation backups and restore
//! - `apply`: Transactional apply followed by sync
//! - `integrations`: GitHub issue tracker bridge
//! - `lock`: File locking and atomic writes

pub mod apply;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod integrations;
pub mod lock;
pub mod mutation;
pub mod output;
pub mod propagate;
pub mod refmap;
pub mod render;
pub mod rollup;
pub mod schedule;
pub mod snapshot;
pub mod storage;
pub mod stores;
pub mod task;

pub use error::{Error, Result};
