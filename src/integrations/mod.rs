//! External tracker integrations.

pub mod github;
pub mod sync;

pub use github::{GhCli, IssueTracker, ProjectBoard};
pub use sync::{push_changes, SyncReport};
