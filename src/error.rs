//! Error types for plansync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid input, unknown task, malformed documents)
//! - 4: Operation failed (I/O, lock contention, rolled back mutation)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the plansync CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Which store a lookup was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Tasks,
    Schedule,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Tasks => write!(f, "task store"),
            StoreKind::Schedule => write!(f, "schedule store"),
        }
    }
}

/// Main error type for plansync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{task_id} not found in {store}")]
    NotFound { store: StoreKind, task_id: String },

    #[error("Invalid document {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Never fatal: surfaced as warnings by the sync step
    #[error("Sync failed for {task_id}: {message}")]
    ExternalSync { task_id: String, message: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("{source} (documents restored from backup {})", backup.display())]
    RolledBack {
        backup: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::NotFound { .. }
            | Error::InvalidDocument { .. }
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::RolledBack { source, .. } => source.exit_code(),

            Error::ExternalSync { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True for errors raised before any store was touched.
    pub fn is_pre_mutation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound { .. })
    }

    pub fn not_found(store: StoreKind, task_id: impl Into<String>) -> Self {
        Error::NotFound {
            store,
            task_id: task_id.into(),
        }
    }

    /// Structured details for JSON output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { store, task_id } => Some(serde_json::json!({
                "store": store.to_string(),
                "task_id": task_id,
            })),
            Error::InvalidDocument { path, message } => Some(serde_json::json!({
                "path": path.display().to_string(),
                "message": message,
            })),
            Error::Validation(message)
            | Error::InvalidConfig(message)
            | Error::InvalidArgument(message) => Some(serde_json::json!({ "message": message })),
            Error::ExternalSync { task_id, message } => Some(serde_json::json!({
                "task_id": task_id,
                "message": message,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            Error::RolledBack { backup, source } => Some(serde_json::json!({
                "backup": backup.display().to_string(),
                "restored": true,
                "cause": source.to_string(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for plansync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
