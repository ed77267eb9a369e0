//! Error taxonomy for the migration engine
//!
//! Structural and planning errors are raised before any statement runs.
//! Execution errors carry the boundary between applied and pending work.

use std::fmt;

use crate::diff::RenameProposal;

/// Malformed or version-incompatible snapshot / history file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("snapshot error{}: {message}", origin_label(.origin))]
pub struct SnapshotParseError {
    /// File or label the snapshot came from, if known
    pub origin: Option<String>,
    /// What is wrong
    pub message: String,
}

fn origin_label(origin: &Option<String>) -> String {
    origin
        .as_ref()
        .map(|s| format!(" in {s}"))
        .unwrap_or_default()
}

impl SnapshotParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            origin: None,
            message: message.into(),
        }
    }

    pub(crate) fn in_file(self, origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            ..self
        }
    }
}

/// Rename proposals the caller has not (validly) decided
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {}", describe_proposals(.proposals))]
pub struct AmbiguousRenameError {
    pub reason: String,
    pub proposals: Vec<RenameProposal>,
}

fn describe_proposals(proposals: &[RenameProposal]) -> String {
    proposals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A change the target dialect cannot express incrementally
///
/// Carried as a plan warning; the change is skipped, never applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported change `{change}`: {reason}")]
pub struct UnsupportedChange {
    pub change: String,
    pub reason: String,
}

/// Dependency cycle left after deferring foreign keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot order migration statements, cycle between: {}", .blocked.join(", "))]
pub struct PlanningCycleError {
    pub blocked: Vec<String>,
}

/// Driver failure while pushing a plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("statement {position} failed: {message}\n  {statement}")]
pub struct ExecutionError {
    /// 1-based position of the failing statement in the plan
    pub position: usize,
    /// Failing statement text
    pub statement: String,
    /// Driver message, verbatim
    pub message: String,
    /// Statements that completed before the failure
    pub applied: Vec<String>,
    /// Statements that never ran (including rolled back ones)
    pub not_applied: Vec<String>,
}

/// Error reported by a database driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Migration engine errors
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotParseError),

    #[error(transparent)]
    AmbiguousRename(#[from] AmbiguousRenameError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedChange),

    #[error(transparent)]
    PlanningCycle(#[from] PlanningCycleError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("snapshot dialects differ: previous is {previous}, next is {next}")]
    DialectMismatch {
        previous: drizzle_types::Dialect,
        next: drizzle_types::Dialect,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No schema changes detected")]
    NoChanges,
}

impl MigrationError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
