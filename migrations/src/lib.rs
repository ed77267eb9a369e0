//! Drizzle Migrations - schema diffing and migration planning
//!
//! This crate turns two schema [`Snapshot`]s into an ordered, classified
//! list of DDL statements for PostgreSQL, MySQL or SQLite:
//!
//! 1. [`diff`](diff::diff) compares the snapshots into a [`ChangeSet`]; possible
//!    renames are proposed and settled through [`Differ::resolve_renames`]
//! 2. a per-dialect [`DialectRules`] object renders each entry, or reports it
//!    as unsupported, or asks for a table rebuild
//! 3. the [planner](plan) orders the rendered statements by their dependencies
//! 4. [`classify`] grades each unit and the [`ApprovalGate`] settles
//!    confirmations for destructive ones
//! 5. an emitter writes a migration file ([`MigrationWriter`]) or runs the plan
//!    against a connection ([`push`](emit::push))
//!
//! # Generate
//!
//! ```ignore
//! use drizzle_migrations::{MigrationSettings, MigrationWriter, RenameDecisions, prepare};
//! use drizzle_types::Dialect;
//!
//! let writer = MigrationWriter::new(MigrationSettings::new(Dialect::SQLite, "./drizzle"));
//! let previous = writer.previous_snapshot()?;
//! let prepared = prepare(&previous, &declared, &RenameDecisions::new())?;
//! let written = writer.write(&prepared.plan, &prepared.changes, &declared, Some("init"))?;
//! println!("{}", written.sql_path.display());
//! ```
//!
//! # Push
//!
//! ```ignore
//! use drizzle_migrations::{ApprovalGate, ApprovalPolicy, NonInteractive, push};
//!
//! let gate = ApprovalGate::new(ApprovalPolicy::Confirm);
//! let report = push(&prepared.plan, &gate, &mut NonInteractive, &mut conn)?;
//! ```

mod tracing;

pub mod classify;
pub mod diff;
pub mod emit;
pub mod error;
pub mod introspect;
pub mod journal;
pub mod pipeline;
pub mod plan;
pub mod rules;
pub mod snapshot;
pub mod version;
pub mod words;

pub use classify::{
    ApprovalGate, ApprovalPolicy, ApprovalState, ChangeClass, ConfirmationDecision,
    ConfirmationProvider, GateOutcome, NonInteractive, ReviewedUnit, ScriptedConfirmations,
    classify, classify_entry, is_narrowing_type_change,
};
pub use diff::{
    ChangeSet, ChangeSetEntry, Differ, RenameDecision, RenameDecisions, RenameKind,
    RenameProposal, TableName,
};
pub use emit::{
    Executor, GeneratedMigration, MigrationPrefix, MigrationSettings, MigrationWriter,
    PushOutcome, PushReport, push,
};
pub use error::{
    AmbiguousRenameError, DriverError, ExecutionError, MigrationError, PlanningCycleError,
    SnapshotParseError, UnsupportedChange,
};
pub use introspect::Introspector;
pub use journal::{Journal, JournalEntry};
pub use pipeline::{PreparedMigration, plan_change_set, prepare, prepare_changes};
pub use plan::{OrderedPlan, PlanUnit, PlanWarning, UnitOrigin};
pub use rules::{DialectRules, RenderResult, TableRebuildPlan, rules_for};
pub use snapshot::Snapshot;
pub use version::{
    JOURNAL_VERSION, MYSQL_SNAPSHOT_VERSION, ORIGIN_UUID, POSTGRES_SNAPSHOT_VERSION,
    SQLITE_SNAPSHOT_VERSION, is_supported_version, snapshot_version,
};
