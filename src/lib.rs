//! # drizzle-kit for Rust
//!
//! Schema diffing and migration planning for PostgreSQL, MySQL and SQLite.
//!
//! Two schema snapshots go in; an ordered, classified list of DDL statements
//! comes out, either written as a migration file or pushed to a live database.
//!
//! ```rust
//! use drizzle_kit::migrations::{RenameDecisions, Snapshot, prepare};
//! use drizzle_kit::types::Dialect;
//! use drizzle_kit::types::ddl::{Column, Table};
//!
//! let previous = Snapshot::new(Dialect::SQLite);
//! let next = Snapshot::new(Dialect::SQLite).with_table(
//!     Table::new("users")
//!         .column(Column::new("id", "integer").primary_key())
//!         .column(Column::new("email", "text").not_null()),
//! );
//!
//! let prepared = prepare(&previous, &next, &RenameDecisions::new())?;
//! assert_eq!(prepared.plan.units.len(), 1);
//! assert!(prepared.plan.statements()[0].starts_with("CREATE TABLE `users`"));
//! # Ok::<(), drizzle_kit::migrations::MigrationError>(())
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`types`] | `drizzle-types` | Dialects and the DDL entity model |
//! | [`migrations`] | `drizzle-migrations` | Snapshots, differ, rules, planner, approval gate, emitters |
//!
//! The `drizzle` binary lives in `drizzle-cli`.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rusqlite` | SQLite introspection and push through rusqlite |
//! | `tracing` | Emit planning and execution events through `tracing` |

pub use drizzle_migrations as migrations;
pub use drizzle_types as types;

/// Commonly used items
pub mod prelude {
    pub use drizzle_migrations::{
        ApprovalGate, ApprovalPolicy, ChangeClass, ChangeSet, Differ, MigrationError,
        MigrationSettings, MigrationWriter, OrderedPlan, RenameDecisions, Snapshot, prepare, push,
    };
    pub use drizzle_types::prelude::*;
}
