//! Live database introspection
//!
//! An introspector reads the current structure of a database into the same
//! [`Snapshot`] shape the differ consumes.

pub mod sqlite;

#[cfg(feature = "rusqlite")]
pub use sqlite::RusqliteIntrospector;
pub use sqlite::{
    RawColumnInfo, RawForeignKey, RawIndexColumn, RawIndexInfo, RawTable, SqliteSchemaRows,
    build_snapshot, is_internal_table,
};

use drizzle_types::Dialect;

use crate::error::MigrationError;
use crate::snapshot::Snapshot;

/// Source of a live-database snapshot
pub trait Introspector {
    fn dialect(&self) -> Dialect;

    /// Read the current database structure
    fn introspect(&mut self) -> Result<Snapshot, MigrationError>;
}
