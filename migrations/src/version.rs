//! Version constants for snapshots and the migration journal
//!
//! All version constants are centralized here for maintainability.

use drizzle_types::Dialect;

/// The origin UUID used for the first migration's prev_id
pub const ORIGIN_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Journal version - used in _journal.json
pub const JOURNAL_VERSION: &str = "7";

/// SQLite snapshot version
pub const SQLITE_SNAPSHOT_VERSION: &str = "6";

/// PostgreSQL snapshot version
pub const POSTGRES_SNAPSHOT_VERSION: &str = "7";

/// MySQL snapshot version
pub const MYSQL_SNAPSHOT_VERSION: &str = "5";

/// Get the current snapshot version for a dialect
pub fn snapshot_version(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::SQLite => SQLITE_SNAPSHOT_VERSION,
        Dialect::PostgreSQL => POSTGRES_SNAPSHOT_VERSION,
        Dialect::MySQL => MYSQL_SNAPSHOT_VERSION,
    }
}

/// Check if a snapshot version is supported (not newer than current)
pub fn is_supported_version(dialect: Dialect, version: &str) -> bool {
    let current = snapshot_version(dialect);
    match (version.parse::<u32>(), current.parse::<u32>()) {
        (Ok(v), Ok(current_v)) => v <= current_v,
        _ => false,
    }
}
