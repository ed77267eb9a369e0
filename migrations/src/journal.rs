//! Journal types for tracking generated migrations
//!
//! The journal (`meta/_journal.json`) lists every migration in history order.

use std::path::Path;

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, SnapshotParseError};
use crate::version::{JOURNAL_VERSION, snapshot_version};

/// Migration journal - tracks all migrations
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Journal {
    /// Journal format version
    pub version: String,
    /// Database dialect
    pub dialect: Dialect,
    /// List of migration entries
    pub entries: Vec<JournalEntry>,
}

/// A single migration entry in the journal
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    /// Migration index (0-based)
    pub idx: u32,
    /// Snapshot version used for this migration
    pub version: String,
    /// Unix timestamp in milliseconds when the migration was created
    pub when: i64,
    /// Migration tag, the SQL file stem (e.g. "0001_bold_wolf")
    pub tag: String,
    /// Whether SQL statement breakpoints are enabled
    pub breakpoints: bool,
}

impl JournalEntry {
    /// 1-based sequence number used in file names
    pub fn sequence(&self) -> u32 {
        self.idx + 1
    }
}

impl Journal {
    /// Create a new journal for the given dialect
    pub fn new(dialect: Dialect) -> Self {
        Self {
            version: JOURNAL_VERSION.to_string(),
            dialect,
            entries: Vec::new(),
        }
    }

    /// Get the next migration index
    pub fn next_idx(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Last recorded entry
    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    /// Add a new entry created at `when_ms`
    pub fn add_entry(&mut self, tag: String, breakpoints: bool, when_ms: i64) -> JournalEntry {
        let entry = JournalEntry {
            idx: self.next_idx(),
            version: snapshot_version(self.dialect).to_string(),
            when: when_ms,
            tag,
            breakpoints,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Load journal from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SnapshotParseError> {
        serde_json::from_str(json).map_err(|e| SnapshotParseError::new(e.to_string()))
    }

    /// Serialize journal to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load journal from file
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents = std::fs::read_to_string(path).map_err(|e| MigrationError::io(path, e))?;
        Self::from_json(&contents).map_err(|e| e.in_file(path.display().to_string()).into())
    }

    /// Load journal from file, or create new if it doesn't exist
    pub fn load_or_create(path: &Path, dialect: Dialect) -> Result<Self, MigrationError> {
        if !path.exists() {
            return Ok(Self::new(dialect));
        }
        let journal = Self::load(path)?;
        if journal.dialect != dialect {
            return Err(MigrationError::DialectMismatch {
                previous: journal.dialect,
                next: dialect,
            });
        }
        Ok(journal)
    }

    /// Save journal to file
    pub fn save(&self, path: &Path) -> Result<(), MigrationError> {
        let json = self
            .to_json()
            .map_err(|e| SnapshotParseError::new(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MigrationError::io(parent, e))?;
        }

        std::fs::write(path, json).map_err(|e| MigrationError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sqlite_journal() {
        let journal = Journal::new(Dialect::SQLite);
        assert_eq!(journal.version, "7");
        assert_eq!(journal.dialect, Dialect::SQLite);
        assert!(journal.entries.is_empty());
    }

    #[test]
    fn test_add_entry() {
        let mut journal = Journal::new(Dialect::SQLite);
        let entry = journal.add_entry("0001_initial".to_string(), true, 1_700_000_000_000);

        assert_eq!(journal.entries.len(), 1);
        assert_eq!(entry.idx, 0);
        assert_eq!(entry.sequence(), 1);
        assert_eq!(entry.version, "6");
        assert!(entry.breakpoints);
        assert_eq!(journal.next_idx(), 1);
    }

    #[test]
    fn test_dialect_mismatch_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_journal.json");
        Journal::new(Dialect::SQLite).save(&path).unwrap();

        assert!(Journal::load_or_create(&path, Dialect::SQLite).is_ok());
        assert!(matches!(
            Journal::load_or_create(&path, Dialect::MySQL),
            Err(MigrationError::DialectMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_journal() {
        assert!(Journal::from_json("{\"version\": 7}").is_err());
    }
}
