//! Generate mode: migration files and history

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use drizzle_types::Dialect;
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

use crate::diff::ChangeSet;
use crate::error::{MigrationError, SnapshotParseError};
use crate::journal::Journal;
use crate::plan::OrderedPlan;
use crate::snapshot::Snapshot;
use crate::words::random_name;

/// Line separating statements in a migration file
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

/// Migration file naming scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPrefix {
    /// `0001_name`
    #[default]
    Index,
    /// `20240115093000_name`
    Timestamp,
    /// Same as `Timestamp`
    Supabase,
    /// `1705311000_name`
    Unix,
    /// `name`
    None,
}

impl MigrationPrefix {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "index" => Some(Self::Index),
            "timestamp" => Some(Self::Timestamp),
            "supabase" => Some(Self::Supabase),
            "unix" => Some(Self::Unix),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// File stem (journal tag) for the migration with 1-based `sequence`
    pub fn file_stem(&self, sequence: u32, name: &str, now: DateTime<Utc>) -> String {
        match self {
            Self::Index => format!("{sequence:04}_{name}"),
            Self::Timestamp | Self::Supabase => {
                format!("{}_{name}", now.format("%Y%m%d%H%M%S"))
            }
            Self::Unix => format!("{}_{name}", now.timestamp()),
            Self::None => name.to_string(),
        }
    }
}

/// Settings the generator consumes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationSettings {
    pub dialect: Dialect,
    /// History directory
    pub out: PathBuf,
    pub prefix: MigrationPrefix,
    /// Separate statements with breakpoint markers
    pub breakpoints: bool,
}

impl MigrationSettings {
    pub fn new(dialect: Dialect, out: impl Into<PathBuf>) -> Self {
        Self {
            dialect,
            out: out.into(),
            prefix: MigrationPrefix::default(),
            breakpoints: true,
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: MigrationPrefix) -> Self {
        self.prefix = prefix;
        self
    }

    #[must_use]
    pub fn breakpoints(mut self, enabled: bool) -> Self {
        self.breakpoints = enabled;
        self
    }
}

/// Files written for one migration
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMigration {
    /// 1-based position in the history
    pub sequence: u32,
    pub tag: String,
    pub sql_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub statements: Vec<String>,
    pub snapshot: Snapshot,
}

/// Join statements the way migration files store them
pub fn render_sql(statements: &[String], breakpoints: bool) -> String {
    let separator = if breakpoints {
        format!("\n{STATEMENT_BREAKPOINT}\n")
    } else {
        "\n".to_string()
    };
    let mut sql = statements.join(&separator);
    if !sql.is_empty() {
        sql.push('\n');
    }
    sql
}

/// Writes migration files and keeps the history chain
#[derive(Clone, Debug)]
pub struct MigrationWriter {
    settings: MigrationSettings,
    now: Option<DateTime<Utc>>,
}

impl MigrationWriter {
    pub fn new(settings: MigrationSettings) -> Self {
        Self {
            settings,
            now: None,
        }
    }

    /// Pin the clock used for file names and journal timestamps
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.settings.out.join("meta")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.meta_dir().join("_journal.json")
    }

    /// Snapshot file of the migration with 1-based `sequence`
    pub fn snapshot_path(&self, sequence: u32) -> PathBuf {
        self.meta_dir().join(format!("{sequence:04}_snapshot.json"))
    }

    pub fn migration_path(&self, tag: &str) -> PathBuf {
        self.settings.out.join(format!("{tag}.sql"))
    }

    pub fn load_journal(&self) -> Result<Journal, MigrationError> {
        Journal::load_or_create(&self.journal_path(), self.settings.dialect)
    }

    /// Latest recorded snapshot, or the origin when the history is empty
    pub fn previous_snapshot(&self) -> Result<Snapshot, MigrationError> {
        let journal = self.load_journal()?;
        let Some(last) = journal.last() else {
            return Ok(Snapshot::origin(self.settings.dialect));
        };

        let path = self.snapshot_path(last.sequence());
        if !path.exists() {
            return Err(SnapshotParseError::new(format!(
                "missing snapshot for migration `{}`",
                last.tag
            ))
            .in_file(path.display().to_string())
            .into());
        }
        Snapshot::load(&path)
    }

    /// Write `plan` as the next migration and record `next` in the history
    ///
    /// `name` is converted to snake case; a random name is used when absent.
    /// An empty plan writes nothing and fails with [`MigrationError::NoChanges`].
    pub fn write(
        &self,
        plan: &OrderedPlan,
        changes: &ChangeSet,
        next: &Snapshot,
        name: Option<&str>,
    ) -> Result<GeneratedMigration, MigrationError> {
        if plan.is_empty() {
            return Err(MigrationError::NoChanges);
        }

        let previous = self.previous_snapshot()?;
        let mut journal = self.load_journal()?;
        let now = self.now.unwrap_or_else(Utc::now);

        let name = match name.map(|n| n.to_snake_case()) {
            Some(n) if !n.is_empty() => n,
            _ => random_name(),
        };
        let sequence = journal.next_idx() + 1;
        let tag = self.settings.prefix.file_stem(sequence, &name, now);

        let statements = plan.statements();
        let sql_path = self.migration_path(&tag);
        write_file(&sql_path, &render_sql(&statements, self.settings.breakpoints))?;

        let mut snapshot = next.chained_after(&previous);
        snapshot.renames = changes.renames.clone();
        let snapshot_path = self.snapshot_path(sequence);
        snapshot.save(&snapshot_path)?;

        journal.add_entry(tag.clone(), self.settings.breakpoints, now.timestamp_millis());
        journal.save(&self.journal_path())?;

        Ok(GeneratedMigration {
            sequence,
            tag,
            sql_path,
            snapshot_path,
            statements,
            snapshot,
        })
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), MigrationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MigrationError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| MigrationError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_file_stems() {
        let now = jan_15();
        assert_eq!(MigrationPrefix::Index.file_stem(3, "init", now), "0003_init");
        assert_eq!(
            MigrationPrefix::Timestamp.file_stem(3, "init", now),
            "20240115093000_init"
        );
        assert_eq!(
            MigrationPrefix::Supabase.file_stem(1, "init", now),
            "20240115093000_init"
        );
        assert_eq!(MigrationPrefix::Unix.file_stem(1, "init", now), "1705311000_init");
        assert_eq!(MigrationPrefix::None.file_stem(7, "init", now), "init");
    }

    #[test]
    fn test_prefix_serde() {
        let prefix: MigrationPrefix = serde_json::from_str("\"supabase\"").unwrap();
        assert_eq!(prefix, MigrationPrefix::Supabase);
        assert_eq!(MigrationPrefix::parse("UNIX"), Some(MigrationPrefix::Unix));
        assert_eq!(MigrationPrefix::parse("weekly"), None);
    }

    #[test]
    fn test_render_sql() {
        let statements = vec!["CREATE TABLE `a` (`id` integer);".to_string(), "DROP TABLE `b`;".to_string()];
        assert_eq!(
            render_sql(&statements, true),
            "CREATE TABLE `a` (`id` integer);\n--> statement-breakpoint\nDROP TABLE `b`;\n"
        );
        assert_eq!(
            render_sql(&statements, false),
            "CREATE TABLE `a` (`id` integer);\nDROP TABLE `b`;\n"
        );
    }
}
