//! Schema snapshots
//!
//! A [`Snapshot`] is the full description of a schema state at one point in
//! history. It is produced from the declared schema, read back from the
//! migration history, or built by an introspector from a live database. The
//! engine treats snapshots as read-only inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use drizzle_types::Dialect;
use drizzle_types::ddl::{Constraint, EnumType, Sequence, Table};
use drizzle_types::naming::qualified_name;
use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, SnapshotParseError};
use crate::version::{ORIGIN_UUID, is_supported_version, snapshot_version};

/// PostgreSQL's default namespace; tables in it are keyed without a schema
pub const DEFAULT_PG_SCHEMA: &str = "public";

/// Key of the table `name` in `schema`, with PostgreSQL's default namespace
/// left implicit as it is in [`Snapshot::tables`]
pub fn table_key(dialect: Dialect, schema: Option<&str>, name: &str) -> String {
    let schema = schema.filter(|s| !(dialect == Dialect::PostgreSQL && *s == DEFAULT_PG_SCHEMA));
    qualified_name(schema, name)
}

/// Full schema state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version
    pub version: String,
    /// Database dialect
    pub dialect: Dialect,
    /// Unique snapshot ID
    pub id: String,
    /// Previous snapshot IDs
    pub prev_ids: Vec<String>,
    /// Tables by qualified name
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    /// Standalone sequences by qualified name
    #[serde(default)]
    pub sequences: BTreeMap<String, Sequence>,
    /// Enum types by qualified name
    #[serde(default)]
    pub enums: BTreeMap<String, EnumType>,
    /// Non-default schemas
    #[serde(default)]
    pub schemas: BTreeSet<String>,
    /// Confirmed renames that led to this state
    #[serde(default)]
    pub renames: Vec<String>,
}

impl Snapshot {
    /// Create an empty snapshot chained to the origin
    pub fn new(dialect: Dialect) -> Self {
        Self {
            version: snapshot_version(dialect).to_string(),
            dialect,
            id: uuid::Uuid::new_v4().to_string(),
            prev_ids: vec![ORIGIN_UUID.to_string()],
            tables: BTreeMap::new(),
            sequences: BTreeMap::new(),
            enums: BTreeMap::new(),
            schemas: BTreeSet::new(),
            renames: Vec::new(),
        }
    }

    /// The empty starting state every history begins from
    pub fn origin(dialect: Dialect) -> Self {
        Self {
            id: ORIGIN_UUID.to_string(),
            prev_ids: Vec::new(),
            ..Self::new(dialect)
        }
    }

    /// Add a table, replacing any table with the same qualified name
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.insert_table(table);
        self
    }

    /// Add a standalone sequence
    #[must_use]
    pub fn with_sequence(mut self, mut sequence: Sequence) -> Self {
        sequence.schema = self.namespace(sequence.schema.take());
        self.sequences.insert(sequence.key(), sequence);
        self
    }

    /// Add an enum type
    #[must_use]
    pub fn with_enum(mut self, mut enum_type: EnumType) -> Self {
        enum_type.schema = self.namespace(enum_type.schema.take());
        self.enums.insert(enum_type.key(), enum_type);
        self
    }

    /// Declare a schema
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        if let Some(schema) = self.namespace(Some(schema.into())) {
            self.schemas.insert(schema);
        }
        self
    }

    /// Insert a table under its qualified name
    pub fn insert_table(&mut self, mut table: Table) {
        table.schema = self.namespace(table.schema.take());
        self.tables.insert(table.key(), table);
    }

    fn namespace(&self, schema: Option<String>) -> Option<String> {
        match schema {
            Some(s) if self.dialect == Dialect::PostgreSQL && s == DEFAULT_PG_SCHEMA => None,
            other => other,
        }
    }

    /// Get a table by qualified name
    pub fn table(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    /// Returns `true` if the snapshot describes no objects at all
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.sequences.is_empty()
            && self.enums.is_empty()
            && self.schemas.is_empty()
    }

    /// Copy of `self` chained after `previous` with a fresh id
    #[must_use]
    pub fn chained_after(&self, previous: &Snapshot) -> Self {
        Self {
            version: snapshot_version(self.dialect).to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            prev_ids: vec![previous.id.clone()],
            ..self.clone()
        }
    }

    /// Check the no-dangling-reference invariant
    pub fn validate(&self) -> Result<(), SnapshotParseError> {
        for name in self
            .tables
            .values()
            .filter_map(|t| t.schema.as_deref())
            .chain(self.sequences.values().filter_map(|s| s.schema.as_deref()))
            .chain(self.enums.values().filter_map(|e| e.schema.as_deref()))
        {
            if !self.schemas.contains(name) {
                return Err(SnapshotParseError::new(format!(
                    "schema `{name}` is used but not declared"
                )));
            }
        }

        for (key, table) in &self.tables {
            if *key != table.key() {
                return Err(SnapshotParseError::new(format!(
                    "table `{}` is stored under key `{key}`",
                    table.key()
                )));
            }
            self.validate_table(table)?;
        }
        Ok(())
    }

    fn validate_table(&self, table: &Table) -> Result<(), SnapshotParseError> {
        let err = |msg: String| SnapshotParseError::new(format!("table `{}`: {msg}", table.key()));

        let mut seen = BTreeSet::new();
        for column in &table.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(err(format!("duplicate column `{}`", column.name)));
            }
            if column.value_source_count() > 1 {
                return Err(err(format!(
                    "column `{}` has more than one of default, identity and generated",
                    column.name
                )));
            }
        }

        let mut names = BTreeSet::new();
        for index in &table.indexes {
            if !names.insert(index.name.as_str()) {
                return Err(err(format!("duplicate index `{}`", index.name)));
            }
            for col in index.columns.iter().filter(|c| !c.is_expression) {
                if table.column_named(&col.value).is_none() {
                    return Err(err(format!(
                        "index `{}` references missing column `{}`",
                        index.name, col.value
                    )));
                }
            }
        }

        let mut names = BTreeSet::new();
        for constraint in &table.constraints {
            if !names.insert(constraint.diff_key()) {
                return Err(err(format!("duplicate constraint `{}`", constraint.name())));
            }
            for col in constraint.columns() {
                if table.column_named(col).is_none() {
                    return Err(err(format!(
                        "constraint `{}` references missing column `{col}`",
                        constraint.name()
                    )));
                }
            }
            if let Constraint::ForeignKey {
                table_to,
                schema_to,
                columns_to,
                ..
            } = constraint
            {
                let schema = self.namespace(schema_to.clone().or_else(|| table.schema.clone()));
                let target_key = qualified_name(schema.as_deref(), table_to);
                let target = self.tables.get(&target_key).ok_or_else(|| {
                    err(format!(
                        "foreign key `{}` references missing table `{target_key}`",
                        constraint.name()
                    ))
                })?;
                if let Some(missing) = columns_to.iter().find(|c| target.column_named(c).is_none()) {
                    return Err(err(format!(
                        "foreign key `{}` references missing column `{target_key}.{missing}`",
                        constraint.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotParseError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SnapshotParseError::new(e.to_string()))?;

        let dialect_str = raw
            .get("dialect")
            .and_then(|d| d.as_str())
            .ok_or_else(|| SnapshotParseError::new("missing `dialect`"))?;
        let dialect = Dialect::parse(dialect_str)
            .ok_or_else(|| SnapshotParseError::new(format!("unknown dialect `{dialect_str}`")))?;

        let version = raw
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SnapshotParseError::new("missing `version`"))?;
        if !is_supported_version(dialect, version) {
            return Err(SnapshotParseError::new(format!(
                "unsupported {dialect} snapshot version `{version}` (latest is {})",
                snapshot_version(dialect)
            )));
        }

        let snapshot: Self =
            serde_json::from_value(raw).map_err(|e| SnapshotParseError::new(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents = std::fs::read_to_string(path).map_err(|e| MigrationError::io(path, e))?;
        Self::from_json(&contents)
            .map_err(|e| e.in_file(path.display().to_string()).into())
    }

    /// Save to a snapshot file, creating parent directories
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
