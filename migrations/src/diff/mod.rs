//! Structural snapshot diffing
//!
//! [`diff`] compares two snapshots entity by entity, keyed by qualified name
//! at each level, and produces a [`ChangeSet`]. Drops and creates that look
//! like renames are never guessed: they are attached to the change-set as
//! [`RenameProposal`]s and must be resolved through [`Differ`].

mod rename;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use drizzle_types::Dialect;
use drizzle_types::ddl::{
    Column, Constraint, ConstraintKind, EnumType, GeneratedSpec, Index, Sequence, SequenceOptions,
    SequenceParam, Table,
};
use drizzle_types::naming::qualified_name;

use crate::snapshot::Snapshot;

pub use rename::{Differ, RenameDecision, RenameDecisions, RenameKind, RenameProposal};

/// Schema-qualified table name
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Name of `table`
    pub fn of(table: &Table) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
        }
    }

    /// Qualified key, as used by [`Snapshot::tables`]
    pub fn key(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// What changed about a generated column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratedChange {
    /// A plain column became generated
    Added,
    /// A generated column became plain
    Dropped,
    /// The expression changed (the mode may have changed too)
    Expression,
    /// Only the storage mode changed
    Mode,
}

/// Sequence targeted by an `AlterSequence` entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceTarget {
    /// Standalone sequence
    Standalone { schema: Option<String>, name: String },
    /// Sequence owned by an identity column
    Identity {
        table: TableName,
        column: String,
        sequence_name: String,
    },
}

impl SequenceTarget {
    /// Qualified sequence name
    pub fn key(&self) -> String {
        match self {
            Self::Standalone { schema, name } => qualified_name(schema.as_deref(), name),
            Self::Identity {
                table,
                sequence_name,
                ..
            } => qualified_name(table.schema.as_deref(), sequence_name),
        }
    }
}

/// One structural difference between two snapshots
///
/// Every entry carries enough of the old and new state to render DDL
/// without consulting the snapshots again.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeSetEntry {
    CreateSchema {
        name: String,
    },
    DropSchema {
        name: String,
    },
    CreateEnum(EnumType),
    DropEnum(EnumType),
    AlterEnum {
        enum_type: EnumType,
        /// Added values, each with the value it follows
        added: Vec<(String, Option<String>)>,
    },
    CreateSequence(Sequence),
    DropSequence(Sequence),
    AlterSequence {
        sequence: SequenceTarget,
        /// Full new parameter set
        options: SequenceOptions,
        /// Only the parameters that changed
        changes: Vec<SequenceParam>,
    },
    CreateTable(Table),
    DropTable(Table),
    RenameTable {
        from: TableName,
        to: TableName,
    },
    AddColumn {
        table: TableName,
        column: Column,
    },
    DropColumn {
        table: TableName,
        column: Column,
    },
    RenameColumn {
        table: TableName,
        from: String,
        to: String,
    },
    AlterColumnType {
        table: TableName,
        previous: Column,
        next: Column,
    },
    AlterColumnNullability {
        table: TableName,
        previous: Column,
        next: Column,
    },
    AlterColumnDefault {
        table: TableName,
        previous: Column,
        next: Column,
    },
    AlterColumnGenerated {
        table: TableName,
        change: GeneratedChange,
        previous: Column,
        next: Column,
    },
    AlterColumnIdentity {
        table: TableName,
        previous: Column,
        next: Column,
    },
    AddIndex {
        table: TableName,
        index: Index,
    },
    DropIndex {
        table: TableName,
        index: Index,
    },
    AddConstraint {
        table: TableName,
        constraint: Constraint,
    },
    DropConstraint {
        table: TableName,
        constraint: Constraint,
    },
}

impl ChangeSetEntry {
    /// Key of the table the entry operates on, if any
    pub fn table_key(&self) -> Option<String> {
        match self {
            Self::CreateTable(t) | Self::DropTable(t) => Some(t.key()),
            Self::RenameTable { to, .. } => Some(to.key()),
            Self::AlterSequence {
                sequence: SequenceTarget::Identity { table, .. },
                ..
            } => Some(table.key()),
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::AlterColumnNullability { table, .. }
            | Self::AlterColumnDefault { table, .. }
            | Self::AlterColumnGenerated { table, .. }
            | Self::AlterColumnIdentity { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddConstraint { table, .. }
            | Self::DropConstraint { table, .. } => Some(table.key()),
            _ => None,
        }
    }

    /// Table, previous and next column of a column alteration
    pub fn column_alteration(&self) -> Option<(&TableName, &Column, &Column)> {
        match self {
            Self::AlterColumnType {
                table,
                previous,
                next,
            }
            | Self::AlterColumnNullability {
                table,
                previous,
                next,
            }
            | Self::AlterColumnDefault {
                table,
                previous,
                next,
            }
            | Self::AlterColumnGenerated {
                table,
                previous,
                next,
                ..
            }
            | Self::AlterColumnIdentity {
                table,
                previous,
                next,
            } => Some((table, previous, next)),
            _ => None,
        }
    }

    /// Returns `true` for renames, which run before any rebuild of their table
    pub fn is_rename(&self) -> bool {
        matches!(self, Self::RenameTable { .. } | Self::RenameColumn { .. })
    }
}

impl fmt::Display for ChangeSetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateSchema { name } => write!(f, "create schema {name}"),
            Self::DropSchema { name } => write!(f, "drop schema {name}"),
            Self::CreateEnum(e) => write!(f, "create enum {}", e.key()),
            Self::DropEnum(e) => write!(f, "drop enum {}", e.key()),
            Self::AlterEnum { enum_type, added } => write!(
                f,
                "add {} value(s) to enum {}",
                added.len(),
                enum_type.key()
            ),
            Self::CreateSequence(s) => write!(f, "create sequence {}", s.key()),
            Self::DropSequence(s) => write!(f, "drop sequence {}", s.key()),
            Self::AlterSequence { sequence, .. } => write!(f, "alter sequence {}", sequence.key()),
            Self::CreateTable(t) => write!(f, "create table {}", t.key()),
            Self::DropTable(t) => write!(f, "drop table {}", t.key()),
            Self::RenameTable { from, to } => write!(f, "rename table {from} to {to}"),
            Self::AddColumn { table, column } => write!(f, "add column {table}.{}", column.name),
            Self::DropColumn { table, column } => write!(f, "drop column {table}.{}", column.name),
            Self::RenameColumn { table, from, to } => {
                write!(f, "rename column {table}.{from} to {to}")
            }
            Self::AlterColumnType {
                table,
                previous,
                next,
            } => write!(
                f,
                "alter column {table}.{} type {} -> {}",
                next.name, previous.sql_type, next.sql_type
            ),
            Self::AlterColumnNullability { table, next, .. } => write!(
                f,
                "alter column {table}.{} {}",
                next.name,
                if next.not_null { "set not null" } else { "drop not null" }
            ),
            Self::AlterColumnDefault { table, next, .. } => {
                write!(f, "alter column {table}.{} default", next.name)
            }
            Self::AlterColumnGenerated {
                table,
                change,
                next,
                ..
            } => write!(
                f,
                "alter column {table}.{} generated ({})",
                next.name,
                match change {
                    GeneratedChange::Added => "added",
                    GeneratedChange::Dropped => "dropped",
                    GeneratedChange::Expression => "expression",
                    GeneratedChange::Mode => "mode",
                }
            ),
            Self::AlterColumnIdentity { table, next, .. } => {
                write!(f, "alter column {table}.{} identity", next.name)
            }
            Self::AddIndex { table, index } => write!(f, "create index {} on {table}", index.name),
            Self::DropIndex { table, index } => write!(f, "drop index {} on {table}", index.name),
            Self::AddConstraint { table, constraint } => write!(
                f,
                "add {} {} on {table}",
                constraint.kind().as_str(),
                constraint.name()
            ),
            Self::DropConstraint { table, constraint } => write!(
                f,
                "drop {} {} on {table}",
                constraint.kind().as_str(),
                constraint.name()
            ),
        }
    }
}

/// Before and after state of a table that exists in both snapshots
#[derive(Clone, Debug, PartialEq)]
pub struct TableTransition {
    /// Previous state, with accepted renames already applied
    pub before: Table,
    pub after: Table,
}

/// Typed list of structural differences between two snapshots
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeSet {
    pub dialect: Dialect,
    pub entries: Vec<ChangeSetEntry>,
    /// Altered tables by qualified key
    pub transitions: BTreeMap<String, TableTransition>,
    /// Rename proposals still waiting for a decision
    pub ambiguous: Vec<RenameProposal>,
    /// Accepted renames (`table:<from>:<to>`, `column:<table>:<from>:<to>`)
    pub renames: Vec<String>,
}

impl ChangeSet {
    /// Returns `true` if nothing changed and nothing is ambiguous
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.ambiguous.is_empty()
    }

    /// Transition of an altered table
    pub fn transition(&self, table_key: &str) -> Option<&TableTransition> {
        self.transitions.get(table_key)
    }
}

/// Compare two snapshots
///
/// Pure and deterministic. Possible renames are attached as
/// [`ChangeSet::ambiguous`] and the affected entities appear as plain drops
/// and creates; use [`Differ::resolve_renames`] to settle them.
pub fn diff(previous: &Snapshot, next: &Snapshot) -> ChangeSet {
    let differ = Differ::new(previous, next);
    let mut changes = compare(previous, next);
    changes.ambiguous = differ.propose_renames();
    changes
}

/// Plain structural comparison, with no rename handling
pub(crate) fn compare(previous: &Snapshot, next: &Snapshot) -> ChangeSet {
    let mut entries = Vec::new();
    let mut transitions = BTreeMap::new();

    for name in next.schemas.difference(&previous.schemas) {
        entries.push(ChangeSetEntry::CreateSchema { name: name.clone() });
    }

    diff_enums(&previous.enums, &next.enums, &mut entries);
    diff_sequences(&previous.sequences, &next.sequences, &mut entries);

    for (key, table) in &next.tables {
        match previous.tables.get(key) {
            None => {
                entries.push(ChangeSetEntry::CreateTable(table.clone()));
                let name = TableName::of(table);
                entries.extend(table.indexes.iter().map(|index| ChangeSetEntry::AddIndex {
                    table: name.clone(),
                    index: index.clone(),
                }));
            }
            Some(before) => {
                let start = entries.len();
                diff_table(before, table, &mut entries);
                if entries.len() > start {
                    transitions.insert(
                        key.clone(),
                        TableTransition {
                            before: before.clone(),
                            after: table.clone(),
                        },
                    );
                }
            }
        }
    }

    for (key, table) in &previous.tables {
        if !next.tables.contains_key(key) {
            entries.push(ChangeSetEntry::DropTable(table.clone()));
        }
    }

    for name in previous.schemas.difference(&next.schemas) {
        entries.push(ChangeSetEntry::DropSchema { name: name.clone() });
    }

    ChangeSet {
        dialect: next.dialect,
        entries,
        transitions,
        ambiguous: Vec::new(),
        renames: Vec::new(),
    }
}

fn diff_enums(
    previous: &BTreeMap<String, EnumType>,
    next: &BTreeMap<String, EnumType>,
    entries: &mut Vec<ChangeSetEntry>,
) {
    for (key, enum_type) in next {
        match previous.get(key) {
            None => entries.push(ChangeSetEntry::CreateEnum(enum_type.clone())),
            Some(before) if before.values == enum_type.values => {}
            Some(before) => match enum_type.added_values(before) {
                Some(added) => entries.push(ChangeSetEntry::AlterEnum {
                    enum_type: enum_type.clone(),
                    added,
                }),
                None => {
                    entries.push(ChangeSetEntry::DropEnum(before.clone()));
                    entries.push(ChangeSetEntry::CreateEnum(enum_type.clone()));
                }
            },
        }
    }
    for (key, enum_type) in previous {
        if !next.contains_key(key) {
            entries.push(ChangeSetEntry::DropEnum(enum_type.clone()));
        }
    }
}

fn diff_sequences(
    previous: &BTreeMap<String, Sequence>,
    next: &BTreeMap<String, Sequence>,
    entries: &mut Vec<ChangeSetEntry>,
) {
    for (key, sequence) in next {
        match previous.get(key) {
            None => entries.push(ChangeSetEntry::CreateSequence(sequence.clone())),
            Some(before) => {
                let changes = sequence.options.changed_params(&before.options);
                if !changes.is_empty() {
                    entries.push(ChangeSetEntry::AlterSequence {
                        sequence: SequenceTarget::Standalone {
                            schema: sequence.schema.clone(),
                            name: sequence.name.clone(),
                        },
                        options: sequence.options,
                        changes,
                    });
                }
            }
        }
    }
    for (key, sequence) in previous {
        if !next.contains_key(key) {
            entries.push(ChangeSetEntry::DropSequence(sequence.clone()));
        }
    }
}

/// Primary key as a constraint, synthesizing one from inline column flags
///
/// Inline keys get the name PostgreSQL gives them (`<table>_pkey`).
fn effective_primary_key(table: &Table) -> Option<Constraint> {
    if let Some(pk) = table.primary_key() {
        return Some(pk.clone());
    }
    let columns = table.primary_key_columns();
    (!columns.is_empty())
        .then(|| Constraint::primary_key(&table.name, &columns).named(format!("{}_pkey", table.name)))
}

fn diff_table(before: &Table, after: &Table, entries: &mut Vec<ChangeSetEntry>) {
    let name = TableName::of(after);

    // Drops first, so column and index names can be reused within one change
    for index in &before.indexes {
        let kept = after
            .index_named(&index.name)
            .is_some_and(|i| i.same_definition(index));
        if !kept {
            entries.push(ChangeSetEntry::DropIndex {
                table: name.clone(),
                index: index.clone(),
            });
        }
    }

    let after_constraints: BTreeMap<String, &Constraint> = after
        .constraints
        .iter()
        .filter(|c| c.kind() != ConstraintKind::PrimaryKey)
        .map(|c| (c.diff_key(), c))
        .collect();
    let before_constraints: BTreeMap<String, &Constraint> = before
        .constraints
        .iter()
        .filter(|c| c.kind() != ConstraintKind::PrimaryKey)
        .map(|c| (c.diff_key(), c))
        .collect();

    for (key, constraint) in &before_constraints {
        let kept = after_constraints
            .get(key)
            .is_some_and(|c| c.same_definition(constraint));
        if !kept {
            entries.push(ChangeSetEntry::DropConstraint {
                table: name.clone(),
                constraint: (*constraint).clone(),
            });
        }
    }

    let pk_before = effective_primary_key(before);
    let pk_after = effective_primary_key(after);
    let pk_changed = match (&pk_before, &pk_after) {
        (Some(a), Some(b)) => !a.same_definition(b),
        (None, None) => false,
        _ => true,
    };
    if pk_changed && let Some(pk) = &pk_before {
        entries.push(ChangeSetEntry::DropConstraint {
            table: name.clone(),
            constraint: pk.clone(),
        });
    }

    let after_columns: BTreeSet<&str> = after.columns.iter().map(|c| c.name.as_str()).collect();
    for column in &before.columns {
        if !after_columns.contains(column.name.as_str()) {
            entries.push(ChangeSetEntry::DropColumn {
                table: name.clone(),
                column: column.clone(),
            });
        }
    }

    for column in &after.columns {
        match before.column_named(&column.name) {
            None => entries.push(ChangeSetEntry::AddColumn {
                table: name.clone(),
                column: column.clone(),
            }),
            Some(previous) => diff_column(&name, previous, column, entries),
        }
    }

    if pk_changed && let Some(pk) = pk_after {
        entries.push(ChangeSetEntry::AddConstraint {
            table: name.clone(),
            constraint: pk,
        });
    }

    for (key, constraint) in &after_constraints {
        let kept = before_constraints
            .get(key)
            .is_some_and(|c| c.same_definition(constraint));
        if !kept {
            entries.push(ChangeSetEntry::AddConstraint {
                table: name.clone(),
                constraint: (*constraint).clone(),
            });
        }
    }

    for index in &after.indexes {
        let kept = before
            .index_named(&index.name)
            .is_some_and(|i| i.same_definition(index));
        if !kept {
            entries.push(ChangeSetEntry::AddIndex {
                table: name.clone(),
                index: index.clone(),
            });
        }
    }
}

fn diff_column(table: &TableName, previous: &Column, next: &Column, entries: &mut Vec<ChangeSetEntry>) {
    let alter = || (table.clone(), previous.clone(), next.clone());

    if !previous.sql_type.trim().eq_ignore_ascii_case(next.sql_type.trim())
        || previous.autoincrement != next.autoincrement
    {
        let (table, previous, next) = alter();
        entries.push(ChangeSetEntry::AlterColumnType {
            table,
            previous,
            next,
        });
    }

    if previous.not_null != next.not_null {
        let (table, previous, next) = alter();
        entries.push(ChangeSetEntry::AlterColumnNullability {
            table,
            previous,
            next,
        });
    }

    if !previous.same_default(next) {
        let (table, previous, next) = alter();
        entries.push(ChangeSetEntry::AlterColumnDefault {
            table,
            previous,
            next,
        });
    }

    if let Some(change) = generated_change(previous.generated.as_ref(), next.generated.as_ref()) {
        let (table, previous, next) = alter();
        entries.push(ChangeSetEntry::AlterColumnGenerated {
            table,
            change,
            previous,
            next,
        });
    }

    match (&previous.identity, &next.identity) {
        (None, None) => {}
        (Some(a), Some(b)) if a.kind == b.kind && a.sequence_name == b.sequence_name => {
            let changes = b.options.changed_params(&a.options);
            if !changes.is_empty() {
                entries.push(ChangeSetEntry::AlterSequence {
                    sequence: SequenceTarget::Identity {
                        table: table.clone(),
                        column: next.name.clone(),
                        sequence_name: b.owned_sequence_name(&table.name, &next.name),
                    },
                    options: b.options,
                    changes,
                });
            }
        }
        _ => {
            let (table, previous, next) = alter();
            entries.push(ChangeSetEntry::AlterColumnIdentity {
                table,
                previous,
                next,
            });
        }
    }
}

/// Generated-spec comparison: equal iff normalized expressions and modes match
pub fn generated_change(
    previous: Option<&GeneratedSpec>,
    next: Option<&GeneratedSpec>,
) -> Option<GeneratedChange> {
    match (previous, next) {
        (None, None) => None,
        (None, Some(_)) => Some(GeneratedChange::Added),
        (Some(_), None) => Some(GeneratedChange::Dropped),
        (Some(a), Some(b)) if !a.same_expression(b) => Some(GeneratedChange::Expression),
        (Some(a), Some(b)) if a.mode != b.mode => Some(GeneratedChange::Mode),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_types::ddl::{GeneratedMode, IdentitySpec};

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("email", "text").not_null())
    }

    fn snap(tables: Vec<Table>) -> Snapshot {
        tables
            .into_iter()
            .fold(Snapshot::new(Dialect::SQLite), Snapshot::with_table)
    }

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let a = snap(vec![users()]);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn test_create_and_drop_table() {
        let changes = diff(&snap(vec![]), &snap(vec![users().index(Index::on("users", &["email"]))]));
        assert!(matches!(changes.entries[0], ChangeSetEntry::CreateTable(_)));
        assert!(matches!(changes.entries[1], ChangeSetEntry::AddIndex { .. }));

        let changes = diff(&snap(vec![users()]), &snap(vec![]));
        assert_eq!(changes.entries.len(), 1);
        assert!(matches!(changes.entries[0], ChangeSetEntry::DropTable(_)));
    }

    #[test]
    fn test_add_column() {
        let next = snap(vec![users().column(Column::new("bio", "text"))]);
        let changes = diff(&snap(vec![users()]), &next);
        assert_eq!(changes.entries.len(), 1);
        assert_eq!(changes.entries[0].to_string(), "add column users.bio");
        assert!(changes.transition("users").is_some());
    }

    #[test]
    fn test_column_alterations() {
        let before = snap(vec![Table::new("t").column(Column::new("a", "varchar(20)"))]);
        let after = snap(vec![Table::new("t").column(
            Column::new("a", "varchar(10)").not_null().default_literal("'x'"),
        )]);
        let changes = diff(&before, &after);
        let names: Vec<String> = changes.entries.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "alter column t.a type varchar(20) -> varchar(10)",
                "alter column t.a set not null",
                "alter column t.a default",
            ]
        );
    }

    #[test]
    fn test_generated_formatting_is_not_a_change() {
        let before = snap(vec![Table::new("t")
            .column(Column::new("a", "integer"))
            .column(Column::new("b", "integer").generated(GeneratedSpec::stored("a * 2")))]);
        let after = snap(vec![Table::new("t")
            .column(Column::new("a", "integer"))
            .column(Column::new("b", "integer").generated(GeneratedSpec::stored("(\"a\"*2)")))]);
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn test_generated_mode_and_expression_are_distinct() {
        let stored = GeneratedSpec::stored("a*2");
        let virt = GeneratedSpec::virtual_("a*2");
        let other = GeneratedSpec::new("a*3", GeneratedMode::Stored);
        assert_eq!(generated_change(Some(&virt), Some(&stored)), Some(GeneratedChange::Mode));
        assert_eq!(
            generated_change(Some(&stored), Some(&other)),
            Some(GeneratedChange::Expression)
        );
        assert_eq!(generated_change(None, Some(&stored)), Some(GeneratedChange::Added));
        assert_eq!(generated_change(Some(&stored), None), Some(GeneratedChange::Dropped));
        assert_eq!(generated_change(Some(&stored), Some(&stored.clone())), None);
    }

    #[test]
    fn test_identity_parameter_change_is_sequence_alter() {
        let col = |inc| {
            Column::new("id", "integer").identity(
                IdentitySpec::always().options(SequenceOptions::default().increment(inc)),
            )
        };
        let before = Snapshot::new(Dialect::PostgreSQL).with_table(Table::new("t").column(col(1)));
        let after = Snapshot::new(Dialect::PostgreSQL).with_table(Table::new("t").column(col(2)));
        let changes = diff(&before, &after);
        assert_eq!(changes.entries.len(), 1);
        match &changes.entries[0] {
            ChangeSetEntry::AlterSequence {
                sequence, changes, ..
            } => {
                assert_eq!(sequence.key(), "t_id_seq");
                assert_eq!(changes, &vec![SequenceParam::Increment(Some(2))]);
            }
            other => panic!("unexpected entry {other}"),
        }
    }

    #[test]
    fn test_primary_key_change() {
        let before = snap(vec![users()]);
        let after = snap(vec![Table::new("users")
            .column(Column::new("id", "integer").not_null())
            .column(Column::new("email", "text").not_null())
            .constraint(Constraint::primary_key("users", &["id", "email"]))]);
        let names: Vec<String> = diff(&before, &after)
            .entries
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec!["drop primary key users_pkey on users", "add primary key users_pk on users"]
        );
    }

    #[test]
    fn test_changed_index_is_dropped_and_recreated() {
        let before = snap(vec![users().index(Index::on("users", &["email"]))]);
        let after = snap(vec![users().index(Index::on("users", &["email"]).unique())]);
        let names: Vec<String> = diff(&before, &after)
            .entries
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec![
                "drop index users_email_index on users",
                "create index users_email_index on users"
            ]
        );
    }

    #[test]
    fn test_enum_changes() {
        let before = Snapshot::new(Dialect::PostgreSQL).with_enum(EnumType::new("mood", &["sad"]));
        let after =
            Snapshot::new(Dialect::PostgreSQL).with_enum(EnumType::new("mood", &["sad", "happy"]));
        let changes = diff(&before, &after);
        assert!(matches!(changes.entries[0], ChangeSetEntry::AlterEnum { .. }));

        let reordered =
            Snapshot::new(Dialect::PostgreSQL).with_enum(EnumType::new("mood", &["happy"]));
        let changes = diff(&before, &reordered);
        assert!(matches!(changes.entries[0], ChangeSetEntry::DropEnum(_)));
        assert!(matches!(changes.entries[1], ChangeSetEntry::CreateEnum(_)));
    }

    #[test]
    fn test_rename_candidates_are_reported_not_guessed() {
        let before = snap(vec![users()]);
        let after = snap(vec![Table::new("accounts")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("email", "text").not_null())]);
        let changes = diff(&before, &after);
        assert_eq!(changes.ambiguous.len(), 1);
        assert!(changes.entries.iter().any(|e| matches!(e, ChangeSetEntry::DropTable(_))));
        assert!(changes.entries.iter().any(|e| matches!(e, ChangeSetEntry::CreateTable(_))));
    }
}
