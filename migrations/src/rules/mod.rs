//! Dialect rule engine
//!
//! One [`DialectRules`] implementation per dialect maps each change-set entry
//! to DDL statements, to an unsupported marker, or to a table rebuild. Adding
//! a dialect means adding one implementation here.

mod mysql;
mod postgres;
mod sqlite;

use drizzle_types::Dialect;
use drizzle_types::ddl::{ColumnDefault, Constraint, SequenceParam, Table};
use drizzle_types::expression::render_expression;

use crate::diff::{ChangeSet, ChangeSetEntry, TableName};

pub use mysql::MysqlRules;
pub use postgres::PostgresRules;
pub use sqlite::SqliteRules;

/// Outcome of rendering one change-set entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderResult {
    /// Statements to run in order (possibly none)
    Statements(Vec<String>),
    /// The dialect cannot express this change incrementally
    Unsupported(String),
    /// The table must be recreated to apply this change
    RequiresRebuild(TableRebuildPlan),
}

/// Shadow-table rebuild of one table, executed as a single plan unit
///
/// `setup` and `teardown` run outside the unit's transaction (SQLite ignores
/// `PRAGMA foreign_keys` inside one).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRebuildPlan {
    pub table: TableName,
    pub setup: Vec<String>,
    /// Create shadow, copy, drop, rename, recreate indexes
    pub body: Vec<String>,
    pub teardown: Vec<String>,
    /// Run `body` in one transaction where the dialect allows it
    pub atomic: bool,
}

impl TableRebuildPlan {
    /// Every statement in execution order
    pub fn statements(&self) -> impl Iterator<Item = &String> {
        self.setup.iter().chain(&self.body).chain(&self.teardown)
    }
}

/// `CREATE TABLE` split so foreign keys can be added after every table exists
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredCreate {
    /// The table without foreign keys
    pub create: Vec<String>,
    /// One `ADD CONSTRAINT` statement per foreign key
    pub foreign_keys: Vec<(Constraint, String)>,
}

/// Per-dialect rendering policy
pub trait DialectRules {
    /// Dialect this implementation renders
    fn dialect(&self) -> Dialect;

    /// Render one entry. `changes` gives access to the table transitions
    /// needed for rebuilds.
    fn render(&self, entry: &ChangeSetEntry, changes: &ChangeSet) -> RenderResult;

    /// Deferred form of a `CREATE TABLE`, if the dialect can add foreign keys
    /// to an existing table
    fn render_deferred(&self, table: &Table) -> Option<DeferredCreate> {
        let _ = table;
        None
    }

    /// Returns `true` if a table's foreign key targets must exist before the
    /// table is created
    fn foreign_keys_need_targets(&self) -> bool {
        true
    }
}

/// Rules for `dialect`
pub fn rules_for(dialect: Dialect) -> Box<dyn DialectRules> {
    match dialect {
        Dialect::PostgreSQL => Box::new(PostgresRules),
        Dialect::MySQL => Box::new(MysqlRules),
        Dialect::SQLite => Box::new(SqliteRules),
    }
}

/// A change-set entry together with its rendering
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub entry: ChangeSetEntry,
    pub result: RenderResult,
    /// Alternative form for `CreateTable` entries
    pub deferred: Option<DeferredCreate>,
}

/// Render every entry of a change-set
pub fn render_all(rules: &dyn DialectRules, changes: &ChangeSet) -> Vec<Rendered> {
    changes
        .entries
        .iter()
        .map(|entry| Rendered {
            entry: entry.clone(),
            result: rules.render(entry, changes),
            deferred: match entry {
                ChangeSetEntry::CreateTable(table) => rules.render_deferred(table),
                _ => None,
            },
        })
        .collect()
}

// =============================================================================
// Shared rendering helpers
// =============================================================================

pub(crate) fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub(crate) fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn quote_list(columns: &[String], quote: fn(&str) -> String) -> String {
    columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// ` DEFAULT ...` clause; expressions are parenthesized where the dialect
/// requires it, runtime defaults render nothing
pub(crate) fn default_clause(default: Option<&ColumnDefault>, parenthesize: bool) -> String {
    match default {
        Some(ColumnDefault::Literal(value)) => format!(" DEFAULT {value}"),
        Some(ColumnDefault::Expression(expr)) if parenthesize => format!(" DEFAULT ({expr})"),
        Some(ColumnDefault::Expression(expr)) => format!(" DEFAULT {expr}"),
        Some(ColumnDefault::Runtime) | None => String::new(),
    }
}

/// Sequence parameter clauses in `CREATE SEQUENCE` order, each with a leading
/// space. A parameter without a value resets it to the database default.
pub(crate) fn sequence_clauses(params: &[SequenceParam]) -> String {
    let rank = |p: &SequenceParam| match p {
        SequenceParam::Increment(_) => 0,
        SequenceParam::MinValue(_) => 1,
        SequenceParam::MaxValue(_) => 2,
        SequenceParam::StartWith(_) => 3,
        SequenceParam::Cache(_) => 4,
        SequenceParam::Cycle(_) => 5,
    };
    let mut ordered = params.to_vec();
    ordered.sort_by_key(rank);

    ordered
        .iter()
        .map(|p| match p {
            SequenceParam::Increment(Some(v)) => format!(" INCREMENT BY {v}"),
            SequenceParam::Increment(None) => " INCREMENT BY 1".to_string(),
            SequenceParam::MinValue(Some(v)) => format!(" MINVALUE {v}"),
            SequenceParam::MinValue(None) => " NO MINVALUE".to_string(),
            SequenceParam::MaxValue(Some(v)) => format!(" MAXVALUE {v}"),
            SequenceParam::MaxValue(None) => " NO MAXVALUE".to_string(),
            SequenceParam::StartWith(Some(v)) => format!(" START WITH {v}"),
            SequenceParam::StartWith(None) => " START WITH 1".to_string(),
            SequenceParam::Cache(Some(v)) => format!(" CACHE {v}"),
            SequenceParam::Cache(None) => " CACHE 1".to_string(),
            SequenceParam::Cycle(Some(true)) => " CYCLE".to_string(),
            SequenceParam::Cycle(_) => " NO CYCLE".to_string(),
        })
        .collect()
}

/// Column names of `table` after the change, for rendering expressions of
/// altered tables
pub(crate) fn table_columns(changes: &ChangeSet, table: &TableName) -> Vec<String> {
    changes
        .transition(&table.key())
        .map(|t| t.after.columns.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

/// Renders a canonical expression with the owning table's columns quoted
pub(crate) fn expression_sql(expr: &str, columns: &[String], quote: fn(&str) -> String) -> String {
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    render_expression(expr, &columns, quote)
}

/// Columns to copy into a rebuilt table: present in both versions and not
/// generated in either
pub(crate) fn copy_columns(before: &Table, after: &Table) -> Vec<String> {
    after
        .columns
        .iter()
        .filter(|c| c.generated.is_none())
        .filter(|c| {
            before
                .column_named(&c.name)
                .is_some_and(|b| b.generated.is_none())
        })
        .map(|c| c.name.clone())
        .collect()
}
