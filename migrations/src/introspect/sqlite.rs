//! SQLite introspection
//!
//! Raw rows come from `sqlite_master` and the `pragma_table_xinfo`,
//! `pragma_index_list`, `pragma_index_xinfo` and `pragma_foreign_key_list`
//! table-valued functions. Details the pragmas do not report (generated
//! expressions, constraint names, table options) are parsed from the stored
//! `CREATE` statements with a small, tolerant scanner.

use std::collections::BTreeMap;

use drizzle_types::Dialect;
use drizzle_types::ddl::{
    Column, ColumnDefault, Constraint, GeneratedMode, GeneratedSpec, Index, IndexColumn,
    ReferentialAction, Table,
};

use crate::snapshot::Snapshot;

/// Row of `sqlite_master` for a table
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub sql: Option<String>,
}

/// Row of `pragma_table_xinfo`
#[derive(Debug, Clone)]
pub struct RawColumnInfo {
    pub table: String,
    pub cid: i32,
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it
    pub pk: i32,
    /// 0 normal, 1 hidden (virtual tables), 2 virtual generated, 3 stored generated
    pub hidden: i32,
}

/// Row of `pragma_index_list`, plus the index's `CREATE` statement
#[derive(Debug, Clone)]
pub struct RawIndexInfo {
    pub table: String,
    pub name: String,
    pub unique: bool,
    /// `c` for CREATE INDEX, `u` for UNIQUE, `pk` for PRIMARY KEY
    pub origin: String,
    pub partial: bool,
    pub sql: Option<String>,
}

/// Row of `pragma_index_xinfo`
#[derive(Debug, Clone)]
pub struct RawIndexColumn {
    pub index_name: String,
    pub seqno: i32,
    /// -2 for expressions, -1 for the rowid
    pub cid: i32,
    pub name: Option<String>,
    pub desc: bool,
    pub key: bool,
}

/// Row of `pragma_foreign_key_list`
#[derive(Debug, Clone)]
pub struct RawForeignKey {
    pub table: String,
    pub id: i32,
    pub seq: i32,
    pub to_table: String,
    /// `None` when the key references the target's primary key implicitly
    pub to_column: Option<String>,
    pub from_column: String,
    pub on_update: String,
    pub on_delete: String,
}

/// Everything read from one database
#[derive(Debug, Clone, Default)]
pub struct SqliteSchemaRows {
    pub tables: Vec<RawTable>,
    pub columns: Vec<RawColumnInfo>,
    pub indexes: Vec<RawIndexInfo>,
    pub index_columns: Vec<RawIndexColumn>,
    pub foreign_keys: Vec<RawForeignKey>,
}

/// SQLite internals and migration bookkeeping tables
pub fn is_internal_table(name: &str) -> bool {
    name.starts_with("sqlite_") || name.starts_with("_cf_") || name == "__drizzle_migrations"
}

// =============================================================================
// CREATE statement scanning
// =============================================================================

/// Byte index of the `)` matching the `(` at `open`, skipping quoted text
fn matching_paren(sql: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, ch) in sql[open..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside parentheses and quotes
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Parenthesized body starting at the first `(` at or after `from`,
/// with the text following it
fn parenthesized(sql: &str, from: usize) -> Option<(&str, &str)> {
    let open = sql[from..].find('(')? + from;
    let close = matching_paren(sql, open)?;
    Some((&sql[open + 1..close], &sql[close + 1..]))
}

/// Leading identifier of `item` (quoted or bare) and the rest
fn leading_identifier(item: &str) -> Option<(String, &str)> {
    let item = item.trim_start();
    let close = match item.chars().next()? {
        '"' => '"',
        '`' => '`',
        '[' => ']',
        _ => {
            let end = item
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(item.len());
            return Some((item[..end].to_string(), &item[end..]));
        }
    };
    let end = item[1..].find(close)? + 1;
    Some((item[1..end].to_string(), &item[end + 1..]))
}

fn identifier_list(body: &str) -> Vec<String> {
    split_top_level(body)
        .into_iter()
        .filter_map(|item| leading_identifier(item).map(|(name, _)| name))
        .collect()
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    let text = text.trim_start();
    text.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        && !text[keyword.len()..]
            .starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
}

/// Table-level clause of a `CREATE TABLE` body
#[derive(Debug, PartialEq)]
enum TableClause {
    PrimaryKey { name: Option<String>, columns: Vec<String> },
    Unique { name: Option<String>, columns: Vec<String> },
    ForeignKey { name: Option<String>, columns: Vec<String> },
    Check { name: Option<String>, expression: String },
}

/// What the `CREATE TABLE` text adds to the pragma rows
#[derive(Debug, Default)]
struct ParsedCreate {
    generated: BTreeMap<String, GeneratedSpec>,
    autoincrement: Vec<String>,
    clauses: Vec<TableClause>,
    strict: bool,
    without_rowid: bool,
}

fn parse_table_clause(item: &str) -> Option<TableClause> {
    let (name, rest) = if starts_with_keyword(item, "CONSTRAINT") {
        let after = &item.trim_start()["CONSTRAINT".len()..];
        let (name, rest) = leading_identifier(after)?;
        (Some(name), rest.trim_start())
    } else {
        (None, item.trim_start())
    };

    if starts_with_keyword(rest, "PRIMARY KEY") {
        let (body, _) = parenthesized(rest, 0)?;
        Some(TableClause::PrimaryKey {
            name,
            columns: identifier_list(body),
        })
    } else if starts_with_keyword(rest, "UNIQUE") {
        let (body, _) = parenthesized(rest, 0)?;
        Some(TableClause::Unique {
            name,
            columns: identifier_list(body),
        })
    } else if starts_with_keyword(rest, "FOREIGN KEY") {
        let (body, _) = parenthesized(rest, 0)?;
        Some(TableClause::ForeignKey {
            name,
            columns: identifier_list(body),
        })
    } else if starts_with_keyword(rest, "CHECK") {
        let (body, _) = parenthesized(rest, 0)?;
        Some(TableClause::Check {
            name,
            expression: body.trim().to_string(),
        })
    } else {
        None
    }
}

fn parse_generated(definition: &str) -> Option<GeneratedSpec> {
    let upper = definition.to_ascii_uppercase();
    let as_pos = upper.find(" AS ").or_else(|| upper.find(" AS("))?;
    let (expression, rest) = parenthesized(definition, as_pos)?;
    let mode = if rest.to_ascii_uppercase().contains("STORED") {
        GeneratedMode::Stored
    } else {
        GeneratedMode::Virtual
    };
    Some(GeneratedSpec::new(expression, mode))
}

fn parse_create_table(sql: &str) -> ParsedCreate {
    let mut parsed = ParsedCreate::default();
    let Some((body, trailer)) = parenthesized(sql, 0) else {
        return parsed;
    };

    let options = trailer.to_ascii_uppercase();
    parsed.strict = options.contains("STRICT");
    parsed.without_rowid = options.contains("WITHOUT ROWID");

    for item in split_top_level(body) {
        if let Some(clause) = parse_table_clause(item) {
            parsed.clauses.push(clause);
            continue;
        }
        let Some((column, definition)) = leading_identifier(item) else {
            continue;
        };
        let upper = definition.to_ascii_uppercase();
        if upper.contains("AUTOINCREMENT") {
            parsed.autoincrement.push(column.clone());
        }
        if (upper.contains("GENERATED") || upper.contains(" AS "))
            && let Some(generated) = parse_generated(definition)
        {
            parsed.generated.insert(column, generated);
        }
    }
    parsed
}

/// Column entries of a `CREATE INDEX` statement, by position
fn index_entries(sql: &str) -> (Vec<String>, Option<String>) {
    let upper = sql.to_ascii_uppercase();
    let Some(on) = upper.find(" ON ") else {
        return (Vec::new(), None);
    };
    let Some((body, rest)) = parenthesized(sql, on) else {
        return (Vec::new(), None);
    };

    let entries = split_top_level(body)
        .into_iter()
        .map(|entry| {
            let upper = entry.to_ascii_uppercase();
            let trimmed = if upper.ends_with(" DESC") || upper.ends_with(" ASC") {
                entry.rsplit_once(' ').map_or(entry, |(head, _)| head)
            } else {
                entry
            };
            trimmed.trim().to_string()
        })
        .collect();

    let predicate = rest
        .to_ascii_uppercase()
        .find("WHERE")
        .map(|pos| rest[pos + "WHERE".len()..].trim().trim_end_matches(';').trim().to_string())
        .filter(|p| !p.is_empty());

    (entries, predicate)
}

// =============================================================================
// Snapshot assembly
// =============================================================================

fn parse_default(raw: &str) -> ColumnDefault {
    let value = raw.trim();
    if value.starts_with('(') && matching_paren(value, 0) == Some(value.len() - 1) {
        return ColumnDefault::Expression(value[1..value.len() - 1].trim().to_string());
    }
    match value.to_ascii_uppercase().as_str() {
        "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME" => {
            ColumnDefault::Expression(value.to_string())
        }
        _ => ColumnDefault::Literal(value.to_string()),
    }
}

fn clause_name(clauses: &[TableClause], wanted: impl Fn(&TableClause) -> bool) -> Option<String> {
    clauses.iter().find(|c| wanted(c)).and_then(|c| match c {
        TableClause::PrimaryKey { name, .. }
        | TableClause::Unique { name, .. }
        | TableClause::ForeignKey { name, .. }
        | TableClause::Check { name, .. } => name.clone(),
    })
}

fn build_table(raw: &RawTable, rows: &SqliteSchemaRows) -> Table {
    let parsed = raw
        .sql
        .as_deref()
        .map(parse_create_table)
        .unwrap_or_default();

    let mut columns: Vec<&RawColumnInfo> = rows
        .columns
        .iter()
        .filter(|c| c.table == raw.name && c.hidden != 1)
        .collect();
    columns.sort_by_key(|c| c.cid);

    let mut pk: Vec<&RawColumnInfo> = columns.iter().copied().filter(|c| c.pk > 0).collect();
    pk.sort_by_key(|c| c.pk);
    let inline_pk = pk.len() == 1
        && !parsed
            .clauses
            .iter()
            .any(|c| matches!(c, TableClause::PrimaryKey { name: Some(_), .. }));

    let mut table = Table::new(raw.name.clone());
    table.strict = parsed.strict;
    table.without_rowid = parsed.without_rowid;

    for raw_column in &columns {
        let mut column = Column::new(&raw_column.name, raw_column.column_type.to_ascii_lowercase());
        if raw_column.not_null {
            column = column.not_null();
        }
        if inline_pk && raw_column.pk > 0 {
            column = column.primary_key();
        }
        if parsed.autoincrement.contains(&raw_column.name) {
            column = column.autoincrement();
        }
        if let Some(generated) = parsed.generated.get(&raw_column.name) {
            column = column.generated(generated.clone());
        } else if let Some(default) = raw_column.default_value.as_deref() {
            column.default = Some(parse_default(default));
        }
        table = table.column(column);
    }

    if !pk.is_empty() && !inline_pk {
        let names: Vec<&str> = pk.iter().map(|c| c.name.as_str()).collect();
        let mut constraint = Constraint::primary_key(&raw.name, &names);
        if let Some(name) = clause_name(&parsed.clauses, |c| matches!(c, TableClause::PrimaryKey { .. })) {
            constraint = constraint.named(name);
        }
        table = table.constraint(constraint);
    }

    for index in rows.indexes.iter().filter(|i| i.table == raw.name) {
        let mut entries: Vec<&RawIndexColumn> = rows
            .index_columns
            .iter()
            .filter(|c| c.index_name == index.name && c.key)
            .collect();
        entries.sort_by_key(|c| c.seqno);

        match index.origin.as_str() {
            "u" => {
                let names: Vec<&str> = entries.iter().filter_map(|c| c.name.as_deref()).collect();
                if names.is_empty() {
                    continue;
                }
                let mut constraint = Constraint::unique(&raw.name, &names);
                if let Some(name) = clause_name(&parsed.clauses, |c| {
                    matches!(c, TableClause::Unique { columns, .. } if columns.iter().map(String::as_str).eq(names.iter().copied()))
                }) {
                    constraint = constraint.named(name);
                }
                table = table.constraint(constraint);
            }
            "c" => {
                let (texts, predicate) = index
                    .sql
                    .as_deref()
                    .map(index_entries)
                    .unwrap_or_default();
                let mut built = Index::new(index.name.clone());
                for entry in &entries {
                    let column = match (&entry.name, entry.cid) {
                        (Some(name), cid) if cid >= 0 => IndexColumn::column(name.clone()),
                        _ => match usize::try_from(entry.seqno).ok().and_then(|i| texts.get(i)) {
                            Some(text) => IndexColumn::expression(text),
                            None => continue,
                        },
                    };
                    built = built.column(if entry.desc { column.desc() } else { column });
                }
                if index.unique {
                    built = built.unique();
                }
                if index.partial
                    && let Some(predicate) = predicate.as_deref()
                {
                    built = built.where_clause(predicate);
                }
                table = table.index(built);
            }
            _ => {}
        }
    }

    let mut keys: BTreeMap<i32, Vec<&RawForeignKey>> = BTreeMap::new();
    for fk in rows.foreign_keys.iter().filter(|f| f.table == raw.name) {
        keys.entry(fk.id).or_default().push(fk);
    }
    for (_, mut parts) in keys.into_iter().rev() {
        parts.sort_by_key(|f| f.seq);
        let Some(first) = parts.first() else {
            continue;
        };
        let from: Vec<&str> = parts.iter().map(|f| f.from_column.as_str()).collect();
        let to: Vec<String> = if parts.iter().all(|f| f.to_column.is_some()) {
            parts.iter().filter_map(|f| f.to_column.clone()).collect()
        } else {
            target_primary_key(rows, &first.to_table)
        };
        let to_refs: Vec<&str> = to.iter().map(String::as_str).collect();

        let mut constraint = Constraint::foreign_key(&raw.name, &from, &first.to_table, &to_refs)
            .on_delete(ReferentialAction::parse(&first.on_delete).unwrap_or_default())
            .on_update(ReferentialAction::parse(&first.on_update).unwrap_or_default());
        if let Some(name) = clause_name(&parsed.clauses, |c| {
            matches!(c, TableClause::ForeignKey { columns, .. } if columns.iter().map(String::as_str).eq(from.iter().copied()))
        }) {
            constraint = constraint.named(name);
        }
        table = table.constraint(constraint);
    }

    let mut checks = 0;
    for clause in &parsed.clauses {
        if let TableClause::Check { name, expression } = clause {
            checks += 1;
            let constraint = Constraint::check(&raw.name, checks, expression);
            table = table.constraint(match name {
                Some(name) => constraint.named(name.clone()),
                None => constraint,
            });
        }
    }

    table
}

fn target_primary_key(rows: &SqliteSchemaRows, table: &str) -> Vec<String> {
    let mut pk: Vec<&RawColumnInfo> = rows
        .columns
        .iter()
        .filter(|c| c.table == table && c.pk > 0)
        .collect();
    pk.sort_by_key(|c| c.pk);
    pk.into_iter().map(|c| c.name.clone()).collect()
}

/// Assemble a snapshot from raw introspection rows
pub fn build_snapshot(rows: &SqliteSchemaRows) -> Snapshot {
    let mut snapshot = Snapshot::new(Dialect::SQLite);
    for raw in rows.tables.iter().filter(|t| !is_internal_table(&t.name)) {
        snapshot.insert_table(build_table(raw, rows));
    }
    snapshot
}

// =============================================================================
// rusqlite adapter
// =============================================================================

#[cfg(feature = "rusqlite")]
mod driver {
    use rusqlite::Connection;

    use super::*;
    use crate::error::{DriverError, MigrationError};
    use crate::introspect::Introspector;

    const TABLES_QUERY: &str =
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY name";

    const COLUMNS_QUERY: &str = r#"
        SELECT m.name, p.cid, p.name, p.type, p."notnull", p.dflt_value, p.pk, p.hidden
        FROM sqlite_master AS m
        JOIN pragma_table_xinfo(m.name) AS p
        WHERE m.type = 'table'
        ORDER BY m.name, p.cid
    "#;

    const INDEXES_QUERY: &str = r#"
        SELECT il.name, il."unique", il.origin, il.partial, m.sql
        FROM pragma_index_list(?1) AS il
        LEFT JOIN sqlite_master AS m ON m.type = 'index' AND m.name = il.name
    "#;

    const INDEX_COLUMNS_QUERY: &str =
        r#"SELECT seqno, cid, name, "desc", key FROM pragma_index_xinfo(?1)"#;

    const FOREIGN_KEYS_QUERY: &str = r#"
        SELECT id, seq, "table", "from", "to", on_update, on_delete
        FROM pragma_foreign_key_list(?1)
    "#;

    /// Introspector over a rusqlite connection
    pub struct RusqliteIntrospector<'a> {
        conn: &'a Connection,
    }

    impl<'a> RusqliteIntrospector<'a> {
        pub fn new(conn: &'a Connection) -> Self {
            Self { conn }
        }

        /// Run every introspection query
        pub fn read_rows(&self) -> rusqlite::Result<SqliteSchemaRows> {
            let conn = self.conn;
            let mut rows = SqliteSchemaRows::default();

            let mut stmt = conn.prepare(TABLES_QUERY)?;
            rows.tables = stmt
                .query_map([], |row| {
                    Ok(RawTable {
                        name: row.get(0)?,
                        sql: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<_>>()?;
            rows.tables.retain(|t| !is_internal_table(&t.name));

            let mut stmt = conn.prepare(COLUMNS_QUERY)?;
            rows.columns = stmt
                .query_map([], |row| {
                    Ok(RawColumnInfo {
                        table: row.get(0)?,
                        cid: row.get(1)?,
                        name: row.get(2)?,
                        column_type: row.get(3)?,
                        not_null: row.get(4)?,
                        default_value: row.get(5)?,
                        pk: row.get(6)?,
                        hidden: row.get(7)?,
                    })
                })?
                .collect::<rusqlite::Result<_>>()?;

            for table in &rows.tables {
                let mut stmt = conn.prepare(INDEXES_QUERY)?;
                let indexes: Vec<RawIndexInfo> = stmt
                    .query_map([&table.name], |row| {
                        Ok(RawIndexInfo {
                            table: table.name.clone(),
                            name: row.get(0)?,
                            unique: row.get(1)?,
                            origin: row.get(2)?,
                            partial: row.get(3)?,
                            sql: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<_>>()?;

                for index in &indexes {
                    let mut stmt = conn.prepare(INDEX_COLUMNS_QUERY)?;
                    let columns = stmt
                        .query_map([&index.name], |row| {
                            Ok(RawIndexColumn {
                                index_name: index.name.clone(),
                                seqno: row.get(0)?,
                                cid: row.get(1)?,
                                name: row.get(2)?,
                                desc: row.get(3)?,
                                key: row.get(4)?,
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows.index_columns.extend(columns);
                }
                rows.indexes.extend(indexes);

                let mut stmt = conn.prepare(FOREIGN_KEYS_QUERY)?;
                let keys = stmt
                    .query_map([&table.name], |row| {
                        Ok(RawForeignKey {
                            table: table.name.clone(),
                            id: row.get(0)?,
                            seq: row.get(1)?,
                            to_table: row.get(2)?,
                            from_column: row.get(3)?,
                            to_column: row.get(4)?,
                            on_update: row.get(5)?,
                            on_delete: row.get(6)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.foreign_keys.extend(keys);
            }

            Ok(rows)
        }
    }

    impl Introspector for RusqliteIntrospector<'_> {
        fn dialect(&self) -> Dialect {
            Dialect::SQLite
        }

        fn introspect(&mut self) -> Result<Snapshot, MigrationError> {
            let rows = self.read_rows().map_err(DriverError::new)?;
            Ok(build_snapshot(&rows))
        }
    }
}

#[cfg(feature = "rusqlite")]
pub use driver::RusqliteIntrospector;
