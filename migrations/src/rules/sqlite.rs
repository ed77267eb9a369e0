//! SQLite DDL rendering
//!
//! SQLite's `ALTER TABLE` only renames tables and columns and adds or drops
//! plain columns. Everything else is applied by rebuilding the table through
//! a `__new_<table>` shadow copy.

use drizzle_types::Dialect;
use drizzle_types::ddl::{ColumnDefault, Column, Constraint, Index, ReferentialAction, Table};

use super::{
    DialectRules, RenderResult, TableRebuildPlan, copy_columns, default_clause, expression_sql,
    quote_backtick, quote_list, table_columns,
};
use crate::diff::{ChangeSet, ChangeSetEntry, GeneratedChange, TableName};

/// Prefix of the shadow table used by rebuilds
pub const SHADOW_PREFIX: &str = "__new_";

/// SQLite rules: limited `ALTER TABLE`, table rebuilds for the rest
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteRules;

fn table_sql(table: &TableName) -> String {
    quote_backtick(&table.name)
}

fn column_def(column: &Column, columns: &[String], inline_pk: bool) -> String {
    let mut def = format!("{} {}", quote_backtick(&column.name), column.sql_type);
    // INTEGER PRIMARY KEY is the rowid alias and never NULL
    let omit_not_null = inline_pk && column.sql_type.to_ascii_lowercase().starts_with("int");
    if inline_pk {
        def.push_str(" PRIMARY KEY");
    }
    if column.autoincrement {
        def.push_str(" AUTOINCREMENT");
    }
    def.push_str(&default_clause(column.default.as_ref(), true));
    if let Some(generated) = &column.generated {
        def.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            expression_sql(&generated.expression, columns, quote_backtick),
            generated.mode.as_sql()
        ));
    }
    if column.not_null && !omit_not_null {
        def.push_str(" NOT NULL");
    }
    def
}

fn referential_actions(on_delete: ReferentialAction, on_update: ReferentialAction) -> String {
    let mut sql = String::new();
    if on_update != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON UPDATE {}", on_update.as_sql()));
    }
    if on_delete != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON DELETE {}", on_delete.as_sql()));
    }
    sql
}

fn constraint_def(constraint: &Constraint, columns: &[String]) -> String {
    let name = quote_backtick(constraint.name());
    match constraint {
        Constraint::PrimaryKey { columns: pk, .. } => {
            format!("CONSTRAINT {name} PRIMARY KEY({})", quote_list(pk, quote_backtick))
        }
        Constraint::Unique {
            columns: unique, ..
        } => format!("CONSTRAINT {name} UNIQUE({})", quote_list(unique, quote_backtick)),
        Constraint::Check { expression, .. } => format!(
            "CONSTRAINT {name} CHECK({})",
            expression_sql(expression, columns, quote_backtick)
        ),
        Constraint::ForeignKey {
            columns: from,
            table_to,
            columns_to,
            on_delete,
            on_update,
            ..
        } => format!(
            "CONSTRAINT {name} FOREIGN KEY ({}) REFERENCES {}({}){}",
            quote_list(from, quote_backtick),
            quote_backtick(table_to),
            quote_list(columns_to, quote_backtick),
            referential_actions(*on_delete, *on_update)
        ),
    }
}

/// `CREATE TABLE` for `table` under `name`
fn create_table(table: &Table, name: &str) -> String {
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let flagged: Vec<&Column> = table.columns.iter().filter(|c| c.primary_key).collect();
    let inline_pk = table.primary_key().is_none() && flagged.len() == 1;

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{}", column_def(c, &columns, inline_pk && c.primary_key)))
        .collect();

    if table.primary_key().is_none() && flagged.len() > 1 {
        let pk: Vec<String> = flagged.iter().map(|c| c.name.clone()).collect();
        lines.push(format!("\tPRIMARY KEY({})", quote_list(&pk, quote_backtick)));
    }
    lines.extend(
        table
            .constraints
            .iter()
            .map(|c| format!("\t{}", constraint_def(c, &columns))),
    );

    let mut options = Vec::new();
    if table.strict {
        options.push("STRICT");
    }
    if table.without_rowid {
        options.push("WITHOUT ROWID");
    }
    let options = if options.is_empty() {
        String::new()
    } else {
        format!(" {}", options.join(", "))
    };

    format!(
        "CREATE TABLE {} (\n{}\n){options};",
        quote_backtick(name),
        lines.join(",\n")
    )
}

fn create_index(table: &TableName, index: &Index, columns: &[String]) -> String {
    let parts = index
        .columns
        .iter()
        .map(|c| {
            let value = if c.is_expression {
                expression_sql(&c.value, columns, quote_backtick)
            } else {
                quote_backtick(&c.value)
            };
            if c.desc { format!("{value} DESC") } else { value }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let predicate = index
        .where_clause
        .as_ref()
        .map(|w| format!(" WHERE {}", expression_sql(w, columns, quote_backtick)))
        .unwrap_or_default();

    format!(
        "CREATE {}INDEX {} ON {} ({parts}){predicate};",
        if index.unique { "UNIQUE " } else { "" },
        quote_backtick(&index.name),
        table_sql(table)
    )
}

/// Returns `true` if `ALTER TABLE ... ADD COLUMN` cannot add `column`
fn add_needs_rebuild(column: &Column) -> bool {
    let stored = column.generated.as_ref().is_some_and(|g| g.is_stored());
    let not_null_without_default =
        column.not_null && !column.has_sql_default() && column.generated.is_none();
    let expression_default = matches!(column.default, Some(ColumnDefault::Expression(_)));
    stored || column.primary_key || not_null_without_default || expression_default
}

fn add_column(table: &TableName, column: &Column, columns: &[String]) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {};",
        table_sql(table),
        column_def(column, columns, false)
    )
}

fn drop_column(table: &TableName, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        table_sql(table),
        quote_backtick(column)
    )
}

/// Full shadow-table rebuild of `table` from its transition
pub fn rebuild(table: &TableName, changes: &ChangeSet) -> RenderResult {
    let Some(transition) = changes.transition(&table.key()) else {
        return RenderResult::Unsupported(format!("no previous state recorded for table {table}"));
    };
    let after = &transition.after;
    let shadow = format!("{SHADOW_PREFIX}{}", after.name);
    let columns: Vec<String> = after.columns.iter().map(|c| c.name.clone()).collect();

    let mut body = vec![create_table(after, &shadow)];
    let copied = copy_columns(&transition.before, after);
    if !copied.is_empty() {
        let list = quote_list(&copied, quote_backtick);
        body.push(format!(
            "INSERT INTO {}({list}) SELECT {list} FROM {};",
            quote_backtick(&shadow),
            quote_backtick(&after.name)
        ));
    }
    body.push(format!("DROP TABLE {};", quote_backtick(&after.name)));
    body.push(format!(
        "ALTER TABLE {} RENAME TO {};",
        quote_backtick(&shadow),
        quote_backtick(&after.name)
    ));
    body.extend(
        after
            .indexes
            .iter()
            .map(|index| create_index(table, index, &columns)),
    );

    RenderResult::RequiresRebuild(TableRebuildPlan {
        table: table.clone(),
        setup: vec!["PRAGMA foreign_keys=OFF;".to_string()],
        body,
        teardown: vec!["PRAGMA foreign_keys=ON;".to_string()],
        atomic: true,
    })
}

/// Replace a virtual column in place, or rebuild when the new definition
/// cannot be added
fn drop_and_add(table: &TableName, next: &Column, changes: &ChangeSet) -> RenderResult {
    if add_needs_rebuild(next) {
        return rebuild(table, changes);
    }
    let columns = table_columns(changes, table);
    RenderResult::Statements(vec![
        drop_column(table, &next.name),
        add_column(table, next, &columns),
    ])
}

fn alter_generated(
    table: &TableName,
    change: GeneratedChange,
    previous: &Column,
    next: &Column,
    changes: &ChangeSet,
) -> RenderResult {
    let was_stored = previous.generated.as_ref().is_some_and(|g| g.is_stored());
    let is_stored = next.generated.as_ref().is_some_and(|g| g.is_stored());

    let needs_rebuild = match change {
        GeneratedChange::Added => is_stored,
        GeneratedChange::Dropped => was_stored,
        GeneratedChange::Expression => was_stored || is_stored,
        GeneratedChange::Mode => is_stored,
    };
    if needs_rebuild {
        rebuild(table, changes)
    } else {
        drop_and_add(table, next, changes)
    }
}

impl DialectRules for SqliteRules {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn render(&self, entry: &ChangeSetEntry, changes: &ChangeSet) -> RenderResult {
        use ChangeSetEntry as E;

        let statements = match entry {
            E::CreateSchema { .. } | E::DropSchema { .. } => {
                return RenderResult::Unsupported("SQLite has no schemas".to_string());
            }
            E::CreateEnum(_) | E::DropEnum(_) | E::AlterEnum { .. } => {
                return RenderResult::Unsupported("SQLite has no enum types".to_string());
            }
            E::CreateSequence(_) | E::DropSequence(_) | E::AlterSequence { .. } => {
                return RenderResult::Unsupported("SQLite has no sequences".to_string());
            }
            E::AlterColumnIdentity { table, next, .. } => {
                return RenderResult::Unsupported(format!(
                    "SQLite has no identity columns ({table}.{})",
                    next.name
                ));
            }
            E::CreateTable(table) => vec![create_table(table, &table.name)],
            E::DropTable(table) => vec![format!("DROP TABLE {};", quote_backtick(&table.name))],
            E::RenameTable { from, to } => vec![format!(
                "ALTER TABLE {} RENAME TO {};",
                table_sql(from),
                table_sql(to)
            )],
            E::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table_sql(table),
                quote_backtick(from),
                quote_backtick(to)
            )],
            E::AddColumn { table, column } => {
                if add_needs_rebuild(column) {
                    return rebuild(table, changes);
                }
                let columns = table_columns(changes, table);
                vec![add_column(table, column, &columns)]
            }
            E::DropColumn { table, column } => {
                let constrained = changes.transition(&table.key()).is_some_and(|t| {
                    t.before
                        .constraints
                        .iter()
                        .any(|c| c.references_column(&column.name))
                        || t.before.primary_key_columns().contains(&column.name.as_str())
                        || t.before.columns.iter().any(|c| {
                            c.name != column.name
                                && c.generated
                                    .as_ref()
                                    .is_some_and(|g| g.references_column(&column.name))
                        })
                });
                if column.primary_key || constrained {
                    return rebuild(table, changes);
                }
                vec![drop_column(table, &column.name)]
            }
            E::AlterColumnType { table, .. }
            | E::AlterColumnNullability { table, .. }
            | E::AlterColumnDefault { table, .. }
            | E::AddConstraint { table, .. }
            | E::DropConstraint { table, .. } => return rebuild(table, changes),
            E::AlterColumnGenerated {
                table,
                change,
                previous,
                next,
            } => return alter_generated(table, *change, previous, next, changes),
            E::AddIndex { table, index } => {
                let columns = table_columns(changes, table);
                vec![create_index(table, index, &columns)]
            }
            E::DropIndex { index, .. } => {
                vec![format!("DROP INDEX IF EXISTS {};", quote_backtick(&index.name))]
            }
        };

        RenderResult::Statements(statements)
    }

    fn foreign_keys_need_targets(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::snapshot::Snapshot;
    use drizzle_types::ddl::GeneratedSpec;

    fn single(previous: Table, next: Table) -> (ChangeSet, Vec<RenderResult>) {
        let changes = diff(
            &Snapshot::new(Dialect::SQLite).with_table(previous),
            &Snapshot::new(Dialect::SQLite).with_table(next),
        );
        let results = changes
            .entries
            .iter()
            .map(|e| SqliteRules.render(e, &changes))
            .collect();
        (changes, results)
    }

    fn base() -> Table {
        Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "integer"))
    }

    #[test]
    fn test_create_table_options() {
        let table = base().strict().without_rowid();
        let sql = create_table(&table, "t");
        assert_eq!(
            sql,
            "CREATE TABLE `t` (\n\t`id` integer PRIMARY KEY,\n\t`a` integer\n) STRICT, WITHOUT ROWID;"
        );
    }

    #[test]
    fn test_nullable_column_is_plain_add() {
        let (_, results) = single(base(), base().column(Column::new("bio", "text")));
        assert_eq!(
            results,
            vec![RenderResult::Statements(vec![
                "ALTER TABLE `t` ADD COLUMN `bio` text;".to_string()
            ])]
        );
    }

    #[test]
    fn test_not_null_without_default_rebuilds() {
        let (_, results) = single(base(), base().column(Column::new("bio", "text").not_null()));
        assert!(matches!(results[0], RenderResult::RequiresRebuild(_)));
    }

    #[test]
    fn test_stored_expression_change_rebuilds() {
        let previous =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::stored("a + 1")));
        let next =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::stored("a + 2")));
        let (_, results) = single(previous, next);
        assert_eq!(results.len(), 1);

        let RenderResult::RequiresRebuild(plan) = &results[0] else {
            panic!("expected rebuild, got {:?}", results[0]);
        };
        assert_eq!(plan.setup, vec!["PRAGMA foreign_keys=OFF;"]);
        assert_eq!(plan.teardown, vec!["PRAGMA foreign_keys=ON;"]);
        assert!(plan.body[0].starts_with("CREATE TABLE `__new_t` ("));
        assert!(plan.body[0].contains("GENERATED ALWAYS AS (`a`+2) STORED"));
        assert_eq!(
            plan.body[1],
            "INSERT INTO `__new_t`(`id`, `a`) SELECT `id`, `a` FROM `t`;"
        );
        assert_eq!(plan.body[2], "DROP TABLE `t`;");
        assert_eq!(plan.body[3], "ALTER TABLE `__new_t` RENAME TO `t`;");
    }

    #[test]
    fn test_virtual_expression_change_drops_and_adds() {
        let previous =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::virtual_("a + 1")));
        let next =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::virtual_("a + 2")));
        let (_, results) = single(previous, next);
        let RenderResult::Statements(sql) = &results[0] else {
            panic!("expected statements, got {:?}", results[0]);
        };
        assert_eq!(sql[0], "ALTER TABLE `t` DROP COLUMN `b`;");
        assert!(sql[1].ends_with("VIRTUAL;"));
    }

    #[test]
    fn test_mode_change_direction() {
        let virtual_col =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::virtual_("a")));
        let stored_col =
            base().column(Column::new("b", "integer").generated(GeneratedSpec::stored("a")));

        let (_, to_stored) = single(virtual_col.clone(), stored_col.clone());
        assert!(matches!(to_stored[0], RenderResult::RequiresRebuild(_)));

        let (_, to_virtual) = single(stored_col, virtual_col);
        assert!(matches!(to_virtual[0], RenderResult::Statements(_)));
    }

    #[test]
    fn test_drop_column_read_by_generated_column_rebuilds() {
        let previous = base()
            .column(Column::new("b", "integer"))
            .column(Column::new("c", "integer").generated(GeneratedSpec::virtual_("b * 2")));
        let next =
            base().column(Column::new("c", "integer").generated(GeneratedSpec::virtual_("a * 2")));
        let (changes, results) = single(previous, next);
        let drop = changes
            .entries
            .iter()
            .position(|e| matches!(e, ChangeSetEntry::DropColumn { .. }))
            .unwrap();
        let RenderResult::RequiresRebuild(plan) = &results[drop] else {
            panic!("expected rebuild, got {:?}", results[drop]);
        };
        assert!(plan.body[0].starts_with("CREATE TABLE `__new_t` ("));
        assert!(!plan.body[0].contains("`b`"));
    }

    #[test]
    fn test_drop_unreferenced_column_is_plain_drop() {
        let previous = base()
            .column(Column::new("b", "integer"))
            .column(Column::new("c", "integer").generated(GeneratedSpec::virtual_("a * 2")));
        let next =
            base().column(Column::new("c", "integer").generated(GeneratedSpec::virtual_("a * 2")));
        let (_, results) = single(previous, next);
        assert_eq!(
            results,
            vec![RenderResult::Statements(vec![
                "ALTER TABLE `t` DROP COLUMN `b`;".to_string()
            ])]
        );
    }

    #[test]
    fn test_rebuild_recreates_indexes() {
        let previous = base().index(Index::on("t", &["a"]));
        let next = Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "bigint"))
            .index(Index::on("t", &["a"]));
        let (_, results) = single(previous, next);
        let RenderResult::RequiresRebuild(plan) = &results[0] else {
            panic!("expected rebuild");
        };
        assert_eq!(
            plan.body.last().map(String::as_str),
            Some("CREATE INDEX `t_a_index` ON `t` (`a`);")
        );
    }

    #[test]
    fn test_sequences_are_unsupported() {
        let changes = diff(&Snapshot::new(Dialect::SQLite), &Snapshot::new(Dialect::SQLite));
        let entry = ChangeSetEntry::CreateSequence(drizzle_types::ddl::Sequence::new("s"));
        assert!(matches!(
            SqliteRules.render(&entry, &changes),
            RenderResult::Unsupported(_)
        ));
    }
}
