//! MySQL DDL rendering

use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, Constraint, Index, ReferentialAction, Table};

use super::{
    DeferredCreate, DialectRules, RenderResult, default_clause, expression_sql, quote_backtick,
    quote_list, table_columns,
};
use crate::diff::{ChangeSet, ChangeSetEntry, TableName};

/// MySQL rules: non-transactional DDL, column changes through `MODIFY COLUMN`
#[derive(Clone, Copy, Debug, Default)]
pub struct MysqlRules;

fn table_sql(table: &TableName) -> String {
    quote_backtick(&table.name)
}

fn column_def(column: &Column, columns: &[String], inline_pk: bool) -> String {
    let mut def = format!("{} {}", quote_backtick(&column.name), column.sql_type);
    if let Some(generated) = &column.generated {
        def.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            expression_sql(&generated.expression, columns, quote_backtick),
            generated.mode.as_sql()
        ));
    }
    if column.not_null {
        def.push_str(" NOT NULL");
    }
    def.push_str(&default_clause(column.default.as_ref(), true));
    if column.autoincrement || column.identity.is_some() {
        def.push_str(" AUTO_INCREMENT");
    }
    if inline_pk && column.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    def
}

fn referential_actions(on_delete: ReferentialAction, on_update: ReferentialAction) -> String {
    let mut sql = String::new();
    if on_delete != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON DELETE {}", on_delete.as_sql()));
    }
    if on_update != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON UPDATE {}", on_update.as_sql()));
    }
    sql
}

fn constraint_def(constraint: &Constraint, columns: &[String]) -> String {
    let name = quote_backtick(constraint.name());
    match constraint {
        Constraint::PrimaryKey { columns: pk, .. } => {
            format!("PRIMARY KEY({})", quote_list(pk, quote_backtick))
        }
        Constraint::Unique {
            columns: unique, ..
        } => format!("CONSTRAINT {name} UNIQUE({})", quote_list(unique, quote_backtick)),
        Constraint::Check { expression, .. } => format!(
            "CONSTRAINT {name} CHECK ({})",
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

fn create_table(table: &Table, with_foreign_keys: bool) -> String {
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let explicit_pk = table.primary_key().is_some();

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{}", column_def(c, &columns, !explicit_pk)))
        .collect();
    lines.extend(
        table
            .constraints
            .iter()
            .filter(|c| with_foreign_keys || !matches!(c, Constraint::ForeignKey { .. }))
            .map(|c| format!("\t{}", constraint_def(c, &columns))),
    );

    format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_backtick(&table.name),
        lines.join(",\n")
    )
}

fn add_constraint(table: &TableName, constraint: &Constraint, columns: &[String]) -> String {
    format!(
        "ALTER TABLE {} ADD {};",
        table_sql(table),
        constraint_def(constraint, columns)
    )
}

fn drop_constraint(table: &TableName, constraint: &Constraint) -> String {
    let name = quote_backtick(constraint.name());
    let action = match constraint {
        Constraint::PrimaryKey { .. } => "DROP PRIMARY KEY".to_string(),
        Constraint::ForeignKey { .. } => format!("DROP FOREIGN KEY {name}"),
        Constraint::Unique { .. } => format!("DROP INDEX {name}"),
        Constraint::Check { .. } => format!("DROP CHECK {name}"),
    };
    format!("ALTER TABLE {} {action};", table_sql(table))
}

fn create_index(table: &TableName, index: &Index, columns: &[String]) -> String {
    let parts = index
        .columns
        .iter()
        .map(|c| {
            let value = if c.is_expression {
                format!("({})", expression_sql(&c.value, columns, quote_backtick))
            } else {
                quote_backtick(&c.value)
            };
            if c.desc { format!("{value} DESC") } else { value }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE {}INDEX {} ON {} ({parts});",
        if index.unique { "UNIQUE " } else { "" },
        quote_backtick(&index.name),
        table_sql(table)
    )
}

/// Returns `true` if `entry` is the first `MODIFY`-rendered alteration of its
/// column; later ones are already covered by the full column definition
fn is_first_modify(entry: &ChangeSetEntry, changes: &ChangeSet) -> bool {
    let Some((table, _, column)) = entry.column_alteration() else {
        return true;
    };
    changes
        .entries
        .iter()
        .filter(|e| renders_as_modify(e))
        .find(|e| {
            e.column_alteration()
                .is_some_and(|(t, _, c)| t == table && c.name == column.name)
        })
        .is_none_or(|first| first == entry)
}

fn renders_as_modify(entry: &ChangeSetEntry) -> bool {
    matches!(
        entry,
        ChangeSetEntry::AlterColumnType { .. }
            | ChangeSetEntry::AlterColumnNullability { .. }
            | ChangeSetEntry::AlterColumnDefault { .. }
            | ChangeSetEntry::AlterColumnIdentity { .. }
    )
}

impl DialectRules for MysqlRules {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    fn render(&self, entry: &ChangeSetEntry, changes: &ChangeSet) -> RenderResult {
        use ChangeSetEntry as E;

        let statements = match entry {
            E::CreateSchema { .. } | E::DropSchema { .. } => {
                return RenderResult::Unsupported(
                    "MySQL has no schemas below the database".to_string(),
                );
            }
            E::CreateEnum(_) | E::DropEnum(_) | E::AlterEnum { .. } => {
                return RenderResult::Unsupported(
                    "MySQL enums are column types, not standalone objects".to_string(),
                );
            }
            E::CreateSequence(_) | E::DropSequence(_) | E::AlterSequence { .. } => {
                return RenderResult::Unsupported("MySQL has no sequences".to_string());
            }
            E::AlterColumnGenerated { table, next, .. } => {
                return RenderResult::Unsupported(format!(
                    "MySQL cannot alter generated column {table}.{}; drop and re-add the column manually (DROP COLUMN then ADD COLUMN)",
                    next.name
                ));
            }
            E::AddIndex { index, .. } if index.where_clause.is_some() => {
                return RenderResult::Unsupported(format!(
                    "MySQL does not support partial index {}",
                    index.name
                ));
            }
            E::CreateTable(table) => vec![create_table(table, true)],
            E::DropTable(table) => {
                vec![format!("DROP TABLE {};", quote_backtick(&table.name))]
            }
            E::RenameTable { from, to } => vec![format!(
                "RENAME TABLE {} TO {};",
                table_sql(from),
                table_sql(to)
            )],
            E::AddColumn { table, column } => {
                let columns = table_columns(changes, table);
                vec![format!(
                    "ALTER TABLE {} ADD {};",
                    table_sql(table),
                    column_def(column, &columns, false)
                )]
            }
            E::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table_sql(table),
                quote_backtick(&column.name)
            )],
            E::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table_sql(table),
                quote_backtick(from),
                quote_backtick(to)
            )],
            E::AlterColumnType { table, next, .. }
            | E::AlterColumnNullability { table, next, .. }
            | E::AlterColumnDefault { table, next, .. }
            | E::AlterColumnIdentity { table, next, .. } => {
                if is_first_modify(entry, changes) {
                    let columns = table_columns(changes, table);
                    vec![format!(
                        "ALTER TABLE {} MODIFY COLUMN {};",
                        table_sql(table),
                        column_def(next, &columns, false)
                    )]
                } else {
                    Vec::new()
                }
            }
            E::AddIndex { table, index } => {
                let columns = table_columns(changes, table);
                vec![create_index(table, index, &columns)]
            }
            E::DropIndex { table, index } => vec![format!(
                "DROP INDEX {} ON {};",
                quote_backtick(&index.name),
                table_sql(table)
            )],
            E::AddConstraint { table, constraint } => {
                let columns = table_columns(changes, table);
                vec![add_constraint(table, constraint, &columns)]
            }
            E::DropConstraint { table, constraint } => vec![drop_constraint(table, constraint)],
        };

        RenderResult::Statements(statements)
    }

    fn render_deferred(&self, table: &Table) -> Option<DeferredCreate> {
        let name = TableName::of(table);
        let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        Some(DeferredCreate {
            create: vec![create_table(table, false)],
            foreign_keys: table
                .foreign_keys()
                .map(|fk| (fk.clone(), add_constraint(&name, fk, &columns)))
                .collect(),
        })
    }
}
