//! PostgreSQL DDL rendering

use drizzle_types::Dialect;
use drizzle_types::ddl::{
    Column, Constraint, EnumType, IdentitySpec, Index, ReferentialAction, Sequence, Table,
};

use super::{
    DeferredCreate, DialectRules, RenderResult, default_clause, expression_sql, quote_double,
    quote_list, sequence_clauses, string_literal, table_columns,
};
use crate::diff::{ChangeSet, ChangeSetEntry, GeneratedChange, SequenceTarget, TableName};

/// PostgreSQL rules: transactional DDL, in-place column alters
#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresRules;

fn qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_double(schema), quote_double(name)),
        None => quote_double(name),
    }
}

fn table_sql(table: &TableName) -> String {
    qualified(table.schema.as_deref(), &table.name)
}

fn identity_clause(identity: &IdentitySpec, table: &TableName, column: &str) -> String {
    let sequence = qualified(
        table.schema.as_deref(),
        &identity.owned_sequence_name(&table.name, column),
    );
    format!(
        " GENERATED {} AS IDENTITY (SEQUENCE NAME {sequence}{})",
        identity.kind.as_sql(),
        sequence_clauses(&identity.options.set_params())
    )
}

fn column_def(column: &Column, table: &TableName, columns: &[String], inline_pk: bool) -> String {
    let mut def = format!("{} {}", quote_double(&column.name), column.sql_type);
    let inline_pk = inline_pk && column.primary_key;
    if inline_pk {
        def.push_str(" PRIMARY KEY");
    }
    def.push_str(&default_clause(column.default.as_ref(), false));
    if let Some(generated) = &column.generated {
        def.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            expression_sql(&generated.expression, columns, quote_double),
            generated.mode.as_sql()
        ));
    }
    if column.not_null && !inline_pk {
        def.push_str(" NOT NULL");
    }
    if let Some(identity) = &column.identity {
        def.push_str(&identity_clause(identity, table, &column.name));
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

fn constraint_def(constraint: &Constraint, table: &TableName, columns: &[String]) -> String {
    let name = quote_double(constraint.name());
    match constraint {
        Constraint::PrimaryKey { columns: pk, .. } => {
            format!("CONSTRAINT {name} PRIMARY KEY({})", quote_list(pk, quote_double))
        }
        Constraint::Unique {
            columns: unique,
            nulls_not_distinct,
            ..
        } => format!(
            "CONSTRAINT {name} UNIQUE{}({})",
            if *nulls_not_distinct {
                " NULLS NOT DISTINCT"
            } else {
                ""
            },
            quote_list(unique, quote_double)
        ),
        Constraint::Check { expression, .. } => format!(
            "CONSTRAINT {name} CHECK ({})",
            expression_sql(expression, columns, quote_double)
        ),
        Constraint::ForeignKey {
            columns: from,
            table_to,
            schema_to,
            columns_to,
            on_delete,
            on_update,
            ..
        } => {
            let target = qualified(schema_to.as_deref().or(table.schema.as_deref()), table_to);
            format!(
                "CONSTRAINT {name} FOREIGN KEY ({}) REFERENCES {target}({}){}",
                quote_list(from, quote_double),
                quote_list(columns_to, quote_double),
                referential_actions(*on_delete, *on_update)
            )
        }
    }
}

fn create_table(table: &Table, with_foreign_keys: bool) -> String {
    let name = TableName::of(table);
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let explicit_pk = table.primary_key().is_some();

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{}", column_def(c, &name, &columns, !explicit_pk)))
        .collect();
    lines.extend(
        table
            .constraints
            .iter()
            .filter(|c| with_foreign_keys || !matches!(c, Constraint::ForeignKey { .. }))
            .map(|c| format!("\t{}", constraint_def(c, &name, &columns))),
    );

    format!("CREATE TABLE {} (\n{}\n);", table_sql(&name), lines.join(",\n"))
}

fn add_constraint(table: &TableName, constraint: &Constraint, columns: &[String]) -> String {
    format!(
        "ALTER TABLE {} ADD {};",
        table_sql(table),
        constraint_def(constraint, table, columns)
    )
}

fn create_index(table: &TableName, index: &Index, columns: &[String]) -> String {
    let parts = index
        .columns
        .iter()
        .map(|c| {
            let value = if c.is_expression {
                format!("({})", expression_sql(&c.value, columns, quote_double))
            } else {
                quote_double(&c.value)
            };
            if c.desc { format!("{value} DESC") } else { value }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let predicate = index
        .where_clause
        .as_ref()
        .map(|w| format!(" WHERE {}", expression_sql(w, columns, quote_double)))
        .unwrap_or_default();

    format!(
        "CREATE {}INDEX {} ON {} USING btree ({parts}){predicate};",
        if index.unique { "UNIQUE " } else { "" },
        quote_double(&index.name),
        table_sql(table)
    )
}

fn create_enum(enum_type: &EnumType) -> String {
    let values = enum_type
        .values
        .iter()
        .map(|v| string_literal(v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TYPE {} AS ENUM({values});",
        qualified(enum_type.schema.as_deref(), &enum_type.name)
    )
}

fn alter_enum(enum_type: &EnumType, added: &[(String, Option<String>)]) -> Vec<String> {
    let name = qualified(enum_type.schema.as_deref(), &enum_type.name);
    // Values inserted at the front go before the first value that already existed
    let first_existing = enum_type
        .values
        .iter()
        .find(|v| !added.iter().any(|(a, _)| a == *v));

    added
        .iter()
        .map(|(value, after)| {
            let position = match (after, first_existing) {
                (Some(after), _) => format!(" AFTER {}", string_literal(after)),
                (None, Some(before)) => format!(" BEFORE {}", string_literal(before)),
                (None, None) => String::new(),
            };
            format!("ALTER TYPE {name} ADD VALUE {}{position};", string_literal(value))
        })
        .collect()
}

fn create_sequence(sequence: &Sequence) -> String {
    format!(
        "CREATE SEQUENCE {}{};",
        qualified(sequence.schema.as_deref(), &sequence.name),
        sequence_clauses(&sequence.options.set_params())
    )
}

fn alter_column(table: &TableName, column: &str, action: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {action};",
        table_sql(table),
        quote_double(column)
    )
}

fn alter_identity(table: &TableName, previous: &Column, next: &Column) -> Vec<String> {
    let column = &next.name;
    let add = |identity: &IdentitySpec| {
        alter_column(
            table,
            column,
            &format!("ADD{}", identity_clause(identity, table, column)),
        )
    };

    match (&previous.identity, &next.identity) {
        (None, Some(identity)) => vec![add(identity)],
        (Some(_), None) => vec![alter_column(table, column, "DROP IDENTITY")],
        (Some(before), Some(after)) if before.sequence_name != after.sequence_name => vec![
            alter_column(table, column, "DROP IDENTITY"),
            add(after),
        ],
        (Some(before), Some(after)) => {
            let mut statements = Vec::new();
            if before.kind != after.kind {
                statements.push(alter_column(
                    table,
                    column,
                    &format!("SET GENERATED {}", after.kind.as_sql()),
                ));
            }
            let params = after.options.changed_params(&before.options);
            if !params.is_empty() {
                let sequence =
                    qualified(table.schema.as_deref(), &after.owned_sequence_name(&table.name, column));
                statements.push(format!(
                    "ALTER SEQUENCE {sequence}{};",
                    sequence_clauses(&params)
                ));
            }
            statements
        }
        (None, None) => Vec::new(),
    }
}

impl DialectRules for PostgresRules {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    fn render(&self, entry: &ChangeSetEntry, changes: &ChangeSet) -> RenderResult {
        use ChangeSetEntry as E;

        let statements = match entry {
            E::CreateSchema { name } => vec![format!("CREATE SCHEMA {};", quote_double(name))],
            E::DropSchema { name } => vec![format!("DROP SCHEMA {};", quote_double(name))],
            E::CreateEnum(enum_type) => vec![create_enum(enum_type)],
            E::DropEnum(enum_type) => vec![format!(
                "DROP TYPE {};",
                qualified(enum_type.schema.as_deref(), &enum_type.name)
            )],
            E::AlterEnum { enum_type, added } => alter_enum(enum_type, added),
            E::CreateSequence(sequence) => vec![create_sequence(sequence)],
            E::DropSequence(sequence) => vec![format!(
                "DROP SEQUENCE {};",
                qualified(sequence.schema.as_deref(), &sequence.name)
            )],
            E::AlterSequence {
                sequence, changes, ..
            } => {
                let name = match sequence {
                    SequenceTarget::Standalone { schema, name } => qualified(schema.as_deref(), name),
                    SequenceTarget::Identity {
                        table,
                        sequence_name,
                        ..
                    } => qualified(table.schema.as_deref(), sequence_name),
                };
                vec![format!("ALTER SEQUENCE {name}{};", sequence_clauses(changes))]
            }
            E::CreateTable(table) => vec![create_table(table, true)],
            E::DropTable(table) => {
                vec![format!("DROP TABLE {} CASCADE;", table_sql(&TableName::of(table)))]
            }
            E::RenameTable { from, to } => {
                let mut statements = Vec::new();
                let mut current = from.clone();
                if from.schema != to.schema {
                    let schema = to
                        .schema
                        .as_deref()
                        .unwrap_or(crate::snapshot::DEFAULT_PG_SCHEMA);
                    statements.push(format!(
                        "ALTER TABLE {} SET SCHEMA {};",
                        table_sql(from),
                        quote_double(schema)
                    ));
                    current.schema = to.schema.clone();
                }
                if from.name != to.name {
                    statements.push(format!(
                        "ALTER TABLE {} RENAME TO {};",
                        table_sql(&current),
                        quote_double(&to.name)
                    ));
                }
                statements
            }
            E::AddColumn { table, column } => {
                let columns = table_columns(changes, table);
                vec![format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    table_sql(table),
                    column_def(column, table, &columns, false)
                )]
            }
            E::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table_sql(table),
                quote_double(&column.name)
            )],
            E::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table_sql(table),
                quote_double(from),
                quote_double(to)
            )],
            E::AlterColumnType {
                table,
                previous,
                next,
            } => {
                if previous.sql_type.trim().eq_ignore_ascii_case(next.sql_type.trim()) {
                    // Autoincrement is a serial-type concern here
                    Vec::new()
                } else {
                    vec![alter_column(
                        table,
                        &next.name,
                        &format!("SET DATA TYPE {}", next.sql_type),
                    )]
                }
            }
            E::AlterColumnNullability { table, next, .. } => vec![alter_column(
                table,
                &next.name,
                if next.not_null {
                    "SET NOT NULL"
                } else {
                    "DROP NOT NULL"
                },
            )],
            E::AlterColumnDefault { table, next, .. } => {
                let clause = default_clause(next.default.as_ref(), false);
                let action = match clause.strip_prefix(' ') {
                    Some(set) => format!("SET {set}"),
                    None => "DROP DEFAULT".to_string(),
                };
                vec![alter_column(table, &next.name, &action)]
            }
            E::AlterColumnGenerated {
                table,
                change: GeneratedChange::Dropped,
                next,
                ..
            } => vec![alter_column(table, &next.name, "DROP EXPRESSION")],
            E::AlterColumnGenerated { table, next, .. } => {
                let columns = table_columns(changes, table);
                vec![
                    format!(
                        "ALTER TABLE {} DROP COLUMN {};",
                        table_sql(table),
                        quote_double(&next.name)
                    ),
                    format!(
                        "ALTER TABLE {} ADD COLUMN {};",
                        table_sql(table),
                        column_def(next, table, &columns, false)
                    ),
                ]
            }
            E::AlterColumnIdentity {
                table,
                previous,
                next,
            } => alter_identity(table, previous, next),
            E::AddIndex { table, index } => {
                let columns = table_columns(changes, table);
                vec![create_index(table, index, &columns)]
            }
            E::DropIndex { table, index } => vec![format!(
                "DROP INDEX {};",
                qualified(table.schema.as_deref(), &index.name)
            )],
            E::AddConstraint { table, constraint } => {
                let columns = table_columns(changes, table);
                vec![add_constraint(table, constraint, &columns)]
            }
            E::DropConstraint { table, constraint } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                table_sql(table),
                quote_double(constraint.name())
            )],
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::snapshot::Snapshot;
    use drizzle_types::ddl::{GeneratedSpec, SequenceOptions};

    fn render(entry: &ChangeSetEntry) -> Vec<String> {
        let changes = ChangeSet {
            dialect: Dialect::PostgreSQL,
            entries: vec![entry.clone()],
            transitions: Default::default(),
            ambiguous: Vec::new(),
            renames: Vec::new(),
        };
        match PostgresRules.render(entry, &changes) {
            RenderResult::Statements(s) => s,
            other => panic!("expected statements, got {other:?}"),
        }
    }

    fn users() -> TableName {
        TableName {
            schema: None,
            name: "users".to_string(),
        }
    }

    #[test]
    fn test_create_table_with_constraints() {
        let table = Table::new("posts")
            .column(Column::new("id", "serial").primary_key())
            .column(Column::new("author_id", "integer").not_null())
            .column(Column::new("title", "text").default_literal("'untitled'"))
            .constraint(
                Constraint::foreign_key("posts", &["author_id"], "users", &["id"])
                    .on_delete(ReferentialAction::Cascade),
            );

        let sql = render(&ChangeSetEntry::CreateTable(table));
        assert_eq!(
            sql[0],
            "CREATE TABLE \"posts\" (\n\
             \t\"id\" serial PRIMARY KEY,\n\
             \t\"author_id\" integer NOT NULL,\n\
             \t\"title\" text DEFAULT 'untitled',\n\
             \tCONSTRAINT \"posts_author_id_users_id_fk\" FOREIGN KEY (\"author_id\") REFERENCES \"users\"(\"id\") ON DELETE CASCADE\n\
             );"
        );
    }

    #[test]
    fn test_single_sequence_parameter() {
        let previous = Snapshot::new(Dialect::PostgreSQL).with_sequence(Sequence::new("s"));
        let next = Snapshot::new(Dialect::PostgreSQL)
            .with_sequence(Sequence::new("s").options(SequenceOptions::default().increment(2)));
        let changes = diff(&previous, &next);

        assert_eq!(changes.entries.len(), 1);
        assert_eq!(
            PostgresRules.render(&changes.entries[0], &changes),
            RenderResult::Statements(vec!["ALTER SEQUENCE \"s\" INCREMENT BY 2;".to_string()])
        );
    }

    #[test]
    fn test_generated_dropped_keeps_column() {
        let previous = Column::new("total", "integer").generated(GeneratedSpec::stored("a + b"));
        let next = Column::new("total", "integer");
        let sql = render(&ChangeSetEntry::AlterColumnGenerated {
            table: users(),
            change: GeneratedChange::Dropped,
            previous,
            next,
        });
        assert_eq!(
            sql,
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"total\" DROP EXPRESSION;"]
        );
    }

    #[test]
    fn test_generated_expression_change_recreates_column() {
        let previous = Column::new("total", "integer").generated(GeneratedSpec::stored("a + b"));
        let next = Column::new("total", "integer").generated(GeneratedSpec::stored("a * b"));
        let sql = render(&ChangeSetEntry::AlterColumnGenerated {
            table: users(),
            change: GeneratedChange::Expression,
            previous,
            next,
        });
        assert_eq!(sql.len(), 2);
        assert_eq!(sql[0], "ALTER TABLE \"users\" DROP COLUMN \"total\";");
        assert!(sql[1].starts_with("ALTER TABLE \"users\" ADD COLUMN \"total\" integer GENERATED ALWAYS AS ("));
        assert!(sql[1].ends_with(") STORED;"));
    }

    #[test]
    fn test_default_and_nullability() {
        let previous = Column::new("role", "text");
        let next = Column::new("role", "text").not_null().default_literal("'member'");
        assert_eq!(
            render(&ChangeSetEntry::AlterColumnDefault {
                table: users(),
                previous: previous.clone(),
                next: next.clone(),
            }),
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"role\" SET DEFAULT 'member';"]
        );
        assert_eq!(
            render(&ChangeSetEntry::AlterColumnNullability {
                table: users(),
                previous,
                next,
            }),
            vec!["ALTER TABLE \"users\" ALTER COLUMN \"role\" SET NOT NULL;"]
        );
    }

    #[test]
    fn test_enum_value_positions() {
        let mood = EnumType::new("mood", &["happy", "sad", "ok"]);
        let sql = render(&ChangeSetEntry::AlterEnum {
            enum_type: mood,
            added: vec![("happy".to_string(), None), ("ok".to_string(), Some("sad".to_string()))],
        });
        assert_eq!(
            sql,
            vec![
                "ALTER TYPE \"mood\" ADD VALUE 'happy' BEFORE 'sad';",
                "ALTER TYPE \"mood\" ADD VALUE 'ok' AFTER 'sad';",
            ]
        );
    }

    #[test]
    fn test_identity_added() {
        let previous = Column::new("id", "integer").not_null();
        let next = Column::new("id", "integer").identity(IdentitySpec::always());
        let sql = render(&ChangeSetEntry::AlterColumnIdentity {
            table: users(),
            previous,
            next,
        });
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"id\" ADD GENERATED ALWAYS AS IDENTITY (SEQUENCE NAME \"users_id_seq\");"
            ]
        );
    }

    #[test]
    fn test_deferred_create_splits_foreign_keys() {
        let table = Table::new("a")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("b_id", "integer"))
            .constraint(Constraint::foreign_key("a", &["b_id"], "b", &["id"]));
        let deferred = PostgresRules.render_deferred(&table).unwrap();

        assert!(!deferred.create[0].contains("FOREIGN KEY"));
        assert_eq!(deferred.foreign_keys.len(), 1);
        assert_eq!(
            deferred.foreign_keys[0].1,
            "ALTER TABLE \"a\" ADD CONSTRAINT \"a_b_id_b_id_fk\" FOREIGN KEY (\"b_id\") REFERENCES \"b\"(\"id\");"
        );
    }

    #[test]
    fn test_schema_qualified_index() {
        let table = TableName {
            schema: Some("auth".to_string()),
            name: "users".to_string(),
        };
        let index = Index::on("users", &["email"]).unique();
        let create = render(&ChangeSetEntry::AddIndex {
            table: table.clone(),
            index: index.clone(),
        });
        assert_eq!(
            create[0],
            format!(
                "CREATE UNIQUE INDEX \"{}\" ON \"auth\".\"users\" USING btree (\"email\");",
                index.name
            )
        );
        let drop = render(&ChangeSetEntry::DropIndex { table, index });
        assert!(drop[0].starts_with("DROP INDEX \"auth\"."));
    }
}
