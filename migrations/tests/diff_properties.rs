//! Dialect-independent properties of diffing and planning

mod common;

use common::{blog_schema, plan, statements};
use drizzle_migrations::diff::diff;
use drizzle_migrations::{ChangeSetEntry, Differ, RenameDecisions, Snapshot};
use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, GeneratedSpec, Table};

#[test]
fn identical_snapshots_produce_no_changes() {
    for dialect in Dialect::ALL {
        let schema = blog_schema(dialect);
        let changes = diff(&schema, &schema.clone());
        assert!(changes.is_empty(), "{dialect:?}: {:?}", changes.entries);
        assert!(plan(&schema, &schema).is_empty());
    }
}

#[test]
fn generated_expression_formatting_is_not_a_change() {
    for dialect in Dialect::ALL {
        let with = |expr: &str| {
            Snapshot::new(dialect).with_table(
                Table::new("orders")
                    .column(Column::new("price", "integer"))
                    .column(Column::new("qty", "integer"))
                    .column(
                        Column::new("total", "integer").generated(GeneratedSpec::stored(expr)),
                    ),
            )
        };
        let previous = with("price * qty");
        let next = with("(\"price\"*`qty`)");
        assert!(diff(&previous, &next).is_empty(), "{dialect:?}");

        let qualified = with("\"orders\".\"price\"   *  \"orders\".qty");
        assert!(diff(&previous, &qualified).is_empty(), "{dialect:?}");
    }
}

#[test]
fn referenced_table_is_created_first() {
    for dialect in Dialect::ALL {
        let sql = statements(&Snapshot::new(dialect), &blog_schema(dialect));
        let users = sql.iter().position(|s| s.contains("TABLE") && s.contains("users")).unwrap();
        let posts = sql.iter().position(|s| s.contains("TABLE") && s.contains("posts")).unwrap();
        assert!(users < posts, "{dialect:?}: {sql:#?}");
    }
}

#[test]
fn dropping_everything_reverses_creation_order() {
    for dialect in Dialect::ALL {
        let sql = statements(&blog_schema(dialect), &Snapshot::new(dialect));
        let drops: Vec<&String> = sql.iter().filter(|s| s.starts_with("DROP TABLE")).collect();
        assert_eq!(drops.len(), 2, "{dialect:?}");
        assert!(drops[0].contains("posts"), "{dialect:?}: {sql:#?}");
    }
}

#[test]
fn rename_with_type_change_is_two_entries() {
    let previous = Snapshot::new(Dialect::PostgreSQL).with_table(
        Table::new("users")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("age", "smallint")),
    );
    let next = Snapshot::new(Dialect::PostgreSQL).with_table(
        Table::new("users")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("years", "integer")),
    );
    let differ = Differ::new(&previous, &next);
    assert_eq!(differ.propose_renames().len(), 1);

    let renamed = differ
        .resolve_renames(&RenameDecisions::new().rename_column("users", "age", "years"))
        .unwrap();
    let names: Vec<String> = renamed.entries.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        vec![
            "rename column users.age to years",
            "alter column users.years type smallint -> integer",
        ]
    );

    let unrelated = differ
        .resolve_renames(&RenameDecisions::new().unrelated_column("users", "age"))
        .unwrap();
    assert!(unrelated
        .entries
        .iter()
        .any(|e| matches!(e, ChangeSetEntry::DropColumn { column, .. } if column.name == "age")));
    assert!(unrelated
        .entries
        .iter()
        .any(|e| matches!(e, ChangeSetEntry::AddColumn { column, .. } if column.name == "years")));
}
