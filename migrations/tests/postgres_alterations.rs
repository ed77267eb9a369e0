//! PostgreSQL alterations rendered through the full pipeline

mod common;

use common::{plan, statements};
use drizzle_migrations::{ChangeClass, Snapshot, classify};
use drizzle_types::Dialect;
use drizzle_types::ddl::{
    Column, EnumType, GeneratedSpec, IdentitySpec, Sequence, SequenceOptions, Table,
};

fn pg() -> Snapshot {
    Snapshot::new(Dialect::PostgreSQL)
}

fn users(column: Column) -> Snapshot {
    pg().with_table(
        Table::new("users")
            .column(Column::new("id", "integer").primary_key())
            .column(column),
    )
}

#[test]
fn one_sequence_parameter_is_one_alter() {
    let options = SequenceOptions::default().start_with(1).increment(1).cache(1);
    let previous = pg().with_sequence(Sequence::new("invoice_seq").options(options.clone()));
    let next = pg().with_sequence(Sequence::new("invoice_seq").options(options.increment(2)));

    assert_eq!(
        statements(&previous, &next),
        vec!["ALTER SEQUENCE \"invoice_seq\" INCREMENT BY 2;"]
    );
}

#[test]
fn identity_options_alter_the_owned_sequence() {
    let with_increment = |increment| {
        pg().with_table(Table::new("users").column(
            Column::new("id", "integer").identity(
                IdentitySpec::always().options(SequenceOptions::default().increment(increment)),
            ),
        ))
    };

    assert_eq!(
        statements(&with_increment(1), &with_increment(5)),
        vec!["ALTER SEQUENCE \"users_id_seq\" INCREMENT BY 5;"]
    );
}

#[test]
fn sequence_and_enum_precede_the_table_using_them() {
    let next = pg()
        .with_enum(EnumType::new("mood", &["happy", "sad"]))
        .with_sequence(Sequence::new("ticket_seq"))
        .with_table(
            Table::new("tickets")
                .column(
                    Column::new("id", "integer")
                        .primary_key()
                        .default_expression("nextval('ticket_seq')"),
                )
                .column(Column::new("mood", "mood")),
        );

    let sql = statements(&pg(), &next);
    let position = |needle: &str| sql.iter().position(|s| s.starts_with(needle)).unwrap();
    assert!(position("CREATE TYPE") < position("CREATE TABLE"));
    assert!(position("CREATE SEQUENCE") < position("CREATE TABLE"));
}

#[test]
fn generated_expression_change_recreates_the_column() {
    let previous = users(Column::new("total", "integer").generated(GeneratedSpec::stored("id * 2")));
    let next = users(Column::new("total", "integer").generated(GeneratedSpec::stored("id * 3")));

    let plan = plan(&previous, &next);
    assert_eq!(
        plan.statements(),
        vec![
            "ALTER TABLE \"users\" DROP COLUMN \"total\";",
            "ALTER TABLE \"users\" ADD COLUMN \"total\" integer GENERATED ALWAYS AS (\"id\"*3) STORED;",
        ]
    );
    assert_eq!(classify(&plan.units[0]), ChangeClass::DataAltering);
}

#[test]
fn plain_column_turned_generated_is_destructive() {
    let previous = users(Column::new("total", "integer"));
    let next = users(Column::new("total", "integer").generated(GeneratedSpec::stored("id * 2")));

    let plan = plan(&previous, &next);
    assert_eq!(plan.statements()[0], "ALTER TABLE \"users\" DROP COLUMN \"total\";");
    assert_eq!(classify(&plan.units[0]), ChangeClass::Destructive);
}

#[test]
fn narrowing_type_change_is_destructive() {
    let previous = users(Column::new("name", "varchar(255)"));
    let next = users(Column::new("name", "varchar(64)"));

    let plan = plan(&previous, &next);
    assert_eq!(
        plan.statements(),
        vec!["ALTER TABLE \"users\" ALTER COLUMN \"name\" SET DATA TYPE varchar(64);"]
    );
    assert_eq!(classify(&plan.units[0]), ChangeClass::Destructive);

    let widened = plan_widening();
    assert_eq!(classify(&widened.units[0]), ChangeClass::DataAltering);
}

fn plan_widening() -> drizzle_migrations::OrderedPlan {
    plan(
        &users(Column::new("name", "varchar(64)")),
        &users(Column::new("name", "text")),
    )
}

#[test]
fn schema_tables_are_qualified() {
    let next = pg()
        .with_schema("billing")
        .with_table(Table::new("invoices").in_schema("billing").column(Column::new("id", "integer")));

    assert_eq!(
        statements(&pg(), &next),
        vec![
            "CREATE SCHEMA \"billing\";",
            "CREATE TABLE \"billing\".\"invoices\" (\n\t\"id\" integer\n);",
        ]
    );
}
