//! SQLite table rebuilds and in-place alterations

mod common;

use common::{plan, statements};
use drizzle_migrations::{ChangeClass, Snapshot, UnitOrigin, classify};
use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, GeneratedSpec, Index, Table};

fn table_t(extra: Column) -> Snapshot {
    Snapshot::new(Dialect::SQLite).with_table(
        Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "integer"))
            .column(extra),
    )
}

#[test]
fn stored_expression_change_is_an_atomic_rebuild() {
    let previous = table_t(Column::new("b", "integer").generated(GeneratedSpec::stored("a + 1")));
    let next = table_t(Column::new("b", "integer").generated(GeneratedSpec::stored("a + 2")));

    let plan = plan(&previous, &next);
    assert_eq!(plan.units.len(), 1);
    let unit = &plan.units[0];
    assert!(unit.atomic);
    assert!(matches!(unit.origin, UnitOrigin::Rebuild { .. }));
    assert_eq!(classify(unit), ChangeClass::Destructive);

    assert_eq!(
        plan.statements(),
        vec![
            "PRAGMA foreign_keys=OFF;",
            "CREATE TABLE `__new_t` (\n\t`id` integer PRIMARY KEY,\n\t`a` integer,\n\t`b` integer GENERATED ALWAYS AS (`a`+2) STORED\n);",
            "INSERT INTO `__new_t`(`id`, `a`) SELECT `id`, `a` FROM `t`;",
            "DROP TABLE `t`;",
            "ALTER TABLE `__new_t` RENAME TO `t`;",
            "PRAGMA foreign_keys=ON;",
        ]
    );
    assert!(!plan.statements().iter().any(|s| s.contains("ALTER COLUMN")));
}

#[test]
fn virtual_column_is_added_in_place() {
    let previous = Snapshot::new(Dialect::SQLite).with_table(
        Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "integer")),
    );
    let next = table_t(Column::new("b", "integer").generated(GeneratedSpec::virtual_("a * 2")));

    assert_eq!(
        statements(&previous, &next),
        vec!["ALTER TABLE `t` ADD COLUMN `b` integer GENERATED ALWAYS AS (`a`*2) VIRTUAL;"]
    );
}

#[test]
fn several_alterations_share_one_rebuild() {
    let previous = Snapshot::new(Dialect::SQLite).with_table(
        Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "integer"))
            .column(Column::new("name", "text"))
            .index(Index::on("t", &["a"])),
    );
    let next = Snapshot::new(Dialect::SQLite).with_table(
        Table::new("t")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("a", "text").not_null().default_literal("''"))
            .column(Column::new("name", "text").not_null())
            .index(Index::on("t", &["a"])),
    );

    let plan = plan(&previous, &next);
    assert_eq!(plan.units.len(), 1, "{:#?}", plan.units);
    let sql = plan.statements();
    assert_eq!(
        sql.iter().filter(|s| s.starts_with("CREATE TABLE `__new_t`")).count(),
        1
    );
    assert!(sql.contains(&"CREATE INDEX `t_a_index` ON `t` (`a`);".to_string()));
}

#[test]
fn sequences_are_reported_not_applied() {
    let previous = Snapshot::new(Dialect::SQLite);
    let next = Snapshot::new(Dialect::SQLite)
        .with_sequence(drizzle_types::ddl::Sequence::new("counter"));

    let plan = plan(&previous, &next);
    assert!(plan.is_empty());
    assert_eq!(plan.warnings.len(), 1);
}
