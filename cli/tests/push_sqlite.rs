#![cfg(feature = "rusqlite")]

use assert_cmd::cargo::cargo_bin_cmd;
use drizzle_migrations::Snapshot;
use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, Table};
use predicates::prelude::PredicateBooleanExt;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn project(root: &Path, tables: &[&str]) {
    fs::write(
        root.join("drizzle.config.toml"),
        r#"
dialect = "sqlite"
schema = "schema.json"

[dbCredentials]
url = "dev.db"
"#,
    )
    .unwrap();
    declare(root, tables);
}

fn declare(root: &Path, tables: &[&str]) {
    let mut snapshot = Snapshot::new(Dialect::SQLite);
    for name in tables {
        snapshot = snapshot.with_table(
            Table::new(*name)
                .column(Column::new("id", "integer").primary_key())
                .column(Column::new("email", "text").not_null()),
        );
    }
    snapshot.save(&root.join("schema.json")).unwrap();
}

fn live_tables(root: &Path) -> Vec<String> {
    let conn = rusqlite::Connection::open(root.join("dev.db")).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn explain_prints_plan_without_applying() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    project(root, &["users"]);

    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .args(["push", "--explain"])
        .assert()
        .success()
        .stdout(
            predicates::str::contains("--- Planned SQL ---")
                .and(predicates::str::contains("CREATE TABLE `users`"))
                .and(predicates::str::contains("--- End SQL ---")),
        );

    assert!(live_tables(root).is_empty());
}

#[test]
fn push_applies_then_reports_up_to_date() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    project(root, &["posts", "users"]);

    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .arg("push")
        .assert()
        .success()
        .stdout(predicates::str::contains("Changes applied"));
    assert_eq!(live_tables(root), vec!["posts", "users"]);

    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .arg("push")
        .assert()
        .success()
        .stdout(predicates::str::contains("Database is up to date"));
}

#[test]
fn destructive_push_waits_for_force() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    project(root, &["posts", "users"]);
    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .arg("push")
        .assert()
        .success();

    declare(root, &["users"]);
    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .arg("push")
        .assert()
        .failure()
        .stdout(predicates::str::contains("DROP TABLE `posts`;"))
        .stderr(predicates::str::contains("need confirmation"));
    assert_eq!(live_tables(root), vec!["posts", "users"]);

    cargo_bin_cmd!("drizzle")
        .current_dir(root)
        .args(["push", "--force"])
        .assert()
        .success();
    assert_eq!(live_tables(root), vec!["users"]);
}
