//! Push against a real SQLite database

#![cfg(feature = "rusqlite")]

mod common;

use common::{blog_schema, plan};
use drizzle_migrations::introspect::{Introspector, RusqliteIntrospector};
use drizzle_migrations::{
    ApprovalGate, ApprovalPolicy, ConfirmationDecision, MigrationError, NonInteractive,
    PushOutcome, ScriptedConfirmations, Snapshot, diff::diff, push,
};
use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, GeneratedSpec, Table};
use rusqlite::Connection;

fn introspect(conn: &Connection) -> Snapshot {
    RusqliteIntrospector::new(conn).introspect().unwrap()
}

fn push_forced(conn: &mut Connection, next: &Snapshot) {
    let previous = introspect(conn);
    let plan = plan(&previous, next);
    let report = push(
        &plan,
        &ApprovalGate::new(ApprovalPolicy::Force),
        &mut NonInteractive,
        conn,
    )
    .unwrap();
    assert_eq!(report.outcome, PushOutcome::Completed);
}

#[test]
fn pushed_schema_introspects_back_unchanged() {
    let mut conn = Connection::open_in_memory().unwrap();
    let declared = blog_schema(Dialect::SQLite);
    push_forced(&mut conn, &declared);

    let live = introspect(&conn);
    let changes = diff(&live, &declared);
    assert!(changes.is_empty(), "{:#?}", changes.entries);
}

#[test]
fn stored_generated_rebuild_keeps_rows() {
    let table = |expr: &str| {
        Snapshot::new(Dialect::SQLite).with_table(
            Table::new("t")
                .column(Column::new("id", "integer").primary_key())
                .column(Column::new("a", "integer"))
                .column(Column::new("b", "integer").generated(GeneratedSpec::stored(expr))),
        )
    };

    let mut conn = Connection::open_in_memory().unwrap();
    push_forced(&mut conn, &table("a + 1"));
    conn.execute("INSERT INTO t (id, a) VALUES (1, 10)", []).unwrap();

    push_forced(&mut conn, &table("a + 2"));
    let b: i64 = conn
        .query_row("SELECT b FROM t WHERE id = 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(b, 12);
    assert!(diff(&introspect(&conn), &table("a + 2")).is_empty());
}

#[test]
fn destructive_push_waits_without_force() {
    let mut conn = Connection::open_in_memory().unwrap();
    push_forced(&mut conn, &blog_schema(Dialect::SQLite));

    let previous = introspect(&conn);
    let next = Snapshot::new(Dialect::SQLite);
    let plan = plan(&previous, &next);

    let gate = ApprovalGate::new(ApprovalPolicy::Confirm);
    let report = push(&plan, &gate, &mut NonInteractive, &mut conn).unwrap();
    assert!(matches!(report.outcome, PushOutcome::PendingConfirmation(ref held) if held.len() == 2));
    assert!(report.executed.is_empty());
    assert_eq!(introspect(&conn).tables.len(), 2);

    let mut answers = ScriptedConfirmations::new([ConfirmationDecision::ApproveAll]);
    let report = push(&plan, &gate, &mut answers, &mut conn).unwrap();
    assert_eq!(report.outcome, PushOutcome::Completed);
    assert!(introspect(&conn).tables.is_empty());
}

#[test]
fn plain_column_turned_generated_waits_for_confirmation() {
    let table = |total: Column| {
        Snapshot::new(Dialect::SQLite).with_table(
            Table::new("t")
                .column(Column::new("id", "integer").primary_key())
                .column(Column::new("a", "integer"))
                .column(total),
        )
    };

    let mut conn = Connection::open_in_memory().unwrap();
    push_forced(&mut conn, &table(Column::new("total", "integer")));
    conn.execute("INSERT INTO t (id, a, total) VALUES (1, 2, 99)", []).unwrap();

    let next = table(Column::new("total", "integer").generated(GeneratedSpec::virtual_("a + 1")));
    let plan = plan(&introspect(&conn), &next);
    let report = push(
        &plan,
        &ApprovalGate::new(ApprovalPolicy::Confirm),
        &mut NonInteractive,
        &mut conn,
    )
    .unwrap();

    assert!(matches!(report.outcome, PushOutcome::PendingConfirmation(ref held) if held.len() == 1));
    assert!(report.executed.is_empty());
    let total: i64 = conn
        .query_row("SELECT total FROM t WHERE id = 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 99);
}

#[test]
fn driver_failure_reports_applied_statements() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE `posts` (`id` integer);").unwrap();

    // the live table is unknown to the plan, so creating it fails
    let plan = plan(&Snapshot::new(Dialect::SQLite), &blog_schema(Dialect::SQLite));
    let err = push(
        &plan,
        &ApprovalGate::new(ApprovalPolicy::Force),
        &mut NonInteractive,
        &mut conn,
    )
    .unwrap_err();

    let MigrationError::Execution(err) = err else {
        panic!("expected execution error, got {err}");
    };
    assert!(err.statement.starts_with("CREATE TABLE `posts`"));
    assert!(err.message.contains("already exists"), "{}", err.message);
    assert_eq!(err.applied.len(), err.position - 1);
    assert!(!err.not_applied.is_empty());
}
