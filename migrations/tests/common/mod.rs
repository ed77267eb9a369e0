//! Shared fixtures for migration integration tests

#![allow(dead_code)]

use drizzle_migrations::{OrderedPlan, RenameDecisions, Snapshot, prepare};
use drizzle_types::Dialect;
use drizzle_types::ddl::{Column, Constraint, Index, Table};

/// Plan `previous -> next` with no renames and return every statement
pub fn statements(previous: &Snapshot, next: &Snapshot) -> Vec<String> {
    plan(previous, next).statements()
}

pub fn plan(previous: &Snapshot, next: &Snapshot) -> OrderedPlan {
    prepare(previous, next, &RenameDecisions::new())
        .expect("plan should succeed")
        .plan
}

/// `users` and `posts` with a foreign key, an index and a default
pub fn blog_schema(dialect: Dialect) -> Snapshot {
    let id_type = match dialect {
        Dialect::PostgreSQL => "serial",
        Dialect::MySQL => "int",
        Dialect::SQLite => "integer",
    };
    let users = Table::new("users")
        .column(Column::new("id", id_type).primary_key())
        .column(Column::new("email", "varchar(255)").not_null())
        .column(Column::new("role", "varchar(32)").default_literal("'member'"))
        .index(Index::on("users", &["email"]).unique());
    let posts = Table::new("posts")
        .column(Column::new("id", id_type).primary_key())
        .column(Column::new("author_id", "integer").not_null())
        .column(Column::new("title", "text"))
        .constraint(Constraint::foreign_key("posts", &["author_id"], "users", &["id"]));

    Snapshot::new(dialect).with_table(users).with_table(posts)
}
