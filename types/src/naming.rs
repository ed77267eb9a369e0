//! Default names for constraints, indexes and owned sequences
//!
//! These follow the drizzle-kit naming grammar so snapshots produced by
//! either tool agree on entity names.

/// Generate a default name for a foreign key constraint
#[must_use]
pub fn name_for_fk(table: &str, columns: &[&str], table_to: &str, columns_to: &[&str]) -> String {
    format!(
        "{}_{}_{}_{}_fk",
        table,
        columns.join("_"),
        table_to,
        columns_to.join("_")
    )
}

/// Generate a default name for a unique constraint
#[must_use]
pub fn name_for_unique(table: &str, columns: &[&str]) -> String {
    format!("{}_{}_unique", table, columns.join("_"))
}

/// Generate a default name for a primary key constraint
#[must_use]
pub fn name_for_pk(table: &str) -> String {
    format!("{}_pk", table)
}

/// Generate a default name for an index
#[must_use]
pub fn name_for_index(table: &str, columns: &[&str]) -> String {
    format!("{}_{}_index", table, columns.join("_"))
}

/// Generate a default name for a check constraint
#[must_use]
pub fn name_for_check(table: &str, index: usize) -> String {
    format!("{}_check_{}", table, index)
}

/// Name of the sequence backing an identity column
#[must_use]
pub fn name_for_identity_sequence(table: &str, column: &str) -> String {
    format!("{}_{}_seq", table, column)
}

/// Qualified map key for a schema entity: `schema.name`, or `name` when the
/// entity lives in the default namespace.
#[must_use]
pub fn qualified_name(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => format!("{}.{}", schema, name),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        assert_eq!(
            name_for_fk("posts", &["author_id"], "users", &["id"]),
            "posts_author_id_users_id_fk"
        );
        assert_eq!(name_for_unique("users", &["email"]), "users_email_unique");
        assert_eq!(name_for_pk("users"), "users_pk");
        assert_eq!(name_for_index("users", &["a", "b"]), "users_a_b_index");
        assert_eq!(name_for_check("users", 0), "users_check_0");
        assert_eq!(name_for_identity_sequence("users", "id"), "users_id_seq");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name(Some("auth"), "users"), "auth.users");
        assert_eq!(qualified_name(None, "users"), "users");
        assert_eq!(qualified_name(Some(""), "users"), "users");
    }
}
