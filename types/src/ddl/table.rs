//! Table DDL types

use super::{Column, Constraint, ConstraintKind, Index};
use crate::expression::strip_qualifier;
use crate::naming::qualified_name;

/// Table entity with its columns, indexes and constraints
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Table {
    /// Schema name (`None` for the default namespace)
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub schema: Option<String>,

    /// Table name
    pub name: String,

    /// Columns in declaration order
    #[cfg_attr(feature = "serde", serde(default))]
    pub columns: Vec<Column>,

    /// Indexes
    #[cfg_attr(feature = "serde", serde(default))]
    pub indexes: Vec<Index>,

    /// Table-level constraints
    #[cfg_attr(feature = "serde", serde(default))]
    pub constraints: Vec<Constraint>,

    /// SQLite STRICT table
    #[cfg_attr(feature = "serde", serde(default))]
    pub strict: bool,

    /// SQLite WITHOUT ROWID table
    #[cfg_attr(feature = "serde", serde(default))]
    pub without_rowid: bool,
}

impl Table {
    /// Create an empty table
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            strict: false,
            without_rowid: false,
        }
    }

    /// Place the table in a schema
    #[must_use]
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..self
        }
    }

    /// Append a column
    ///
    /// Generated expressions lose qualifiers naming this table so they only
    /// reference the row they belong to.
    #[must_use]
    pub fn column(mut self, mut column: Column) -> Self {
        if let Some(generated) = column.generated.as_mut() {
            generated.expression = strip_qualifier(&generated.expression, &self.name);
        }
        self.columns.push(column);
        self
    }

    /// Append an index
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Append a constraint
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Mark as SQLite STRICT
    #[must_use]
    pub fn strict(self) -> Self {
        Self {
            strict: true,
            ..self
        }
    }

    /// Mark as SQLite WITHOUT ROWID
    #[must_use]
    pub fn without_rowid(self) -> Self {
        Self {
            without_rowid: true,
            ..self
        }
    }

    /// Qualified map key
    #[must_use]
    pub fn key(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    /// Find a column by name
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find an index by name
    #[must_use]
    pub fn index_named(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Column names in declaration order
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Table-level primary key constraint, if any
    #[must_use]
    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind() == ConstraintKind::PrimaryKey)
    }

    /// Primary key columns, from the table-level constraint or inline flags
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        match self.primary_key() {
            Some(pk) => pk.columns().iter().map(String::as_str).collect(),
            None => self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.as_str())
                .collect(),
        }
    }

    /// Foreign key constraints
    pub fn foreign_keys(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind() == ConstraintKind::ForeignKey)
    }

    /// Qualified keys of the tables this table references through foreign
    /// keys (self references excluded)
    #[must_use]
    pub fn referenced_tables(&self, default_schema: Option<&str>) -> Vec<String> {
        let own = self.key();
        let mut refs: Vec<String> = self
            .foreign_keys()
            .filter_map(|fk| match fk {
                Constraint::ForeignKey {
                    table_to,
                    schema_to,
                    ..
                } => {
                    let schema = schema_to.as_deref().or(self.schema.as_deref()).or(default_schema);
                    Some(qualified_name(schema, table_to))
                }
                _ => None,
            })
            .filter(|key| *key != own)
            .collect();
        refs.sort();
        refs.dedup();
        refs
    }

    /// Returns `true` if `other` could be this table under a new name: the
    /// same number of columns with the same types, column names aside
    #[must_use]
    pub fn rename_compatible(&self, other: &Table) -> bool {
        let types = |table: &Table| {
            let mut types: Vec<String> = table
                .columns
                .iter()
                .map(|c| c.sql_type.to_ascii_lowercase())
                .collect();
            types.sort();
            types
        };
        self.columns.len() == other.columns.len() && types(self) == types(other)
    }

    /// Rename a column together with every local reference to it
    pub fn rename_column(&mut self, from: &str, to: &str) {
        for column in self.columns.iter_mut().filter(|c| c.name == from) {
            column.name = to.to_string();
        }
        for column in &mut self.columns {
            if let Some(generated) = column.generated.as_mut() {
                generated.expression =
                    super::constraint::rename_word(&generated.expression, from, to);
            }
        }
        for index in &mut self.indexes {
            index.rename_column(from, to);
        }
        for constraint in &mut self.constraints {
            constraint.rename_column(from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::GeneratedSpec;

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("email", "text").not_null())
            .index(Index::on("users", &["email"]).unique())
    }

    #[test]
    fn test_builder_and_lookup() {
        let table = users();
        assert_eq!(table.key(), "users");
        assert_eq!(table.column_names(), vec!["id", "email"]);
        assert_eq!(table.primary_key_columns(), vec!["id"]);
        assert!(table.index_named("users_email_index").is_some());
    }

    #[test]
    fn test_schema_key() {
        assert_eq!(Table::new("users").in_schema("auth").key(), "auth.users");
    }

    #[test]
    fn test_generated_qualifier_stripped() {
        let table = Table::new("items")
            .column(Column::new("price", "integer"))
            .column(Column::new("total", "integer").generated(GeneratedSpec::stored("\"items\".\"price\" * 2")));
        let generated = table.column_named("total").unwrap().generated.as_ref().unwrap();
        assert_eq!(generated.expression, "price*2");
    }

    #[test]
    fn test_referenced_tables() {
        let posts = Table::new("posts")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("author_id", "integer"))
            .column(Column::new("parent_id", "integer"))
            .constraint(Constraint::foreign_key("posts", &["author_id"], "users", &["id"]))
            .constraint(Constraint::foreign_key("posts", &["parent_id"], "posts", &["id"]));
        assert_eq!(posts.referenced_tables(None), vec!["users".to_string()]);
    }

    #[test]
    fn test_rename_compatible_ignores_order_and_names() {
        let a = Table::new("a")
            .column(Column::new("x", "int"))
            .column(Column::new("y", "TEXT"));
        let b = Table::new("b")
            .column(Column::new("label", "text"))
            .column(Column::new("x", "INT"));
        assert!(a.rename_compatible(&b));
        assert!(!a.rename_compatible(&users()));
    }

    #[test]
    fn test_rename_column_follows_references() {
        let mut table = users()
            .column(Column::new("handle", "text").generated(GeneratedSpec::virtual_("lower(email)")));
        table.rename_column("email", "mail");
        assert!(table.column_named("mail").is_some());
        assert_eq!(table.indexes[0].columns[0].value, "mail");
        assert_eq!(
            table.column_named("handle").unwrap().generated.as_ref().unwrap().expression,
            "lower(mail)"
        );
    }
}
