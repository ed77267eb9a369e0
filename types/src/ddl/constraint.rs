//! Table constraints: primary key, foreign key, unique, check

use crate::expression::normalize_expression;
use crate::naming::{name_for_check, name_for_fk, name_for_pk, name_for_unique};

/// Referential action for foreign key ON DELETE / ON UPDATE
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// SQL keyword(s) for this action
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse the SQL form (case-insensitive), as reported by introspection
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// Constraint discriminator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

impl ConstraintKind {
    /// Get the kind name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary key",
            Self::ForeignKey => "foreign key",
            Self::Unique => "unique",
            Self::Check => "check",
        }
    }
}

/// Table-level constraint
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")
)]
pub enum Constraint {
    /// Composite (or named) primary key
    PrimaryKey { name: String, columns: Vec<String> },

    /// Foreign key
    ForeignKey {
        name: String,
        columns: Vec<String>,
        table_to: String,
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        schema_to: Option<String>,
        columns_to: Vec<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        on_delete: ReferentialAction,
        #[cfg_attr(feature = "serde", serde(default))]
        on_update: ReferentialAction,
    },

    /// Unique constraint
    Unique {
        name: String,
        columns: Vec<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        nulls_not_distinct: bool,
    },

    /// Check constraint
    Check { name: String, expression: String },
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| (*c).to_string()).collect()
}

impl Constraint {
    /// Primary key with the default name
    #[must_use]
    pub fn primary_key(table: &str, columns: &[&str]) -> Self {
        Self::PrimaryKey {
            name: name_for_pk(table),
            columns: owned(columns),
        }
    }

    /// Foreign key with the default name and `NO ACTION` rules
    #[must_use]
    pub fn foreign_key(table: &str, columns: &[&str], table_to: &str, columns_to: &[&str]) -> Self {
        Self::ForeignKey {
            name: name_for_fk(table, columns, table_to, columns_to),
            columns: owned(columns),
            table_to: table_to.to_string(),
            schema_to: None,
            columns_to: owned(columns_to),
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    /// Unique constraint with the default name
    #[must_use]
    pub fn unique(table: &str, columns: &[&str]) -> Self {
        Self::Unique {
            name: name_for_unique(table, columns),
            columns: owned(columns),
            nulls_not_distinct: false,
        }
    }

    /// Check constraint with the default name for position `index`
    #[must_use]
    pub fn check(table: &str, index: usize, expression: &str) -> Self {
        Self::Check {
            name: name_for_check(table, index),
            expression: normalize_expression(expression),
        }
    }

    /// Override the constraint name
    #[must_use]
    pub fn named(mut self, new_name: impl Into<String>) -> Self {
        match &mut self {
            Self::PrimaryKey { name, .. }
            | Self::ForeignKey { name, .. }
            | Self::Unique { name, .. }
            | Self::Check { name, .. } => *name = new_name.into(),
        }
        self
    }

    /// Set ON DELETE (foreign keys only)
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Self::ForeignKey { on_delete, .. } = &mut self {
            *on_delete = action;
        }
        self
    }

    /// Set ON UPDATE (foreign keys only)
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Self::ForeignKey { on_update, .. } = &mut self {
            *on_update = action;
        }
        self
    }

    /// Point a foreign key at a table in another schema
    #[must_use]
    pub fn schema_to(mut self, schema: impl Into<String>) -> Self {
        if let Self::ForeignKey { schema_to, .. } = &mut self {
            *schema_to = Some(schema.into());
        }
        self
    }

    /// Constraint kind
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        match self {
            Self::PrimaryKey { .. } => ConstraintKind::PrimaryKey,
            Self::ForeignKey { .. } => ConstraintKind::ForeignKey,
            Self::Unique { .. } => ConstraintKind::Unique,
            Self::Check { .. } => ConstraintKind::Check,
        }
    }

    /// Constraint name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::PrimaryKey { name, .. }
            | Self::ForeignKey { name, .. }
            | Self::Unique { name, .. }
            | Self::Check { name, .. } => name,
        }
    }

    /// Key used to match constraints between two versions of a table
    ///
    /// A table has at most one primary key and SQLite does not keep its
    /// name, so primary keys match by kind alone.
    #[must_use]
    pub fn diff_key(&self) -> String {
        match self {
            Self::PrimaryKey { .. } => ConstraintKind::PrimaryKey.as_str().to_string(),
            other => other.name().to_string(),
        }
    }

    /// Local columns the constraint covers (empty for checks)
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::PrimaryKey { columns, .. }
            | Self::ForeignKey { columns, .. }
            | Self::Unique { columns, .. } => columns,
            Self::Check { .. } => &[],
        }
    }

    /// Returns `true` if the constraint mentions `column`
    #[must_use]
    pub fn references_column(&self, column: &str) -> bool {
        match self {
            Self::Check { expression, .. } => crate::expression::mentions_column(expression, column),
            other => other.columns().iter().any(|c| c == column),
        }
    }

    /// Structural equality, comparing check expressions through normalization
    #[must_use]
    pub fn same_definition(&self, other: &Constraint) -> bool {
        match (self, other) {
            (Self::Check { expression: a, .. }, Self::Check { expression: b, .. }) => {
                self.name() == other.name() && normalize_expression(a) == normalize_expression(b)
            }
            (Self::PrimaryKey { columns: a, .. }, Self::PrimaryKey { columns: b, .. }) => a == b,
            _ => self == other,
        }
    }

    /// Rename a local column reference
    pub fn rename_column(&mut self, from: &str, to: &str) {
        match self {
            Self::PrimaryKey { columns, .. }
            | Self::ForeignKey { columns, .. }
            | Self::Unique { columns, .. } => {
                for c in columns.iter_mut().filter(|c| c.as_str() == from) {
                    *c = to.to_string();
                }
            }
            Self::Check { expression, .. } => {
                *expression = rename_word(expression, from, to);
            }
        }
    }

    /// Schema and name of the table a foreign key points at
    #[must_use]
    pub fn foreign_target(&self) -> Option<(Option<&str>, &str)> {
        match self {
            Self::ForeignKey {
                schema_to,
                table_to,
                ..
            } => Some((schema_to.as_deref(), table_to.as_str())),
            _ => None,
        }
    }

    /// Follow a rename of a referenced table or of one of its columns
    pub fn rename_reference(&mut self, table: &str, from_column: Option<&str>, to: &str) {
        if let Self::ForeignKey {
            table_to,
            columns_to,
            ..
        } = self
            && table_to.as_str() == table
        {
            match from_column {
                None => *table_to = to.to_string(),
                Some(from) => {
                    for c in columns_to.iter_mut().filter(|c| c.as_str() == from) {
                        *c = to.to_string();
                    }
                }
            }
        }
    }
}

/// Replace whole-word occurrences of `from` in a canonical expression
pub(crate) fn rename_word(expression: &str, from: &str, to: &str) -> String {
    let tokens = crate::expression::tokenize(expression);
    let mut out = String::new();
    let mut prev_wordlike = false;
    for token in &tokens {
        use crate::expression::Token;
        let (text, wordlike) = match token {
            Token::Word(w) if w.eq_ignore_ascii_case(from) => (to.to_string(), true),
            Token::Word(w) => ((*w).to_string(), true),
            Token::Quoted(q) if q == from => (format!("\"{}\"", to), true),
            Token::Quoted(q) => (format!("\"{}\"", q.replace('"', "\"\"")), true),
            Token::Literal(l) => ((*l).to_string(), true),
            Token::Punct(c) => (c.to_string(), false),
            Token::Space => continue,
        };
        if wordlike && prev_wordlike {
            out.push(' ');
        }
        out.push_str(&text);
        prev_wordlike = wordlike;
    }
    normalize_expression(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_builder() {
        let fk = Constraint::foreign_key("posts", &["author_id"], "users", &["id"])
            .on_delete(ReferentialAction::Cascade);
        assert_eq!(fk.name(), "posts_author_id_users_id_fk");
        assert_eq!(fk.kind(), ConstraintKind::ForeignKey);
        match fk {
            Constraint::ForeignKey { on_delete, on_update, .. } => {
                assert_eq!(on_delete, ReferentialAction::Cascade);
                assert_eq!(on_update, ReferentialAction::NoAction);
            }
            _ => panic!("expected foreign key"),
        }
    }

    #[test]
    fn test_primary_key_matches_by_kind() {
        let declared = Constraint::primary_key("users", &["id"]);
        let introspected = Constraint::primary_key("users", &["id"]).named("");
        assert_eq!(declared.diff_key(), introspected.diff_key());
        assert!(declared.same_definition(&introspected));
    }

    #[test]
    fn test_check_references_column() {
        let check = Constraint::check("users", 0, "\"age\" >= 18");
        assert!(check.references_column("age"));
        assert!(!check.references_column("name"));
    }

    #[test]
    fn test_rename_column_in_check() {
        let mut check = Constraint::check("users", 0, "age >= 18 and age < 150");
        check.rename_column("age", "years");
        match check {
            Constraint::Check { expression, .. } => assert_eq!(expression, "years>=18 and years<150"),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_foreign_target() {
        let fk = Constraint::foreign_key("posts", &["author_id"], "users", &["id"]).schema_to("auth");
        assert_eq!(fk.foreign_target(), Some((Some("auth"), "users")));
        assert_eq!(Constraint::unique("users", &["email"]).foreign_target(), None);
    }

    #[test]
    fn test_rename_reference() {
        let mut fk = Constraint::foreign_key("posts", &["author_id"], "users", &["id"]);
        fk.rename_reference("users", None, "accounts");
        fk.rename_reference("accounts", Some("id"), "account_id");
        match fk {
            Constraint::ForeignKey { table_to, columns_to, .. } => {
                assert_eq!(table_to, "accounts");
                assert_eq!(columns_to, vec!["account_id".to_string()]);
            }
            _ => panic!("expected foreign key"),
        }
    }

    #[test]
    fn test_referential_action_parse() {
        assert_eq!(ReferentialAction::parse("cascade"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::parse("SET NULL"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::parse("bogus"), None);
    }
}
