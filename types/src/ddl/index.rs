//! Index DDL types

use crate::expression::normalize_expression;
use crate::naming::name_for_index;

/// One indexed column or expression
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IndexColumn {
    /// Column name or SQL expression
    pub value: String,
    /// Whether `value` is an expression rather than a column name
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_expression: bool,
    /// Descending order
    #[cfg_attr(feature = "serde", serde(default))]
    pub desc: bool,
}

impl IndexColumn {
    /// Plain ascending column
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            value: name.into(),
            is_expression: false,
            desc: false,
        }
    }

    /// Expression entry
    #[must_use]
    pub fn expression(expr: &str) -> Self {
        Self {
            value: normalize_expression(expr),
            is_expression: true,
            desc: false,
        }
    }

    /// Descending order
    #[must_use]
    pub fn desc(self) -> Self {
        Self { desc: true, ..self }
    }
}

/// Table index
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Index {
    /// Index name (unique per schema)
    pub name: String,
    /// Indexed columns/expressions, in order
    pub columns: Vec<IndexColumn>,
    /// UNIQUE index
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique: bool,
    /// Partial index predicate
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub where_clause: Option<String>,
}

impl Index {
    /// Create an empty index with an explicit name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: false,
            where_clause: None,
        }
    }

    /// Index over plain columns with the default name
    #[must_use]
    pub fn on(table: &str, columns: &[&str]) -> Self {
        Self {
            name: name_for_index(table, columns),
            columns: columns.iter().map(|c| IndexColumn::column(*c)).collect(),
            unique: false,
            where_clause: None,
        }
    }

    /// Append a column entry
    #[must_use]
    pub fn column(mut self, column: IndexColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Make the index unique
    #[must_use]
    pub fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Make the index partial
    #[must_use]
    pub fn where_clause(self, predicate: &str) -> Self {
        Self {
            where_clause: Some(normalize_expression(predicate)),
            ..self
        }
    }

    /// Returns `true` if the index covers `column`, by name or inside an
    /// expression entry
    #[must_use]
    pub fn references_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| {
            if c.is_expression {
                crate::expression::mentions_column(&c.value, column)
            } else {
                c.value == column
            }
        })
    }

    /// Structural equality, comparing expressions through normalization
    #[must_use]
    pub fn same_definition(&self, other: &Index) -> bool {
        let norm = |w: &Option<String>| w.as_deref().map(normalize_expression);
        self.unique == other.unique
            && norm(&self.where_clause) == norm(&other.where_clause)
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.desc == b.desc
                    && a.is_expression == b.is_expression
                    && if a.is_expression {
                        normalize_expression(&a.value) == normalize_expression(&b.value)
                    } else {
                        a.value == b.value
                    }
            })
    }

    /// Rename a column reference
    pub fn rename_column(&mut self, from: &str, to: &str) {
        for c in &mut self.columns {
            if c.is_expression {
                c.value = super::constraint::rename_word(&c.value, from, to);
            } else if c.value == from {
                c.value = to.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        let idx = Index::on("users", &["email"]).unique();
        assert_eq!(idx.name, "users_email_index");
        assert!(idx.unique);
    }

    #[test]
    fn test_same_definition_tolerates_expression_formatting() {
        let a = Index::new("lower_email").column(IndexColumn::expression("lower( \"email\" )"));
        let b = Index::new("lower_email").column(IndexColumn::expression("(lower(email))"));
        assert!(a.same_definition(&b));
        assert!(a.references_column("email"));
    }

    #[test]
    fn test_desc_changes_definition() {
        let a = Index::on("t", &["a"]);
        let b = Index::new("t_a_index").column(IndexColumn::column("a").desc());
        assert!(!a.same_definition(&b));
    }
}
