//! Column DDL types

use super::{GeneratedSpec, IdentitySpec};
use crate::expression::normalize_default;

/// Column default value
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "value", rename_all = "camelCase")
)]
pub enum ColumnDefault {
    /// SQL literal, rendered verbatim (`'active'`, `0`, `true`)
    Literal(String),
    /// SQL expression, rendered in parentheses where the dialect requires it
    Expression(String),
    /// Value produced by the application at insert time; never rendered
    Runtime,
}

impl ColumnDefault {
    /// Comparison form: literals and expressions normalize, runtime markers
    /// compare by kind only
    #[must_use]
    pub fn normalized(&self) -> Option<String> {
        match self {
            Self::Literal(v) | Self::Expression(v) => Some(normalize_default(v)),
            Self::Runtime => None,
        }
    }

    /// Returns `true` if two defaults render the same database state
    #[must_use]
    pub fn equivalent(&self, other: &ColumnDefault) -> bool {
        match (self, other) {
            (Self::Runtime, Self::Runtime) => true,
            (Self::Runtime, _) | (_, Self::Runtime) => false,
            _ => self.normalized() == other.normalized(),
        }
    }
}

/// Table column
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Column {
    /// Column name
    pub name: String,

    /// SQL type as declared (`integer`, `varchar(255)`, `text[]`)
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub sql_type: String,

    /// NOT NULL constraint
    #[cfg_attr(feature = "serde", serde(default))]
    pub not_null: bool,

    /// Inline single-column primary key
    #[cfg_attr(feature = "serde", serde(default))]
    pub primary_key: bool,

    /// Legacy auto-increment (SQLite `AUTOINCREMENT`, MySQL `AUTO_INCREMENT`)
    #[cfg_attr(feature = "serde", serde(default))]
    pub autoincrement: bool,

    /// Default value
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub default: Option<ColumnDefault>,

    /// Identity specification
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub identity: Option<IdentitySpec>,

    /// Generated column specification
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub generated: Option<GeneratedSpec>,
}

impl Column {
    /// Create a nullable column with no default
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            autoincrement: false,
            default: None,
            identity: None,
            generated: None,
        }
    }

    /// Set NOT NULL
    #[must_use]
    pub fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    /// Set inline primary key (implies NOT NULL)
    #[must_use]
    pub fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            not_null: true,
            ..self
        }
    }

    /// Set legacy auto-increment
    #[must_use]
    pub fn autoincrement(self) -> Self {
        Self {
            autoincrement: true,
            ..self
        }
    }

    /// Set a literal default
    #[must_use]
    pub fn default_literal(self, value: impl Into<String>) -> Self {
        Self {
            default: Some(ColumnDefault::Literal(value.into())),
            ..self
        }
    }

    /// Set an expression default
    #[must_use]
    pub fn default_expression(self, value: impl Into<String>) -> Self {
        Self {
            default: Some(ColumnDefault::Expression(value.into())),
            ..self
        }
    }

    /// Mark the default as application-generated
    #[must_use]
    pub fn default_runtime(self) -> Self {
        Self {
            default: Some(ColumnDefault::Runtime),
            ..self
        }
    }

    /// Make this an identity column
    #[must_use]
    pub fn identity(self, identity: IdentitySpec) -> Self {
        Self {
            identity: Some(identity),
            not_null: true,
            ..self
        }
    }

    /// Make this a generated column
    #[must_use]
    pub fn generated(self, generated: GeneratedSpec) -> Self {
        Self {
            generated: Some(generated),
            ..self
        }
    }

    /// Number of value sources set among default, identity and generated
    ///
    /// A valid column has at most one. Runtime defaults are not a database
    /// value source and are not counted.
    #[must_use]
    pub fn value_source_count(&self) -> usize {
        let default = matches!(
            self.default,
            Some(ColumnDefault::Literal(_) | ColumnDefault::Expression(_))
        );
        usize::from(default)
            + usize::from(self.identity.is_some())
            + usize::from(self.generated.is_some())
    }

    /// Returns `true` if the column's default renders into DDL
    #[must_use]
    pub fn has_sql_default(&self) -> bool {
        matches!(
            self.default,
            Some(ColumnDefault::Literal(_) | ColumnDefault::Expression(_))
        )
    }

    /// Returns `true` if inserting rows never needs a value for this column
    #[must_use]
    pub fn is_value_optional(&self) -> bool {
        !self.not_null
            || self.has_sql_default()
            || self.identity.is_some()
            || self.generated.is_some()
            || self.autoincrement
    }

    /// Default comparison tolerant of cast and paren formatting
    #[must_use]
    pub fn same_default(&self, other: &Column) -> bool {
        match (&self.default, &other.default) {
            (None, None) => true,
            (Some(a), Some(b)) => a.equivalent(b),
            _ => false,
        }
    }

    /// Whether `other` could be this column under a new name, possibly with
    /// a new type
    #[must_use]
    pub fn rename_compatible(&self, other: &Column) -> bool {
        self.primary_key == other.primary_key
            && self.generated.is_some() == other.generated.is_some()
            && self.identity.is_some() == other.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let col = Column::new("id", "integer").primary_key().autoincrement();
        assert!(col.primary_key);
        assert!(col.not_null);
        assert!(col.autoincrement);
        assert!(col.is_value_optional());
    }

    #[test]
    fn test_value_sources() {
        let plain = Column::new("a", "text").default_literal("'x'");
        assert_eq!(plain.value_source_count(), 1);

        let conflicting = Column::new("a", "integer")
            .default_literal("0")
            .identity(IdentitySpec::always());
        assert_eq!(conflicting.value_source_count(), 2);

        let runtime = Column::new("id", "text").default_runtime();
        assert_eq!(runtime.value_source_count(), 0);
        assert!(!runtime.has_sql_default());
    }

    #[test]
    fn test_default_equivalence_tolerates_casts() {
        let declared = Column::new("status", "varchar(20)").default_literal("'active'");
        let introspected =
            Column::new("status", "varchar(20)").default_literal("'active'::character varying");
        assert!(declared.same_default(&introspected));

        let changed = Column::new("status", "varchar(20)").default_literal("'archived'");
        assert!(!declared.same_default(&changed));
    }

    #[test]
    fn test_not_null_without_default_needs_value() {
        let col = Column::new("email", "text").not_null();
        assert!(!col.is_value_optional());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_column_json() {
        let col = Column::new("created", "integer").default_expression("unixepoch()");
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["notNull"], false);
        assert_eq!(json["default"]["kind"], "expression");
        assert_eq!(json["default"]["value"], "unixepoch()");
        assert!(json.get("identity").is_none());

        let back: Column = serde_json::from_value(json).unwrap();
        assert_eq!(back, col);
    }
}
