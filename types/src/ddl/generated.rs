//! Generated column specs

use crate::expression::{mentions_column, normalize_expression};

/// Storage mode of a generated column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GeneratedMode {
    /// Materialized on write
    #[default]
    Stored,
    /// Computed on read
    Virtual,
}

impl GeneratedMode {
    /// SQL keyword for this mode
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Stored => "STORED",
            Self::Virtual => "VIRTUAL",
        }
    }
}

/// Generated column specification
///
/// The expression is normalized on construction (see
/// [`crate::expression`]), so a spec built from introspected SQL equals one
/// built from the declared schema when they differ only in formatting.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GeneratedSpec {
    /// Normalized SQL expression
    #[cfg_attr(feature = "serde", serde(rename = "as"))]
    pub expression: String,

    /// Storage mode
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub mode: GeneratedMode,

    /// Whether the declaring dialect can express this column at all
    #[cfg_attr(feature = "serde", serde(default = "supported_default"))]
    pub supported: bool,
}

#[cfg(feature = "serde")]
fn supported_default() -> bool {
    true
}

impl GeneratedSpec {
    /// Create a generated spec, normalizing the expression
    #[must_use]
    pub fn new(expression: impl AsRef<str>, mode: GeneratedMode) -> Self {
        Self {
            expression: normalize_expression(expression.as_ref()),
            mode,
            supported: true,
        }
    }

    /// Stored generated column
    #[must_use]
    pub fn stored(expression: impl AsRef<str>) -> Self {
        Self::new(expression, GeneratedMode::Stored)
    }

    /// Virtual generated column
    #[must_use]
    pub fn virtual_(expression: impl AsRef<str>) -> Self {
        Self::new(expression, GeneratedMode::Virtual)
    }

    /// Mark the spec as not expressible by its dialect
    #[must_use]
    pub fn unsupported(self) -> Self {
        Self {
            supported: false,
            ..self
        }
    }

    /// Returns `true` for stored generated columns
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.mode == GeneratedMode::Stored
    }

    /// Returns `true` if the expression reads `column`
    #[must_use]
    pub fn references_column(&self, column: &str) -> bool {
        mentions_column(&self.expression, column)
    }

    /// Compare expressions through normalization, tolerating specs that were
    /// deserialized from hand-edited snapshots
    #[must_use]
    pub fn same_expression(&self, other: &GeneratedSpec) -> bool {
        normalize_expression(&self.expression) == normalize_expression(&other.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_is_normalized() {
        let spec = GeneratedSpec::stored("( \"a\"  +  b )");
        assert_eq!(spec.expression, "a+b");
        assert!(spec.is_stored());
        assert!(spec.supported);
    }

    #[test]
    fn test_same_expression_ignores_formatting() {
        let declared = GeneratedSpec::virtual_("price * qty");
        let introspected = GeneratedSpec {
            expression: "(`price`*`qty`)".to_string(),
            mode: GeneratedMode::Virtual,
            supported: true,
        };
        assert!(declared.same_expression(&introspected));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_serde_field_names() {
        let spec = GeneratedSpec::stored("a + 1");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["as"], "a+1");
        assert_eq!(json["type"], "stored");
        assert_eq!(json["supported"], true);
    }
}
