//! Enum types (PostgreSQL `CREATE TYPE ... AS ENUM`)

use crate::naming::qualified_name;

/// Enum type entity
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EnumType {
    /// Schema name (`None` for the default namespace)
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub schema: Option<String>,
    /// Type name
    pub name: String,
    /// Values in declaration order
    pub values: Vec<String>,
}

impl EnumType {
    /// Create an enum type
    #[must_use]
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            schema: None,
            name: name.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// Place the enum in a schema
    #[must_use]
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..self
        }
    }

    /// Qualified map key
    #[must_use]
    pub fn key(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    /// Values appended after `previous`'s values, each with the value it
    /// follows, or `None` when `previous` is not a prefix-preserving subset
    /// (a value was removed or reordered)
    #[must_use]
    pub fn added_values(&self, previous: &EnumType) -> Option<Vec<(String, Option<String>)>> {
        let mut cursor = 0;
        let mut added = Vec::new();
        let mut last: Option<&String> = None;

        for value in &self.values {
            if previous.values.get(cursor) == Some(value) {
                cursor += 1;
                last = Some(value);
            } else if previous.values.contains(value) {
                return None;
            } else {
                added.push((value.clone(), last.cloned()));
                last = Some(value);
            }
        }

        (cursor == previous.values.len()).then_some(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_values() {
        let before = EnumType::new("mood", &["sad", "ok"]);
        let after = EnumType::new("mood", &["sad", "ok", "happy"]);
        assert_eq!(
            after.added_values(&before),
            Some(vec![("happy".to_string(), Some("ok".to_string()))])
        );
    }

    #[test]
    fn test_removed_value_is_not_additive() {
        let before = EnumType::new("mood", &["sad", "ok"]);
        let after = EnumType::new("mood", &["sad"]);
        assert_eq!(after.added_values(&before), None);
    }

    #[test]
    fn test_reordered_values_are_not_additive() {
        let before = EnumType::new("mood", &["sad", "ok"]);
        let after = EnumType::new("mood", &["ok", "sad"]);
        assert_eq!(after.added_values(&before), None);
    }
}
