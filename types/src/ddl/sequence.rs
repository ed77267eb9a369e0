//! Sequence and identity column types

use crate::naming::qualified_name;

// =============================================================================
// Sequence parameters
// =============================================================================

/// The six parameters shared by standalone sequences and identity columns.
///
/// `None` means "database default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SequenceOptions {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub start_with: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub min_value: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub max_value: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub increment: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cache: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cycle: Option<bool>,
}

/// One changed sequence parameter, carrying its new value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "param", content = "value", rename_all = "camelCase"))]
pub enum SequenceParam {
    StartWith(Option<i64>),
    MinValue(Option<i64>),
    MaxValue(Option<i64>),
    Increment(Option<i64>),
    Cache(Option<i64>),
    Cycle(Option<bool>),
}

impl SequenceOptions {
    /// Set the start value
    #[must_use]
    pub const fn start_with(self, value: i64) -> Self {
        Self {
            start_with: Some(value),
            ..self
        }
    }

    /// Set the minimum value
    #[must_use]
    pub const fn min_value(self, value: i64) -> Self {
        Self {
            min_value: Some(value),
            ..self
        }
    }

    /// Set the maximum value
    #[must_use]
    pub const fn max_value(self, value: i64) -> Self {
        Self {
            max_value: Some(value),
            ..self
        }
    }

    /// Set the increment
    #[must_use]
    pub const fn increment(self, value: i64) -> Self {
        Self {
            increment: Some(value),
            ..self
        }
    }

    /// Set the cache size
    #[must_use]
    pub const fn cache(self, value: i64) -> Self {
        Self {
            cache: Some(value),
            ..self
        }
    }

    /// Set the cycle flag
    #[must_use]
    pub const fn cycle(self, value: bool) -> Self {
        Self {
            cycle: Some(value),
            ..self
        }
    }

    /// Parameters that differ from `previous`, each with its new value
    ///
    /// Every parameter is compared on its own; the result is empty when the
    /// two option sets are equal.
    #[must_use]
    pub fn changed_params(&self, previous: &SequenceOptions) -> Vec<SequenceParam> {
        let mut params = Vec::new();
        if self.start_with != previous.start_with {
            params.push(SequenceParam::StartWith(self.start_with));
        }
        if self.min_value != previous.min_value {
            params.push(SequenceParam::MinValue(self.min_value));
        }
        if self.max_value != previous.max_value {
            params.push(SequenceParam::MaxValue(self.max_value));
        }
        if self.increment != previous.increment {
            params.push(SequenceParam::Increment(self.increment));
        }
        if self.cache != previous.cache {
            params.push(SequenceParam::Cache(self.cache));
        }
        if self.cycle != previous.cycle {
            params.push(SequenceParam::Cycle(self.cycle));
        }
        params
    }

    /// Every parameter that is set, in rendering order
    #[must_use]
    pub fn set_params(&self) -> Vec<SequenceParam> {
        self.changed_params(&SequenceOptions::default())
    }

    /// Returns `true` if no parameter is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == SequenceOptions::default()
    }
}

// =============================================================================
// Standalone sequence
// =============================================================================

/// Standalone sequence entity
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Sequence {
    /// Schema name (`None` for the default namespace)
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub schema: Option<String>,

    /// Sequence name
    pub name: String,

    /// Parameters
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub options: SequenceOptions,
}

impl Sequence {
    /// Create a sequence with default parameters
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            options: SequenceOptions::default(),
        }
    }

    /// Place the sequence in a schema
    #[must_use]
    pub fn in_schema(self, schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..self
        }
    }

    /// Set all parameters at once
    #[must_use]
    pub fn options(self, options: SequenceOptions) -> Self {
        Self { options, ..self }
    }

    /// Qualified map key
    #[must_use]
    pub fn key(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// `GENERATED { ALWAYS | BY DEFAULT } AS IDENTITY`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum IdentityKind {
    #[default]
    Always,
    ByDefault,
}

impl IdentityKind {
    /// SQL keyword(s) for this kind
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Always => "ALWAYS",
            Self::ByDefault => "BY DEFAULT",
        }
    }
}

/// Identity column specification
///
/// The backing sequence is owned by the column: dropping the column drops
/// the sequence, renaming it keeps the sequence.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IdentitySpec {
    /// `always` or `byDefault`
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: IdentityKind,

    /// Explicit name of the owned sequence
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub sequence_name: Option<String>,

    /// Sequence parameters
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub options: SequenceOptions,
}

impl IdentitySpec {
    /// `GENERATED ALWAYS AS IDENTITY`
    #[must_use]
    pub fn always() -> Self {
        Self {
            kind: IdentityKind::Always,
            ..Self::default()
        }
    }

    /// `GENERATED BY DEFAULT AS IDENTITY`
    #[must_use]
    pub fn by_default() -> Self {
        Self {
            kind: IdentityKind::ByDefault,
            ..Self::default()
        }
    }

    /// Set the sequence parameters
    #[must_use]
    pub fn options(self, options: SequenceOptions) -> Self {
        Self { options, ..self }
    }

    /// Name the owned sequence explicitly
    #[must_use]
    pub fn sequence_name(self, name: impl Into<String>) -> Self {
        Self {
            sequence_name: Some(name.into()),
            ..self
        }
    }

    /// Name of the owned sequence for a column of `table`
    #[must_use]
    pub fn owned_sequence_name(&self, table: &str, column: &str) -> String {
        self.sequence_name
            .clone()
            .unwrap_or_else(|| crate::naming::name_for_identity_sequence(table, column))
    }
}
