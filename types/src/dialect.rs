//! Unified database dialect enum

/// SQL dialect targeted by a snapshot and its migrations
///
/// # Examples
///
/// ```
/// use drizzle_types::Dialect;
///
/// assert!(Dialect::PostgreSQL.supports_transactional_ddl());
/// assert!(!Dialect::MySQL.supports_transactional_ddl());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// SQLite
    ///
    /// Compatible with: rusqlite, libsql, turso
    #[default]
    SQLite,

    /// PostgreSQL
    PostgreSQL,

    /// MySQL
    MySQL,
}

impl Dialect {
    /// All supported dialects
    pub const ALL: [Dialect; 3] = [Dialect::PostgreSQL, Dialect::MySQL, Dialect::SQLite];

    /// Returns `true` if DDL statements can run inside a transaction and be
    /// rolled back.
    ///
    /// MySQL commits implicitly around most DDL, so a failed statement leaves
    /// everything before it applied.
    #[inline]
    #[must_use]
    pub const fn supports_transactional_ddl(&self) -> bool {
        matches!(self, Dialect::PostgreSQL | Dialect::SQLite)
    }

    /// Returns `true` if the dialect has standalone sequences
    #[inline]
    #[must_use]
    pub const fn supports_sequences(&self) -> bool {
        matches!(self, Dialect::PostgreSQL)
    }

    /// Returns `true` if the dialect has namespaces (schemas) below the database
    #[inline]
    #[must_use]
    pub const fn supports_schemas(&self) -> bool {
        matches!(self, Dialect::PostgreSQL)
    }

    /// Parse a dialect from a string (case-insensitive)
    ///
    /// Supports various common aliases:
    /// - SQLite: `"sqlite"`, `"turso"`, `"libsql"`
    /// - PostgreSQL: `"postgresql"`, `"postgres"`, `"pg"`
    /// - MySQL: `"mysql"`
    ///
    /// # Examples
    ///
    /// ```
    /// use drizzle_types::Dialect;
    ///
    /// assert_eq!(Dialect::parse("sqlite"), Some(Dialect::SQLite));
    /// assert_eq!(Dialect::parse("pg"), Some(Dialect::PostgreSQL));
    /// assert_eq!(Dialect::parse("unknown"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sqlite")
            || s.eq_ignore_ascii_case("turso")
            || s.eq_ignore_ascii_case("libsql")
        {
            Some(Dialect::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql")
            || s.eq_ignore_ascii_case("postgres")
            || s.eq_ignore_ascii_case("pg")
        {
            Some(Dialect::PostgreSQL)
        } else if s.eq_ignore_ascii_case("mysql") {
            Some(Dialect::MySQL)
        } else {
            None
        }
    }

    /// Get the dialect name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
        }
    }
}

impl core::fmt::Display for Dialect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Dialect {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::parse(s).ok_or(DialectParseError)
    }
}

/// Error returned when parsing an unknown dialect string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectParseError;

impl core::fmt::Display for DialectParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown dialect")
    }
}

impl std::error::Error for DialectParseError {}
