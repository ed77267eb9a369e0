//! Shared schema types for drizzle-kit
//!
//! This crate holds the entity model every other drizzle-kit crate speaks:
//!
//! - [`Dialect`] - Database dialect enum (SQLite, PostgreSQL, MySQL)
//! - [`ddl`] - Tables, columns, indexes, constraints, sequences, identity and
//!   generated-column specs, enums
//! - [`expression`] - Tolerant normalization of SQL fragments (generated
//!   expressions, default values) so introspected and declared forms compare equal
//! - [`naming`] - Default constraint and index names
//!
//! # Features
//!
//! - `serde` - Enable serde serialization/deserialization (enabled by default)

mod dialect;
pub mod ddl;
pub mod expression;
pub mod naming;

pub use dialect::{Dialect, DialectParseError};

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::Dialect;
    pub use crate::ddl::{
        Column, ColumnDefault, Constraint, EnumType, GeneratedMode, GeneratedSpec, IdentityKind,
        IdentitySpec, Index, IndexColumn, ReferentialAction, Sequence, SequenceOptions, Table,
    };
}
