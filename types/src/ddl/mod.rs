//! DDL (Data Definition Language) entity types
//!
//! Every entity is a plain owned value with consuming builder methods:
//!
//! ```
//! use drizzle_types::ddl::{Column, GeneratedSpec, Index, Table};
//!
//! let users = Table::new("users")
//!     .column(Column::new("id", "integer").primary_key())
//!     .column(Column::new("first", "text").not_null())
//!     .column(Column::new("last", "text").not_null())
//!     .column(Column::new("full", "text").generated(GeneratedSpec::stored("users.first || ' ' || users.last")))
//!     .index(Index::on("users", &["last"]));
//!
//! // qualifiers naming the owning table are stripped on attach
//! assert_eq!(users.column_named("full").unwrap().generated.as_ref().unwrap().expression, "first||' '||last");
//! ```

mod column;
mod constraint;
mod enum_type;
mod generated;
mod index;
mod sequence;
mod table;

pub use column::{Column, ColumnDefault};
pub use constraint::{Constraint, ConstraintKind, ReferentialAction};
pub use enum_type::EnumType;
pub use generated::{GeneratedMode, GeneratedSpec};
pub use index::{Index, IndexColumn};
pub use sequence::{IdentityKind, IdentitySpec, Sequence, SequenceOptions, SequenceParam};
pub use table::Table;
