//! Plan emitters
//!
//! - [`generate`]: write the plan as a migration file and extend the history
//! - [`push`]: execute the plan against a live connection

pub mod generate;
pub mod push;

pub use generate::{GeneratedMigration, MigrationPrefix, MigrationSettings, MigrationWriter};
pub use push::{PushOutcome, PushReport, push};

use drizzle_types::Dialect;

use crate::error::DriverError;

/// Statement sink for push mode
///
/// Implemented by driver adapters and by test doubles.
pub trait Executor {
    /// Dialect of the connection
    fn dialect(&self) -> Dialect;

    /// Run one statement
    fn execute(&mut self, sql: &str) -> Result<(), DriverError>;

    fn begin(&mut self) -> Result<(), DriverError> {
        self.execute("BEGIN")
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.execute("ROLLBACK")
    }
}

#[cfg(feature = "rusqlite")]
impl Executor for rusqlite::Connection {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        self.execute_batch(sql).map_err(DriverError::new)
    }
}
