//! Database connections for `push`
//!
//! Only drivers compiled in through features can be opened; every other
//! credential reports which feature it needs.

use drizzle_migrations::{Executor, Snapshot};

#[cfg(feature = "rusqlite")]
use drizzle_migrations::Introspector;
#[cfg(feature = "rusqlite")]
use drizzle_migrations::introspect::RusqliteIntrospector;

use crate::config::Credentials;
use crate::error::CliError;

/// Open connection to the configured database
pub enum Connection {
    #[cfg(feature = "rusqlite")]
    Sqlite(rusqlite::Connection),
}

impl Connection {
    /// Connect with `credentials`
    pub fn open(credentials: &Credentials) -> Result<Self, CliError> {
        match credentials {
            #[cfg(feature = "rusqlite")]
            Credentials::Sqlite { path } => rusqlite::Connection::open(&**path)
                .map(Self::Sqlite)
                .map_err(|e| CliError::IoError(format!("Failed to open {path}: {e}"))),

            #[cfg(not(feature = "rusqlite"))]
            Credentials::Sqlite { .. } => Err(CliError::MissingDriver {
                dialect: "SQLite",
                feature: "rusqlite",
            }),

            Credentials::Postgres { .. } => Err(CliError::UnsupportedPush("PostgreSQL")),
            Credentials::Mysql { .. } => Err(CliError::UnsupportedPush("MySQL")),
        }
    }

    /// Read the live schema
    pub fn introspect(&mut self) -> Result<Snapshot, CliError> {
        match *self {
            #[cfg(feature = "rusqlite")]
            Self::Sqlite(ref conn) => Ok(RusqliteIntrospector::new(conn).introspect()?),
        }
    }

    /// Statement executor over this connection
    pub fn executor(&mut self) -> &mut dyn Executor {
        match *self {
            #[cfg(feature = "rusqlite")]
            Self::Sqlite(ref mut conn) => conn,
        }
    }
}
