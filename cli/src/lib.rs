//! Drizzle CLI - Command-line interface for the drizzle-kit migration engine
//!
//! The CLI reads a `drizzle.config.toml`, loads the declared schema snapshot
//! and drives the engine in `drizzle-migrations`.
//!
//! # Configuration
//!
//! ```toml
//! dialect = "sqlite"
//! schema = "schema.json"
//! out = "./drizzle"
//! breakpoints = true
//!
//! [dbCredentials]
//! url = "./dev.db"
//!
//! [migrations]
//! prefix = "index"
//! ```
//!
//! # Commands
//!
//! - `drizzle generate [--name N]` - Write the next migration file
//! - `drizzle push [--force] [--explain] [--verbose]` - Apply the schema to a live database
//!   (requires a driver feature, e.g. `rusqlite`)
//! - `drizzle check` - Validate the config, the declared schema and the history

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod prompts;
pub mod schema;

pub use config::{Config, Credentials, Dialect, Error as ConfigError};
pub use error::CliError;
