//! Error types for the CLI

use thiserror::Error;

use crate::config::ConfigError;
use drizzle_migrations::MigrationError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the migration engine
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Declared schema files disagree or do not match the config
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// `push` needs `[dbCredentials]`
    #[error("No database credentials configured; add a [dbCredentials] section")]
    MissingCredentials,

    /// No driver for the configured database
    #[error("{dialect} push requires the `{feature}` feature")]
    MissingDriver {
        dialect: &'static str,
        feature: &'static str,
    },

    /// No push driver exists for the dialect
    #[error("push is not available for {0}; use `drizzle generate` instead")]
    UnsupportedPush(&'static str),

    /// A question needs an answer but stdin is not a terminal
    #[error("{0}")]
    NonInteractive(String),

    /// Destructive statements were held back
    #[error("{0} destructive change(s) need confirmation; rerun in a terminal or with --force")]
    PendingConfirmation(usize),

    /// Terminal prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Validation found problems
    #[error("{0}")]
    Check(String),
}
