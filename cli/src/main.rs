//! Drizzle CLI - Main entry point

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use drizzle_cli::commands::push::PushOptions;
use drizzle_cli::config::Config;
use drizzle_cli::error::CliError;

/// Drizzle - schema migrations for PostgreSQL, MySQL and SQLite
#[derive(Parser, Debug)]
#[command(name = "drizzle")]
#[command(author, version, about = "Schema migrations for PostgreSQL, MySQL and SQLite", long_about = None)]
struct Cli {
    /// Path to config file (default: drizzle.config.toml)
    #[arg(short, long, global = true, value_name = "PATH", env = "DRIZZLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new migration from schema changes
    Generate {
        /// Migration name (optional, auto-generated if not provided)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Push schema changes directly to database (without migration files)
    Push {
        /// Show all SQL statements before they are executed
        #[arg(long)]
        verbose: bool,

        /// Auto-approve destructive statements
        #[arg(long)]
        force: bool,

        /// Print planned SQL changes without executing them (dry run)
        #[arg(long)]
        explain: bool,
    },

    /// Validate configuration, declared schema and migration history
    Check,
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate { name } => drizzle_cli::commands::generate::run(&config, name.as_deref()),
        Command::Push {
            verbose,
            force,
            explain,
        } => drizzle_cli::commands::push::run(
            &config,
            PushOptions {
                force,
                explain,
                verbose,
            },
        ),
        Command::Check => drizzle_cli::commands::check::run(&config),
    }
}

/// Load configuration with fallback to default path
fn load_config(custom_path: Option<&Path>) -> Result<Config, CliError> {
    match custom_path {
        Some(path) => Config::load_from(path).map_err(Into::into),
        None => Config::load().map_err(Into::into),
    }
}
