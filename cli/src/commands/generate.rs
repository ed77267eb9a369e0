//! Generate migration command
//!
//! This command generates a new migration by:
//! 1. Loading the declared schema snapshot(s)
//! 2. Loading the last snapshot from the migrations directory
//! 3. Asking about possible renames
//! 4. Diffing and planning the changes
//! 5. Writing the migration file, the new snapshot and the journal entry

use colored::Colorize;

use drizzle_migrations::{Differ, MigrationError, MigrationWriter, classify, prepare};

use super::print_warnings;
use crate::config::Config;
use crate::error::CliError;
use crate::{output, prompts, schema};

/// Run the generate command
pub fn run(config: &Config, name: Option<&str>) -> Result<(), CliError> {
    println!("{}", output::heading("Generating migration..."));
    println!();

    let writer = MigrationWriter::new(config.settings());
    let declared = schema::load_declared(config)?;
    let previous = writer.previous_snapshot()?;

    let proposals = Differ::new(&previous, &declared).propose_renames();
    let decisions = prompts::resolve_renames(&proposals)?;
    let prepared = prepare(&previous, &declared, &decisions)?;

    print_warnings(&prepared.plan.warnings);

    let written = match writer.write(&prepared.plan, &prepared.changes, &declared, name) {
        Ok(written) => written,
        Err(MigrationError::NoChanges) => {
            println!("{}", output::warning("No schema changes detected"));
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "{} Created migration: {}",
        "✓".green().bold(),
        written.tag.cyan()
    );
    println!("  {}", output::muted(&written.sql_path.display().to_string()));

    println!("\n{}", "Changes:".bold());
    for unit in &prepared.plan.units {
        println!("  {} {}", output::class_tag(classify(unit)), unit.description);
    }

    Ok(())
}
