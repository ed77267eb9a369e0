//! Check command - validates configuration, declared schema and history

use drizzle_migrations::diff::diff;
use drizzle_migrations::{MigrationWriter, ORIGIN_UUID, Snapshot};

use crate::config::Config;
use crate::error::CliError;
use crate::{output, schema};

/// Findings from walking the migration history
#[derive(Debug, Default)]
pub struct HistoryReport {
    pub migrations: usize,
    /// Snapshot of the newest migration
    pub latest: Option<Snapshot>,
    pub problems: Vec<String>,
}

/// Verify that every journal entry has its files and that snapshots chain
pub fn verify_history(config: &Config) -> Result<HistoryReport, CliError> {
    let writer = MigrationWriter::new(config.settings());
    let journal = writer.load_journal()?;
    let mut report = HistoryReport {
        migrations: journal.entries.len(),
        ..HistoryReport::default()
    };

    if journal.dialect != config.base_dialect() {
        report.problems.push(format!(
            "journal dialect is {} but the config dialect is {}",
            journal.dialect,
            config.base_dialect()
        ));
    }

    let mut previous_id = ORIGIN_UUID.to_string();
    for entry in &journal.entries {
        let sql_path = writer.migration_path(&entry.tag);
        if !sql_path.exists() {
            report
                .problems
                .push(format!("missing migration file {}", sql_path.display()));
        }

        match Snapshot::load(&writer.snapshot_path(entry.sequence())) {
            Ok(snapshot) => {
                if !snapshot.prev_ids.contains(&previous_id) {
                    report.problems.push(format!(
                        "snapshot of `{}` does not follow the previous migration",
                        entry.tag
                    ));
                }
                previous_id = snapshot.id.clone();
                report.latest = Some(snapshot);
            }
            Err(e) => report.problems.push(e.to_string()),
        }
    }
    Ok(report)
}

pub fn run(config: &Config) -> Result<(), CliError> {
    println!("{}", output::heading("Checking configuration..."));
    println!();

    let mut warnings = Vec::new();
    let mut has_errors = false;

    println!("  {}: {}", output::label("Dialect"), config.dialect);
    println!("  {}: {}", output::label("Schema"), config.schema_display());
    println!("  {}: {}", output::label("Output"), config.out.display());

    // Declared schema
    println!();
    print!("  {} Schema... ", output::label("Checking"));
    let declared = match schema::load_declared(config) {
        Ok(declared) => {
            println!("{}", output::status_ok());
            println!("    {} table(s)", declared.tables.len());
            Some(declared)
        }
        Err(e) => {
            println!("{}", output::status_error());
            println!("    {e}");
            has_errors = true;
            None
        }
    };

    // History
    println!();
    print!("  {} Migrations... ", output::label("Checking"));
    let history = if config.journal_path().exists() {
        let history = verify_history(config)?;
        if history.problems.is_empty() {
            println!("{}", output::status_ok());
            println!("    {} migration(s)", history.migrations);
        } else {
            println!("{}", output::status_error());
            for problem in &history.problems {
                println!("    {problem}");
            }
            has_errors = true;
        }
        Some(history)
    } else {
        println!("{}", output::status_warning("NOT CREATED"));
        warnings.push("No migration journal (run generate first)".to_string());
        None
    };

    // Pending changes
    if let Some(declared) = &declared
        && history.as_ref().is_none_or(|h| h.problems.is_empty())
    {
        let previous = history
            .and_then(|h| h.latest)
            .unwrap_or_else(|| Snapshot::origin(config.base_dialect()));
        let changes = diff(&previous, declared);
        if !changes.entries.is_empty() || !changes.ambiguous.is_empty() {
            warnings.push("Declared schema has changes not yet generated".to_string());
        }
    }

    // Credentials
    println!();
    print!("  {} Credentials... ", output::label("Checking"));
    match config.credentials() {
        Some(creds) => {
            println!("{}", output::status_ok());
            println!("    {}", creds.redacted());
        }
        None => {
            println!("{}", output::status_warning("NOT SET"));
            warnings.push("No credentials (needed for push)".to_string());
        }
    }

    // Summary
    println!();
    if has_errors {
        println!("{}", output::error("Configuration has errors."));
        Err(CliError::Check("check failed".into()))
    } else if warnings.is_empty() {
        println!("{}", output::success("Configuration OK."));
        Ok(())
    } else {
        println!(
            "{}",
            output::warning(&format!("{} warning(s):", warnings.len()))
        );
        for w in warnings {
            println!("  - {w}");
        }
        Ok(())
    }
}
