//! Push command implementation
//!
//! Introspects the live database, diffs it against the declared schema and
//! applies the plan directly, without migration files. Destructive changes
//! are confirmed on the terminal unless `--force` is given.

use colored::Colorize;

use drizzle_migrations::{
    ApprovalGate, ApprovalPolicy, ChangeClass, Differ, ExecutionError, MigrationError,
    OrderedPlan, PushOutcome, classify, prepare, push,
};

use super::print_warnings;
use crate::config::Config;
use crate::db::Connection;
use crate::error::CliError;
use crate::prompts::TerminalConfirmations;
use crate::{output, prompts, schema};

/// Flags accepted by `drizzle push`
#[derive(Clone, Copy, Debug, Default)]
pub struct PushOptions {
    /// Approve destructive changes without asking
    pub force: bool,
    /// Print the plan and stop
    pub explain: bool,
    /// Print every statement before running it
    pub verbose: bool,
}

/// Run the push command
pub fn run(config: &Config, opts: PushOptions) -> Result<(), CliError> {
    println!("{}", output::heading("Pushing schema to database..."));
    println!();

    let declared = schema::load_declared(config)?;
    let credentials = config.credentials().ok_or(CliError::MissingCredentials)?;
    println!("  {}: {}", output::label("Database"), credentials.redacted());

    let mut conn = Connection::open(&credentials)?;
    let current = conn.introspect()?;

    let proposals = Differ::new(&current, &declared).propose_renames();
    let decisions = prompts::resolve_renames(&proposals)?;
    let prepared = prepare(&current, &declared, &decisions)?;

    print_warnings(&prepared.plan.warnings);

    if prepared.is_empty() {
        println!(
            "{}",
            output::success("No changes to push. Database is up to date.")
        );
        return Ok(());
    }

    if opts.explain {
        print_plan(&prepared.plan);
        return Ok(());
    }
    if opts.verbose {
        print_plan(&prepared.plan);
    }

    let gate = ApprovalGate::new(ApprovalPolicy::from_force(opts.force));
    let report = match push(&prepared.plan, &gate, &mut TerminalConfirmations, conn.executor()) {
        Ok(report) => report,
        Err(MigrationError::Execution(err)) => {
            print_failure(&err);
            return Err(MigrationError::Execution(err).into());
        }
        Err(e) => return Err(e.into()),
    };

    match &report.outcome {
        PushOutcome::Completed => {
            println!(
                "{} Changes applied ({} statement(s))",
                "✓".green().bold(),
                report.executed.len()
            );
            let skipped = report.skipped().count();
            if skipped > 0 {
                println!(
                    "  {}",
                    output::warning(&format!("{skipped} rejected change(s) skipped"))
                );
            }
            Ok(())
        }
        PushOutcome::PendingConfirmation(held) => {
            println!();
            println!(
                "{}",
                output::banner_warning("Destructive changes were not applied:")
            );
            for unit in held.iter().filter_map(|id| prepared.plan.unit(*id)) {
                println!(
                    "  {} {}",
                    output::class_tag(ChangeClass::Destructive),
                    unit.description
                );
                for sql in &unit.statements {
                    println!("    {}", output::muted(sql));
                }
            }
            Err(CliError::PendingConfirmation(held.len()))
        }
        PushOutcome::Cancelled => {
            println!("{}", output::warning("Push cancelled; nothing was applied."));
            Ok(())
        }
    }
}

/// Print every planned statement with its unit's class
fn print_plan(plan: &OrderedPlan) {
    println!();
    println!("{}", output::muted("--- Planned SQL ---"));
    for unit in &plan.units {
        println!("-- {} {}", output::class_tag(classify(unit)), unit.description);
        for sql in unit.all_statements() {
            println!("{sql}");
        }
    }
    println!("{}", output::muted("--- End SQL ---"));
    println!();
}

fn print_failure(err: &ExecutionError) {
    eprintln!();
    eprintln!(
        "{} statement {} failed: {}",
        "✗".red().bold(),
        err.position,
        err.statement
    );
    eprintln!(
        "  {}: {} statement(s)",
        output::label("Applied"),
        err.applied.len()
    );
    for sql in &err.not_applied {
        eprintln!("  {} {}", output::error("not applied:"), output::muted(sql));
    }
}
