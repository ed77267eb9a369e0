//! CLI command implementations
//!
//! Each command module implements a specific drizzle CLI command.

pub mod check;
pub mod generate;
pub mod push;

use drizzle_migrations::PlanWarning;

use crate::output;

/// Report changes the dialect cannot express
fn print_warnings(warnings: &[PlanWarning]) {
    for warning in warnings {
        println!("{}", output::warn_line(&warning.to_string()));
    }
}
