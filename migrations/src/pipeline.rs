//! Snapshot pair to ordered plan
//!
//! Every structural and planning error surfaces here, before any emitter
//! touches a file or a connection.

use crate::diff::{ChangeSet, Differ, RenameDecisions};
use crate::error::{AmbiguousRenameError, MigrationError};
use crate::plan::{OrderedPlan, plan_changes};
use crate::rules::rules_for;
use crate::snapshot::Snapshot;
use crate::tracing::trace_plan;

/// Change-set and the plan derived from it
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedMigration {
    pub changes: ChangeSet,
    pub plan: OrderedPlan,
}

impl PreparedMigration {
    /// Returns `true` if there is nothing to emit
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }
}

fn check_dialects(previous: &Snapshot, next: &Snapshot) -> Result<(), MigrationError> {
    if previous.dialect != next.dialect {
        return Err(MigrationError::DialectMismatch {
            previous: previous.dialect,
            next: next.dialect,
        });
    }
    Ok(())
}

/// Validate both snapshots and diff them with the given rename decisions
pub fn prepare_changes(
    previous: &Snapshot,
    next: &Snapshot,
    decisions: &RenameDecisions,
) -> Result<ChangeSet, MigrationError> {
    check_dialects(previous, next)?;
    previous.validate()?;
    next.validate()?;

    let changes = Differ::new(previous, next).resolve_renames(decisions)?;
    trace_plan!("diff", changes.entries.len(), "change-set entries");
    Ok(changes)
}

/// Plan a change-set in its own dialect
///
/// A change-set with unresolved rename proposals cannot be planned.
pub fn plan_change_set(changes: &ChangeSet) -> Result<OrderedPlan, MigrationError> {
    if !changes.ambiguous.is_empty() {
        return Err(AmbiguousRenameError {
            reason: "rename decisions missing".to_string(),
            proposals: changes.ambiguous.clone(),
        }
        .into());
    }
    let rules = rules_for(changes.dialect);
    Ok(plan_changes(changes, rules.as_ref())?)
}

/// Diff and plan in one step
pub fn prepare(
    previous: &Snapshot,
    next: &Snapshot,
    decisions: &RenameDecisions,
) -> Result<PreparedMigration, MigrationError> {
    let changes = prepare_changes(previous, next, decisions)?;
    let plan = plan_change_set(&changes)?;
    Ok(PreparedMigration { changes, plan })
}
