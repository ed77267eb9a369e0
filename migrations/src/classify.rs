//! Change classification and the push approval gate
//!
//! Classification is structural: it looks at the change-set entries behind a
//! plan unit, never at SQL text.

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use drizzle_types::ddl::{Column, Constraint};
use regex::Regex;

use crate::diff::ChangeSetEntry;
use crate::error::MigrationError;
use crate::plan::{OrderedPlan, PlanUnit, UnitOrigin};
use crate::tracing::trace_plan;

/// How much existing data a change can affect
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeClass {
    /// Cannot lose or rewrite data
    Safe,
    /// Rewrites data or can fail on existing rows
    DataAltering,
    /// Can delete rows or truncate values
    Destructive,
}

impl ChangeClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::DataAltering => "data-altering",
            Self::Destructive => "destructive",
        }
    }
}

impl fmt::Display for ChangeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Type narrowing
// =============================================================================

#[derive(Debug, PartialEq)]
enum TypeFamily {
    Integer(u8),
    Float(u8),
    /// Precision and scale, `None` when unconstrained
    Numeric(Option<u32>, Option<u32>),
    /// Length, `None` for unbounded text
    Character(Option<u32>),
    Other(String, Vec<u32>),
}

static TYPE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_][a-z0-9_ ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*(unsigned)?\s*$")
        .ok()
});

fn parse_type(sql_type: &str) -> TypeFamily {
    let lower = sql_type.to_ascii_lowercase();
    let (base, args) = match TYPE_PATTERN.as_ref().and_then(|re| re.captures(&lower)) {
        Some(caps) => {
            let base = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let args: Vec<u32> = [caps.get(2), caps.get(3)]
                .into_iter()
                .flatten()
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            (base, args)
        }
        None => (lower.trim().to_string(), Vec::new()),
    };
    let first = args.first().copied();

    match base.as_str() {
        "tinyint" => TypeFamily::Integer(8),
        "smallint" | "int2" | "smallserial" => TypeFamily::Integer(16),
        "mediumint" => TypeFamily::Integer(24),
        "int" | "integer" | "int4" | "serial" => TypeFamily::Integer(32),
        "bigint" | "int8" | "bigserial" => TypeFamily::Integer(64),
        "real" | "float4" => TypeFamily::Float(32),
        "double" | "double precision" | "float8" | "float" => TypeFamily::Float(64),
        "numeric" | "decimal" => TypeFamily::Numeric(first, args.get(1).copied()),
        "varchar" | "character varying" | "char" | "character" | "nchar" | "nvarchar" => {
            TypeFamily::Character(first)
        }
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => TypeFamily::Character(None),
        _ => TypeFamily::Other(base, args),
    }
}

fn bound_shrinks(from: Option<u32>, to: Option<u32>) -> bool {
    match (from, to) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(a), Some(b)) => b < a,
    }
}

/// Returns `true` if converting `from` to `to` can truncate or reject
/// existing values: a smaller integer or float width, a shorter character
/// length, lower numeric precision or scale, unbounded text to a bounded
/// type, or a move to another type family
pub fn is_narrowing_type_change(from: &str, to: &str) -> bool {
    use TypeFamily as F;

    match (parse_type(from), parse_type(to)) {
        (F::Integer(a), F::Integer(b)) | (F::Float(a), F::Float(b)) => b < a,
        (F::Numeric(p1, s1), F::Numeric(p2, s2)) => {
            bound_shrinks(p1, p2) || (p2.is_some() && bound_shrinks(s1.or(Some(0)), s2.or(Some(0))))
        }
        (F::Character(a), F::Character(b)) => bound_shrinks(a, b),
        (F::Other(a, args_a), F::Other(b, args_b)) if a == b => args_a
            .iter()
            .zip(&args_b)
            .any(|(x, y)| y < x),
        _ => true,
    }
}

// =============================================================================
// Classification
// =============================================================================

fn adds_required_value(column: &Column) -> bool {
    column.not_null && !column.has_sql_default() && column.generated.is_none() && column.identity.is_none()
}

/// Classify one change-set entry
pub fn classify_entry(entry: &ChangeSetEntry) -> ChangeClass {
    use ChangeClass::*;
    use ChangeSetEntry as E;

    match entry {
        E::DropTable(_) | E::DropColumn { .. } | E::DropEnum(_) | E::DropSchema { .. } => {
            Destructive
        }
        E::AlterColumnType { previous, next, .. } => {
            if previous.sql_type.trim().eq_ignore_ascii_case(next.sql_type.trim()) {
                Safe
            } else if is_narrowing_type_change(&previous.sql_type, &next.sql_type) {
                Destructive
            } else {
                DataAltering
            }
        }
        E::AlterColumnNullability { next, .. } if next.not_null => DataAltering,
        E::AddColumn { column, .. } if adds_required_value(column) => DataAltering,
        E::AddConstraint { constraint, .. } => match constraint {
            Constraint::Unique { .. }
            | Constraint::Check { .. }
            | Constraint::ForeignKey { .. }
            | Constraint::PrimaryKey { .. } => DataAltering,
        },
        // Turning a plain column generated replaces the values it stored
        E::AlterColumnGenerated { previous, .. } if previous.generated.is_none() => Destructive,
        E::AlterColumnGenerated { .. } | E::DropSequence(_) => DataAltering,
        // Re-creating an identity restarts its sequence
        E::AlterColumnIdentity { previous, next, .. } => match (&previous.identity, &next.identity)
        {
            (Some(a), Some(b)) if a.sequence_name == b.sequence_name => Safe,
            (Some(_), _) => DataAltering,
            (None, _) => Safe,
        },
        _ => Safe,
    }
}

/// Classify a plan unit; rebuilds drop and recreate their table
pub fn classify(unit: &PlanUnit) -> ChangeClass {
    match &unit.origin {
        UnitOrigin::Rebuild { .. } => ChangeClass::Destructive,
        UnitOrigin::DeferredForeignKey { .. } => ChangeClass::DataAltering,
        UnitOrigin::Entry(entry) => classify_entry(entry),
    }
}

// =============================================================================
// Approval gate
// =============================================================================

/// Push-mode state of a plan unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalState {
    Planned,
    AutoApproved,
    PendingConfirmation,
    Approved,
    Rejected,
    Executed,
    Skipped,
}

impl ApprovalState {
    /// Returns `true` if the unit may run
    pub const fn may_execute(&self) -> bool {
        matches!(self, Self::AutoApproved | Self::Approved)
    }
}

/// How destructive units are approved
///
/// There is no default: forcing must always be an explicit choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Hold destructive units for confirmation
    Confirm,
    /// Approve every destructive unit without asking
    Force,
}

impl ApprovalPolicy {
    pub const fn from_force(force: bool) -> Self {
        if force { Self::Force } else { Self::Confirm }
    }
}

/// Answer to one confirmation request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationDecision {
    Approve,
    Reject,
    /// Approve this and every remaining held unit
    ApproveAll,
    /// Stop the push before anything runs
    Cancel,
}

/// Source of confirmation decisions
pub trait ConfirmationProvider {
    /// Decide on one held unit
    fn confirm(
        &mut self,
        unit: &PlanUnit,
        class: ChangeClass,
    ) -> Result<ConfirmationDecision, MigrationError>;

    /// Returns `false` if this provider cannot ask anyone
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Provider for non-interactive runs; never confirms anything
#[derive(Clone, Copy, Debug, Default)]
pub struct NonInteractive;

impl ConfirmationProvider for NonInteractive {
    fn confirm(
        &mut self,
        _unit: &PlanUnit,
        _class: ChangeClass,
    ) -> Result<ConfirmationDecision, MigrationError> {
        Ok(ConfirmationDecision::Reject)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Pre-recorded answers, consumed in order; cancels once exhausted
#[derive(Clone, Debug, Default)]
pub struct ScriptedConfirmations {
    answers: VecDeque<ConfirmationDecision>,
    /// Units asked about, by id
    pub asked: Vec<usize>,
}

impl ScriptedConfirmations {
    pub fn new(answers: impl IntoIterator<Item = ConfirmationDecision>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl ConfirmationProvider for ScriptedConfirmations {
    fn confirm(
        &mut self,
        unit: &PlanUnit,
        _class: ChangeClass,
    ) -> Result<ConfirmationDecision, MigrationError> {
        self.asked.push(unit.id);
        Ok(self
            .answers
            .pop_front()
            .unwrap_or(ConfirmationDecision::Cancel))
    }
}

/// A plan unit with its classification and approval state
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewedUnit {
    pub unit: PlanUnit,
    pub class: ChangeClass,
    pub state: ApprovalState,
}

/// Result of reviewing a plan
#[derive(Clone, Debug, PartialEq)]
pub enum GateOutcome {
    /// Every unit is decided; run the approved ones
    Ready(Vec<ReviewedUnit>),
    /// Destructive units need a decision nobody can give; ids of held units
    PendingConfirmation(Vec<usize>),
    /// The user aborted
    Cancelled,
}

/// Classifies plan units and settles approvals before anything executes
#[derive(Clone, Copy, Debug)]
pub struct ApprovalGate {
    policy: ApprovalPolicy,
}

impl ApprovalGate {
    pub const fn new(policy: ApprovalPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Classify every unit and resolve every confirmation up front
    pub fn review(
        &self,
        plan: &OrderedPlan,
        provider: &mut dyn ConfirmationProvider,
    ) -> Result<GateOutcome, MigrationError> {
        let mut reviewed: Vec<ReviewedUnit> = plan
            .units
            .iter()
            .map(|unit| {
                let class = classify(unit);
                let state = match (class, self.policy) {
                    (ChangeClass::Destructive, ApprovalPolicy::Confirm) => {
                        ApprovalState::PendingConfirmation
                    }
                    (ChangeClass::Destructive, ApprovalPolicy::Force) => ApprovalState::Approved,
                    _ => ApprovalState::AutoApproved,
                };
                ReviewedUnit {
                    unit: unit.clone(),
                    class,
                    state,
                }
            })
            .collect();

        let held: Vec<usize> = reviewed
            .iter()
            .filter(|r| r.state == ApprovalState::PendingConfirmation)
            .map(|r| r.unit.id)
            .collect();
        trace_plan!("held", held.len(), "units awaiting confirmation");

        if held.is_empty() {
            return Ok(GateOutcome::Ready(reviewed));
        }
        if !provider.is_interactive() {
            return Ok(GateOutcome::PendingConfirmation(held));
        }

        let mut approve_rest = false;
        for item in reviewed
            .iter_mut()
            .filter(|r| r.state == ApprovalState::PendingConfirmation)
        {
            if approve_rest {
                item.state = ApprovalState::Approved;
                continue;
            }
            item.state = match provider.confirm(&item.unit, item.class)? {
                ConfirmationDecision::Approve => ApprovalState::Approved,
                ConfirmationDecision::Reject => ApprovalState::Rejected,
                ConfirmationDecision::ApproveAll => {
                    approve_rest = true;
                    ApprovalState::Approved
                }
                ConfirmationDecision::Cancel => return Ok(GateOutcome::Cancelled),
            };
        }

        Ok(GateOutcome::Ready(reviewed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{GeneratedChange, TableName};
    use drizzle_types::ddl::{GeneratedSpec, Table};

    fn entry_unit(id: usize, entry: ChangeSetEntry) -> PlanUnit {
        PlanUnit {
            id,
            description: entry.to_string(),
            setup: Vec::new(),
            statements: vec![format!("-- {entry}")],
            teardown: Vec::new(),
            atomic: false,
            origin: UnitOrigin::Entry(entry),
        }
    }

    fn users() -> TableName {
        TableName {
            schema: None,
            name: "users".to_string(),
        }
    }

    fn mixed_plan() -> OrderedPlan {
        OrderedPlan {
            units: vec![
                entry_unit(
                    1,
                    ChangeSetEntry::AddColumn {
                        table: users(),
                        column: Column::new("bio", "text"),
                    },
                ),
                entry_unit(2, ChangeSetEntry::DropTable(Table::new("legacy"))),
                entry_unit(3, ChangeSetEntry::DropTable(Table::new("old_logs"))),
            ],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_narrowing() {
        assert!(is_narrowing_type_change("bigint", "integer"));
        assert!(!is_narrowing_type_change("integer", "bigint"));
        assert!(is_narrowing_type_change("varchar(255)", "varchar(50)"));
        assert!(!is_narrowing_type_change("varchar(50)", "text"));
        assert!(is_narrowing_type_change("text", "varchar(10)"));
        assert!(is_narrowing_type_change("numeric(10, 2)", "numeric(8,2)"));
        assert!(is_narrowing_type_change("numeric(10,4)", "numeric(10,2)"));
        assert!(!is_narrowing_type_change("numeric(8,2)", "numeric(12,2)"));
        assert!(is_narrowing_type_change("integer", "text"));
        assert!(!is_narrowing_type_change("INT UNSIGNED", "bigint"));
    }

    #[test]
    fn test_drop_table_is_destructive_and_nullable_add_is_safe() {
        assert_eq!(
            classify_entry(&ChangeSetEntry::DropTable(Table::new("users"))),
            ChangeClass::Destructive
        );
        assert_eq!(
            classify_entry(&ChangeSetEntry::AddColumn {
                table: users(),
                column: Column::new("bio", "text"),
            }),
            ChangeClass::Safe
        );
        assert_eq!(
            classify_entry(&ChangeSetEntry::AddColumn {
                table: users(),
                column: Column::new("bio", "text").not_null(),
            }),
            ChangeClass::DataAltering
        );
    }

    #[test]
    fn test_plain_column_becoming_generated_is_destructive() {
        let plain = Column::new("total", "integer");
        let generated = Column::new("total", "integer").generated(GeneratedSpec::virtual_("a + 1"));
        assert_eq!(
            classify_entry(&ChangeSetEntry::AlterColumnGenerated {
                table: users(),
                change: GeneratedChange::Added,
                previous: plain.clone(),
                next: generated.clone(),
            }),
            ChangeClass::Destructive
        );
        assert_eq!(
            classify_entry(&ChangeSetEntry::AlterColumnGenerated {
                table: users(),
                change: GeneratedChange::Dropped,
                previous: generated,
                next: plain,
            }),
            ChangeClass::DataAltering
        );
    }

    #[test]
    fn test_non_interactive_holds_destructive_units() {
        let outcome = ApprovalGate::new(ApprovalPolicy::Confirm)
            .review(&mixed_plan(), &mut NonInteractive)
            .unwrap();
        assert_eq!(outcome, GateOutcome::PendingConfirmation(vec![2, 3]));
    }

    #[test]
    fn test_force_approves_everything() {
        let GateOutcome::Ready(units) = ApprovalGate::new(ApprovalPolicy::Force)
            .review(&mixed_plan(), &mut NonInteractive)
            .unwrap()
        else {
            panic!("expected ready");
        };
        assert!(units.iter().all(|u| u.state.may_execute()));
    }

    #[test]
    fn test_scripted_reject_and_approve() {
        let mut answers = ScriptedConfirmations::new([
            ConfirmationDecision::Reject,
            ConfirmationDecision::Approve,
        ]);
        let GateOutcome::Ready(units) = ApprovalGate::new(ApprovalPolicy::Confirm)
            .review(&mixed_plan(), &mut answers)
            .unwrap()
        else {
            panic!("expected ready");
        };
        assert_eq!(answers.asked, vec![2, 3]);
        let states: Vec<ApprovalState> = units.iter().map(|u| u.state).collect();
        assert_eq!(
            states,
            vec![
                ApprovalState::AutoApproved,
                ApprovalState::Rejected,
                ApprovalState::Approved
            ]
        );
    }

    #[test]
    fn test_approve_all_and_cancel() {
        let mut approve_all = ScriptedConfirmations::new([ConfirmationDecision::ApproveAll]);
        let outcome = ApprovalGate::new(ApprovalPolicy::Confirm)
            .review(&mixed_plan(), &mut approve_all)
            .unwrap();
        assert!(matches!(outcome, GateOutcome::Ready(_)));
        assert_eq!(approve_all.asked, vec![2]);

        let mut cancel = ScriptedConfirmations::new([ConfirmationDecision::Cancel]);
        let outcome = ApprovalGate::new(ApprovalPolicy::Confirm)
            .review(&mixed_plan(), &mut cancel)
            .unwrap();
        assert_eq!(outcome, GateOutcome::Cancelled);
    }
}
