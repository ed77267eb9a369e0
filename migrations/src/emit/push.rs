//! Push mode: run an approved plan against a live connection

use crate::classify::{ApprovalGate, ApprovalState, ConfirmationProvider, GateOutcome, ReviewedUnit};
use crate::emit::Executor;
use crate::error::{DriverError, ExecutionError, MigrationError};
use crate::plan::{OrderedPlan, PlanUnit, PlanWarning};
use crate::tracing::{trace_exec, trace_plan};

/// How a push run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Every approved unit ran
    Completed,
    /// Nothing ran; these destructive units need confirmation
    PendingConfirmation(Vec<usize>),
    /// The user aborted before anything ran
    Cancelled,
}

/// Summary of a push run
#[derive(Clone, Debug, PartialEq)]
pub struct PushReport {
    pub outcome: PushOutcome,
    /// Statements sent to the database, in order
    pub executed: Vec<String>,
    /// Units that were reviewed, with their final state
    pub units: Vec<ReviewedUnit>,
    /// Changes left out of the plan
    pub warnings: Vec<PlanWarning>,
}

impl PushReport {
    fn halted(outcome: PushOutcome, plan: &OrderedPlan) -> Self {
        Self {
            outcome,
            executed: Vec::new(),
            units: Vec::new(),
            warnings: plan.warnings.clone(),
        }
    }

    /// Units the user rejected
    pub fn skipped(&self) -> impl Iterator<Item = &ReviewedUnit> {
        self.units
            .iter()
            .filter(|u| u.state == ApprovalState::Skipped)
    }
}

/// Tracks the applied prefix of the scheduled statements
struct Cursor {
    scheduled: Vec<String>,
    next: usize,
}

impl Cursor {
    fn run(&mut self, executor: &mut dyn Executor, sql: &str) -> Result<(), ExecutionError> {
        trace_exec!(self.next + 1, sql);
        executor
            .execute(sql)
            .map_err(|e| self.failure(sql, e, self.next))?;
        self.next += 1;
        Ok(())
    }

    /// Failure at the current position; statements from `applied` on count as not applied
    fn failure(&self, statement: &str, error: DriverError, applied: usize) -> ExecutionError {
        ExecutionError {
            position: self.next + 1,
            statement: statement.to_string(),
            message: error.message,
            applied: self.scheduled[..applied].to_vec(),
            not_applied: self.scheduled[applied..].to_vec(),
        }
    }

    /// Turn a failure inside a transaction into one that reflects the rollback
    fn rolled_back(
        &self,
        executor: &mut dyn Executor,
        mut error: ExecutionError,
        checkpoint: usize,
    ) -> ExecutionError {
        match executor.rollback() {
            Ok(()) => {
                error.applied = self.scheduled[..checkpoint].to_vec();
                error.not_applied = self.scheduled[checkpoint..].to_vec();
            }
            Err(e) => {
                error.message = format!("{}; rollback failed: {}", error.message, e.message);
            }
        }
        error
    }

    fn run_unit(
        &mut self,
        executor: &mut dyn Executor,
        unit: &ReviewedUnit,
    ) -> Result<(), ExecutionError> {
        let unit = &unit.unit;
        for sql in &unit.setup {
            self.run(executor, sql)?;
        }
        if let Err(error) = self.run_body(executor, unit) {
            return Err(restore(executor, unit, error));
        }
        for sql in &unit.teardown {
            self.run(executor, sql)?;
        }
        Ok(())
    }

    fn run_body(&mut self, executor: &mut dyn Executor, unit: &PlanUnit) -> Result<(), ExecutionError> {
        if unit.atomic && executor.dialect().supports_transactional_ddl() {
            let checkpoint = self.next;
            executor
                .begin()
                .map_err(|e| self.failure("BEGIN", e, checkpoint))?;
            for sql in &unit.statements {
                if let Err(error) = self.run(executor, sql) {
                    return Err(self.rolled_back(executor, error, checkpoint));
                }
            }
            if let Err(e) = executor.commit() {
                let error = self.failure("COMMIT", e, self.next);
                return Err(self.rolled_back(executor, error, checkpoint));
            }
        } else {
            for sql in &unit.statements {
                self.run(executor, sql)?;
            }
        }
        Ok(())
    }
}

/// Run the teardown of a failed unit so connection settings its setup
/// changed (`PRAGMA foreign_keys`) are restored; teardown failures are
/// appended to the error message
fn restore(executor: &mut dyn Executor, unit: &PlanUnit, mut error: ExecutionError) -> ExecutionError {
    for sql in &unit.teardown {
        trace_exec!(error.position, sql);
        if let Err(e) = executor.execute(sql) {
            error.message = format!("{}; teardown `{sql}` failed: {}", error.message, e.message);
        }
    }
    error
}

/// Review `plan` through `gate`, then execute every approved unit in order
///
/// Confirmations are settled before the first statement runs. A pending or
/// cancelled review executes nothing. The first driver failure stops the run
/// with an [`ExecutionError`] describing what was and was not applied.
pub fn push(
    plan: &OrderedPlan,
    gate: &ApprovalGate,
    provider: &mut dyn ConfirmationProvider,
    executor: &mut dyn Executor,
) -> Result<PushReport, MigrationError> {
    let mut units = match gate.review(plan, provider)? {
        GateOutcome::Ready(units) => units,
        GateOutcome::PendingConfirmation(held) => {
            return Ok(PushReport::halted(PushOutcome::PendingConfirmation(held), plan));
        }
        GateOutcome::Cancelled => return Ok(PushReport::halted(PushOutcome::Cancelled, plan)),
    };

    let mut cursor = Cursor {
        scheduled: units
            .iter()
            .filter(|u| u.state.may_execute())
            .flat_map(|u| u.unit.all_statements().cloned())
            .collect(),
        next: 0,
    };
    trace_plan!("push", cursor.scheduled.len(), "statements scheduled");

    for unit in &mut units {
        if !unit.state.may_execute() {
            unit.state = ApprovalState::Skipped;
            continue;
        }
        cursor.run_unit(executor, unit)?;
        unit.state = ApprovalState::Executed;
    }

    Ok(PushReport {
        outcome: PushOutcome::Completed,
        executed: cursor.scheduled,
        units,
        warnings: plan.warnings.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ApprovalPolicy, NonInteractive};
    use crate::plan::{PlanUnit, UnitOrigin};
    use drizzle_types::Dialect;
    use drizzle_types::ddl::Table;

    use crate::diff::ChangeSetEntry;

    #[derive(Default)]
    struct Recorder {
        dialect: Option<Dialect>,
        log: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl Executor for Recorder {
        fn dialect(&self) -> Dialect {
            self.dialect.unwrap_or(Dialect::SQLite)
        }

        fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
            self.log.push(sql.to_string());
            if self.fail_on.is_some_and(|f| sql.contains(f)) {
                return Err(DriverError::new("no such table: ghost"));
            }
            Ok(())
        }
    }

    fn unit(id: usize, statements: &[&str], atomic: bool) -> PlanUnit {
        PlanUnit {
            id,
            description: format!("unit {id}"),
            setup: if atomic {
                vec!["PRAGMA foreign_keys=OFF;".to_string()]
            } else {
                Vec::new()
            },
            statements: statements.iter().map(|s| s.to_string()).collect(),
            teardown: if atomic {
                vec!["PRAGMA foreign_keys=ON;".to_string()]
            } else {
                Vec::new()
            },
            atomic,
            origin: UnitOrigin::Entry(ChangeSetEntry::CreateTable(Table::new("t"))),
        }
    }

    fn force() -> ApprovalGate {
        ApprovalGate::new(ApprovalPolicy::Force)
    }

    #[test]
    fn test_atomic_unit_runs_in_transaction() {
        let plan = OrderedPlan {
            units: vec![unit(1, &["CREATE TABLE `__new_t` (`a` integer);"], true)],
            warnings: Vec::new(),
        };
        let mut exec = Recorder::default();
        let report = push(&plan, &force(), &mut NonInteractive, &mut exec).unwrap();

        assert_eq!(report.outcome, PushOutcome::Completed);
        assert_eq!(
            exec.log,
            vec![
                "PRAGMA foreign_keys=OFF;",
                "BEGIN",
                "CREATE TABLE `__new_t` (`a` integer);",
                "COMMIT",
                "PRAGMA foreign_keys=ON;",
            ]
        );
        assert_eq!(report.executed.len(), 3);
    }

    #[test]
    fn test_mysql_runs_atomic_unit_without_transaction() {
        let plan = OrderedPlan {
            units: vec![unit(1, &["ALTER TABLE `t` ADD `a` int;"], true)],
            warnings: Vec::new(),
        };
        let mut exec = Recorder {
            dialect: Some(Dialect::MySQL),
            ..Recorder::default()
        };
        push(&plan, &force(), &mut NonInteractive, &mut exec).unwrap();
        assert!(!exec.log.iter().any(|s| s == "BEGIN"));
    }

    #[test]
    fn test_failure_reports_boundary() {
        let plan = OrderedPlan {
            units: vec![
                unit(1, &["CREATE TABLE `a` (`id` integer);"], false),
                unit(2, &["DROP TABLE `ghost`;"], false),
                unit(3, &["CREATE TABLE `b` (`id` integer);"], false),
            ],
            warnings: Vec::new(),
        };
        let mut exec = Recorder {
            fail_on: Some("ghost"),
            ..Recorder::default()
        };
        let err = push(&plan, &force(), &mut NonInteractive, &mut exec).unwrap_err();
        let MigrationError::Execution(err) = err else {
            panic!("expected execution error");
        };
        assert_eq!(err.position, 2);
        assert_eq!(err.message, "no such table: ghost");
        assert_eq!(err.applied, vec!["CREATE TABLE `a` (`id` integer);"]);
        assert_eq!(
            err.not_applied,
            vec!["DROP TABLE `ghost`;", "CREATE TABLE `b` (`id` integer);"]
        );
        assert_eq!(exec.log.len(), 2);
    }

    #[test]
    fn test_failure_inside_transaction_rolls_back() {
        let plan = OrderedPlan {
            units: vec![unit(
                1,
                &["CREATE TABLE `__new_t` (`a` integer);", "DROP TABLE `ghost`;"],
                true,
            )],
            warnings: Vec::new(),
        };
        let mut exec = Recorder {
            fail_on: Some("ghost"),
            ..Recorder::default()
        };
        let err = push(&plan, &force(), &mut NonInteractive, &mut exec).unwrap_err();
        let MigrationError::Execution(err) = err else {
            panic!("expected execution error");
        };
        assert_eq!(err.position, 3);
        assert_eq!(err.applied, vec!["PRAGMA foreign_keys=OFF;"]);
        assert_eq!(err.not_applied.len(), 3);
        assert_eq!(
            &exec.log[exec.log.len() - 2..],
            ["ROLLBACK", "PRAGMA foreign_keys=ON;"]
        );
    }

    #[test]
    fn test_pending_confirmation_runs_nothing() {
        let plan = OrderedPlan {
            units: vec![PlanUnit {
                origin: UnitOrigin::Entry(ChangeSetEntry::DropTable(Table::new("users"))),
                ..unit(1, &["DROP TABLE `users`;"], false)
            }],
            warnings: Vec::new(),
        };
        let mut exec = Recorder::default();
        let report = push(
            &plan,
            &ApprovalGate::new(ApprovalPolicy::Confirm),
            &mut NonInteractive,
            &mut exec,
        )
        .unwrap();
        assert_eq!(report.outcome, PushOutcome::PendingConfirmation(vec![1]));
        assert!(exec.log.is_empty());
    }
}
