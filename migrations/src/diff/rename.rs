//! Two-phase rename resolution
//!
//! [`Differ::propose_renames`] lists every dropped table or column that has
//! plausible candidates among the created ones. The caller answers each
//! proposal (usually by asking the user) and hands the answers to
//! [`Differ::resolve_renames`], which produces the final change-set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use drizzle_types::ddl::Table;

use crate::error::{AmbiguousRenameError, MigrationError};
use crate::snapshot::{Snapshot, table_key};

use super::{ChangeSet, ChangeSetEntry, TableName, compare};

/// Level a rename applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenameKind {
    Table,
    Column,
}

/// A dropped entity that might have been renamed to one of `candidates`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameProposal {
    pub kind: RenameKind,
    /// Owning table key (columns only)
    pub table: Option<String>,
    /// Dropped table key or column name
    pub from: String,
    /// Created table keys or column names that could be the renamed entity
    pub candidates: Vec<String>,
    /// Dropped table key a column proposal depends on; the proposal only
    /// applies when that table is renamed to `table`
    pub table_renamed_from: Option<String>,
}

type ProposalKey = (RenameKind, Option<String>, String);

impl RenameProposal {
    fn key(&self) -> ProposalKey {
        (self.kind, self.table.clone(), self.from.clone())
    }

    /// Returns `true` if `decisions` make this proposal relevant: always,
    /// unless it depends on a table rename that was not chosen
    pub fn applies(&self, decisions: &RenameDecisions) -> bool {
        let Some(old_table) = &self.table_renamed_from else {
            return true;
        };
        match decisions
            .decisions
            .get(&(RenameKind::Table, None, old_table.clone()))
        {
            Some(RenameDecision::Rename(to)) => self.table.as_ref() == Some(to),
            _ => false,
        }
    }
}

impl fmt::Display for RenameProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.table) {
            (RenameKind::Column, Some(table)) => write!(f, "column {table}.{}", self.from)?,
            _ => write!(f, "table {}", self.from)?,
        }
        write!(f, " -> {{{}}}", self.candidates.join(", "))
    }
}

/// Answer to one proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameDecision {
    /// The entity was renamed to this candidate
    Rename(String),
    /// Drop and create are unrelated
    Unrelated,
}

/// Answers collected for a set of proposals
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenameDecisions {
    decisions: BTreeMap<ProposalKey, RenameDecision>,
}

impl RenameDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the answer for `proposal`
    pub fn decide(&mut self, proposal: &RenameProposal, decision: RenameDecision) {
        self.decisions.insert(proposal.key(), decision);
    }

    /// Table `from` was renamed to `to`
    #[must_use]
    pub fn rename_table(mut self, from: &str, to: &str) -> Self {
        self.decisions.insert(
            (RenameKind::Table, None, from.to_string()),
            RenameDecision::Rename(to.to_string()),
        );
        self
    }

    /// Column `from` of `table` was renamed to `to`
    #[must_use]
    pub fn rename_column(mut self, table: &str, from: &str, to: &str) -> Self {
        self.decisions.insert(
            (RenameKind::Column, Some(table.to_string()), from.to_string()),
            RenameDecision::Rename(to.to_string()),
        );
        self
    }

    /// Table `from` was dropped, not renamed
    #[must_use]
    pub fn unrelated_table(mut self, from: &str) -> Self {
        self.decisions.insert(
            (RenameKind::Table, None, from.to_string()),
            RenameDecision::Unrelated,
        );
        self
    }

    /// Column `from` of `table` was dropped, not renamed
    #[must_use]
    pub fn unrelated_column(mut self, table: &str, from: &str) -> Self {
        self.decisions.insert(
            (RenameKind::Column, Some(table.to_string()), from.to_string()),
            RenameDecision::Unrelated,
        );
        self
    }

    /// Answer recorded for `proposal`
    pub fn get(&self, proposal: &RenameProposal) -> Option<&RenameDecision> {
        self.decisions.get(&proposal.key())
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Column proposals between two versions of one table, keyed by `key`
fn column_proposals(
    key: &str,
    before: &Table,
    after: &Table,
    table_renamed_from: Option<String>,
) -> Vec<RenameProposal> {
    let created: Vec<_> = after
        .columns
        .iter()
        .filter(|c| before.column_named(&c.name).is_none())
        .collect();
    before
        .columns
        .iter()
        .filter(|c| after.column_named(&c.name).is_none())
        .filter_map(|dropped| {
            let candidates: Vec<String> = created
                .iter()
                .filter(|c| c.rename_compatible(dropped))
                .map(|c| c.name.clone())
                .collect();
            (!candidates.is_empty()).then(|| RenameProposal {
                kind: RenameKind::Column,
                table: Some(key.to_string()),
                from: dropped.name.clone(),
                candidates,
                table_renamed_from: table_renamed_from.clone(),
            })
        })
        .collect()
}

/// Point every foreign key aimed at the table keyed `target` to its new
/// table or column name
fn follow_rename(view: &mut Snapshot, target: &str, from_column: Option<&str>, to: &str) {
    let dialect = view.dialect;
    for table in view.tables.values_mut() {
        let owner = table.schema.clone();
        for constraint in &mut table.constraints {
            let Some((schema_to, table_to)) = constraint.foreign_target() else {
                continue;
            };
            if table_key(dialect, schema_to.or(owner.as_deref()), table_to) != target {
                continue;
            }
            let table_to = table_to.to_string();
            constraint.rename_reference(&table_to, from_column, to);
        }
    }
}

/// Differ with an explicit rename decision step
pub struct Differ<'a> {
    previous: &'a Snapshot,
    next: &'a Snapshot,
}

impl<'a> Differ<'a> {
    pub fn new(previous: &'a Snapshot, next: &'a Snapshot) -> Self {
        Self { previous, next }
    }

    /// Dropped entities with plausible created candidates
    ///
    /// Tables match by column count and types within one schema. Columns
    /// match by key and value-source kind within a table present in both
    /// snapshots; a type change does not rule a column out. Columns of a
    /// proposed table pair are proposed too, conditional on that table
    /// rename being chosen.
    pub fn propose_renames(&self) -> Vec<RenameProposal> {
        let mut proposals = Vec::new();
        let mut within_renames = Vec::new();

        let created: Vec<_> = self
            .next
            .tables
            .iter()
            .filter(|(key, _)| !self.previous.tables.contains_key(*key))
            .collect();
        for (key, dropped) in &self.previous.tables {
            if self.next.tables.contains_key(key) {
                continue;
            }
            let candidates: Vec<_> = created
                .iter()
                .filter(|(_, t)| t.schema == dropped.schema && t.rename_compatible(dropped))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            for (candidate_key, candidate) in &candidates {
                within_renames.extend(column_proposals(
                    candidate_key,
                    dropped,
                    candidate,
                    Some(key.clone()),
                ));
            }
            proposals.push(RenameProposal {
                kind: RenameKind::Table,
                table: None,
                from: key.clone(),
                candidates: candidates.iter().map(|(k, _)| (*k).clone()).collect(),
                table_renamed_from: None,
            });
        }

        for (key, after) in &self.next.tables {
            if let Some(before) = self.previous.tables.get(key) {
                proposals.extend(column_proposals(key, before, after, None));
            }
        }

        proposals.append(&mut within_renames);
        proposals
    }

    /// Change-set with possible renames left unresolved
    pub fn diff(&self) -> ChangeSet {
        super::diff(self.previous, self.next)
    }

    /// Final change-set once every proposal has an answer
    ///
    /// Fails with [`AmbiguousRenameError`] when a proposal is unanswered,
    /// names a target that is not among its candidates, or claims a target
    /// another rename already took.
    pub fn resolve_renames(&self, decisions: &RenameDecisions) -> Result<ChangeSet, MigrationError> {
        let mut undecided = Vec::new();
        let mut claimed = BTreeSet::new();
        let mut tables = Vec::new();
        let mut columns = Vec::new();

        for proposal in self.propose_renames() {
            if !proposal.applies(decisions) {
                continue;
            }
            match decisions.get(&proposal) {
                None => undecided.push(proposal),
                Some(RenameDecision::Unrelated) => {}
                Some(RenameDecision::Rename(to)) => {
                    if !proposal.candidates.contains(to) {
                        return Err(AmbiguousRenameError {
                            reason: format!("`{to}` is not a rename candidate"),
                            proposals: vec![proposal],
                        }
                        .into());
                    }
                    if !claimed.insert((proposal.kind, proposal.table.clone(), to.clone())) {
                        return Err(AmbiguousRenameError {
                            reason: format!("`{to}` is claimed by more than one rename"),
                            proposals: vec![proposal],
                        }
                        .into());
                    }
                    match proposal.table {
                        Some(table) => columns.push((table, proposal.from, to.clone())),
                        None => tables.push((proposal.from, to.clone())),
                    }
                }
            }
        }

        if !undecided.is_empty() {
            return Err(AmbiguousRenameError {
                reason: "rename decisions missing".to_string(),
                proposals: undecided,
            }
            .into());
        }

        let mut view = self.previous.clone();
        let mut leading = Vec::new();
        let mut renames = Vec::new();

        for (from, to) in &tables {
            let (Some(old), Some(new)) = (view.tables.remove(from), self.next.tables.get(to)) else {
                continue;
            };
            let old_name = old.name.clone();
            let mut renamed = old;
            renamed.name = new.name.clone();
            renamed.schema = new.schema.clone();
            leading.push(ChangeSetEntry::RenameTable {
                from: TableName {
                    schema: renamed.schema.clone(),
                    name: old_name.clone(),
                },
                to: TableName::of(new),
            });
            renames.push(format!("table:{old_name}:{}", new.name));
            view.tables.insert(to.clone(), renamed);
            follow_rename(&mut view, from, None, &new.name);
        }

        for (key, from, to) in &columns {
            let Some(table) = view.tables.get_mut(key) else {
                continue;
            };
            table.rename_column(from, to);
            let owner = TableName::of(table);
            follow_rename(&mut view, key, Some(from.as_str()), to);
            renames.push(format!("column:{}:{from}:{to}", owner.name));
            leading.push(ChangeSetEntry::RenameColumn {
                table: owner,
                from: from.clone(),
                to: to.clone(),
            });
        }

        let mut changes = compare(&view, self.next);
        leading.append(&mut changes.entries);
        changes.entries = leading;
        changes.renames = renames;
        Ok(changes)
    }
}
