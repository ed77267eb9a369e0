//! Terminal prompts
//!
//! Rename questions are asked before planning; destructive confirmations are
//! asked by the approval gate through [`TerminalConfirmations`]. Nothing is
//! asked when stdin is not a terminal.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, IsTerminal};

use colored::Colorize;
use inquire::Select;

use crate::error::CliError;
use crate::output;
use drizzle_migrations::{
    ChangeClass, ConfirmationDecision, ConfirmationProvider, MigrationError, PlanUnit,
    RenameDecision, RenameDecisions, RenameKind, RenameProposal,
};

/// Returns `true` if prompts can be shown
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

// ============================================================================
// Renames
// ============================================================================

/// One answer offered for a rename proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameChoice {
    pub from: String,
    /// `None` means the dropped entity is unrelated to the created ones
    pub to: Option<String>,
}

impl fmt::Display for RenameChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.to {
            Some(to) => write!(f, "~ {} › {}  rename", self.from, to),
            None => write!(f, "- {}  drop, create the new one separately", self.from),
        }
    }
}

type Claimed = BTreeSet<(Option<String>, String)>;

/// Answers for `proposal`; candidates already claimed by an earlier rename are left out
pub fn rename_choices(proposal: &RenameProposal, claimed: &Claimed) -> Vec<RenameChoice> {
    proposal
        .candidates
        .iter()
        .filter(|c| !claimed.contains(&(proposal.table.clone(), (*c).clone())))
        .map(|c| RenameChoice {
            from: proposal.from.clone(),
            to: Some(c.clone()),
        })
        .chain(std::iter::once(RenameChoice {
            from: proposal.from.clone(),
            to: None,
        }))
        .collect()
}

fn describe(proposal: &RenameProposal) -> String {
    match (proposal.kind, &proposal.table) {
        (RenameKind::Column, Some(table)) => format!("column `{}` in table `{table}`", proposal.from),
        _ => format!("table `{}`", proposal.from),
    }
}

/// Ask how each proposal resolves
///
/// Fails without prompting when stdin is not a terminal.
pub fn resolve_renames(proposals: &[RenameProposal]) -> Result<RenameDecisions, CliError> {
    let mut decisions = RenameDecisions::new();
    if proposals.is_empty() {
        return Ok(decisions);
    }

    if !is_interactive() {
        let listed: Vec<_> = proposals.iter().map(describe).collect();
        return Err(CliError::NonInteractive(format!(
            "Cannot decide whether {} was renamed in non-interactive mode; run in a terminal",
            listed.join(", ")
        )));
    }

    let mut claimed = Claimed::new();
    for proposal in proposals {
        if !proposal.applies(&decisions) {
            continue;
        }
        let choices = rename_choices(proposal, &claimed);
        if choices.len() == 1 {
            decisions.decide(proposal, RenameDecision::Unrelated);
            continue;
        }

        let question = format!("Was {} renamed?", describe(proposal));
        let answer = Select::new(&question, choices)
            .prompt()
            .map_err(|e| CliError::Prompt(e.to_string()))?;

        match answer.to {
            Some(to) => {
                claimed.insert((proposal.table.clone(), to.clone()));
                decisions.decide(proposal, RenameDecision::Rename(to));
            }
            None => decisions.decide(proposal, RenameDecision::Unrelated),
        }
    }
    Ok(decisions)
}

// ============================================================================
// Destructive confirmations
// ============================================================================

/// Answers offered for a held unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmChoice {
    Approve,
    Reject,
    ApproveAll,
    Abort,
}

impl ConfirmChoice {
    pub const ALL: [ConfirmChoice; 4] = [Self::Approve, Self::Reject, Self::ApproveAll, Self::Abort];

    pub const fn decision(self) -> ConfirmationDecision {
        match self {
            Self::Approve => ConfirmationDecision::Approve,
            Self::Reject => ConfirmationDecision::Reject,
            Self::ApproveAll => ConfirmationDecision::ApproveAll,
            Self::Abort => ConfirmationDecision::Cancel,
        }
    }
}

impl fmt::Display for ConfirmChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "Yes, apply this change",
            Self::Reject => "No, skip it",
            Self::ApproveAll => "Yes, and apply every remaining change",
            Self::Abort => "Abort the push",
        })
    }
}

/// Asks on the terminal for each held unit
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalConfirmations;

impl ConfirmationProvider for TerminalConfirmations {
    fn confirm(
        &mut self,
        unit: &PlanUnit,
        class: ChangeClass,
    ) -> Result<ConfirmationDecision, MigrationError> {
        println!();
        println!("{} {}", output::class_tag(class), unit.description.bold());
        for sql in &unit.statements {
            println!("    {}", output::muted(sql));
        }

        // a closed or interrupted prompt aborts the whole push
        Ok(Select::new("Apply this change?", ConfirmChoice::ALL.to_vec())
            .prompt()
            .map_or(ConfirmationDecision::Cancel, ConfirmChoice::decision))
    }

    fn is_interactive(&self) -> bool {
        is_interactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_proposal() -> RenameProposal {
        RenameProposal {
            kind: RenameKind::Column,
            table: Some("users".to_string()),
            from: "name".to_string(),
            candidates: vec!["full_name".to_string(), "nickname".to_string()],
            table_renamed_from: None,
        }
    }

    #[test]
    fn choices_end_with_unrelated() {
        let choices = rename_choices(&column_proposal(), &Claimed::new());
        assert_eq!(choices.len(), 3);
        assert_eq!(choices[0].to.as_deref(), Some("full_name"));
        assert_eq!(choices[2].to, None);
        assert_eq!(choices[0].to_string(), "~ name › full_name  rename");
    }

    #[test]
    fn claimed_candidates_are_skipped() {
        let mut claimed = Claimed::new();
        claimed.insert((Some("users".to_string()), "full_name".to_string()));
        claimed.insert((Some("posts".to_string()), "nickname".to_string()));

        let choices = rename_choices(&column_proposal(), &claimed);
        let targets: Vec<_> = choices.iter().map(|c| c.to.as_deref()).collect();
        assert_eq!(targets, vec![Some("nickname"), None]);
    }

    #[test]
    fn no_proposals_need_no_terminal() {
        let decisions = resolve_renames(&[]).unwrap();
        assert_eq!(decisions, RenameDecisions::new());
    }

    #[test]
    fn confirm_choices_map_to_decisions() {
        assert_eq!(ConfirmChoice::Abort.decision(), ConfirmationDecision::Cancel);
        assert_eq!(
            ConfirmChoice::ApproveAll.decision(),
            ConfirmationDecision::ApproveAll
        );
        assert_eq!(describe(&column_proposal()), "column `name` in table `users`");
    }
}
