//! Commands that can mutate a record card.
//!
//! All record mutations go through [`RecordWorkflow::apply`]; commands are
//! validated against the catalog-derived transitions before anything is
//! touched.
//!
//! [`RecordWorkflow::apply`]: super::RecordWorkflow::apply

use crate::reassignment::ReassignReason;
use crate::types::{GroupId, ThemeId};

/// Commands accepted by the record workflow executor.
#[derive(Debug, Clone)]
pub enum RecordCommand {
    /// Follow the single advance transition of the current step. When the
    /// target is pending-answer and a draft answer is supplied, the answer
    /// short-circuits and the record closes in the same application.
    Advance {
        acting_group: GroupId,
        draft_answer: Option<String>,
    },
    /// Send the answer from pending-answer and close the record.
    Answer {
        acting_group: GroupId,
        body: String,
    },
    /// Abort processing; lands on not-processed before validation,
    /// cancelled afterwards.
    Cancel {
        acting_group: GroupId,
        reason: String,
    },
    /// Close an externally-returned record.
    Close { acting_group: GroupId },
    /// Hand an externally-returned record back to the external operator.
    Return { acting_group: GroupId },
    /// Citizen-initiated reopen of a closed record; bumps the claim
    /// counter and resets the record to pending validation.
    Claim,
    /// Move ownership to another group; the target must survive the
    /// reassignment resolver for the acting group.
    Reassign {
        acting_group: GroupId,
        target: GroupId,
        reason: ReassignReason,
    },
    /// Flip the reassignment lock.
    ToggleReassignable { acting_group: GroupId },
    /// Flip the mayorship priority flag.
    ToggleUrgency { acting_group: GroupId },
    /// Move the record to a different theme.
    ChangeTheme {
        acting_group: GroupId,
        theme: ThemeId,
    },
}

impl RecordCommand {
    /// Human-readable name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            RecordCommand::Advance { .. } => "Advance",
            RecordCommand::Answer { .. } => "Answer",
            RecordCommand::Cancel { .. } => "Cancel",
            RecordCommand::Close { .. } => "Close",
            RecordCommand::Return { .. } => "Return",
            RecordCommand::Claim => "Claim",
            RecordCommand::Reassign { .. } => "Reassign",
            RecordCommand::ToggleReassignable { .. } => "ToggleReassignable",
            RecordCommand::ToggleUrgency { .. } => "ToggleUrgency",
            RecordCommand::ChangeTheme { .. } => "ChangeTheme",
        }
    }
}
