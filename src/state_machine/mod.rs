//! Lifecycle state machine for record cards.
//!
//! The decision functions here are pure reads over the process catalog:
//! they compute the current step, the legal transitions and the handler
//! kind without touching anything. Mutation happens in one place only, the
//! [`RecordWorkflow`] executor.

mod commands;
mod events;
mod executor;
mod snapshot;

pub use commands::RecordCommand;
pub use events::RecordEvent;
pub use executor::{RecordWorkflow, WorkflowStore};
pub use snapshot::RecordSnapshot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{StateChangeKind, Step};
use crate::errors::WorkflowError;
use crate::record::{Record, RecordState};

/// Named transitions a step can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Move to the next sequential step of the ideal path.
    Advance,
    /// Abort processing. Targets not-processed before validation,
    /// cancelled afterwards.
    Cancel,
    /// Hand an externally-returned record back to the external operator.
    Return,
    /// Close an externally-returned record.
    Close,
}

/// Maps `record_state` to the matching step of the record's ideal path.
///
/// # Errors
///
/// `InvalidState` when the state does not appear in the path: an invalid
/// process/state combination that indicates data corruption and must never
/// be silently coerced.
pub fn current_step(record: &Record) -> Result<&'static Step, WorkflowError> {
    record
        .process_type
        .ideal_path()
        .iter()
        .find(|step| step.state == record.record_state)
        .ok_or(WorkflowError::InvalidState {
            record: record.id,
            state: record.record_state,
        })
}

/// Legal next transitions from the record's current step.
///
/// Terminal states return an empty map. Every other step offers the single
/// advance transition plus cancel, except the externally-returned
/// intermediate, which offers return and close instead.
pub fn transitions(
    record: &Record,
) -> Result<BTreeMap<TransitionKind, RecordState>, WorkflowError> {
    let mut map = BTreeMap::new();
    if record.record_state.is_terminal() {
        return Ok(map);
    }
    let path = record.process_type.ideal_path();
    let step = current_step(record)?;
    let index = path
        .iter()
        .position(|s| s.state == step.state)
        .unwrap_or_default();

    if record.record_state == RecordState::ExternalReturned {
        map.insert(TransitionKind::Return, path[index - 1].state);
        map.insert(TransitionKind::Close, RecordState::Closed);
        return Ok(map);
    }

    map.insert(TransitionKind::Advance, path[index + 1].state);
    let cancel_target = if record.record_state == RecordState::PendingValidate {
        RecordState::NotProcessed
    } else {
        RecordState::Cancelled
    };
    map.insert(TransitionKind::Cancel, cancel_target);
    Ok(map)
}

/// The state the next sequential step represents, or `None` when terminal.
pub fn next_step_code(record: &Record) -> Result<Option<RecordState>, WorkflowError> {
    if record.record_state.is_terminal() {
        return Ok(None);
    }
    let path = record.process_type.ideal_path();
    let step = current_step(record)?;
    let index = path
        .iter()
        .position(|s| s.state == step.state)
        .unwrap_or_default();
    Ok(path.get(index + 1).map(|s| s.state))
}

/// Which handler contract the caller must invoke for a move into `next`.
///
/// Pure dispatch: the pending-answer handler additionally persists closing
/// metadata and may short-circuit into an immediate answer, but selecting
/// it here has no side effects.
pub fn state_change_method(_record: &Record, next: RecordState) -> StateChangeKind {
    StateChangeKind::for_target(next)
}

#[cfg(test)]
mod tests;
