//! Error types for the record workflow core.
//!
//! Gate failures (permission, reassignment restrictions) are reported as
//! deny-results with reasons, never as errors; see
//! [`ActionDecision`](crate::authorizer::ActionDecision). Only genuinely
//! unexpected states surface through this enum.

use std::fmt::{Display, Formatter};

use crate::record::RecordState;
use crate::types::{ConversationId, GroupId, RecordId};

/// Errors that can occur while evaluating or executing record workflows.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// The record's state does not appear in its process type's step path.
    /// Data corruption; must never be silently coerced.
    InvalidState {
        record: RecordId,
        state: RecordState,
    },
    /// An action was requested that the current step does not offer.
    /// Reachable UI flows receive a denial instead; this surfaces only on
    /// programmatic misuse.
    IllegalTransition {
        record: RecordId,
        from: RecordState,
        action: String,
    },
    /// A group id was referenced that the hierarchy does not contain.
    UnknownGroup { group: GroupId },
    /// The group tree would be left inconsistent (duplicate id, second
    /// root).
    HierarchyViolation { message: String },
    /// A record id was referenced that the store does not contain.
    UnknownRecord { record: RecordId },
    /// A conversation id was referenced that the store does not contain.
    UnknownConversation { conversation: ConversationId },
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidState { record, state } => {
                write!(f, "record {} is in state {:?} which its process type cannot reach", record, state)
            }
            Self::IllegalTransition { record, from, action } => {
                write!(f, "record {}: action '{}' is not legal from state {:?}", record, action, from)
            }
            Self::UnknownGroup { group } => write!(f, "unknown group {}", group),
            Self::HierarchyViolation { message } => write!(f, "hierarchy violation: {}", message),
            Self::UnknownRecord { record } => write!(f, "unknown record {}", record),
            Self::UnknownConversation { conversation } => {
                write!(f, "unknown conversation {}", conversation)
            }
        }
    }
}

impl std::error::Error for WorkflowError {}
