//! Events emitted by the record workflow executor.
//!
//! Events are facts that have happened. They feed the structured audit log
//! and are the unit the JSONL trail serializes; the snapshot channel, not
//! the event stream, carries UI state.

use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use crate::reassignment::ReassignReason;
use crate::record::RecordState;
use crate::types::{ClaimsNumber, GroupId, RecordId, ThemeId, TimestampUtc};

/// Events emitted after a successfully applied record command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEvent {
    /// The record moved to another lifecycle state.
    StateChanged {
        record: RecordId,
        from: RecordState,
        to: RecordState,
        changed_at: TimestampUtc,
    },
    /// Ownership moved to another group.
    Reassigned {
        record: RecordId,
        acting_group: GroupId,
        previous_responsible: GroupId,
        next_responsible: GroupId,
        reason: ReassignReason,
        reassigned_at: TimestampUtc,
    },
    /// The citizen reopened a closed record.
    Claimed {
        record: RecordId,
        claims_number: ClaimsNumber,
        reopened_at: TimestampUtc,
    },
    /// The answer left the organization; delivery is the caller's concern.
    AnswerSent {
        record: RecordId,
        body: String,
        sent_at: TimestampUtc,
    },
    /// Processing was aborted with an operator-supplied reason.
    Cancelled {
        record: RecordId,
        reason: String,
        cancelled_at: TimestampUtc,
    },
    /// The reassignment lock was flipped.
    ReassignableToggled {
        record: RecordId,
        reassignment_not_allowed: bool,
    },
    /// The mayorship priority flag was flipped.
    UrgencyToggled { record: RecordId, mayorship: bool },
    /// The record moved to a different theme.
    ThemeChanged {
        record: RecordId,
        previous_theme: ThemeId,
        next_theme: ThemeId,
    },
}

impl DomainEvent for RecordEvent {
    fn event_type(&self) -> String {
        match self {
            Self::StateChanged { .. } => "StateChanged".to_string(),
            Self::Reassigned { .. } => "Reassigned".to_string(),
            Self::Claimed { .. } => "Claimed".to_string(),
            Self::AnswerSent { .. } => "AnswerSent".to_string(),
            Self::Cancelled { .. } => "Cancelled".to_string(),
            Self::ReassignableToggled { .. } => "ReassignableToggled".to_string(),
            Self::UrgencyToggled { .. } => "UrgencyToggled".to_string(),
            Self::ThemeChanged { .. } => "ThemeChanged".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1".to_string()
    }
}
