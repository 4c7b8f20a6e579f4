//! Read-only snapshot of a record for UI display.
//!
//! Consumers never mutate this; they receive new snapshots via the
//! executor's watch channel.

use std::collections::BTreeMap;

use crate::catalog::ProcessType;
use crate::record::{AlarmFlags, Record, RecordState};
use crate::state_machine::{self, TransitionKind};
use crate::types::{ClaimsNumber, GroupId, RecordId};

/// Everything the UI needs to render one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub id: RecordId,
    pub process_type: ProcessType,
    pub record_state: RecordState,
    pub responsible_profile: GroupId,
    pub claims_number: ClaimsNumber,
    pub mayorship: bool,
    pub reassignment_not_allowed: bool,
    pub alarms: AlarmFlags,
    /// Name of the current step; `None` when the record sits in a state
    /// outside its ideal path (cancelled, not-processed).
    pub step_name: Option<&'static str>,
    /// Legal transitions from the current step.
    pub transitions: BTreeMap<TransitionKind, RecordState>,
}

impl From<&Record> for RecordSnapshot {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            process_type: record.process_type,
            record_state: record.record_state,
            responsible_profile: record.responsible_profile,
            claims_number: record.claims_number,
            mayorship: record.mayorship,
            reassignment_not_allowed: record.reassignment_not_allowed,
            alarms: record.alarms,
            step_name: state_machine::current_step(record).ok().map(|s| s.name),
            transitions: state_machine::transitions(record).unwrap_or_default(),
        }
    }
}
