//! The record card: the central aggregate root of the workflow core.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::ProcessType;
use crate::types::{ClaimsNumber, GroupId, RecordId, ThemeId, TimestampUtc};

/// Lifecycle state of a record card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    PendingValidate,
    Planning,
    InResolution,
    PendingAnswer,
    Closed,
    Cancelled,
    NotProcessed,
    ExternalProcessing,
    ExternalReturned,
}

impl RecordState {
    /// Terminal states offer no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordState::Closed | RecordState::Cancelled | RecordState::NotProcessed
        )
    }

    /// Human-readable label for display and deny reasons.
    pub fn label(&self) -> &'static str {
        match self {
            RecordState::PendingValidate => "pending validation",
            RecordState::Planning => "planning",
            RecordState::InResolution => "in resolution",
            RecordState::PendingAnswer => "pending answer",
            RecordState::Closed => "closed",
            RecordState::Cancelled => "cancelled",
            RecordState::NotProcessed => "not processed",
            RecordState::ExternalProcessing => "external processing",
            RecordState::ExternalReturned => "returned from external processing",
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-record alarm flags maintained by the conversation alarm engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmFlags {
    /// Something on this record needs attention.
    pub alarm: bool,
    /// The applicant owes the responsible group a reply.
    pub pend_applicant_response: bool,
    /// The applicant has replied since the responsible group last wrote.
    pub applicant_response: bool,
    /// A non-responsible participant replied to the responsible group.
    pub response_to_responsible: bool,
    /// The responsible group is waiting on an answer it asked for.
    pub pend_response_responsible: bool,
    /// Raised by citizen-facing channels outside the conversation engine.
    pub citizen_alarm: bool,
}

/// Field-level identifier used for partial record saves.
///
/// [`RecordStore::save_record`](crate::store::RecordStore::save_record)
/// receives the set of fields a mutation actually touched; fields outside
/// the set must be left untouched by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    RecordState,
    ProcessType,
    ResponsibleProfile,
    ClaimsNumber,
    ReassignmentNotAllowed,
    Mayorship,
    ApplicantBlocked,
    Theme,
    ClosingDate,
    Alarm,
    PendApplicantResponse,
    ApplicantResponse,
    ResponseToResponsible,
    PendResponseResponsible,
    CitizenAlarm,
}

/// A citizen service request tracked through the administrative lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Immutable once set unless changed through the explicit theme-change
    /// action.
    pub process_type: ProcessType,
    pub record_state: RecordState,
    /// Group currently owning the record.
    pub responsible_profile: GroupId,
    pub creation_group: GroupId,
    pub created_at: TimestampUtc,
    /// Set when the record reaches a closed state.
    pub closing_date: Option<TimestampUtc>,
    pub theme: ThemeId,
    /// Count of prior reopen cycles; never decreases.
    pub claims_number: ClaimsNumber,
    /// Lock flag: the record may not be reassigned.
    pub reassignment_not_allowed: bool,
    /// Priority flag requiring the mayorship permission to act on.
    pub mayorship: bool,
    /// The applicant is blocked and may not claim.
    pub applicant_blocked: bool,
    pub alarms: AlarmFlags,
}

impl Record {
    /// Creates a record in the initial state of its process type.
    pub fn new(
        process_type: ProcessType,
        responsible_profile: GroupId,
        creation_group: GroupId,
        theme: ThemeId,
    ) -> Self {
        Self {
            id: RecordId::new(),
            process_type,
            record_state: process_type.initial_state(),
            responsible_profile,
            creation_group,
            created_at: TimestampUtc::now(),
            closing_date: None,
            theme,
            claims_number: ClaimsNumber::default(),
            reassignment_not_allowed: false,
            mayorship: false,
            applicant_blocked: false,
            alarms: AlarmFlags::default(),
        }
    }

    /// Whole days the record has existed, relative to `now`.
    pub fn age_days(&self, now: TimestampUtc) -> i64 {
        self.created_at.days_until(now)
    }

    /// True once the record has left pending-validate.
    pub fn is_validated(&self) -> bool {
        self.record_state != RecordState::PendingValidate
    }

    /// True in any of the terminal states.
    pub fn is_closed_or_cancelled(&self) -> bool {
        self.record_state.is_terminal()
    }

    /// Field-level diff against an earlier copy of the same record.
    ///
    /// Drives partial saves: only fields in the returned set reach the
    /// persistence layer, everything else stays untouched.
    pub fn changed_fields(&self, earlier: &Record) -> BTreeSet<RecordField> {
        let mut changed = BTreeSet::new();
        let mut check = |same: bool, field: RecordField| {
            if !same {
                changed.insert(field);
            }
        };
        check(self.record_state == earlier.record_state, RecordField::RecordState);
        check(self.process_type == earlier.process_type, RecordField::ProcessType);
        check(
            self.responsible_profile == earlier.responsible_profile,
            RecordField::ResponsibleProfile,
        );
        check(self.claims_number == earlier.claims_number, RecordField::ClaimsNumber);
        check(
            self.reassignment_not_allowed == earlier.reassignment_not_allowed,
            RecordField::ReassignmentNotAllowed,
        );
        check(self.mayorship == earlier.mayorship, RecordField::Mayorship);
        check(
            self.applicant_blocked == earlier.applicant_blocked,
            RecordField::ApplicantBlocked,
        );
        check(self.theme == earlier.theme, RecordField::Theme);
        check(self.closing_date == earlier.closing_date, RecordField::ClosingDate);
        check(self.alarms.alarm == earlier.alarms.alarm, RecordField::Alarm);
        check(
            self.alarms.pend_applicant_response == earlier.alarms.pend_applicant_response,
            RecordField::PendApplicantResponse,
        );
        check(
            self.alarms.applicant_response == earlier.alarms.applicant_response,
            RecordField::ApplicantResponse,
        );
        check(
            self.alarms.response_to_responsible == earlier.alarms.response_to_responsible,
            RecordField::ResponseToResponsible,
        );
        check(
            self.alarms.pend_response_responsible == earlier.alarms.pend_response_responsible,
            RecordField::PendResponseResponsible,
        );
        check(
            self.alarms.citizen_alarm == earlier.alarms.citizen_alarm,
            RecordField::CitizenAlarm,
        );
        changed
    }
}
