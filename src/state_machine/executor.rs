//! The record workflow executor: the ONLY place record mutations happen.
//!
//! The executor owns the record, validates commands against the
//! catalog-derived transitions, emits events, appends to the audit trail
//! and broadcasts snapshots over a watch channel. Everything a command
//! touches (state, flags, audit rows) lands through one `apply` call, so
//! partial application cannot be observed.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{commands::RecordCommand, events::RecordEvent, snapshot::RecordSnapshot};
use crate::audit::AuditLog;
use crate::catalog::StateChangeKind;
use crate::errors::WorkflowError;
use crate::hierarchy::GroupHierarchy;
use crate::reassignment::{ReassignmentEvent, ReassignmentResolver, ThemeFacts};
use crate::record::{Record, RecordState};
use crate::state_machine::{self, TransitionKind};
use crate::store::{AuditTrail, RecordStore, ThemeCatalog};
use crate::types::TimestampUtc;

/// Everything the executor needs from the persistence layer. Calls made
/// while applying one command are assumed to share a transaction.
pub trait WorkflowStore: RecordStore + AuditTrail + ThemeCatalog {}

impl<T: RecordStore + AuditTrail + ThemeCatalog> WorkflowStore for T {}

/// Owns one record and serializes every mutation to it.
pub struct RecordWorkflow<'a> {
    record: Record,
    hierarchy: &'a GroupHierarchy,
    store: &'a dyn WorkflowStore,
    audit: Arc<AuditLog>,
    snapshot_tx: watch::Sender<RecordSnapshot>,
    seq: u64,
}

impl<'a> RecordWorkflow<'a> {
    /// Creates an executor around the given record.
    ///
    /// Returns the executor and a watch receiver for state snapshots;
    /// read-only consumers poll the receiver and never touch the record.
    pub fn new(
        record: Record,
        hierarchy: &'a GroupHierarchy,
        store: &'a dyn WorkflowStore,
        audit: Arc<AuditLog>,
    ) -> (Self, watch::Receiver<RecordSnapshot>) {
        let snapshot = RecordSnapshot::from(&record);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let workflow = Self {
            record,
            hierarchy,
            store,
            audit,
            snapshot_tx,
            seq: 0,
        };
        (workflow, snapshot_rx)
    }

    /// All record mutations go through this single method.
    ///
    /// Validates the command, applies it, persists exactly the fields that
    /// changed, appends audit rows, and broadcasts a fresh snapshot.
    pub fn apply(&mut self, command: RecordCommand) -> Result<Vec<RecordEvent>, WorkflowError> {
        self.seq += 1;
        self.audit.log_command(self.seq, command.name());

        let before = self.record.clone();
        let events = self.apply_internal(command)?;

        let changed = self.record.changed_fields(&before);
        if !changed.is_empty() {
            self.store.save_record(&self.record, &changed)?;
        }

        for event in &events {
            self.audit.log_event(self.seq, event);
            if let RecordEvent::Reassigned {
                record,
                acting_group,
                previous_responsible,
                next_responsible,
                reason,
                reassigned_at,
            } = event
            {
                self.store.append_reassignment(ReassignmentEvent {
                    record: *record,
                    acting_group: *acting_group,
                    previous_responsible: *previous_responsible,
                    next_responsible: *next_responsible,
                    reason: *reason,
                    created_at: *reassigned_at,
                })?;
            }
        }

        let _ = self.snapshot_tx.send(RecordSnapshot::from(&self.record));
        Ok(events)
    }

    fn illegal(&self, action: &str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            record: self.record.id,
            from: self.record.record_state,
            action: action.to_string(),
        }
    }

    fn change_state(&mut self, to: RecordState, events: &mut Vec<RecordEvent>) {
        let from = self.record.record_state;
        self.record.record_state = to;
        events.push(RecordEvent::StateChanged {
            record: self.record.id,
            from,
            to,
            changed_at: TimestampUtc::now(),
        });
    }

    /// The pending-answer handler: persists closing metadata alongside the
    /// state change, and short-circuits into an immediate answer when a
    /// draft already exists.
    fn pending_answer_change_state(
        &mut self,
        draft_answer: Option<String>,
        events: &mut Vec<RecordEvent>,
    ) {
        self.record.closing_date = Some(TimestampUtc::now());
        self.change_state(RecordState::PendingAnswer, events);
        if let Some(body) = draft_answer {
            events.push(RecordEvent::AnswerSent {
                record: self.record.id,
                body,
                sent_at: TimestampUtc::now(),
            });
            self.change_state(RecordState::Closed, events);
        }
    }

    fn apply_internal(
        &mut self,
        command: RecordCommand,
    ) -> Result<Vec<RecordEvent>, WorkflowError> {
        let mut events = Vec::new();
        match command {
            RecordCommand::Advance {
                acting_group,
                draft_answer,
            } => {
                if self.record.record_state == RecordState::PendingAnswer {
                    // Leaving pending-answer requires an explicit Answer.
                    return Err(self.illegal("Advance"));
                }
                let target = *state_machine::transitions(&self.record)?
                    .get(&TransitionKind::Advance)
                    .ok_or_else(|| self.illegal("Advance"))?;
                debug!(record = %self.record.id, group = %acting_group, ?target, "advance");
                match state_machine::state_change_method(&self.record, target) {
                    StateChangeKind::Standard => self.change_state(target, &mut events),
                    StateChangeKind::PendingAnswer => {
                        self.pending_answer_change_state(draft_answer, &mut events)
                    }
                }
                Ok(events)
            }

            RecordCommand::Answer { acting_group, body } => {
                if self.record.record_state != RecordState::PendingAnswer {
                    return Err(self.illegal("Answer"));
                }
                debug!(record = %self.record.id, group = %acting_group, "answer");
                self.record.closing_date = Some(TimestampUtc::now());
                events.push(RecordEvent::AnswerSent {
                    record: self.record.id,
                    body,
                    sent_at: TimestampUtc::now(),
                });
                self.change_state(RecordState::Closed, &mut events);
                Ok(events)
            }

            RecordCommand::Cancel {
                acting_group,
                reason,
            } => {
                let target = *state_machine::transitions(&self.record)?
                    .get(&TransitionKind::Cancel)
                    .ok_or_else(|| self.illegal("Cancel"))?;
                debug!(record = %self.record.id, group = %acting_group, ?target, "cancel");
                self.record.closing_date = Some(TimestampUtc::now());
                events.push(RecordEvent::Cancelled {
                    record: self.record.id,
                    reason,
                    cancelled_at: TimestampUtc::now(),
                });
                self.change_state(target, &mut events);
                Ok(events)
            }

            RecordCommand::Close { acting_group } => {
                let target = *state_machine::transitions(&self.record)?
                    .get(&TransitionKind::Close)
                    .ok_or_else(|| self.illegal("Close"))?;
                debug!(record = %self.record.id, group = %acting_group, "close");
                self.record.closing_date = Some(TimestampUtc::now());
                self.change_state(target, &mut events);
                Ok(events)
            }

            RecordCommand::Return { acting_group } => {
                let target = *state_machine::transitions(&self.record)?
                    .get(&TransitionKind::Return)
                    .ok_or_else(|| self.illegal("Return"))?;
                debug!(record = %self.record.id, group = %acting_group, "return to external");
                self.change_state(target, &mut events);
                Ok(events)
            }

            RecordCommand::Claim => {
                if self.record.record_state != RecordState::Closed {
                    return Err(self.illegal("Claim"));
                }
                self.record.claims_number = self.record.claims_number.next();
                self.record.closing_date = None;
                events.push(RecordEvent::Claimed {
                    record: self.record.id,
                    claims_number: self.record.claims_number,
                    reopened_at: TimestampUtc::now(),
                });
                self.change_state(RecordState::PendingValidate, &mut events);
                Ok(events)
            }

            RecordCommand::Reassign {
                acting_group,
                target,
                reason,
            } => {
                if self.record.record_state.is_terminal() {
                    return Err(self.illegal("Reassign"));
                }
                let theme = ThemeFacts {
                    validation_place_days: self.store.validation_place_days(self.record.theme),
                    is_validated_reassignable: self
                        .store
                        .is_validated_reassignable(self.record.theme),
                };
                let trail = self.store.reassignment_trail(self.record.id)?;
                let resolver = ReassignmentResolver::new(self.hierarchy);
                let resolved = resolver.resolve(
                    &self.record,
                    acting_group,
                    &trail,
                    &theme,
                    TimestampUtc::now(),
                )?;
                if !resolved.candidates.contains(&target) {
                    return Err(self.illegal("Reassign"));
                }
                let previous = self.record.responsible_profile;
                self.record.responsible_profile = target;
                events.push(RecordEvent::Reassigned {
                    record: self.record.id,
                    acting_group,
                    previous_responsible: previous,
                    next_responsible: target,
                    reason,
                    reassigned_at: TimestampUtc::now(),
                });
                Ok(events)
            }

            RecordCommand::ToggleReassignable { acting_group } => {
                self.record.reassignment_not_allowed = !self.record.reassignment_not_allowed;
                debug!(record = %self.record.id, group = %acting_group, "toggle reassignable");
                events.push(RecordEvent::ReassignableToggled {
                    record: self.record.id,
                    reassignment_not_allowed: self.record.reassignment_not_allowed,
                });
                Ok(events)
            }

            RecordCommand::ToggleUrgency { acting_group } => {
                self.record.mayorship = !self.record.mayorship;
                debug!(record = %self.record.id, group = %acting_group, "toggle urgency");
                events.push(RecordEvent::UrgencyToggled {
                    record: self.record.id,
                    mayorship: self.record.mayorship,
                });
                Ok(events)
            }

            RecordCommand::ChangeTheme {
                acting_group,
                theme,
            } => {
                let previous = self.record.theme;
                self.record.theme = theme;
                debug!(record = %self.record.id, group = %acting_group, "change theme");
                events.push(RecordEvent::ThemeChanged {
                    record: self.record.id,
                    previous_theme: previous,
                    next_theme: theme,
                });
                Ok(events)
            }
        }
    }

    /// Immutable view of the owned record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Re-broadcasts the current snapshot to all watchers.
    pub fn broadcast_snapshot(&self) {
        let _ = self.snapshot_tx.send(RecordSnapshot::from(&self.record));
    }
}
