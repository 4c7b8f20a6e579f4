//! Action authorization: one map of named actions, each carrying
//! perform/deny plus the reason the deciding gate gave.
//!
//! Composes the state machine (is this transition legal now), the
//! reassignment resolver (where may the record go) and the permission
//! lookup. Gate failures are always recovered into structured deny results;
//! only catalog/record-state mismatches propagate as errors.

mod table;

pub use table::PermissionTable;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::WorkflowError;
use crate::hierarchy::GroupHierarchy;
use crate::reassignment::{ReassignmentEvent, ReassignmentResolver, ThemeFacts};
use crate::record::{Record, RecordState};
use crate::state_machine::{self, TransitionKind};
use crate::store::{PermissionLookup, ThemeCatalog};
use crate::types::{GroupId, PermissionCode, TimestampUtc, UserId};

/// Every action the authorizer can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    // Transition-backed actions, present only when the step offers them.
    Advance,
    Cancel,
    Return,
    Close,
    // Fixed action set, always evaluated.
    Claim,
    CancelRequest,
    Reassign,
    Update,
    ToggleUrgency,
    ToggleReassignable,
    ThemeChange,
    UploadFile,
    DeleteFile,
    AddConversation,
    DraftAnswer,
    ResendAnswer,
    Multirecord,
}

impl ActionName {
    /// The fixed actions evaluated on every request, independent of the
    /// transition map.
    pub const FIXED: [ActionName; 13] = [
        ActionName::Claim,
        ActionName::CancelRequest,
        ActionName::Reassign,
        ActionName::Update,
        ActionName::ToggleUrgency,
        ActionName::ToggleReassignable,
        ActionName::ThemeChange,
        ActionName::UploadFile,
        ActionName::DeleteFile,
        ActionName::AddConversation,
        ActionName::DraftAnswer,
        ActionName::ResendAnswer,
        ActionName::Multirecord,
    ];

    /// Actions dropped from the result while the record is closed or
    /// cancelled, regardless of permissions.
    const DISALLOWED_WHILE_CLOSED: [ActionName; 5] = [
        ActionName::Reassign,
        ActionName::Update,
        ActionName::UploadFile,
        ActionName::Multirecord,
        ActionName::AddConversation,
    ];
}

/// Outcome of evaluating one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub can_perform: bool,
    /// Present whenever a gate denied or narrowed the action.
    pub reason: Option<String>,
}

impl ActionDecision {
    fn granted() -> Self {
        Self {
            can_perform: true,
            reason: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            can_perform: false,
            reason: Some(reason.into()),
        }
    }
}

/// Per-action evaluation lifecycle. Terminal and re-entrant; one value per
/// action per request, no shared mutable state between evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EvalState {
    Unauthenticated,
    Evaluating,
    Granted,
    Denied(String),
}

struct Evaluation {
    state: EvalState,
}

impl Evaluation {
    fn start() -> Self {
        Self {
            state: EvalState::Unauthenticated,
        }
    }

    fn begin(&mut self) {
        if self.state == EvalState::Unauthenticated {
            self.state = EvalState::Evaluating;
        }
    }

    /// First failing gate wins; later gates cannot overwrite it.
    fn gate(&mut self, ok: bool, reason: &str) {
        if self.state == EvalState::Evaluating && !ok {
            self.state = EvalState::Denied(reason.to_string());
        }
    }

    fn finish(mut self) -> ActionDecision {
        if self.state == EvalState::Evaluating {
            self.state = EvalState::Granted;
        }
        match self.state {
            EvalState::Granted => ActionDecision::granted(),
            EvalState::Denied(reason) => ActionDecision::denied(reason),
            EvalState::Unauthenticated | EvalState::Evaluating => {
                ActionDecision::denied("evaluation never completed")
            }
        }
    }
}

/// Evaluates the full action map for one record and acting profile.
pub struct ActionAuthorizer<'a> {
    hierarchy: &'a GroupHierarchy,
    permissions: &'a dyn PermissionLookup,
    themes: &'a dyn ThemeCatalog,
    table: &'a PermissionTable,
}

impl<'a> ActionAuthorizer<'a> {
    pub fn new(
        hierarchy: &'a GroupHierarchy,
        permissions: &'a dyn PermissionLookup,
        themes: &'a dyn ThemeCatalog,
        table: &'a PermissionTable,
    ) -> Self {
        Self {
            hierarchy,
            permissions,
            themes,
            table,
        }
    }

    /// Computes the named-action map for `user` acting as `acting_group`.
    ///
    /// Transition-backed actions appear only when the current step offers
    /// them; fixed actions always appear with an explicit deny reason when
    /// a gate fails. Closed and cancelled records drop the disallowed
    /// subset, with a permission-gated exception for file upload on closed
    /// records.
    pub fn authorize(
        &self,
        record: &Record,
        user: &UserId,
        acting_group: GroupId,
        trail: &[ReassignmentEvent],
        now: TimestampUtc,
    ) -> Result<BTreeMap<ActionName, ActionDecision>, WorkflowError> {
        let mut actions = BTreeMap::new();
        let transitions = state_machine::transitions(record)?;
        let authority = self.tramit_authority(record, user, acting_group)?;

        for kind in transitions.keys() {
            let action = match kind {
                TransitionKind::Advance => ActionName::Advance,
                TransitionKind::Cancel => ActionName::Cancel,
                TransitionKind::Return => ActionName::Return,
                TransitionKind::Close => ActionName::Close,
            };
            actions.insert(action, self.evaluate(record, user, action, &authority));
        }

        for action in ActionName::FIXED {
            if record.is_closed_or_cancelled()
                && ActionName::DISALLOWED_WHILE_CLOSED.contains(&action)
            {
                // Upload keeps a permission-gated exception on closed
                // (not cancelled) records.
                if action == ActionName::UploadFile
                    && record.record_state == RecordState::Closed
                    && self
                        .permissions
                        .has_permission(user, PermissionCode::RecordFileUploadClosed)
                {
                    actions.insert(action, self.evaluate(record, user, action, &authority));
                }
                continue;
            }
            let decision = match action {
                ActionName::Reassign => {
                    self.evaluate_reassign(record, user, acting_group, trail, &authority, now)?
                }
                _ => self.evaluate(record, user, action, &authority),
            };
            actions.insert(action, decision);
        }

        debug!(
            record = %record.id,
            group = %acting_group,
            offered = actions.len(),
            "authorized actions"
        );
        Ok(actions)
    }

    /// Group-level authority over the record: the responsible profile, an
    /// ancestor of it, or the mayorship permission when the record carries
    /// the priority flag. On mayorship records the permission is the only
    /// road in.
    fn tramit_authority(
        &self,
        record: &Record,
        user: &UserId,
        acting_group: GroupId,
    ) -> Result<Authority, WorkflowError> {
        if record.mayorship {
            return Ok(if self.permissions.has_permission(user, PermissionCode::Mayorship) {
                Authority::Granted
            } else {
                Authority::Denied("this record requires the mayorship permission".to_string())
            });
        }
        let owns = acting_group == record.responsible_profile
            || self
                .hierarchy
                .is_descendant(record.responsible_profile, acting_group)?;
        Ok(if owns {
            Authority::Granted
        } else {
            Authority::Denied(
                "the acting group is not the responsible profile or one of its ancestors"
                    .to_string(),
            )
        })
    }

    fn evaluate(
        &self,
        record: &Record,
        user: &UserId,
        action: ActionName,
        authority: &Authority,
    ) -> ActionDecision {
        let mut eval = Evaluation::start();
        eval.begin();

        // Theme-change is forced available when the theme was deactivated
        // out from under the record.
        let theme_forced =
            action == ActionName::ThemeChange && !self.themes.is_theme_active(record.theme);
        // The closed-upload permission lifts the state gate for uploads on
        // closed (not cancelled) records.
        let upload_exception = action == ActionName::UploadFile
            && record.record_state == RecordState::Closed
            && self
                .permissions
                .has_permission(user, PermissionCode::RecordFileUploadClosed);

        if !theme_forced && !upload_exception {
            let (state_ok, state_reason) = self.state_gate(record, action);
            eval.gate(state_ok, &state_reason);
        }

        if let Authority::Denied(reason) = authority {
            eval.gate(false, reason);
        }

        if let Some(code) = self.table.permission_for(action) {
            eval.gate(
                self.permissions.has_permission(user, code),
                &format!("missing permission '{}'", code.as_code()),
            );
        }

        if action == ActionName::Claim && record.applicant_blocked {
            eval.gate(false, "the applicant is blocked and cannot claim");
        }

        eval.finish()
    }

    /// State legality for fixed actions. Transition-backed actions are
    /// pre-filtered by the transitions map and always pass here.
    fn state_gate(&self, record: &Record, action: ActionName) -> (bool, String) {
        let state = record.record_state;
        let ok = match action {
            ActionName::Advance
            | ActionName::Cancel
            | ActionName::Return
            | ActionName::Close => true,
            ActionName::Claim => state == RecordState::Closed,
            ActionName::DraftAnswer => state == RecordState::PendingAnswer,
            ActionName::ResendAnswer => state == RecordState::Closed,
            ActionName::CancelRequest
            | ActionName::Reassign
            | ActionName::Update
            | ActionName::ToggleUrgency
            | ActionName::ToggleReassignable
            | ActionName::ThemeChange
            | ActionName::UploadFile
            | ActionName::DeleteFile
            | ActionName::AddConversation
            | ActionName::Multirecord => !state.is_terminal(),
        };
        (
            ok,
            format!("not available while the record is {}", state.label()),
        )
    }

    /// Reassign composes the shared gates with the resolver's own verdict.
    fn evaluate_reassign(
        &self,
        record: &Record,
        user: &UserId,
        acting_group: GroupId,
        trail: &[ReassignmentEvent],
        authority: &Authority,
        now: TimestampUtc,
    ) -> Result<ActionDecision, WorkflowError> {
        let base = self.evaluate(record, user, ActionName::Reassign, authority);
        if !base.can_perform {
            return Ok(base);
        }
        let theme = ThemeFacts {
            validation_place_days: self.themes.validation_place_days(record.theme),
            is_validated_reassignable: self.themes.is_validated_reassignable(record.theme),
        };
        let resolver = ReassignmentResolver::new(self.hierarchy);
        let action = resolver.reassign_action(record, acting_group, trail, &theme, now)?;
        Ok(ActionDecision {
            can_perform: action.can_perform,
            reason: action.reason,
        })
    }
}

enum Authority {
    Granted,
    Denied(String),
}

#[cfg(test)]
mod tests;
