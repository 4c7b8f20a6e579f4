//! Reassignment resolution: who a record may be handed to, and why not.
//!
//! All evaluation is read-only; the outcome is either a candidate list or a
//! denial carrying a plain-language reason the caller surfaces verbatim.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::WorkflowError;
use crate::hierarchy::GroupHierarchy;
use crate::record::{Record, RecordState};
use crate::types::{GroupId, RecordId, TimestampUtc};

/// Why a reassignment event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignReason {
    /// An operator moved the record by hand.
    Manual,
    /// Automatic placement when the record was created.
    InitialAssignment,
    /// Automatic move because the owning group was deleted.
    GroupDeletion,
    /// Automatic move after a group resigned a derivation.
    DerivateResignation,
}

impl ReassignReason {
    /// Automatic derivations are never offered as return targets.
    pub fn is_automatic_derivation(&self) -> bool {
        !matches!(self, ReassignReason::Manual)
    }
}

/// Append-only audit row created on every successful reassignment.
///
/// Never mutated or deleted; the resolver reads the trail to reconstruct
/// "who reassigned this to me" for return-to-sender candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignmentEvent {
    pub record: RecordId,
    pub acting_group: GroupId,
    pub previous_responsible: GroupId,
    pub next_responsible: GroupId,
    pub reason: ReassignReason,
    pub created_at: TimestampUtc,
}

/// Theme facts the resolver treats as external configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFacts {
    /// Days a pending-validation record may sit before ambit escalation.
    pub validation_place_days: i64,
    /// The theme allows reassignment before validation completes.
    pub is_validated_reassignable: bool,
}

/// Outcome of the eligibility gate.
///
/// Non-default variants carry the reason restriction narrowed or blocked
/// the candidate set; callers surface it without re-deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignmentScope {
    NoReassign { reason: String },
    CoordinatorOnly { reason: String },
    AmbitGroups { reason: String },
    ConfigGroups,
}

impl ReassignmentScope {
    /// The restriction reason, when one applies.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ReassignmentScope::NoReassign { reason }
            | ReassignmentScope::CoordinatorOnly { reason }
            | ReassignmentScope::AmbitGroups { reason } => Some(reason),
            ReassignmentScope::ConfigGroups => None,
        }
    }
}

/// Fully evaluated reassignment for one acting group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReassignment {
    pub scope: ReassignmentScope,
    /// Post-restriction candidates, ascending by group id.
    pub candidates: Vec<GroupId>,
}

/// The reassign entry of an action map: perform/deny plus reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignAction {
    pub can_perform: bool,
    pub reason: Option<String>,
}

/// Decides reassignment legality against one hierarchy snapshot.
pub struct ReassignmentResolver<'a> {
    hierarchy: &'a GroupHierarchy,
}

impl<'a> ReassignmentResolver<'a> {
    pub fn new(hierarchy: &'a GroupHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Eligibility gate: which rule-set governs this reassignment attempt.
    pub fn select_scope(
        &self,
        record: &Record,
        acting_group: GroupId,
        theme: &ThemeFacts,
        now: TimestampUtc,
    ) -> Result<ReassignmentScope, WorkflowError> {
        let acting = self.hierarchy.get(acting_group)?;

        // The lock flag wins unless the root coordinating group acts.
        if record.reassignment_not_allowed && Some(acting_group) != self.hierarchy.root() {
            return Ok(ReassignmentScope::NoReassign {
                reason: "reassignment is locked for this record".to_string(),
            });
        }

        if record.record_state == RecordState::PendingValidate && !theme.is_validated_reassignable {
            let aged = record.age_days(now) > theme.validation_place_days;
            if aged || record.claims_number.has_claims() {
                return Ok(ReassignmentScope::AmbitGroups {
                    reason: if aged {
                        "record exceeded its validation window; only ambit groups may receive it"
                            .to_string()
                    } else {
                        "claimed record pending validation; only ambit groups may receive it"
                            .to_string()
                    },
                });
            }
            if !acting.is_ambit {
                return Ok(ReassignmentScope::CoordinatorOnly {
                    reason: "unvalidated record; only the ambit coordinator may receive it"
                        .to_string(),
                });
            }
        }

        Ok(ReassignmentScope::ConfigGroups)
    }

    /// Raw candidate set for `group`: explicit outgoing edges plus manual
    /// return targets reconstructed from the audit trail.
    ///
    /// Groups that passed the record on through an automatic derivation
    /// (initial assignment, group deletion, derivate resignation) are not
    /// offered back; the record's current responsible profile is always
    /// excluded. Output is deduplicated and sorted ascending by id so
    /// repeated calls over unchanged data return identical sequences.
    pub fn reassignment_targets(
        &self,
        record: &Record,
        group: GroupId,
        trail: &[ReassignmentEvent],
    ) -> Result<Vec<GroupId>, WorkflowError> {
        let mut targets = self.hierarchy.get(group)?.reassign_edges.clone();
        for event in trail {
            if event.record == record.id
                && event.next_responsible == group
                && !event.reason.is_automatic_derivation()
            {
                targets.push(event.previous_responsible);
            }
        }
        targets.retain(|g| *g != record.responsible_profile && *g != group);
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    /// Applies the eligibility gate and its restriction to the raw set.
    pub fn resolve(
        &self,
        record: &Record,
        acting_group: GroupId,
        trail: &[ReassignmentEvent],
        theme: &ThemeFacts,
        now: TimestampUtc,
    ) -> Result<ResolvedReassignment, WorkflowError> {
        let scope = self.select_scope(record, acting_group, theme, now)?;
        let candidates = match &scope {
            ReassignmentScope::NoReassign { .. } => Vec::new(),
            ReassignmentScope::CoordinatorOnly { .. } => {
                let coordinator = match self.hierarchy.ambit_ancestor(acting_group)? {
                    Some(c) => Some(c),
                    None => self.hierarchy.root(),
                };
                coordinator
                    .into_iter()
                    .filter(|c| *c != record.responsible_profile && *c != acting_group)
                    .collect()
            }
            ReassignmentScope::AmbitGroups { .. } => {
                let ambit = self.hierarchy.ambit_of(acting_group)?;
                self.reassignment_targets(record, acting_group, trail)?
                    .into_iter()
                    .filter(|g| ambit.contains(g))
                    .collect()
            }
            ReassignmentScope::ConfigGroups => {
                self.reassignment_targets(record, acting_group, trail)?
            }
        };
        debug!(
            record = %record.id,
            group = %acting_group,
            candidates = candidates.len(),
            "resolved reassignment"
        );
        Ok(ResolvedReassignment { scope, candidates })
    }

    /// Packages the resolution as a perform/deny action entry.
    pub fn reassign_action(
        &self,
        record: &Record,
        acting_group: GroupId,
        trail: &[ReassignmentEvent],
        theme: &ThemeFacts,
        now: TimestampUtc,
    ) -> Result<ReassignAction, WorkflowError> {
        let resolved = self.resolve(record, acting_group, trail, theme, now)?;
        let can_perform = !resolved.candidates.is_empty();
        // The reason travels whenever the eligibility gate narrowed or
        // blocked the set, even if candidates remain.
        let reason = match resolved.scope.reason() {
            Some(r) => Some(r.to_string()),
            None if !can_perform => {
                Some("no reassignment targets are configured for this group".to_string())
            }
            None => None,
        };
        Ok(ReassignAction {
            can_perform,
            reason,
        })
    }
}
