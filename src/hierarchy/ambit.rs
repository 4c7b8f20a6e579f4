//! Ambit coordinator maintenance.
//!
//! `ambit_coordinator` is a derived value: the nearest `is_ambit` ancestor
//! of each group, excluding the root. It is refreshed by an explicit
//! recomputation pass triggered by reparenting events, which produces a new
//! immutable snapshot applied in one step; the hierarchy never mutates
//! coordinators as a side effect of unrelated operations.

use std::collections::BTreeMap;

use tracing::debug;

use super::GroupHierarchy;
use crate::errors::WorkflowError;
use crate::types::GroupId;

/// Immutable snapshot of `group → nearest ambit ancestor`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmbitCoordinators {
    coordinators: BTreeMap<GroupId, Option<GroupId>>,
}

impl AmbitCoordinators {
    /// Computes a fresh snapshot over the whole hierarchy.
    pub fn compute(hierarchy: &GroupHierarchy) -> Result<Self, WorkflowError> {
        let mut coordinators = BTreeMap::new();
        for group in hierarchy.iter() {
            coordinators.insert(group.id, hierarchy.ambit_ancestor(group.id)?);
        }
        debug!(groups = coordinators.len(), "recomputed ambit coordinators");
        Ok(Self { coordinators })
    }

    /// The coordinator recorded for `id`, if the snapshot covers it.
    pub fn coordinator_of(&self, id: GroupId) -> Option<GroupId> {
        self.coordinators.get(&id).copied().flatten()
    }

    /// Groups whose stored coordinator disagrees with this snapshot.
    pub fn stale_groups(&self, hierarchy: &GroupHierarchy) -> Vec<GroupId> {
        hierarchy
            .iter()
            .filter(|g| self.coordinators.get(&g.id).copied().flatten() != g.ambit_coordinator)
            .map(|g| g.id)
            .collect()
    }
}

impl GroupHierarchy {
    /// Recomputes every group's `ambit_coordinator` from a fresh snapshot.
    ///
    /// Called after reparenting events; idempotent, so re-running over an
    /// already-correct hierarchy changes nothing.
    pub fn recompute_ambit_coordinators(&mut self) -> Result<AmbitCoordinators, WorkflowError> {
        let snapshot = AmbitCoordinators::compute(self)?;
        for (id, coordinator) in &snapshot.coordinators {
            if let Some(group) = self.groups.get_mut(id) {
                group.ambit_coordinator = *coordinator;
            }
        }
        Ok(snapshot)
    }
}
