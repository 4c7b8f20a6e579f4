//! Read-only view of the organizational group tree.
//!
//! Groups live in a flat arena keyed by id; ancestry is answered through
//! materialized path strings ("plates") so no parent/child pointers are
//! chased. The structure is acyclic by construction: a group can only be
//! added under a parent that already exists.

mod ambit;

pub use ambit::AmbitCoordinators;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::types::GroupId;

/// A node in the organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// The root coordinating group has no parent.
    pub parent: Option<GroupId>,
    /// Materialized ancestor-id path, e.g. `|1|4|9|`. A group is a
    /// descendant of another iff the other's plate is a proper prefix.
    pub plate: String,
    /// Roots a bounded sub-tree sharing reassignment responsibility.
    pub is_ambit: bool,
    /// Nearest ambit ancestor, refreshed by the coordinator maintenance
    /// pass; never mutated as a side effect of other operations.
    pub ambit_coordinator: Option<GroupId>,
    /// Explicit outgoing reassignment edges.
    pub reassign_edges: Vec<GroupId>,
}

/// The group arena plus derived indexes.
#[derive(Debug, Clone, Default)]
pub struct GroupHierarchy {
    groups: BTreeMap<GroupId, Group>,
    root: Option<GroupId>,
}

impl GroupHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group under `parent` (`None` only for the single root).
    ///
    /// # Errors
    ///
    /// Fails when the parent is unknown, when a second root is added, or
    /// when the id is already taken.
    pub fn add_group(
        &mut self,
        id: GroupId,
        parent: Option<GroupId>,
        is_ambit: bool,
    ) -> Result<(), WorkflowError> {
        if self.groups.contains_key(&id) {
            return Err(WorkflowError::HierarchyViolation {
                message: format!("group {} already exists", id),
            });
        }
        let plate = match parent {
            Some(p) => {
                let parent_plate = &self.get(p)?.plate;
                format!("{}{}|", parent_plate, id)
            }
            None => {
                if self.root.is_some() {
                    return Err(WorkflowError::HierarchyViolation {
                        message: format!("group {} would be a second root", id),
                    });
                }
                self.root = Some(id);
                format!("|{}|", id)
            }
        };
        self.groups.insert(
            id,
            Group {
                id,
                parent,
                plate,
                is_ambit,
                ambit_coordinator: None,
                reassign_edges: Vec::new(),
            },
        );
        Ok(())
    }

    /// Declares an explicit reassignment edge `from → to`.
    pub fn add_reassign_edge(&mut self, from: GroupId, to: GroupId) -> Result<(), WorkflowError> {
        if !self.groups.contains_key(&to) {
            return Err(WorkflowError::UnknownGroup { group: to });
        }
        let group = self
            .groups
            .get_mut(&from)
            .ok_or(WorkflowError::UnknownGroup { group: from })?;
        if !group.reassign_edges.contains(&to) {
            group.reassign_edges.push(to);
            group.reassign_edges.sort();
        }
        Ok(())
    }

    pub fn get(&self, id: GroupId) -> Result<&Group, WorkflowError> {
        self.groups
            .get(&id)
            .ok_or(WorkflowError::UnknownGroup { group: id })
    }

    /// The single parentless root coordinating group.
    pub fn root(&self) -> Option<GroupId> {
        self.root
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Iterates all groups in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Ancestors of `id`, nearest first. With `include_self`, the group
    /// itself leads the list.
    pub fn ancestors(&self, id: GroupId, include_self: bool) -> Result<Vec<GroupId>, WorkflowError> {
        let mut out = Vec::new();
        let mut current = self.get(id)?;
        if include_self {
            out.push(current.id);
        }
        while let Some(parent) = current.parent {
            current = self.get(parent)?;
            out.push(current.id);
        }
        Ok(out)
    }

    /// Descendants of `id` in ascending id order. With `include_self`, the
    /// group itself is part of the set.
    pub fn descendants(
        &self,
        id: GroupId,
        include_self: bool,
    ) -> Result<Vec<GroupId>, WorkflowError> {
        let plate = self.get(id)?.plate.clone();
        Ok(self
            .groups
            .values()
            .filter(|g| {
                if g.id == id {
                    include_self
                } else {
                    g.plate.starts_with(&plate)
                }
            })
            .map(|g| g.id)
            .collect())
    }

    /// True iff `child` sits strictly below `ancestor` in the tree.
    pub fn is_descendant(&self, child: GroupId, ancestor: GroupId) -> Result<bool, WorkflowError> {
        let child_plate = &self.get(child)?.plate;
        let ancestor_plate = &self.get(ancestor)?.plate;
        Ok(child != ancestor && child_plate.starts_with(ancestor_plate.as_str()))
    }

    /// Nearest `is_ambit` ancestor of `id`, excluding the root coordinating
    /// group and the group itself.
    pub fn ambit_ancestor(&self, id: GroupId) -> Result<Option<GroupId>, WorkflowError> {
        for ancestor in self.ancestors(id, false)? {
            if Some(ancestor) == self.root {
                continue;
            }
            if self.get(ancestor)?.is_ambit {
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }

    /// The set of groups sharing reassignment responsibility with `id`.
    ///
    /// An ambit group's ambit is itself plus descendants, minus deeper
    /// `is_ambit` sub-trees: nested ambits are independent islands and do
    /// not leak into their parent's view. A non-ambit group borrows the
    /// ambit of its nearest ambit ancestor; with no such ancestor the
    /// fallback is the group itself plus its ancestors excluding the root.
    pub fn ambit_of(&self, id: GroupId) -> Result<Vec<GroupId>, WorkflowError> {
        let group = self.get(id)?;
        if group.is_ambit {
            return self.ambit_island(id);
        }
        match self.ambit_ancestor(id)? {
            Some(head) => self.ambit_island(head),
            None => {
                let mut out: Vec<GroupId> = self
                    .ancestors(id, true)?
                    .into_iter()
                    .filter(|g| Some(*g) != self.root)
                    .collect();
                out.sort();
                Ok(out)
            }
        }
    }

    /// `head` plus descendants, stopping at nested ambit boundaries.
    ///
    /// A descendant belongs to the island iff no group on its parent chain
    /// up to (but excluding) `head` is itself ambit-marked.
    fn ambit_island(&self, head: GroupId) -> Result<Vec<GroupId>, WorkflowError> {
        let mut out = vec![head];
        'candidates: for candidate in self.descendants(head, false)? {
            let mut walk = candidate;
            while walk != head {
                let group = self.get(walk)?;
                if group.is_ambit {
                    continue 'candidates;
                }
                walk = group.parent.ok_or(WorkflowError::UnknownGroup { group: walk })?;
            }
            out.push(candidate);
        }
        out.sort();
        Ok(out)
    }
}
