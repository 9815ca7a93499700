//! Parent/child creation links and cascading destruction.
//!
//! When a parent creates a child, the link records the parent's self-epoch
//! at that moment. Destroying the parent at self-epoch `T` truncates the
//! parent after `T`; each child created at or after `T` was never created at
//! all, so it is fully destroyed, and so is everything it created in turn.
//! Children created strictly before `T` are left alone.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::spacetime::SelfEpoch;
use crate::timeline::DestructionScope;
use crate::{TimelineError, TimelineResult};

/// One creation event, as seen from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentChildLink {
    pub child: EntityId,
    /// Parent's self-epoch when the child was created.
    pub created_at_self_epoch: SelfEpoch,
}

/// A destruction to apply to one entity's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestructionOrder {
    pub entity: EntityId,
    pub scope: DestructionScope,
}

/// Who created whom, and when.
///
/// Each child has at most one parent and the graph never contains a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleGraph {
    children: BTreeMap<EntityId, Vec<ParentChildLink>>,
    parents: BTreeMap<EntityId, EntityId>,
}

impl LifecycleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `parent` created `child` at the parent's `self_epoch`.
    pub fn create(
        &mut self,
        parent: EntityId,
        child: EntityId,
        self_epoch: SelfEpoch,
    ) -> TimelineResult<()> {
        if parent == child {
            return Err(TimelineError::SelfParent(child));
        }
        if let Some(&existing) = self.parents.get(&child) {
            return Err(TimelineError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(TimelineError::LifecycleCycle { parent, child });
        }

        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(ParentChildLink {
            child,
            created_at_self_epoch: self_epoch,
        });
        Ok(())
    }

    /// Links from `parent`, in creation order.
    pub fn children_of(&self, parent: EntityId) -> &[ParentChildLink] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.parents.get(&child).copied()
    }

    /// `entity`'s parent, grandparent, and so on.
    pub fn ancestors(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(self.parent_of(entity), move |&e| self.parent_of(e))
    }

    /// Compute the destruction cascade of destroying `entity` at its own
    /// self-epoch `at`.
    ///
    /// The first order is always `entity` truncated at `at`. The graph itself
    /// is left unchanged; applying the orders is the caller's job.
    pub fn destroy(&self, entity: EntityId, at: SelfEpoch) -> Vec<DestructionOrder> {
        let mut orders = vec![DestructionOrder {
            entity,
            scope: DestructionScope::Truncate { at },
        }];
        let mut visited = BTreeSet::from([entity]);
        let mut pending: Vec<(EntityId, Option<SelfEpoch>)> = vec![(entity, Some(at))];

        // `None` means the parent was fully destroyed: every child goes.
        while let Some((parent, cutoff)) = pending.pop() {
            for link in self.children_of(parent) {
                let erased = cutoff.map_or(true, |at| at <= link.created_at_self_epoch);
                if !erased || !visited.insert(link.child) {
                    continue;
                }
                orders.push(DestructionOrder {
                    entity: link.child,
                    scope: DestructionScope::Full,
                });
                pending.push((link.child, None));
            }
        }

        tracing::debug!(
            %entity,
            at,
            erased = orders.len() - 1,
            "computed destruction cascade"
        );
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn link_validation() {
        let mut graph = LifecycleGraph::new();
        assert_eq!(
            graph.create(e(1), e(1), 0).unwrap_err(),
            TimelineError::SelfParent(e(1))
        );
        graph.create(e(1), e(2), 3).unwrap();
        assert_eq!(
            graph.create(e(3), e(2), 0).unwrap_err(),
            TimelineError::AlreadyParented {
                child: e(2),
                parent: e(1)
            }
        );
        graph.create(e(2), e(3), 0).unwrap();
        assert_eq!(
            graph.create(e(3), e(1), 0).unwrap_err(),
            TimelineError::LifecycleCycle {
                parent: e(3),
                child: e(1)
            }
        );
        assert_eq!(graph.parent_of(e(3)), Some(e(2)));
        assert_eq!(graph.ancestors(e(3)).collect::<Vec<_>>(), vec![e(2), e(1)]);
    }

    #[test]
    fn destroying_before_creation_erases_child() {
        let mut graph = LifecycleGraph::new();
        graph.create(e(1), e(2), 10).unwrap();
        let orders = graph.destroy(e(1), 5);
        assert_eq!(
            orders,
            vec![
                DestructionOrder {
                    entity: e(1),
                    scope: DestructionScope::Truncate { at: 5 }
                },
                DestructionOrder {
                    entity: e(2),
                    scope: DestructionScope::Full
                },
            ]
        );
    }

    #[test]
    fn destroying_at_creation_epoch_erases_child() {
        let mut graph = LifecycleGraph::new();
        graph.create(e(1), e(2), 10).unwrap();
        assert_eq!(graph.destroy(e(1), 10).len(), 2);
    }

    #[test]
    fn destroying_after_creation_spares_child() {
        let mut graph = LifecycleGraph::new();
        graph.create(e(1), e(2), 10).unwrap();
        assert_eq!(
            graph.destroy(e(1), 15),
            vec![DestructionOrder {
                entity: e(1),
                scope: DestructionScope::Truncate { at: 15 }
            }]
        );
    }

    #[test]
    fn erased_child_takes_its_descendants() {
        let mut graph = LifecycleGraph::new();
        graph.create(e(1), e(2), 10).unwrap();
        // e(2) created e(3) late in its own life; still erased.
        graph.create(e(2), e(3), 500).unwrap();
        graph.create(e(1), e(4), 1).unwrap();
        graph.create(e(4), e(5), 0).unwrap();
        let erased: BTreeSet<EntityId> = graph
            .destroy(e(1), 5)
            .into_iter()
            .filter(|o| o.scope == DestructionScope::Full)
            .map(|o| o.entity)
            .collect();
        assert_eq!(erased, BTreeSet::from([e(2), e(3)]));
    }
}
