//! Entity identifiers and allocation.
//!
//! Temporal objects are never recycled: a destroyed object keeps its ledger
//! (it still exists in the past of the loop), so its identifier stays valid
//! for queries forever. The allocator is therefore a plain monotonic counter.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Identifier of one temporal object in a simulation.
///
/// Ordering follows allocation order, which the simulation relies on to
/// advance objects deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw identifier.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out fresh [`EntityId`]s in increasing order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Create an allocator whose first id is `e0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Number of identifiers handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_monotonic() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<EntityId> = (0..10).map(|_| alloc.allocate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(alloc.allocated(), 10);
    }

    #[test]
    fn display_and_debug() {
        let id = EntityId::from_raw(7);
        assert_eq!(id.to_string(), "e7");
        assert_eq!(format!("{id:?}"), "EntityId(7)");
        assert_eq!(EntityId::from_raw(id.to_raw()), id);
    }
}
