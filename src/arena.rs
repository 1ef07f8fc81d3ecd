//! The unit arena: owns every [`Unit`] ever created, indexed by id and by
//! iseq.
//!
//! This replaces the bidirectional owning pointers a naive port would use
//! (`iseq -> unit`, `unit -> iseq`) with a flat arena plus a reverse
//! index, so the coordinator never needs `unsafe` to model the cyclic
//! relationship.

use std::collections::HashMap;

use crate::ids::{IseqId, UnitId};
use crate::unit::{ListKind, Unit};

pub struct UnitArena<A> {
    next_id: u64,
    units: HashMap<UnitId, Unit<A>>,
    by_iseq: HashMap<IseqId, UnitId>,
}

impl<A> Default for UnitArena<A> {
    fn default() -> Self {
        UnitArena {
            next_id: 1,
            units: HashMap::new(),
            by_iseq: HashMap::new(),
        }
    }
}

impl<A> UnitArena<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and assign a fresh id, link iseq -> unit. At most one
    /// unit exists per iseq while the iseq lives; enforced by the caller
    /// checking [`UnitArena::unit_for_iseq`] first.
    pub fn create_unit(&mut self, iseq: IseqId, list: ListKind) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        self.units.insert(id, Unit::new(id, iseq, list));
        self.by_iseq.insert(iseq, id);
        id
    }

    pub fn unit_for_iseq(&self, iseq: IseqId) -> Option<UnitId> {
        self.by_iseq.get(&iseq).copied()
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit<A>> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit<A>> {
        self.units.get_mut(&id)
    }

    /// Releases the artifact handle via the backend (caller does that
    /// before calling this) and frees the iseq backlink, but not the
    /// iseq itself.
    pub fn free_unit(&mut self, id: UnitId) -> Option<Unit<A>> {
        let unit = self.units.remove(&id)?;
        if let Some(iseq) = unit.iseq() {
            // Only clear the reverse index if it still points at this
            // unit; it may already have been replaced once the iseq is
            // gone.
            if self.by_iseq.get(&iseq) == Some(&id) {
                self.by_iseq.remove(&iseq);
            }
        }
        Some(unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_unit_assigns_monotonic_ids() {
        let mut arena: UnitArena<()> = UnitArena::new();
        let a = arena.create_unit(IseqId(1), ListKind::Queue);
        let b = arena.create_unit(IseqId(2), ListKind::Queue);
        assert!(b.0 > a.0);
    }

    #[test]
    fn lookup_by_iseq_round_trips() {
        let mut arena: UnitArena<()> = UnitArena::new();
        let id = arena.create_unit(IseqId(42), ListKind::Queue);
        assert_eq!(arena.unit_for_iseq(IseqId(42)), Some(id));
        arena.free_unit(id);
        assert_eq!(arena.unit_for_iseq(IseqId(42)), None);
    }
}
