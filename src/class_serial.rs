//! The valid class-serial set.
//!
//! Read lock-free by generated guard code, which tolerates stale
//! absence: a guard miss just falls back to re-resolving the call site,
//! it never observes a wrong *presence*. This is why [`ClassSerialSet::add`]
//! is allowed to skip the engine lock entirely: the only contract that
//! matters is that a present serial really is valid, and insertion alone
//! can never violate that for a concurrent reader.
//!
//! The asymmetry with [`ClassSerialSet::remove`] — which the coordinator
//! calls *with* the engine lock held — is deliberate, not an oversight:
//! `add` runs from contexts that already hold the host's
//! global interpreter lock, where taking the engine lock too would risk
//! a `gc_start_hook` deadlock if the underlying map's insertion triggers
//! GC; `remove` runs from contexts that can race with the worker's reads
//! and so needs the engine lock for that race alone.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::ids::ClassSerial;

#[derive(Default)]
pub struct ClassSerialSet {
    serials: RwLock<HashSet<ClassSerial>>,
}

impl ClassSerialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set at init time from the root object's class serial,
    /// top-self's class serial, and every constant in the root constant
    /// table that names a class or module.
    pub fn seed<I: IntoIterator<Item = ClassSerial>>(&self, serials: I) {
        let mut set = self.serials.write().unwrap();
        set.extend(serials);
    }

    /// `add_class_serial`: never takes the engine lock. Called from
    /// main-thread contexts already holding the host's GIL.
    pub fn add(&self, id: ClassSerial) {
        self.serials.write().unwrap().insert(id);
    }

    /// `remove_class_serial`: callers are responsible for holding the
    /// engine lock around this call (see [`Coordinator::remove_class_serial`][crate::coordinator::Coordinator::remove_class_serial]).
    pub fn remove(&self, id: ClassSerial) {
        self.serials.write().unwrap().remove(&id);
    }

    /// Lock-free-in-spirit read: a plain `RwLock` read guard, tolerant of
    /// being raced by `add`/`remove` per the stale-absence contract
    /// described on the module.
    pub fn contains(&self, id: ClassSerial) -> bool {
        self.serials.read().unwrap().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.serials.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_roundtrip() {
        let set = ClassSerialSet::new();
        set.add(ClassSerial(1));
        set.add(ClassSerial(2));
        assert!(set.contains(ClassSerial(1)));
        set.remove(ClassSerial(1));
        assert!(!set.contains(ClassSerial(1)));
        assert!(set.contains(ClassSerial(2)));
    }

    #[test]
    fn remove_then_readd_restores_presence() {
        let set = ClassSerialSet::new();
        set.add(ClassSerial(7));
        set.remove(ClassSerial(7));
        set.add(ClassSerial(7));
        assert!(set.contains(ClassSerial(7)));
    }

    #[test]
    fn seed_from_iterator() {
        let set = ClassSerialSet::new();
        set.seed([ClassSerial(1), ClassSerial(2), ClassSerial(3)]);
        assert_eq!(set.len(), 3);
    }
}
