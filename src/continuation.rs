//! Continuation registry.
//!
//! Continuations (saved fiber/thread execution contexts) are snapshotted
//! outside the host's normal thread list. They are kept only so that
//! `unload_units`'s liveness scan can walk their stacks too; order within
//! the registry is irrelevant.

use std::collections::HashMap;

/// Opaque identity for a registered continuation, returned by
/// [`ContinuationRegistry::insert`] and required by
/// [`ContinuationRegistry::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationId(u64);

/// A saved execution context, identified by whatever key the host uses
/// for its own fiber/thread bookkeeping.
pub struct ContinuationRegistry<Ctx> {
    next_id: u64,
    entries: HashMap<ContinuationId, Ctx>,
}

impl<Ctx> Default for ContinuationRegistry<Ctx> {
    fn default() -> Self {
        ContinuationRegistry {
            next_id: 0,
            entries: HashMap::new(),
        }
    }
}

impl<Ctx> ContinuationRegistry<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cont_new`: prepend a record. Caller holds the engine lock.
    pub fn insert(&mut self, ctx: Ctx) -> ContinuationId {
        let id = ContinuationId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, ctx);
        id
    }

    /// `cont_free`: unlink and drop. Caller holds the engine lock.
    pub fn remove(&mut self, id: ContinuationId) -> Option<Ctx> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ctx> {
        self.entries.values()
    }

    /// `finish_conts`: drop every remaining record at teardown.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut reg: ContinuationRegistry<u32> = ContinuationRegistry::new();
        let a = reg.insert(1);
        let b = reg.insert(2);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.remove(a), Some(1));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.iter().copied().collect::<Vec<_>>(), vec![2]);
        reg.clear();
        assert!(reg.is_empty());
        let _ = b;
    }
}
