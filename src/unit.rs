//! The compilation unit: one per iseq ever admitted to the pipeline.

use crate::ids::{IseqId, UnitId};

/// Per-iseq JIT state cell.
///
/// Transitions are monotonic out of `NotReady`: either `NotReady ->
/// Compiled` (success) or `NotReady -> NotCompiled` (failure, terminal).
/// This transition happens at most once; once settled, a cell never moves
/// again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitFunc {
    /// Initial state: the iseq has never been submitted.
    NotAdded,
    /// Admitted, compilation in flight.
    NotReady,
    /// Terminal failure: worker dead, PCH failed, or a `wait` call timed out.
    NotCompiled,
    /// A valid native entry address, as an opaque integer in the host's
    /// address space.
    Compiled(usize),
}

impl JitFunc {
    /// True for every state other than `NotReady`, i.e. the point at
    /// which a synchronous waiter can stop polling.
    pub fn is_settled(&self) -> bool {
        !matches!(self, JitFunc::NotReady)
    }
}

/// Which of the three lists a [`Unit`] currently belongs to.
///
/// A unit is in exactly one list at a time except during an explicit
/// transfer between lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Queue,
    Active,
    Compact,
}

/// One compilation attempt for one iseq.
///
/// `iseq` is a weak reference: the host's GC may null it out via
/// [`Unit::clear_iseq`] while the unit still lives in the queue or active
/// list. The artifact handle is owned by the unit and is released
/// through the backend on eviction or teardown.
pub struct Unit<A> {
    pub id: UnitId,
    iseq: Option<IseqId>,
    artifact: Option<A>,
    /// Transient flag set by the liveness scan in `unload_units`.
    /// Cleared at the start of every eviction pass.
    pub(crate) used_code_p: bool,
    pub(crate) list: ListKind,
}

impl<A> Unit<A> {
    pub(crate) fn new(id: UnitId, iseq: IseqId, list: ListKind) -> Self {
        Unit {
            id,
            iseq: Some(iseq),
            artifact: None,
            used_code_p: false,
            list,
        }
    }

    /// If non-null, the iseq points back at this unit via its own body;
    /// the coordinator only ever reads the forward half of that relation.
    pub fn iseq(&self) -> Option<IseqId> {
        self.iseq
    }

    /// GC reclaimed the iseq; null the weak backref. The unit may still
    /// be queued or active and is swept out unconditionally on the next
    /// eviction pass.
    pub fn clear_iseq(&mut self) {
        self.iseq = None;
    }

    pub fn artifact(&self) -> Option<&A> {
        self.artifact.as_ref()
    }

    pub fn set_artifact(&mut self, artifact: A) {
        self.artifact = Some(artifact);
    }

    pub fn take_artifact(&mut self) -> Option<A> {
        self.artifact.take()
    }
}
