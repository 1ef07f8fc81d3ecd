//! GC rendezvous protocol.
//!
//! `gc_start_hook` and `gc_finish_hook` bracket a GC region from the
//! mutator's side; the worker thread observes `in_gc` from the other
//! side and parks on `gc_wakeup` for the duration. `mark` walks the
//! queue's iseqs one at a time, releasing the engine lock around every
//! call into the host's own mark function so a host that recursively
//! allocates or triggers nested marking never deadlocks against the
//! engine lock.

use crate::backend::Backend;
use crate::coordinator::Shared;
use crate::host::Host;
use crate::ids::IseqId;

/// Block until no compile is in flight, then enter the GC region.
pub(crate) fn gc_start_hook<H: Host, B: Backend>(shared: &Shared<H, B>) {
    let mut inner = shared.mutex.lock().unwrap();
    while inner.in_jit {
        inner = shared.client_wakeup.wait(inner).unwrap();
    }
    inner.in_gc = true;
}

/// Leave the GC region and release any worker parked on `gc_wakeup`.
pub(crate) fn gc_finish_hook<H: Host, B: Backend>(shared: &Shared<H, B>) {
    shared.mutex.lock().unwrap().in_gc = false;
    shared.gc_wakeup.notify_all();
}

/// Walk the submission queue, invoking `mark_fn` once per live iseq.
/// Called from within a GC region (`in_gc` already `true`); the engine
/// lock is dropped for the duration of every `mark_fn` call.
pub(crate) fn mark<H, B>(shared: &Shared<H, B>, mut mark_fn: impl FnMut(IseqId))
where
    H: Host,
    B: Backend,
{
    let mut position = 0usize;
    loop {
        let inner = shared.mutex.lock().unwrap();
        let found = inner.queue.iter().nth(position);
        let next = match found {
            Some(id) => inner.arena.get(id).and_then(|u| u.iseq()),
            None => break,
        };
        drop(inner);
        if let Some(iseq) = next {
            mark_fn(iseq);
        }
        position += 1;
    }
}
