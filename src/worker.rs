//! The background worker loop.
//!
//! The actual compile call is the external backend's job; everything
//! around it — waiting out a GC region, flipping `in_jit`, signaling
//! `client_wakeup`, moving the unit between lists, and triggering
//! eviction — is this crate's.

use std::sync::Arc;

use crate::backend::{Backend, CompileOutcome, CompileRequest, PchStatus};
use crate::coordinator::Shared;
use crate::host::Host;
use crate::ids::UnitId;
use crate::unit::{JitFunc, ListKind};

pub(crate) fn spawn<H, B>(shared: Arc<Shared<H, B>>) -> std::io::Result<std::thread::JoinHandle<()>>
where
    H: Host,
    B: Backend,
{
    std::thread::Builder::new()
        .name("mjit-worker".into())
        .spawn(move || run(shared))
}

fn run<H: Host, B: Backend>(shared: Arc<Shared<H, B>>) {
    await_pch_bootstrap(&shared);

    while let Some(id) = next_unit(&shared) {
        let (iseq, total_calls) = {
            let inner = shared.mutex.lock().unwrap();
            let iseq = inner.arena.get(id).and_then(|u| u.iseq());
            let calls = iseq.map(|i| shared.host.total_calls(i)).unwrap_or(0);
            (iseq, calls)
        };

        let outcome = match iseq {
            Some(iseq) => shared.backend.compile(CompileRequest { iseq, total_calls }),
            // GC nulled the backref before the compile attempt started.
            None => CompileOutcome::Failed,
        };

        let mut inner = shared.mutex.lock().unwrap();
        inner.in_jit = false;
        shared.client_wakeup.notify_all();

        match outcome {
            CompileOutcome::Compiled { artifact, entry } => {
                if let Some(unit) = inner.arena.get_mut(id) {
                    unit.set_artifact(artifact);
                    unit.list = ListKind::Active;
                }
                inner.active.push_back(id);
                if let Some(iseq) = iseq {
                    shared.host.set_jit_func(iseq, JitFunc::Compiled(entry));
                }
                shared.stats.record_compiled();
                // Eviction runs only at submission time; a freshly
                // compiled unit landing in `active` is never itself the
                // trigger.
            }
            CompileOutcome::Failed => {
                if let Some(iseq) = iseq {
                    shared.host.set_jit_func(iseq, JitFunc::NotCompiled);
                }
                inner.arena.free_unit(id);
                shared.stats.record_failed();
            }
        }
    }
}

/// Wait for the backend's precompiled-header bootstrap to settle, then
/// signal any `finish` call blocked on it. Returns early if the worker
/// is told to stop before the PCH ever settles.
fn await_pch_bootstrap<H: Host, B: Backend>(shared: &Shared<H, B>) {
    loop {
        if shared.backend.pch_status() != PchStatus::NotReady {
            break;
        }
        if shared.mutex.lock().unwrap().stop_worker_p {
            return;
        }
        std::thread::sleep(shared.options.poll_quantum);
    }
    shared.pch_wakeup.notify_all();
}

/// Block until a unit is ready to compile, the worker is asked to stop,
/// or the engine enters a GC region (in which case wait it out first).
/// Returns `None` only when the worker should exit.
fn next_unit<H: Host, B: Backend>(shared: &Shared<H, B>) -> Option<UnitId> {
    let mut inner = shared.mutex.lock().unwrap();
    loop {
        if inner.stop_worker_p {
            inner.worker_stopped = true;
            shared.worker_wakeup.notify_all();
            return None;
        }
        while inner.in_gc {
            inner = shared.gc_wakeup.wait(inner).unwrap();
            if inner.stop_worker_p {
                inner.worker_stopped = true;
                shared.worker_wakeup.notify_all();
                return None;
            }
        }
        if let Some(id) = inner.queue.pop_front() {
            inner.in_jit = true;
            return Some(id);
        }
        inner = shared.worker_wakeup.wait(inner).unwrap();
    }
}
