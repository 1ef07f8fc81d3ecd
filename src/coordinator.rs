//! The coordinator: submission queue, active cache, continuation
//! registry, GC rendezvous, and worker lifecycle, tied together behind
//! one engine lock and four condition variables.
//!
//! `Shared<H, B>` is the `Arc`-shared state the worker thread needs;
//! `Coordinator<H, B>` wraps it plus the worker's `JoinHandle`, which the
//! worker itself has no business owning.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::arena::UnitArena;
use crate::backend::{Backend, PchStatus};
use crate::class_serial::ClassSerialSet;
use crate::continuation::ContinuationRegistry;
use crate::error::CoordError;
use crate::eviction;
use crate::host::{FrameWalk, Host};
use crate::ids::ClassSerial;
use crate::list::UnitList;
use crate::options::Options;
use crate::stats::{Stats, StatsCounters};
use crate::tempdir;
use crate::unit::ListKind;
use crate::{gc, wait, worker};

pub(crate) struct Inner<A, Cont> {
    pub(crate) arena: UnitArena<A>,
    pub(crate) queue: UnitList,
    pub(crate) active: UnitList,
    pub(crate) compact: UnitList,
    pub(crate) continuations: ContinuationRegistry<Cont>,
    pub(crate) in_gc: bool,
    pub(crate) in_jit: bool,
    pub(crate) stop_worker_p: bool,
    pub(crate) worker_stopped: bool,
}

impl<A, Cont> Default for Inner<A, Cont> {
    fn default() -> Self {
        Inner {
            arena: UnitArena::new(),
            queue: UnitList::new(),
            active: UnitList::new(),
            compact: UnitList::new(),
            continuations: ContinuationRegistry::new(),
            in_gc: false,
            in_jit: false,
            stop_worker_p: false,
            worker_stopped: false,
        }
    }
}

pub(crate) struct Shared<H: Host, B: Backend> {
    pub(crate) host: H,
    pub(crate) backend: B,
    pub(crate) class_serial: ClassSerialSet,
    pub(crate) options: Options,
    pub(crate) mutex: Mutex<Inner<B::Artifact, H::Continuation>>,
    pub(crate) pch_wakeup: Condvar,
    pub(crate) client_wakeup: Condvar,
    pub(crate) worker_wakeup: Condvar,
    pub(crate) gc_wakeup: Condvar,
    pub(crate) stats: StatsCounters,
    pub(crate) enabled: AtomicBool,
}

/// Coordination core for a method-level JIT compilation subsystem,
/// generic over the host interpreter and compiler backend it is wired
/// to.
pub struct Coordinator<H: Host, B: Backend> {
    shared: Arc<Shared<H, B>>,
    worker: Mutex<Option<std::thread::JoinHandle<()>>>,
    pch_path: PathBuf,
}

impl<H: Host, B: Backend> Coordinator<H, B> {
    /// Bring the subsystem up: seed the class-serial set, probe the
    /// runtime header, and start the worker thread.
    ///
    /// Bootstrap failures (missing header, worker spawn failure) do not
    /// fail `init`: they disable the subsystem and emit one
    /// diagnostic instead, leaving every other operation a safe no-op.
    pub fn init(options: Options, host: H, backend: B) -> Self {
        let options = options.normalized();

        let class_serial = ClassSerialSet::new();
        class_serial.seed(host.root_class_serials());

        let temp_dir = tempdir::resolve_temp_dir();
        let pch_path = temp_dir.join(backend.unique_filename(0, "mjit_pch_", ".h.gch"));
        let header_ok = tempdir::probe_readable(&host.header_path()).is_ok();

        let shared = Arc::new(Shared {
            host,
            backend,
            class_serial,
            options,
            mutex: Mutex::new(Inner::default()),
            pch_wakeup: Condvar::new(),
            client_wakeup: Condvar::new(),
            worker_wakeup: Condvar::new(),
            gc_wakeup: Condvar::new(),
            stats: StatsCounters::default(),
            enabled: AtomicBool::new(false),
        });

        let mut handle = None;
        if header_ok {
            match worker::spawn(Arc::clone(&shared)) {
                Ok(joined) => {
                    handle = Some(joined);
                    shared.enabled.store(true, Ordering::Release);
                }
                Err(err) => {
                    shared
                        .host
                        .log_warning(&format!("mjit: failed to start worker thread: {err}"));
                }
            }
        } else {
            shared.host.log_warning(&format!(
                "mjit: header not found at {:?}, disabling",
                shared.host.header_path()
            ));
        }

        Coordinator {
            shared,
            worker: Mutex::new(handle),
            pch_path,
        }
    }

    pub fn host(&self) -> &H {
        &self.shared.host
    }

    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Admit `iseq` to the compilation pipeline.
    ///
    /// A no-op if disabled, if the PCH bootstrap has already failed, or
    /// if `iseq` was already admitted — at most one unit exists per iseq.
    pub fn add_iseq_to_process(&self, iseq: crate::ids::IseqId) {
        if !self.shared.enabled.load(Ordering::Acquire) {
            return;
        }
        if self.shared.backend.pch_status() == PchStatus::Failed {
            return;
        }
        if !matches!(self.shared.host.jit_func(iseq), crate::unit::JitFunc::NotAdded) {
            return;
        }
        self.shared.host.set_jit_func(iseq, crate::unit::JitFunc::NotReady);

        let mut inner = self.shared.mutex.lock().unwrap();
        if inner.arena.unit_for_iseq(iseq).is_some() {
            return;
        }
        let id = inner.arena.create_unit(iseq, ListKind::Queue);
        inner.queue.push_back(id);
        if inner.active.len() >= self.shared.options.max_cache_size as usize {
            evict_if_over_capacity(&self.shared, &mut inner);
        }
        drop(inner);
        self.shared.worker_wakeup.notify_all();
    }

    /// Block until the GC region is entered: waits out any in-flight
    /// compile first.
    pub fn gc_start_hook(&self) {
        gc::gc_start_hook(&self.shared);
    }

    pub fn gc_finish_hook(&self) {
        gc::gc_finish_hook(&self.shared);
    }

    /// Walk the submission queue's iseqs, calling `mark_fn` once per
    /// live one. Must be called from within a `gc_start_hook` /
    /// `gc_finish_hook` bracket.
    pub fn mark(&self, mark_fn: impl FnMut(crate::ids::IseqId)) {
        gc::mark(&self.shared, mark_fn);
    }

    /// Synchronously wait for `iseq`'s compile result, falling back to
    /// `NotCompiled` after `Options::wait_timeout_quanta` quanta or an
    /// already-failed PCH bootstrap.
    pub fn get_iseq_func(&self, iseq: crate::ids::IseqId) -> crate::unit::JitFunc {
        wait::get_iseq_func(&self.shared, iseq)
    }

    /// Register a continuation so its stack is scanned by future
    /// eviction passes. Returns an id for a matching
    /// [`Coordinator::remove_continuation`] call.
    pub fn register_continuation(&self, ctx: H::Continuation) -> crate::continuation::ContinuationId {
        self.shared.mutex.lock().unwrap().continuations.insert(ctx)
    }

    pub fn remove_continuation(&self, id: crate::continuation::ContinuationId) {
        self.shared.mutex.lock().unwrap().continuations.remove(id);
    }

    /// `add_class_serial`: never takes the engine lock.
    pub fn add_class_serial(&self, id: ClassSerial) {
        self.shared.class_serial.add(id);
    }

    /// `remove_class_serial`: takes the engine lock around the set
    /// mutation, per the asymmetric locking contract documented on
    /// [`ClassSerialSet`].
    pub fn remove_class_serial(&self, id: ClassSerial) {
        let _guard = self.shared.mutex.lock().unwrap();
        self.shared.class_serial.remove(id);
    }

    pub fn class_serial_present(&self, id: ClassSerial) -> bool {
        self.shared.class_serial.contains(id)
    }

    /// Pause the worker. If `wait`, first block until the submission
    /// queue drains. Returns `Ok(false)` if the worker was already
    /// stopped.
    pub fn pause(&self, wait: bool) -> Result<bool, CoordError> {
        if !self.shared.enabled.load(Ordering::Acquire) {
            return Err(CoordError::Disabled);
        }
        if self.worker.lock().unwrap().is_none() {
            return Ok(false);
        }
        if wait {
            loop {
                let queue_len = self.shared.mutex.lock().unwrap().queue.len();
                if queue_len == 0 {
                    break;
                }
                self.shared.worker_wakeup.notify_all();
                std::thread::sleep(self.shared.options.poll_quantum);
            }
        }
        self.stop_worker_blocking();
        Ok(true)
    }

    /// Start a fresh worker thread after a `pause`. Returns `Ok(false)`
    /// if a worker is already running.
    pub fn resume(&self) -> Result<bool, CoordError> {
        if !self.shared.enabled.load(Ordering::Acquire) {
            return Err(CoordError::Disabled);
        }
        let mut slot = self.worker.lock().unwrap();
        if slot.is_some() {
            return Ok(false);
        }
        {
            let mut inner = self.shared.mutex.lock().unwrap();
            inner.stop_worker_p = false;
            inner.worker_stopped = false;
        }
        let handle = worker::spawn(Arc::clone(&self.shared)).map_err(CoordError::WorkerSpawnFailed)?;
        *slot = Some(handle);
        Ok(true)
    }

    /// Tear the subsystem down: stop the worker, drop every list and
    /// continuation, and disable further operations. A no-op if already
    /// disabled.
    pub fn finish(&self) {
        if !self.shared.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        self.wait_for_pch_settled();
        self.stop_worker_blocking();
        if !self.shared.options.save_temps {
            self.shared.backend.remove_file(&self.pch_path);
        }
        let mut inner = self.shared.mutex.lock().unwrap();
        inner.queue = UnitList::new();
        inner.active = UnitList::new();
        inner.compact = UnitList::new();
        inner.continuations.clear();
    }

    /// Post-`fork` hook for the child process: the worker thread did not
    /// survive the fork, so there is nothing left to join. Clearing
    /// `enabled` is enough to make every other method a safe no-op; the
    /// lists and continuations are deliberately leaked rather than torn
    /// down: no `finish` is performed in the child.
    pub fn child_after_fork(&self) {
        self.shared.enabled.store(false, Ordering::Release);
    }

    pub fn stats(&self) -> Stats {
        let inner = self.shared.mutex.lock().unwrap();
        let oldest_pending_id = inner.queue.iter().map(|id| id.0).min();
        self.shared.stats.snapshot(
            inner.queue.len(),
            inner.active.len(),
            inner.compact.len(),
            oldest_pending_id,
        )
    }

    fn wait_for_pch_settled(&self) {
        let mut inner = self.shared.mutex.lock().unwrap();
        while self.shared.backend.pch_status() == PchStatus::NotReady {
            inner = self
                .shared
                .pch_wakeup
                .wait_timeout(inner, self.shared.options.poll_quantum)
                .unwrap()
                .0;
        }
    }

    fn stop_worker_blocking(&self) {
        {
            let mut inner = self.shared.mutex.lock().unwrap();
            inner.stop_worker_p = true;
        }
        loop {
            self.shared.worker_wakeup.notify_all();
            if self.shared.mutex.lock().unwrap().worker_stopped {
                break;
            }
            std::thread::sleep(self.shared.options.poll_quantum);
        }
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// Run one eviction pass against the engine's current membership,
/// gathering live-frame sources from the host's threads and the
/// registered continuations.
pub(crate) fn evict_if_over_capacity<H: Host, B: Backend>(
    shared: &Shared<H, B>,
    inner: &mut Inner<B::Artifact, H::Continuation>,
) {
    let cont_refs: Vec<&dyn FrameWalk> = inner.continuations.iter().map(|c| c as &dyn FrameWalk).collect();
    eviction::unload_units(
        &mut inner.arena,
        &mut inner.active,
        &shared.host,
        &cont_refs,
        &shared.backend,
        &shared.stats,
        shared.options.max_cache_size,
    );
}
