//! Deterministic fake [`Host`] and [`Backend`] implementations.
//!
//! These stand in for the real interpreter and compiler backend so
//! end-to-end scenarios can run in-process, without a real
//! compiler subprocess or a real interpreter, and without the real
//! timing constants (1 ms poll, ~60 s timeout) making the test suite
//! slow — callers override `Options::poll_quantum` /
//! `Options::wait_timeout_quanta` instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::backend::{Backend, CompileOutcome, CompileRequest, PchStatus};
use crate::host::{FrameWalk, Host};
use crate::ids::{ClassSerial, IseqId};
use crate::unit::JitFunc;

/// A header path that is guaranteed to exist wherever this crate's tests
/// run, standing in for the runtime's own installed header.
fn fake_header_path() -> PathBuf {
    PathBuf::from(file!())
}

#[derive(Default)]
struct HostState {
    next_iseq: u64,
    jit_func: HashMap<IseqId, JitFunc>,
    total_calls: HashMap<IseqId, u64>,
    live_frames: Vec<IseqId>,
}

/// A fake interpreter host. One synthetic "thread" shares the set of
/// currently-live frames pushed with [`FakeHost::push_live_frame`].
pub struct FakeHost {
    state: Mutex<HostState>,
    warnings: Mutex<Vec<String>>,
    missing_header: bool,
}

pub struct FakeThread {
    frames: Vec<IseqId>,
}

impl FrameWalk for FakeThread {
    fn for_each_frame_iseq(&self, f: &mut dyn FnMut(IseqId)) {
        for &iseq in &self.frames {
            f(iseq);
        }
    }
}

/// No real fiber/thread snapshotting to model; continuations in tests
/// are pushed through the same live-frame mechanism as threads, so this
/// type carries no state of its own.
pub struct FakeContinuation;

impl FrameWalk for FakeContinuation {
    fn for_each_frame_iseq(&self, _f: &mut dyn FnMut(IseqId)) {}
}

impl Default for FakeHost {
    fn default() -> Self {
        FakeHost {
            state: Mutex::new(HostState::default()),
            warnings: Mutex::new(Vec::new()),
            missing_header: false,
        }
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host reporting a header path that does not exist, to exercise
    /// the bootstrap-failure path in `Coordinator::init`.
    pub fn with_missing_header() -> Self {
        FakeHost {
            missing_header: true,
            ..Self::default()
        }
    }

    /// Create a new iseq reporting `total_calls` and in the `NotAdded`
    /// state.
    pub fn new_iseq(&self, total_calls: u64) -> IseqId {
        let mut state = self.state.lock().unwrap();
        let id = IseqId(state.next_iseq);
        state.next_iseq += 1;
        state.jit_func.insert(id, JitFunc::NotAdded);
        state.total_calls.insert(id, total_calls);
        id
    }

    pub fn set_total_calls(&self, iseq: IseqId, calls: u64) {
        self.state.lock().unwrap().total_calls.insert(iseq, calls);
    }

    /// Mark `iseq` as appearing in a live control frame, as if it were
    /// on some thread's call stack.
    pub fn push_live_frame(&self, iseq: IseqId) {
        self.state.lock().unwrap().live_frames.push(iseq);
    }

    pub fn clear_live_frames(&self) {
        self.state.lock().unwrap().live_frames.clear();
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Host for FakeHost {
    type Thread = FakeThread;
    type Continuation = FakeContinuation;

    fn jit_func(&self, iseq: IseqId) -> JitFunc {
        *self
            .state
            .lock()
            .unwrap()
            .jit_func
            .get(&iseq)
            .unwrap_or(&JitFunc::NotAdded)
    }

    fn set_jit_func(&self, iseq: IseqId, value: JitFunc) {
        self.state.lock().unwrap().jit_func.insert(iseq, value);
    }

    fn total_calls(&self, iseq: IseqId) -> u64 {
        *self.state.lock().unwrap().total_calls.get(&iseq).unwrap_or(&0)
    }

    fn threads(&self) -> Vec<Self::Thread> {
        let frames = self.state.lock().unwrap().live_frames.clone();
        vec![FakeThread { frames }]
    }

    fn root_class_serials(&self) -> Vec<ClassSerial> {
        vec![ClassSerial(0), ClassSerial(1)]
    }

    fn header_path(&self) -> PathBuf {
        if self.missing_header {
            PathBuf::from("/does/not/exist/mjit-coord-test-header.h")
        } else {
            fake_header_path()
        }
    }

    fn log_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
        log::warn!("{message}");
    }
}

/// A fake compiler backend: "compiles" instantly and successfully unless
/// told otherwise, with a monotonically increasing fake entry address.
pub struct FakeBackend {
    next_entry: AtomicU64,
    fail_all: std::sync::atomic::AtomicBool,
    pch_status: Mutex<PchStatus>,
    removed_files: Mutex<Vec<PathBuf>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        FakeBackend {
            next_entry: AtomicU64::new(0xDEAD_0000),
            fail_all: std::sync::atomic::AtomicBool::new(false),
            pch_status: Mutex::new(PchStatus::Success),
            removed_files: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::Relaxed);
    }

    pub fn set_pch_status(&self, status: PchStatus) {
        *self.pch_status.lock().unwrap() = status;
    }

    pub fn removed_files(&self) -> Vec<PathBuf> {
        self.removed_files.lock().unwrap().clone()
    }
}

impl Backend for FakeBackend {
    type Artifact = u64;

    fn compile(&self, request: CompileRequest) -> CompileOutcome<Self::Artifact> {
        if self.fail_all.load(Ordering::Relaxed) {
            return CompileOutcome::Failed;
        }
        let entry = self.next_entry.fetch_add(1, Ordering::Relaxed);
        CompileOutcome::Compiled {
            artifact: request.iseq.0,
            entry: entry as usize,
        }
    }

    fn free_unit(&self, _artifact: Self::Artifact) {}

    fn remove_file(&self, path: &Path) {
        self.removed_files.lock().unwrap().push(path.to_path_buf());
    }

    fn pch_status(&self) -> PchStatus {
        *self.pch_status.lock().unwrap()
    }
}

/// A backend whose worker never finishes a compile — used to exercise
/// the `get_iseq_func` timeout path without
/// actually blocking forever: it simply never flips `jit_func` away from
/// `NotReady`, which is exactly what "the backend never completes"
/// means from the coordinator's point of view.
pub struct StallingBackend {
    inner: FakeBackend,
}

impl Default for StallingBackend {
    fn default() -> Self {
        StallingBackend {
            inner: FakeBackend::new(),
        }
    }
}

impl StallingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for StallingBackend {
    type Artifact = u64;

    fn compile(&self, _request: CompileRequest) -> CompileOutcome<Self::Artifact> {
        // Park the worker thread indefinitely rather than returning: the
        // unit is never observed as compiled or failed.
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    }

    fn free_unit(&self, artifact: Self::Artifact) {
        self.inner.free_unit(artifact);
    }

    fn remove_file(&self, path: &Path) {
        self.inner.remove_file(path);
    }

    fn pch_status(&self) -> PchStatus {
        self.inner.pch_status()
    }
}
