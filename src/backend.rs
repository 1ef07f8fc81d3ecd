//! The compiler backend's interface, as consumed by the coordinator.
//!
//! Source generation, invoking an external toolchain, dynamic loading,
//! and the precompiled-header bootstrap are all external collaborator
//! concerns reached exclusively through this trait.

use std::path::{Path, PathBuf};

use crate::ids::IseqId;

/// Precompiled-header bootstrap state, polled by `finish` and
/// consulted by `get_iseq_func`'s timeout check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PchStatus {
    NotReady,
    Success,
    Failed,
}

/// What the worker needs to attempt one compile step.
pub struct CompileRequest {
    pub iseq: IseqId,
    pub total_calls: u64,
}

/// Outcome of one compile step. `Artifact` is the backend's opaque
/// loaded-code handle (e.g. a `dlopen` handle); the coordinator never
/// inspects it, only stores it on the unit and hands it back to
/// [`Backend::free_unit`] on eviction or teardown.
pub enum CompileOutcome<Artifact> {
    Compiled { artifact: Artifact, entry: usize },
    Failed,
}

/// The external compiler backend.
pub trait Backend: Send + Sync + 'static {
    type Artifact: Send + 'static;

    /// Attempt to compile and load one unit. Called by the worker thread
    /// strictly outside the GC region.
    fn compile(&self, request: CompileRequest) -> CompileOutcome<Self::Artifact>;

    /// Release a loaded artifact. Called when a unit is evicted or the
    /// coordinator tears down.
    fn free_unit(&self, artifact: Self::Artifact);

    /// Best-effort removal of a temp file; failures are not propagated.
    fn remove_file(&self, path: &Path);

    /// Format a unique file name from `(id, prefix, suffix)`. If
    /// `id == 0`, the process id is substituted.
    fn unique_filename(&self, id: u64, prefix: &str, suffix: &str) -> PathBuf {
        let id = if id == 0 {
            std::process::id() as u64
        } else {
            id
        };
        PathBuf::from(format!("{prefix}{id}{suffix}"))
    }

    fn pch_status(&self) -> PchStatus;
}
