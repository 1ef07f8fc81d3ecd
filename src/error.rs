use thiserror::Error;

/// Errors raised to the host.
///
/// Per the coordinator's error taxonomy, only user-visible misuse of the
/// worker-lifecycle API surfaces as a `Result`; bootstrap failures,
/// compile timeouts, and allocation failures are absorbed internally
/// (disable-and-log, or sticky per-iseq `NotCompiled`) and never reach
/// here.
#[derive(Debug, Error)]
pub enum CoordError {
    /// `pause`/`resume` called while the subsystem is disabled.
    #[error("mjit subsystem is disabled")]
    Disabled,

    /// `resume` failed to start a replacement worker thread.
    #[error("failed to start worker thread: {0}")]
    WorkerSpawnFailed(std::io::Error),
}
