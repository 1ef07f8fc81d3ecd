//! The interpreter host's interface, as consumed by the coordinator.
//!
//! Everything here is narrow on purpose: iseq storage, thread listing,
//! and GC entry/exit hooks all live on the host side of this trait. The
//! coordinator only ever asks questions about identities it was handed
//! back by [`Coordinator::add_iseq_to_process`][crate::coordinator::Coordinator::add_iseq_to_process].

use std::path::PathBuf;

use crate::ids::{ClassSerial, IseqId};
use crate::unit::JitFunc;

/// One host execution context's control-frame stack, as seen during the
/// liveness scan in `unload_units`.
pub trait FrameWalk {
    /// Call `f` once per control frame whose "program slot" names a live
    /// iseq.
    fn for_each_frame_iseq(&self, f: &mut dyn FnMut(IseqId));
}

/// The interpreter host.
pub trait Host: Send + Sync + 'static {
    type Thread: FrameWalk;
    type Continuation: FrameWalk + Send + 'static;

    fn jit_func(&self, iseq: IseqId) -> JitFunc;
    fn set_jit_func(&self, iseq: IseqId, value: JitFunc);

    fn total_calls(&self, iseq: IseqId) -> u64;

    /// List every currently live host thread, for the liveness scan.
    fn threads(&self) -> Vec<Self::Thread>;

    /// Runtime constants consumed at init time to seed the class-serial
    /// set: root object's class serial, top-self's class serial, and the
    /// class/module-valued constants in the root constant table.
    fn root_class_serials(&self) -> Vec<ClassSerial>;

    /// Path to the runtime header the compiler backend's precompiled
    /// header is built from. Probed once at init; a missing header
    /// disables the subsystem entirely.
    fn header_path(&self) -> PathBuf;

    /// Emit a diagnostic through the host's verbosity-level sink. The
    /// coordinator itself only decides *whether* to call this (gated on
    /// `Options::warnings`/`Options::verbose`); formatting beyond that
    /// is the host's business.
    fn log_warning(&self, message: &str) {
        log::warn!("{message}");
    }
}
