//! Coordination core for a method-level JIT compilation subsystem.
//!
//! This crate is the control plane that sits between a bytecode interpreter
//! (the *host*) and an external compiler backend. It owns the submission
//! queue, the bounded cache of loaded code artifacts, the continuation
//! registry used for eviction liveness, the GC rendezvous protocol, the
//! background worker's lifecycle, and the class-serial validity set used
//! by generated guard code.
//!
//! It does **not** generate native code, invoke a C toolchain, or load a
//! shared object: those concerns live behind the [`Backend`] trait. It
//! does not own iseq storage, thread listings, or GC hooks either: those
//! live behind the [`Host`] trait.
//!
//! # Example
//!
//! ```
//! use mjit_coord::{Coordinator, Options};
//! use mjit_coord::testing::{FakeHost, FakeBackend};
//!
//! let host = FakeHost::new();
//! let backend = FakeBackend::new();
//! let coord = Coordinator::init(Options::default(), host, backend);
//!
//! let iseq = coord.host().new_iseq(10);
//! coord.add_iseq_to_process(iseq);
//! let _ = coord.get_iseq_func(iseq);
//! coord.finish();
//! ```

pub mod arena;
pub mod backend;
pub mod class_serial;
pub mod continuation;
pub mod coordinator;
pub mod error;
pub mod eviction;
mod gc;
pub mod host;
pub mod ids;
pub mod list;
pub mod options;
pub mod stats;
pub mod tempdir;
pub mod unit;
mod wait;
mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{Backend, CompileOutcome, CompileRequest, PchStatus};
pub use coordinator::Coordinator;
pub use error::CoordError;
pub use host::Host;
pub use ids::{ClassSerial, IseqId, UnitId};
pub use options::Options;
pub use stats::Stats;
pub use unit::{JitFunc, Unit};

/// Poll quantum used by every busy-wait loop in the coordinator
/// (`pause(wait)`, `get_iseq_func`, `stop_worker`). Kept as a single named
/// constant rather than inlined, per the coordination contract: do not
/// convert these waits into true busy-spins.
pub const POLL_QUANTUM: std::time::Duration = std::time::Duration::from_millis(1);

/// Default timeout for [`Coordinator::get_iseq_func`], expressed as a
/// quantum count so the 1 ms poll interval and the ~60 s budget stay in
/// lockstep if `POLL_QUANTUM` is ever retuned.
pub const WAIT_TIMEOUT_QUANTA: u64 = 60_000;
