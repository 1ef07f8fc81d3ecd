//! Compile/eviction/timeout counters, exposed as an immutable snapshot.
//!
//! Supplements the distilled spec: the original MJIT coordinator exposes
//! `RubyVM::MJIT.statistics`. Non-goals exclude "logging formatting", not
//! observability, so this is additive bookkeeping that participates in
//! no invariant and gates no behavior.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct StatsCounters {
    compiled: AtomicU64,
    failed: AtomicU64,
    evicted: AtomicU64,
    timed_out: AtomicU64,
}

/// Point-in-time snapshot returned by [`Coordinator::stats`][crate::coordinator::Coordinator::stats].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    pub compiled: u64,
    pub failed: u64,
    pub evicted: u64,
    pub timed_out: u64,
    pub queue_len: usize,
    pub active_len: usize,
    pub compact_len: usize,
    /// Smallest `id` still waiting in `queue`, i.e. the oldest
    /// not-yet-compiled submission. `None` when the queue is empty.
    pub oldest_pending_id: Option<u64>,
}

impl StatsCounters {
    pub fn record_compiled(&self) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(
        &self,
        queue_len: usize,
        active_len: usize,
        compact_len: usize,
        oldest_pending_id: Option<u64>,
    ) -> Stats {
        Stats {
            compiled: self.compiled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            queue_len,
            active_len,
            compact_len,
            oldest_pending_id,
        }
    }
}
