//! End-to-end scenarios against the public `Coordinator` API, run with a
//! fake host and fake backend so no real compiler or interpreter is
//! needed.

use std::time::Duration;

use mjit_coord::testing::{FakeBackend, FakeHost, StallingBackend};
use mjit_coord::{Backend, Coordinator, Host, JitFunc, Options, PchStatus};

fn fast_options() -> Options {
    Options {
        poll_quantum: Duration::from_micros(200),
        wait_timeout_quanta: 5,
        max_cache_size: 10,
        ..Default::default()
    }
}

/// Cache eviction picks the least-called, not-on-any-stack unit once the
/// active cache exceeds its cap. Eviction runs at submission time, so
/// the victim is chosen from the cache's prior members, never the unit
/// currently being submitted.
#[test]
fn cache_eviction_prefers_least_called_unit_not_on_a_stack() {
    let mut options = fast_options();
    options.max_cache_size = 10;
    let coord = Coordinator::init(options, FakeHost::new(), FakeBackend::new());

    let mut iseqs = Vec::new();
    for calls in 1..=10u64 {
        let iseq = coord.host().new_iseq(calls);
        coord.add_iseq_to_process(iseq);
        let _ = coord.get_iseq_func(iseq);
        iseqs.push(iseq);
    }

    // The cache is exactly full (10/10); submitting one more triggers
    // eviction of the least-called prior member (iseqs[0], total_calls == 1).
    // Eviction reclaims the unit's cache slot and artifact handle; it
    // leaves `jit_func` itself alone, so iseqs[0] still reports the
    // (now unloaded) compiled address.
    let extra = coord.host().new_iseq(1000);
    coord.add_iseq_to_process(extra);
    let _ = coord.get_iseq_func(extra);

    assert_eq!(coord.stats().evicted, 1);
    for &iseq in &iseqs {
        assert!(matches!(coord.host().jit_func(iseq), JitFunc::Compiled(_)));
    }
    coord.finish();
}

/// Non-blocking `get_iseq_func`: if the worker completes well within the
/// timeout, the caller observes `Compiled` without ever hitting the
/// timeout path.
#[test]
fn get_iseq_func_returns_promptly_on_success() {
    let coord = Coordinator::init(fast_options(), FakeHost::new(), FakeBackend::new());
    let iseq = coord.host().new_iseq(50);
    coord.add_iseq_to_process(iseq);
    let result = coord.get_iseq_func(iseq);
    assert!(matches!(result, JitFunc::Compiled(_)));
    assert_eq!(coord.stats().timed_out, 0);
    coord.finish();
}

/// A backend that never finishes a compile causes `get_iseq_func` to
/// settle the iseq to `NotCompiled` once the timeout budget is spent,
/// and that result is sticky. This path logs a warning through the host;
/// run with `RUST_LOG=warn` to see it.
#[test]
fn timeout_settles_to_not_compiled_and_is_sticky() {
    let _ = env_logger::try_init();
    let coord = Coordinator::init(fast_options(), FakeHost::new(), StallingBackend::new());
    let iseq = coord.host().new_iseq(50);
    coord.add_iseq_to_process(iseq);

    let first = coord.get_iseq_func(iseq);
    assert_eq!(first, JitFunc::NotCompiled);
    assert_eq!(coord.stats().timed_out, 1);

    // `jit_func` already settled, so a second wait returns immediately
    // without spending another timeout budget.
    let second = coord.get_iseq_func(iseq);
    assert_eq!(second, JitFunc::NotCompiled);
    assert_eq!(coord.stats().timed_out, 1);

    // The worker is permanently parked inside `compile`; never finished.
    std::mem::forget(coord);
}

/// `gc_start_hook` blocks new compiles from starting, and queued
/// submissions only proceed once `gc_finish_hook` releases the worker.
#[test]
fn gc_rendezvous_blocks_and_unblocks_the_worker() {
    let coord = Coordinator::init(fast_options(), FakeHost::new(), FakeBackend::new());
    coord.gc_start_hook();

    let iseq = coord.host().new_iseq(50);
    coord.add_iseq_to_process(iseq);
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(coord.host().jit_func(iseq), JitFunc::NotReady);

    coord.gc_finish_hook();
    let result = coord.get_iseq_func(iseq);
    assert!(matches!(result, JitFunc::Compiled(_)));
    coord.finish();
}

/// `mark` walks the submission queue and reports every iseq still
/// waiting to compile, without blocking on the worker.
#[test]
fn mark_reports_every_queued_iseq() {
    let coord = Coordinator::init(fast_options(), FakeHost::new(), StallingBackend::new());
    coord.gc_start_hook();

    let a = coord.host().new_iseq(10);
    let b = coord.host().new_iseq(20);
    coord.add_iseq_to_process(a);
    coord.add_iseq_to_process(b);

    let mut seen = Vec::new();
    coord.mark(|iseq| seen.push(iseq));
    assert!(seen.contains(&a));
    assert!(seen.contains(&b));

    coord.gc_finish_hook();
    std::mem::forget(coord);
}

/// After `child_after_fork`, the coordinator is disabled: every op is a
/// safe no-op and the (not-really-forked-here) worker is never joined.
#[test]
fn fork_child_disables_without_touching_the_worker() {
    let coord = Coordinator::init(fast_options(), FakeHost::new(), FakeBackend::new());
    let iseq = coord.host().new_iseq(50);
    coord.add_iseq_to_process(iseq);
    let _ = coord.get_iseq_func(iseq);

    coord.child_after_fork();
    assert!(!coord.is_enabled());

    let other = coord.host().new_iseq(10);
    coord.add_iseq_to_process(other); // no-op: disabled
    assert_eq!(coord.host().jit_func(other), JitFunc::NotAdded);
    assert!(coord.pause(false).is_err());
    assert!(coord.resume().is_err());

    // `finish` would join a worker we've already decided to abandon;
    // the real child process never calls it either.
    std::mem::forget(coord);
}

/// A unit whose iseq is live on some thread's control-frame stack is
/// never evicted, even when it has the smallest call count.
#[test]
fn live_frame_protects_a_unit_from_eviction() {
    let mut options = fast_options();
    options.max_cache_size = 10;
    let coord = Coordinator::init(options, FakeHost::new(), FakeBackend::new());

    let pinned = coord.host().new_iseq(1);
    coord.add_iseq_to_process(pinned);
    let _ = coord.get_iseq_func(pinned);
    coord.host().push_live_frame(pinned);

    for calls in 2..11u64 {
        let iseq = coord.host().new_iseq(calls);
        coord.add_iseq_to_process(iseq);
        let _ = coord.get_iseq_func(iseq);
    }

    let trigger = coord.host().new_iseq(1000);
    coord.add_iseq_to_process(trigger);
    let _ = coord.get_iseq_func(trigger);

    assert!(matches!(coord.host().jit_func(pinned), JitFunc::Compiled(_)));
    coord.finish();
}

/// A missing header disables the subsystem at `init` time without
/// starting a worker thread, and every operation becomes a no-op.
#[test]
fn bootstrap_failure_from_missing_header_disables_cleanly() {
    let coord = Coordinator::init(
        fast_options(),
        FakeHost::with_missing_header(),
        FakeBackend::new(),
    );
    assert!(!coord.is_enabled());
    assert_eq!(coord.backend().pch_status(), PchStatus::Success);

    let iseq = coord.host().new_iseq(10);
    coord.add_iseq_to_process(iseq);
    assert_eq!(coord.host().jit_func(iseq), JitFunc::NotAdded);
    coord.finish();
}
