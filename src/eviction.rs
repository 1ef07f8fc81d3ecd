//! `unload_units`: bring the active list back under the cache cap.
//!
//! Goal: shrink `active.length` down to
//! `max_cache_size - floor(active.length / 10)`, a 10% hysteresis margin
//! captured once, before any unit is freed — including the units freed
//! unconditionally in the null-iseq sweep. This is deliberate: recomputing
//! the target every iteration would make the shrink more aggressive than
//! intended, and is not how this is meant to behave.

use std::collections::HashSet;

use crate::arena::UnitArena;
use crate::backend::Backend;
use crate::host::{FrameWalk, Host};
use crate::ids::UnitId;
use crate::list::UnitList;
use crate::stats::StatsCounters;

/// Run one eviction pass. `active` and `arena` are mutated in place.
/// `continuations` enumerates every host thread and continuation so step
/// 3 of the algorithm can mark units whose compiled entry may still be on
/// a stack. `max_cache_size` is the configured cap; the target is computed
/// from it, not from the current (possibly already-over-cap) size of
/// `active`, so a backlog that grew past the cap between eviction passes
/// still converges back toward it.
pub fn unload_units<H, B>(
    arena: &mut UnitArena<B::Artifact>,
    active: &mut UnitList,
    host: &H,
    continuations: &[&dyn FrameWalk],
    backend: &B,
    stats: &StatsCounters,
    max_cache_size: u32,
) where
    H: Host,
    B: Backend,
{
    let target = (max_cache_size as usize).saturating_sub(active.len() / 10);

    // Step 1: sweep units whose iseq backref was nulled by GC. These are
    // evicted unconditionally, regardless of liveness.
    let dead: Vec<UnitId> = active
        .iter()
        .filter(|&id| arena.get(id).map(|u| u.iseq().is_none()).unwrap_or(true))
        .collect();
    for id in dead {
        evict(arena, active, id, backend, stats);
    }

    if active.len() <= target {
        return;
    }

    // Step 2: clear the transient liveness flag on everything left.
    for id in active.iter().collect::<Vec<_>>() {
        if let Some(unit) = arena.get_mut(id) {
            unit.used_code_p = false;
        }
    }

    // Step 3: walk every thread and continuation's control-frame stack,
    // marking any unit whose iseq appears as a live frame.
    let mut live_iseqs = HashSet::new();
    for thread in host.threads() {
        thread.for_each_frame_iseq(&mut |iseq| {
            live_iseqs.insert(iseq);
        });
    }
    for cont in continuations {
        cont.for_each_frame_iseq(&mut |iseq| {
            live_iseqs.insert(iseq);
        });
    }
    for id in active.iter().collect::<Vec<_>>() {
        let Some(unit) = arena.get_mut(id) else {
            continue;
        };
        if let Some(iseq) = unit.iseq() {
            if live_iseqs.contains(&iseq) {
                unit.used_code_p = true;
            }
        }
    }

    // Step 4: repeatedly evict the least-called evictable unit until the
    // target is reached or nothing more can be evicted.
    while active.len() > target {
        let victim = active
            .iter()
            .filter(|&id| arena.get(id).map(|u| !u.used_code_p).unwrap_or(false))
            .min_by_key(|&id| {
                let calls = arena
                    .get(id)
                    .and_then(|u| u.iseq())
                    .map(|iseq| host.total_calls(iseq))
                    .unwrap_or(u64::MAX);
                // Stable tie-break by list order: `min_by_key` keeps the
                // first-encountered minimum, matching step 4's "ties
                // broken by first-encountered in list order".
                calls
            });
        match victim {
            Some(id) => evict(arena, active, id, backend, stats),
            None => break,
        }
    }
}

fn evict<A>(
    arena: &mut UnitArena<A>,
    active: &mut UnitList,
    id: UnitId,
    backend: &impl Backend<Artifact = A>,
    stats: &StatsCounters,
) {
    active.remove(id);
    if let Some(mut unit) = arena.free_unit(id) {
        if let Some(artifact) = unit.take_artifact() {
            backend.free_unit(artifact);
        }
    }
    stats.record_evicted();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeHost};
    use crate::unit::ListKind;

    fn make_active(host: &FakeHost, n: usize, calls: u64) -> (UnitArena<u64>, UnitList) {
        let mut arena = UnitArena::new();
        let mut active = UnitList::new();
        for _ in 0..n {
            let iseq = host.new_iseq(calls);
            let id = arena.create_unit(iseq, ListKind::Active);
            arena.get_mut(id).unwrap().set_artifact(0);
            active.push_back(id);
        }
        (arena, active)
    }

    #[test]
    fn evicts_down_to_hysteresis_target() {
        let host = FakeHost::new();
        let backend = FakeBackend::new();
        let stats = StatsCounters::default();
        let (mut arena, mut active) = make_active(&host, 10, 1);
        unload_units(&mut arena, &mut active, &host, &[], &backend, &stats, 10);
        // target = 10 - 10/10 = 9
        assert_eq!(active.len(), 9);
    }

    #[test]
    fn target_is_derived_from_max_cache_size_not_current_len() {
        // A backlog that grew well past the cap (e.g. the worker drained a
        // large burst of submissions between eviction checks) must still
        // converge toward `max_cache_size`, not merely shave 10% off
        // whatever the current, already-over-cap size happens to be.
        let host = FakeHost::new();
        let backend = FakeBackend::new();
        let stats = StatsCounters::default();
        let (mut arena, mut active) = make_active(&host, 40, 1);
        let max_cache_size = 10;
        unload_units(&mut arena, &mut active, &host, &[], &backend, &stats, max_cache_size);
        // target = 10 - 40/10 = 6
        assert_eq!(active.len(), 6);
    }

    #[test]
    fn never_evicts_a_unit_live_on_a_stack() {
        let host = FakeHost::new();
        let backend = FakeBackend::new();
        let stats = StatsCounters::default();
        let (mut arena, mut active) = make_active(&host, 10, 1);
        // Pin the first unit's iseq as live on a thread stack, and give
        // it the minimum call count so it would otherwise be the victim.
        let first = active.iter().next().unwrap();
        let pinned_iseq = arena.get(first).unwrap().iseq().unwrap();
        host.set_total_calls(pinned_iseq, 0);
        host.push_live_frame(pinned_iseq);

        unload_units(&mut arena, &mut active, &host, &[], &backend, &stats, 10);

        assert!(active.contains(first), "live unit must not be evicted");
        assert_eq!(active.len(), 9);
    }

    #[test]
    fn dead_iseq_units_are_swept_unconditionally() {
        let host = FakeHost::new();
        let backend = FakeBackend::new();
        let stats = StatsCounters::default();
        let (mut arena, mut active) = make_active(&host, 5, 1);
        let id = active.iter().next().unwrap();
        arena.get_mut(id).unwrap().clear_iseq();

        unload_units(&mut arena, &mut active, &host, &[], &backend, &stats, 5);

        assert!(!active.contains(id));
    }

    #[test]
    fn all_units_live_makes_no_progress_and_does_not_hang() {
        let host = FakeHost::new();
        let backend = FakeBackend::new();
        let stats = StatsCounters::default();
        let (mut arena, mut active) = make_active(&host, 10, 1);
        for id in active.iter().collect::<Vec<_>>() {
            let iseq = arena.get(id).unwrap().iseq().unwrap();
            host.push_live_frame(iseq);
        }
        unload_units(&mut arena, &mut active, &host, &[], &backend, &stats, 10);
        assert_eq!(active.len(), 10);
    }
}
