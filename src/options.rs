//! Coordinator configuration.
//!
//! Constructing an `Options` value is the host's job — parsing it out of
//! argv or an env file is out of scope here. A plain struct
//! with a `Default` impl, updated with struct-update syntax.

const MIN_CACHE_SIZE: u32 = 10;
const DEFAULT_CACHE_SIZE: u32 = 1000;
const DEFAULT_MIN_CALLS: u32 = 5;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Call-count threshold below which an iseq is never submitted. The
    /// coordinator doesn't enforce this itself (the host decides when to
    /// call `add_iseq_to_process`); it's surfaced here so a single
    /// `Options` value is the complete configuration contract.
    pub min_calls: u32,

    /// Active-cache cap. Clamped to `>= 10` at normalization time.
    pub max_cache_size: u32,

    /// Emit warnings (e.g. on `get_iseq_func` timeout).
    pub warnings: bool,

    /// Verbosity level for the diagnostic sink; `0` is silent.
    pub verbose: u8,

    /// Preserve the PCH file at `finish` instead of deleting it.
    pub save_temps: bool,

    /// Default passed to `pause` when the host doesn't specify one
    /// explicitly.
    pub wait: bool,

    /// Poll interval for every busy-wait loop (`pause(wait)`,
    /// `get_iseq_func`, `stop_worker`, the `finish` PCH wait). Exposed so
    /// tests don't have to sleep through the real 1 ms/60 s constants.
    pub poll_quantum: std::time::Duration,

    /// Quantum count `get_iseq_func` waits before giving up and settling
    /// the iseq to `NotCompiled`.
    pub wait_timeout_quanta: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            min_calls: DEFAULT_MIN_CALLS,
            max_cache_size: DEFAULT_CACHE_SIZE,
            warnings: false,
            verbose: 0,
            save_temps: false,
            wait: false,
            poll_quantum: crate::POLL_QUANTUM,
            wait_timeout_quanta: crate::WAIT_TIMEOUT_QUANTA,
        }
    }
}

impl Options {
    /// Apply the same normalization the coordinator performs at init.
    ///
    /// Preserved quirk: the zero-check and the minimum-clamp are two
    /// separate comparisons, in that order, so
    /// `max_cache_size == 0` lands on the *default* (1000), not on the
    /// floor of 10. Only `max_cache_size` in `1..MIN_CACHE_SIZE` gets
    /// clamped to 10. This is documented, not "fixed".
    pub(crate) fn normalized(mut self) -> Self {
        if self.min_calls == 0 {
            self.min_calls = DEFAULT_MIN_CALLS;
        }
        if self.max_cache_size == 0 {
            self.max_cache_size = DEFAULT_CACHE_SIZE;
        } else if self.max_cache_size < MIN_CACHE_SIZE {
            self.max_cache_size = MIN_CACHE_SIZE;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cache_size_becomes_default_not_floor() {
        let opts = Options {
            max_cache_size: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.max_cache_size, DEFAULT_CACHE_SIZE);
    }

    #[test]
    fn small_nonzero_cache_size_clamps_to_floor() {
        let opts = Options {
            max_cache_size: 3,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.max_cache_size, MIN_CACHE_SIZE);
    }

    #[test]
    fn zero_min_calls_promoted_to_default() {
        let opts = Options {
            min_calls: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.min_calls, DEFAULT_MIN_CALLS);
    }
}
