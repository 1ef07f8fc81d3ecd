//! `get_iseq_func`: synchronous wait for one iseq's compile result.

use crate::backend::{Backend, PchStatus};
use crate::coordinator::Shared;
use crate::host::Host;
use crate::ids::IseqId;
use crate::unit::JitFunc;

pub(crate) fn get_iseq_func<H: Host, B: Backend>(shared: &Shared<H, B>, iseq: IseqId) -> JitFunc {
    let mut quanta = 0u64;
    loop {
        let current = shared.host.jit_func(iseq);
        if current.is_settled() {
            return current;
        }
        let pch_failed = shared.backend.pch_status() == PchStatus::Failed;
        if pch_failed || quanta >= shared.options.wait_timeout_quanta {
            shared.host.set_jit_func(iseq, JitFunc::NotCompiled);
            shared.stats.record_timed_out();
            if shared.options.warnings || shared.options.verbose > 0 {
                shared
                    .host
                    .log_warning("mjit: waiter for iseq timed out, falling back to the interpreter");
            }
            return JitFunc::NotCompiled;
        }
        shared.worker_wakeup.notify_all();
        std::thread::sleep(shared.options.poll_quantum);
        quanta += 1;
    }
}
