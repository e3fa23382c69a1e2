/*!
 * Worker
 *
 * Per-thread identity plus the exclusively owned withdrawal slot. The loop
 * body is a closure resolved before spawn, so it is inlined per method.
 */

use super::barrier::{BarrierWait, StartBarrier};
use super::config::BenchConfig;
use super::timing::TimingCollector;
use crate::core::types::{Amount, WorkerId};
use tracing::{debug, trace};

pub struct WorkerContext<'a> {
    id: WorkerId,
    /// Written only by this worker, read by the harness after join
    slot: &'a mut Amount,
    config: &'a BenchConfig,
}

impl<'a> WorkerContext<'a> {
    pub fn new(id: WorkerId, slot: &'a mut Amount, config: &'a BenchConfig) -> Self {
        Self { id, slot, config }
    }

    /// Thread body: rendezvous, then `iterations` transactions
    ///
    /// `transact` performs one enter/withdraw/leave and reports success.
    pub fn run<F>(self, barrier: Option<&StartBarrier>, timing: &TimingCollector, transact: &F)
    where
        F: Fn(WorkerId, Amount) -> bool,
    {
        let id = self.id;
        let amount = self.config.amount;

        if let Some(barrier) = barrier {
            let outcome = barrier.wait_with(|| {
                debug!("All threads have started transactions.");
                timing.start_now();
            });
            if outcome == BarrierWait::Aborted {
                debug!(worker = id, "start aborted, skipping transactions");
                return;
            }
        }

        let mut withdrawn: Amount = 0;
        for _ in 0..self.config.iterations {
            if transact(id, amount) {
                withdrawn += amount;
            } else {
                trace!(worker = id, amount = -amount, "transaction rejected");
            }
        }
        *self.slot = withdrawn;

        debug!(
            worker = id,
            transactions = self.config.iterations,
            withdrawn,
            "worker finished"
        );
    }
}
