/*!
 * Start Barrier
 *
 * Reusable rendezvous for the workers. The last arrival runs a closure (the
 * timing start) before anyone is released, so the measured window opens only
 * once every worker is runnable. The barrier can also be aborted, which
 * releases parked workers when the harness could not spawn all of them.
 */

use parking_lot::{Condvar, Mutex};

/// How a participant left the barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWait {
    /// Last to arrive; ran the closure
    Leader,
    Follower,
    /// The barrier was aborted before it filled
    Aborted,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

pub struct StartBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl StartBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn wait(&self) -> BarrierWait {
        self.wait_with(|| {})
    }

    /// Block until all parties arrive; the last one runs `on_last` first
    pub fn wait_with(&self, on_last: impl FnOnce()) -> BarrierWait {
        let mut state = self.state.lock();
        if state.aborted {
            return BarrierWait::Aborted;
        }

        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            on_last();
            state.arrived = 0;
            state.generation = generation.wrapping_add(1);
            self.cvar.notify_all();
            return BarrierWait::Leader;
        }

        while state.generation == generation && !state.aborted {
            self.cvar.wait(&mut state);
        }

        if state.generation == generation {
            BarrierWait::Aborted
        } else {
            BarrierWait::Follower
        }
    }

    /// Release current and future waiters without filling the barrier
    pub fn abort(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        self.cvar.notify_all();
    }
}
