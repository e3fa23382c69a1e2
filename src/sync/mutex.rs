/*!
 * Blocking Mutex
 *
 * Process-local lock from parking_lot. Contended waiters park on a futex, so
 * no CPU is burnt while waiting. The raw lock is used directly because enter
 * and leave are separate calls with no guard in between.
 */

use super::traits::Exclusion;
use crate::core::types::WorkerId;
use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

pub struct BlockingMutex {
    raw: RawMutex,
}

impl BlockingMutex {
    pub fn new() -> Self {
        Self { raw: RawMutex::INIT }
    }

    /// Diagnostics only; racy by nature
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Default for BlockingMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Exclusion for BlockingMutex {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        self.raw.lock();
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        // SAFETY: the Exclusion contract has the worker that entered call
        // leave, so the lock is held by the current context.
        unsafe { self.raw.unlock() }
    }

    fn name(&self) -> &'static str {
        "mutex"
    }
}
