/*!
 * Busy-Wait Critical Sections
 *
 * Three flag-based locks that never park in the kernel. With
 * `SpinPolicy::Yield` each failed poll gives up the timeslice.
 *
 * Orderings are part of what is measured: a failed fast-path check is a
 * relaxed load, acquisition is an acquire exchange, release is a release
 * store. Do not strengthen or weaken them.
 */

use super::config::SpinPolicy;
use super::traits::Exclusion;
use crate::core::types::WorkerId;
use std::sync::atomic::{AtomicBool, Ordering};

/// Software lock: wait until the flag reads clear, then set it
///
/// Test and set are two separate relaxed operations, so two workers can both
/// observe the flag clear and enter together. Kept that way on purpose; it is
/// the baseline that shows why the hardware variants exist.
#[repr(C, align(64))] // Cache-line aligned to keep the flag off the ledger's line
pub struct NaiveFlag {
    locked: AtomicBool,
    policy: SpinPolicy,
}

impl NaiveFlag {
    pub fn new(policy: SpinPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            policy,
        }
    }
}

impl Exclusion for NaiveFlag {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        while self.locked.load(Ordering::Relaxed) {
            self.policy.backoff();
        }
        self.locked.store(true, Ordering::Relaxed);
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        self.locked.store(false, Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "naive-flag"
    }
}

/// Test-and-set lock on an atomic exchange
#[repr(C, align(64))]
pub struct ExchangeFlag {
    locked: AtomicBool,
    policy: SpinPolicy,
}

impl ExchangeFlag {
    pub fn new(policy: SpinPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            policy,
        }
    }
}

impl Exclusion for ExchangeFlag {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        while self.locked.swap(true, Ordering::Acquire) {
            self.policy.backoff();
        }
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        self.locked.store(false, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "xchg"
    }
}

/// Test-and-test-and-set lock
///
/// A relaxed read filters out the locked case so waiters share the cache line
/// instead of bouncing it with exchanges.
#[repr(C, align(64))]
pub struct TestThenExchange {
    locked: AtomicBool,
    policy: SpinPolicy,
}

impl TestThenExchange {
    pub fn new(policy: SpinPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            policy,
        }
    }
}

impl Exclusion for TestThenExchange {
    #[inline]
    fn enter(&self, _id: WorkerId) {
        while self.locked.load(Ordering::Relaxed) || self.locked.swap(true, Ordering::Acquire) {
            self.policy.backoff();
        }
    }

    #[inline]
    fn leave(&self, _id: WorkerId) {
        self.locked.store(false, Ordering::Release);
    }

    fn name(&self) -> &'static str {
        "test-xchg"
    }
}
