/*!
 * Spin Configuration
 *
 * Runtime configuration for the busy-wait family
 */

use serde::Serialize;
use std::thread;

/// What a spinning thread does after a failed acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPolicy {
    /// Poll again immediately (lowest latency, highest contention cost)
    #[default]
    Busy,
    /// Give up the rest of the timeslice via sched_yield(2)
    Yield,
}

impl SpinPolicy {
    pub const fn from_yield_flag(yield_on_contention: bool) -> Self {
        if yield_on_contention {
            SpinPolicy::Yield
        } else {
            SpinPolicy::Busy
        }
    }

    /// Called once per failed poll
    #[inline(always)]
    pub fn backoff(self) {
        if let SpinPolicy::Yield = self {
            thread::yield_now();
        }
    }
}
