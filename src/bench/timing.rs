/*!
 * Timing Collector
 *
 * Wall clock from the monotonic clock, CPU time from getrusage(RUSAGE_SELF).
 * Only the harness thread and the barrier leader touch it, never the loop.
 */

use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeVal;
use serde::{Serialize, Serializer};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::warn;

/// Point-in-time wall and CPU clocks
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    wall: Instant,
    user: Duration,
    system: Duration,
}

impl Snapshot {
    pub fn capture() -> Self {
        let wall = Instant::now();
        match getrusage(UsageWho::RUSAGE_SELF) {
            Ok(usage) => Self {
                wall,
                user: timeval_to_duration(usage.user_time()),
                system: timeval_to_duration(usage.system_time()),
            },
            Err(e) => {
                warn!(error = %e, "getrusage failed, CPU time will read as zero");
                Self {
                    wall,
                    user: Duration::ZERO,
                    system: Duration::ZERO,
                }
            }
        }
    }

    /// Deltas from `self` to `later`
    pub fn until(&self, later: &Snapshot) -> TimingReport {
        TimingReport {
            real: later.wall.saturating_duration_since(self.wall),
            user: later.user.saturating_sub(self.user),
            system: later.system.saturating_sub(self.system),
        }
    }
}

fn timeval_to_duration(tv: TimeVal) -> Duration {
    let secs = u64::try_from(tv.tv_sec()).unwrap_or(0);
    let micros = u32::try_from(tv.tv_usec()).unwrap_or(0);
    Duration::new(secs, micros.saturating_mul(1_000))
}

/// Real, user and system time spent in the measured window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimingReport {
    #[serde(rename = "real_ms", serialize_with = "as_millis")]
    pub real: Duration,
    #[serde(rename = "user_ms", serialize_with = "as_millis")]
    pub user: Duration,
    #[serde(rename = "system_ms", serialize_with = "as_millis")]
    pub system: Duration,
}

impl TimingReport {
    pub fn real_ms(&self) -> f64 {
        self.real.as_secs_f64() * 1000.0
    }

    pub fn user_ms(&self) -> f64 {
        self.user.as_secs_f64() * 1000.0
    }

    pub fn system_ms(&self) -> f64 {
        self.system.as_secs_f64() * 1000.0
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Start-once, finish-once window
#[derive(Debug, Default)]
pub struct TimingCollector {
    start: OnceLock<Snapshot>,
}

impl TimingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the window; later calls keep the first snapshot
    pub fn start_now(&self) {
        let _ = self.start.set(Snapshot::capture());
    }

    pub fn is_started(&self) -> bool {
        self.start.get().is_some()
    }

    /// Close the window. A window never opened (no worker reached the start
    /// line) reports zero.
    pub fn finish(&self) -> TimingReport {
        let end = Snapshot::capture();
        match self.start.get() {
            Some(start) => start.until(&end),
            None => TimingReport::default(),
        }
    }
}
