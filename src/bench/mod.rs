/*!
 * Benchmark Harness
 *
 * Drives N worker threads through a barrier-synchronized withdrawal
 * workload against the shared ledger and verifies no update was lost:
 *
 * ```text
 * config -> controller init -> spawn -> barrier -> {enter, withdraw, leave}* -> join
 *        -> timing -> controller destroy -> invariant check
 * ```
 */

mod barrier;
mod config;
mod ledger;
mod report;
mod runner;
mod timing;
mod worker;

pub use barrier::{BarrierWait, StartBarrier};
pub use config::{parse_integer, BenchConfig, BenchConfigBuilder};
pub use ledger::Ledger;
pub use report::BenchReport;
pub use runner::Benchmark;
pub use timing::{Snapshot, TimingCollector, TimingReport};
pub use worker::WorkerContext;
