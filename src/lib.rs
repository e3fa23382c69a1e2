/*!
 * Critical Section Benchmark Library
 *
 * Measures what mutual exclusion costs when many threads hammer one shared
 * counter, and whether each method actually keeps the counter consistent.
 */

pub mod bench;
pub mod cli;
pub mod core;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use crate::bench::{BenchConfig, BenchConfigBuilder, BenchReport, Benchmark, TimingReport};
pub use crate::core::errors::{exit_code, BenchError};
pub use crate::core::types::{Amount, BenchResult, WorkerId};
pub use crate::monitoring::init_tracing;
pub use crate::sync::{Controller, ControllerState, Exclusion, Method, SpinPolicy};
