/*!
 * Core Types
 * Common types used across the benchmark
 */

/// Worker identity, in `[0, thread_count)`
pub type WorkerId = usize;

/// Monetary amount moved by one transaction
pub type Amount = i64;

/// Common result type for benchmark operations
pub type BenchResult<T> = Result<T, super::errors::BenchError>;
