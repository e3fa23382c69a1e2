/*!
 * Benchmark Limits and Constants
 *
 * Centralized location for workload defaults, hard bounds and the names
 * used for kernel-visible synchronization objects.
 */

// =============================================================================
// WORKLOAD LIMITS
// =============================================================================

/// Upper bound on concurrently running workers
/// Sizes the per-worker withdrawal slots
pub const MAX_THREADS: usize = 1024;

/// Default number of workers
pub const DEFAULT_THREADS: usize = 1 << 3;

/// Default transactions per worker (4M)
pub const DEFAULT_ITERATIONS: u64 = 1 << 22;

/// Amount moved by each transaction
/// Kept constant so every run measures the same work per iteration
pub const WITHDRAW_AMOUNT: i64 = 1;

// =============================================================================
// KERNEL OBJECT NAMES
// =============================================================================

/// Prefix for the named POSIX semaphore
/// The pid and a sequence number are appended, then the name is unlinked
pub const NAMED_SEMAPHORE_PREFIX: &str = "/cs_bench-sem";

/// Prefix for the POSIX message queue
pub const MESSAGE_QUEUE_PREFIX: &str = "/cs_bench-posix_mq";

/// Token carried by the POSIX message queue while the section is free
pub const MESSAGE_QUEUE_TOKEN: &[u8] = b"lock";

/// Maximum POSIX message size, exactly one token
pub const MESSAGE_QUEUE_MSG_SIZE: usize = MESSAGE_QUEUE_TOKEN.len();

/// Type tag of the SysV message token (must be > 0)
pub const SYSV_TOKEN_TYPE: libc::c_long = 1;

/// Permission bits for every kernel object we create (owner rw)
pub const IPC_MODE: u32 = 0o600;

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_METHOD: &str = "CS_BENCH_METHOD";
pub const ENV_THREADS: &str = "CS_BENCH_THREADS";
pub const ENV_ITERATIONS: &str = "CS_BENCH_ITERATIONS";
pub const ENV_YIELD: &str = "CS_BENCH_YIELD";
pub const ENV_TRACE_JSON: &str = "CS_BENCH_TRACE_JSON";
