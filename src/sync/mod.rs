/*!
 * Critical Section Controller
 *
 * Ten mutual-exclusion methods behind one enter/leave contract:
 * - Spin family: naive flag, atomic exchange, test-then-exchange
 * - Blocking family: mutex, POSIX semaphores, System V semaphore,
 *   POSIX and System V message queues
 * - Atomic sentinel: bypasses the controller entirely
 *
 * # Architecture
 *
 * `Controller` owns a `Strategy` (one variant per method). The harness
 * resolves it once through `Strategy::dispatch`, so the workload loop is
 * compiled separately for every concrete lock and never re-checks the method.
 */

mod config;
mod controller;
mod method;
mod mutex;
mod queue;
mod semaphore;
mod spin;
mod sys;
mod traits;

pub use config::SpinPolicy;
pub use controller::{Controller, ControllerState, Strategy, StrategyVisitor};
pub use method::Method;
pub use traits::Exclusion;

// Re-export concrete locks for direct use and benchmarking
pub use mutex::BlockingMutex;
pub use queue::{KernelMessageQueue, PosixMessageQueue};
pub use semaphore::{KernelSemaphore, NamedSemaphore, UnnamedSemaphore};
pub use spin::{ExchangeFlag, NaiveFlag, TestThenExchange};
