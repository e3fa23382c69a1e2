/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 *
 * Every category maps onto its own process exit code so scripts driving the
 * benchmark can tell a falsified method apart from a broken environment.
 */

use crate::bench::BenchReport;
use crate::sync::Method;
use miette::Diagnostic;
use nix::errno::Errno;
use thiserror::Error;

/// Process exit codes, one per failure category
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const INVARIANT_VIOLATION: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const RESOURCE_ACQUISITION: i32 = 3;
    pub const THREAD: i32 = 4;
}

/// Unified benchmark error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(bench::configuration),
        help("Check the method ordinal (0-9), thread count (1-1024) and transaction count.")
    )]
    Configuration(String),

    #[error("{method}: {step} failed: {source}")]
    #[diagnostic(
        code(bench::resource_acquisition),
        help("The kernel refused to create a synchronization object. Check IPC limits (ipcs -l) and /dev/mqueue.")
    )]
    ResourceAcquisition {
        method: Method,
        step: &'static str,
        #[source]
        source: Errno,
    },

    #[error("{method}: {step} failed during teardown: {source}")]
    #[diagnostic(
        code(bench::resource_release),
        severity(Warning),
        help("The measured result is still valid; a kernel object may linger until process exit.")
    )]
    ResourceRelease {
        method: Method,
        step: &'static str,
        #[source]
        source: Errno,
    },

    #[error("Worker thread error: {0}")]
    #[diagnostic(code(bench::thread))]
    Thread(String),

    #[error(
        "LOST TRANSACTIONS DETECTED! initial - new != total withdrawn ({} != {})",
        .report.accounted(),
        .report.total_withdrawn
    )]
    #[diagnostic(
        code(bench::invariant_violation),
        help("The selected method did not provide mutual exclusion.")
    )]
    InvariantViolation { report: Box<BenchReport> },
}

impl BenchError {
    /// Shorthand for acquisition failures reported right after a failing call
    pub(crate) fn acquire(method: Method, step: &'static str, source: Errno) -> Self {
        BenchError::ResourceAcquisition {
            method,
            step,
            source,
        }
    }

    pub(crate) fn release(method: Method, step: &'static str, source: Errno) -> Self {
        BenchError::ResourceRelease {
            method,
            step,
            source,
        }
    }

    /// Exit status the process should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Configuration(_) => exit_code::CONFIGURATION,
            BenchError::ResourceAcquisition { .. } => exit_code::RESOURCE_ACQUISITION,
            // Teardown problems never change the verdict on the run
            BenchError::ResourceRelease { .. } => exit_code::SUCCESS,
            BenchError::Thread(_) => exit_code::THREAD,
            BenchError::InvariantViolation { .. } => exit_code::INVARIANT_VIOLATION,
        }
    }
}
