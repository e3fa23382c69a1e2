/*!
 * Benchmark Report
 */

use super::timing::TimingReport;
use crate::core::types::Amount;
use crate::sync::Method;
use serde::Serialize;

/// Measured counters of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub method: Method,
    pub threads: usize,
    pub iterations: u64,
    pub initial_balance: Amount,
    pub final_balance: Amount,
    /// Indexed by worker id
    pub withdrawn: Vec<Amount>,
    pub total_withdrawn: Amount,
    /// Workers actually spawned
    pub threads_started: usize,
    /// The start barrier filled and opened the timing window
    pub synchronized_start: bool,
    pub timing: TimingReport,
    /// Non-fatal teardown problems
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teardown_warnings: Vec<String>,
}

impl BenchReport {
    /// `initial - sum(withdrawn) == final`
    pub fn invariant_holds(&self) -> bool {
        self.initial_balance - self.total_withdrawn == self.final_balance
    }

    /// What the balance says was withdrawn
    pub fn accounted(&self) -> Amount {
        self.initial_balance - self.final_balance
    }

    /// Withdrawals counted by workers but missing from the balance
    pub fn lost(&self) -> Amount {
        self.total_withdrawn - self.accounted()
    }
}
