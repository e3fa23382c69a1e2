/*!
 * Benchmark Runner
 *
 * Orchestrates one run: controller init, worker spawn, barrier start,
 * join, timing, teardown and the ledger invariant check. The harness thread
 * never takes part in the workload loop.
 */

use super::barrier::StartBarrier;
use super::config::BenchConfig;
use super::ledger::Ledger;
use super::report::BenchReport;
use super::timing::TimingCollector;
use super::worker::WorkerContext;
use crate::core::errors::BenchError;
use crate::core::types::{Amount, BenchResult, WorkerId};
use crate::sync::{Controller, Exclusion, StrategyVisitor};
use std::thread;
use tracing::{debug, error, info, instrument, warn};

pub struct Benchmark {
    config: BenchConfig,
}

impl Benchmark {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Run the workload and verify the ledger
    ///
    /// Returns `BenchError::InvariantViolation` (carrying the full report)
    /// when the method lost or duplicated updates. Teardown failures do not
    /// fail the run; they are logged and listed in the report.
    #[instrument(skip(self), fields(method = %self.config.method, threads = self.config.threads))]
    pub fn run(&self) -> BenchResult<BenchReport> {
        self.config.validate()?;
        let initial = self.config.initial_balance()?;
        info!(initial_balance = initial, "The initial balance");

        let mut controller = Controller::new();
        controller.init(self.config.method, self.config.spin)?;

        let outcome = self.execute(&controller, initial);
        let teardown = controller.destroy();
        let mut report = outcome?;

        if let Err(e) = teardown {
            warn!(error = %e, "teardown failed, result still valid");
            report.teardown_warnings.push(e.to_string());
        }

        if !report.invariant_holds() {
            error!(
                initial = report.initial_balance,
                final_balance = report.final_balance,
                total_withdrawn = report.total_withdrawn,
                lost = report.lost(),
                "LOST TRANSACTIONS DETECTED!"
            );
            return Err(BenchError::InvariantViolation {
                report: Box::new(report),
            });
        }

        Ok(report)
    }

    fn execute(&self, controller: &Controller, initial: Amount) -> BenchResult<BenchReport> {
        let strategy = controller.strategy().ok_or_else(|| {
            BenchError::Configuration("critical section controller is not ready".into())
        })?;

        let ledger = Ledger::new(initial);
        let timing = TimingCollector::new();
        let barrier = self
            .config
            .sync_start
            .then(|| StartBarrier::new(self.config.threads));
        if barrier.is_none() {
            timing.start_now();
        }
        let mut withdrawn = vec![0; self.config.threads];

        let threads_started = strategy.dispatch(Launch {
            config: &self.config,
            ledger: &ledger,
            barrier: barrier.as_ref(),
            timing: &timing,
            slots: &mut withdrawn,
        })?;

        let synchronized_start = barrier.is_some() && timing.is_started();
        let timing = timing.finish();
        let total_withdrawn = withdrawn.iter().sum();
        info!(
            real_ms = timing.real_ms(),
            user_ms = timing.user_ms(),
            system_ms = timing.system_ms(),
            "workers joined"
        );

        Ok(BenchReport {
            method: self.config.method,
            threads: self.config.threads,
            iterations: self.config.iterations,
            initial_balance: ledger.initial(),
            final_balance: ledger.balance(),
            withdrawn,
            total_withdrawn,
            threads_started,
            synchronized_start,
            timing,
            teardown_warnings: Vec::new(),
        })
    }
}

/// Everything the workers share, consumed by the resolved strategy
struct Launch<'a> {
    config: &'a BenchConfig,
    ledger: &'a Ledger,
    barrier: Option<&'a StartBarrier>,
    timing: &'a TimingCollector,
    slots: &'a mut [Amount],
}

impl StrategyVisitor for Launch<'_> {
    type Output = BenchResult<usize>;

    fn visit<L: Exclusion>(self, lock: &L) -> Self::Output {
        debug!(lock = lock.name(), "workload resolved");
        let ledger = self.ledger;
        self.spawn_all(move |id, amount| {
            lock.enter(id);
            let ok = ledger.try_withdraw(amount);
            lock.leave(id);
            ok
        })
    }

    fn visit_bypass(self) -> Self::Output {
        debug!(lock = "none", "workload resolved");
        let ledger = self.ledger;
        self.spawn_all(move |_id, amount| ledger.try_withdraw_atomic(amount))
    }
}

impl Launch<'_> {
    /// Spawn every worker and join them; returns how many were started
    fn spawn_all<F>(self, transact: F) -> BenchResult<usize>
    where
        F: Fn(WorkerId, Amount) -> bool + Sync,
    {
        let Launch {
            config,
            barrier,
            timing,
            slots,
            ..
        } = self;
        let transact = &transact;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(slots.len());

            for (id, slot) in slots.iter_mut().enumerate() {
                let worker = WorkerContext::new(id, slot, config);
                let spawned = thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn_scoped(scope, move || worker.run(barrier, timing, transact));

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Parked workers would wait forever for the missing peers
                        if let Some(barrier) = barrier {
                            barrier.abort();
                        }
                        return Err(BenchError::Thread(format!(
                            "failed to spawn worker {id}: {e}"
                        )));
                    }
                }
            }
            let started = handles.len();
            debug!(threads = started, "Threads started");

            let panicked = handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(Result::is_err)
                .count();
            if panicked > 0 {
                return Err(BenchError::Thread(format!("{panicked} worker(s) panicked")));
            }
            Ok(started)
        })
    }
}
