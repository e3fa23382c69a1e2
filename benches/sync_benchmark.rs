/*!
 * Critical Section Benchmarks
 *
 * Uncontended enter/leave cost per method, and short contended runs through
 * the full harness
 */

use cs_bench::sync::{Controller, Exclusion, Method, SpinPolicy, StrategyVisitor};
use cs_bench::{BenchConfig, Benchmark};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

/// One enter/leave pair per iteration on the calling thread
struct Uncontended<'a, 'b> {
    bencher: &'a mut criterion::Bencher<'b>,
}

impl StrategyVisitor for Uncontended<'_, '_> {
    type Output = ();

    fn visit<L: Exclusion>(self, lock: &L) {
        self.bencher.iter(|| {
            lock.enter(black_box(0));
            lock.leave(0);
        });
    }

    fn visit_bypass(self) {
        self.bencher.iter(|| black_box(0));
    }
}

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_enter_leave");

    for method in Method::ALL.into_iter().filter(|m| !m.bypasses_controller()) {
        let mut controller = Controller::new();
        if controller.init(method, SpinPolicy::Busy).is_err() {
            // Kernel object unavailable on this host
            continue;
        }

        group.bench_function(BenchmarkId::from_parameter(method.description()), |b| {
            if let Some(strategy) = controller.strategy() {
                strategy.dispatch(Uncontended { bencher: b });
            }
        });

        controller.destroy().ok();
    }

    group.finish();
}

fn bench_contended_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_run");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for threads in [2usize, 8] {
        for method in Method::ALL.into_iter().filter(|m| *m != Method::SpinFlagNaive) {
            let config = BenchConfig::new(method)
                .with_threads(threads)
                .with_iterations(10_000)
                .with_spin(SpinPolicy::Yield);

            group.bench_with_input(
                BenchmarkId::new(method.description(), threads),
                &config,
                |b, config| {
                    b.iter(|| Benchmark::new(config.clone()).run().ok());
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended_run);
criterion_main!(benches);
