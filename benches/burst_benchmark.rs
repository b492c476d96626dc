/*!
 * Burst Benchmarks
 *
 * Criterion timing of one burst per strategy combination. Trial setup sits
 * outside the measured closure; only `run_trial` is timed.
 */

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use sync_burst::{
    run_trial, setup_trial, teardown_trial, BackoffKind, ExecutionModelKind, LockStrategyKind,
    TrialConfig,
};

const BENCH_CAPACITY: usize = 4;
const BENCH_LOAD_FACTOR: usize = 16;

fn bench_burst(c: &mut Criterion, backoff: BackoffKind) {
    let mut group = c.benchmark_group(format!("burst_{}", backoff));
    group.measurement_time(Duration::from_secs(5));

    for model in ExecutionModelKind::ALL {
        for lock in LockStrategyKind::ALL {
            let config = TrialConfig::new(model, lock, backoff)
                .with_worker_capacity(BENCH_CAPACITY)
                .with_load_factor(BENCH_LOAD_FACTOR);
            let trial = match setup_trial(config) {
                Ok(trial) => trial,
                Err(e) => {
                    eprintln!("skipping {}/{}: {}", model, lock, e);
                    continue;
                }
            };

            group.bench_with_input(
                BenchmarkId::new(model.as_str(), lock.as_str()),
                &trial,
                |b, trial| {
                    b.iter(|| run_trial(trial).unwrap());
                },
            );

            teardown_trial(trial);
        }
    }

    group.finish();
}

fn bench_no_backoff(c: &mut Criterion) {
    bench_burst(c, BackoffKind::None);
}

fn bench_sleep_brief(c: &mut Criterion) {
    bench_burst(c, BackoffKind::SleepBrief);
}

fn bench_park_brief(c: &mut Criterion) {
    bench_burst(c, BackoffKind::ParkBrief);
}

criterion_group!(benches, bench_no_backoff, bench_sleep_brief, bench_park_brief);
criterion_main!(benches);
