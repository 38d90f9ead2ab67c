//! Benchmarks the scheduler's cycle-break + topological-sort pipeline
//! (spec.md §4.G) over a linear dependency chain of increasing length.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use depsolve_bench::scenarios::universe_with_chain;
use depsolve_scheduler::{Job, JobGraph};
use depsolve_test_utils::store::MemoryStore;
use std::sync::Arc;

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("JobGraph::schedule");
    for n in [10usize, 100, 500] {
        let store = Arc::new(MemoryStore::new());
        let (universe, ids) = universe_with_chain(store, n);
        let jobs: Vec<Job> = ids.iter().map(|&id| Job::install(id)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter_batched(
                || JobGraph::new(jobs.clone()),
                |mut graph| {
                    black_box(graph.schedule(&universe).unwrap());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_schedule);
criterion_main!(benches);
