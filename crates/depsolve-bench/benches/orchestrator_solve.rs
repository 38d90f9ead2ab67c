//! End-to-end benchmark of the Request → Universe → SAT → Scheduler
//! pipeline (spec.md §4.H) installing the tail of a linear dependency
//! chain, which pulls in every package ahead of it.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use depsolve_bench::scenarios::populate_remote_chain;
use depsolve_core::{Context, NullEventSink};
use depsolve_orchestrator::{OperationKind, Orchestrator};
use depsolve_request::Request;
use depsolve_test_utils::store::MemoryStore;
use depsolve_universe::{MatchKind, PackageStore, Universe};
use std::sync::Arc;

fn bench_install_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Orchestrator::solve install chain");
    let ctx = Context::default();
    let sink = NullEventSink;

    for n in [5usize, 20, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let store = Arc::new(MemoryStore::new());
                    let tail = populate_remote_chain(&store, n);
                    let store: Arc<dyn PackageStore> = store;
                    let universe = Universe::new(Arc::clone(&store));
                    let mut request = Request::new();
                    request.add_pattern(tail.as_str(), MatchKind::Exact);
                    (Orchestrator::new(store), request, universe)
                },
                |(orchestrator, mut request, mut universe)| {
                    black_box(orchestrator.solve(OperationKind::Install, &mut request, &mut universe, &ctx, &sink).unwrap());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_install_chain);
criterion_main!(benches);
