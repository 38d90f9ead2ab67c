//! Benchmarks for the version comparator (spec.md §4.A).

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use depsolve_core::PkgVersion;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("PkgVersion::parse");
    for raw in ["1.0", "2:1.2.3_4,5", "1.0~rc1.2.3"] {
        group.bench_with_input(BenchmarkId::from_parameter(raw), &raw, |b, raw| {
            b.iter(|| PkgVersion::parse(black_box(raw)).unwrap());
        });
    }
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let a = PkgVersion::parse("1:2.3.4_5,6").unwrap();
    let b = PkgVersion::parse("1:2.3.4_5,7").unwrap();
    c.bench_function("PkgVersion::compare", |bencher| {
        bencher.iter(|| black_box(&a).compare(black_box(&b)));
    });
}

criterion_group!(benches, bench_parse, bench_compare);
criterion_main!(benches);
