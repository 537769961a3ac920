//! Results container benchmarks
//!
//! Every insert rewrites the whole document, so the cost grows with the
//! number of records already stored.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repro_store::container::ResultsContainer;
use repro_store::experiment::{ArtifactRecord, ExperimentRecord, RecordStore, RunRecord, RunStatus};

/// Create a record holding a `side x side` artifact
#[allow(clippy::cast_precision_loss)]
fn create_record(side: usize) -> ExperimentRecord {
    let mut run = RunRecord::new();
    run.start();
    run.complete(RunStatus::Success);

    let values = (0..side * side).map(|i| (i as f64).sqrt()).collect();
    ExperimentRecord::builder("bench", serde_json::json!({ "side": side }))
        .run(run)
        .output(ArtifactRecord::new("grid", vec![side, side], values).unwrap())
        .build()
        .unwrap()
}

/// Benchmark insert into a container that already holds `existing` records
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("container_insert");
    group.sample_size(20);

    for existing in [0, 10, 50].iter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.json");
        let mut container = ResultsContainer::create(&path).unwrap();
        for _ in 0..*existing {
            container.insert(create_record(64)).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(existing), existing, |b, _| {
            b.iter_batched(
                || create_record(64),
                |record| black_box(container.insert(record).unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark loading a record by id
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("container_get");

    for side in [16, 64, 256].iter() {
        let dir = tempfile::tempdir().unwrap();
        let mut container = ResultsContainer::create(dir.path().join("bench.json")).unwrap();
        let id = container.insert(create_record(*side)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(side), side, |b, _| {
            b.iter(|| black_box(container.get(id).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark checksum verification of a stored artifact
fn bench_verify_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_checksum");

    for side in [64, 256, 1024].iter() {
        let record = create_record(*side);
        let artifact = record.output("grid").unwrap().clone();

        group.bench_with_input(BenchmarkId::from_parameter(side), side, |b, _| {
            b.iter(|| black_box(artifact.verify_checksum()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_verify_checksum);
criterion_main!(benches);
