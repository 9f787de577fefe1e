use agri_knowledge::IndexStore;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const DIMENSION: usize = 384;

/// Cheap deterministic pseudo-random vectors
fn vector(seed: usize) -> Vec<f32> {
    let mut state = (seed as u64).wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..DIMENSION)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for size in [1_000, 5_000] {
        let vectors = (0..size).map(vector).collect();
        let chunks = (0..size).map(|i| format!("chunk {}", i)).collect();
        let store = IndexStore::build(vectors, chunks).expect("bench store builds");
        let query = vector(size + 1);

        group.bench_with_input(BenchmarkId::new("top3", size), &store, |b, store| {
            b.iter(|| store.search(black_box(&query), black_box(3)))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
