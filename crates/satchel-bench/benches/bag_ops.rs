//! Criterion micro-benchmarks for single-threaded bag operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use satchel::{Bag, BagConfig};
use satchel_bench::{churn_values, filled_bag, SMALL_BLOCK, STRATEGIES};

/// Benchmark: insert 10K entries into a fresh bag, growth included.
fn bench_put_10k(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_10k");
    for (name, strategy) in STRATEGIES {
        group.bench_function(name, |b| {
            b.iter_batched(
                || Bag::<usize>::new(BagConfig::new(strategy).with_entries_per_block(SMALL_BLOCK)).unwrap(),
                |mut bag| {
                    for v in 1..=10_000 {
                        bag.put(v).unwrap();
                    }
                    bag
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: membership lookups, half hits and half misses, on 1K entries.
fn bench_contains_1k(c: &mut Criterion) {
    let bag = filled_bag(STRATEGIES[0].1, None, 1_000);
    let lookups = churn_values(2_000, 256, 1);
    c.bench_function("contains_1k", |b| {
        b.iter(|| {
            let hits = lookups.iter().filter(|&&v| bag.contains(v)).count();
            black_box(hits)
        });
    });
}

/// Benchmark: full iteration over 10K entries, small and page-sized blocks.
fn bench_iter_10k(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter_10k");
    for (name, blocks) in [("small_blocks", Some(SMALL_BLOCK)), ("page_blocks", None)] {
        let bag = filled_bag(STRATEGIES[0].1, blocks, 10_000);
        group.bench_function(name, |b| {
            b.iter(|| black_box(bag.iter().fold(0usize, usize::wrapping_add)));
        });
    }
    group.finish();
}

/// Benchmark: remove-then-reinsert churn on a bag holding 1K entries.
fn bench_churn_1k(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn_1k");
    for (name, strategy) in STRATEGIES {
        let mut bag = filled_bag(strategy, Some(SMALL_BLOCK), 1_000);
        let values = churn_values(1_000, 512, 2);
        group.bench_function(name, |b| {
            b.iter(|| {
                for &v in &values {
                    bag.remove(v).unwrap();
                    bag.put(v).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark: in-place replacement on a bag holding 1K entries.
fn bench_set_1k(c: &mut Criterion) {
    let mut bag = filled_bag(STRATEGIES[1].1, Some(SMALL_BLOCK), 1_000);
    let values = churn_values(1_000, 256, 3);
    c.bench_function("set_1k", |b| {
        b.iter(|| {
            for &v in &values {
                bag.set(v, v).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_put_10k,
    bench_contains_1k,
    bench_iter_10k,
    bench_churn_1k,
    bench_set_1k,
);
criterion_main!(benches);
