//! # Trie Query Benchmark
//!
//! Masked queries over the radix trie against a linear scan of the same
//! `(mask, id)` pairs.
//!
//! Run with: `cargo bench --package kestrel_core --bench trie_benchmark`

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_core::{MaskQuery, RadixTrie};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Component masks drawn from the low 12 bits, like a world with a dozen
/// component types.
fn random_entities(count: usize) -> Vec<(u64, u32)> {
    let mut rng = StdRng::seed_from_u64(0x6b65_7374);
    (0..count as u32)
        .map(|id| (rng.gen_range(0..1u64 << 12), id))
        .collect()
}

fn bench_query_vs_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_all_query");
    let query = MaskQuery::new().with_all(0b1011).without(0b1_0000_0000);

    for count in [1_000, 100_000] {
        let entities = random_entities(count);
        let mut trie = RadixTrie::new();
        for &(mask, id) in &entities {
            trie.add(mask, id);
        }

        group.bench_with_input(BenchmarkId::new("trie", count), &trie, |b, trie| {
            b.iter(|| {
                let mut hits = 0usize;
                trie.for_each_match(black_box(&query), |_, _| hits += 1);
                hits
            });
        });

        group.bench_with_input(BenchmarkId::new("scan", count), &entities, |b, entities| {
            b.iter(|| {
                entities
                    .iter()
                    .filter(|(mask, _)| black_box(&query).matches(*mask))
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_exact_lookup(c: &mut Criterion) {
    let entities = random_entities(100_000);
    let mut trie = RadixTrie::new();
    for &(mask, id) in &entities {
        trie.add(mask, id);
    }

    c.bench_function("exact_get_100k", |b| {
        b.iter(|| {
            (0..1u64 << 12)
                .filter_map(|mask| trie.get(black_box(mask)))
                .map(<[u32]>::len)
                .sum::<usize>()
        });
    });
}

fn bench_insert(c: &mut Criterion) {
    let entities = random_entities(100_000);

    c.bench_function("insert_100k", |b| {
        b.iter(|| {
            let mut trie = RadixTrie::new();
            for &(mask, id) in &entities {
                trie.add(mask, id);
            }
            black_box(trie.node_count())
        });
    });
}

criterion_group!(benches, bench_query_vs_scan, bench_exact_lookup, bench_insert);
criterion_main!(benches);
