//! Point-lookup comparison: k-ary descent vs dynamic map vs plain binary
//! search over the same snapshot.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use karix_common::IndexConfig;
use karix_index::{DynamicBTreeIndex, OrderedIndex, StaticKaryIndex};
use karix_store::TupleStore;

const TUPLES: u64 = 1 << 17;

/// Cheap deterministic key sequence for the hot loop.
fn next_key(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state % TUPLES
}

fn lookup_benchmark(c: &mut Criterion) {
    let store = Arc::new(TupleStore::new());
    let dynamic = DynamicBTreeIndex::new(store.clone());
    for key in 0..TUPLES {
        let offset = store.insert(key, key + 1);
        dynamic.insert(key, offset).unwrap();
    }

    let kary = StaticKaryIndex::new(
        store.clone(),
        IndexConfig {
            fanout: 8,
            num_layers: 4,
        },
    )
    .unwrap();
    kary.reorganize().unwrap();

    let snapshot = store.project_sorted();

    let mut group = c.benchmark_group("point_lookup");

    let mut values = Vec::new();
    let mut state = 1u64;
    group.bench_function("kary_static", |b| {
        b.iter(|| {
            let key = next_key(&mut state);
            values.clear();
            kary.find(black_box(key), &mut values);
            values.len()
        })
    });

    let mut values = Vec::new();
    let mut state = 1u64;
    group.bench_function("dynamic_btree", |b| {
        b.iter(|| {
            let key = next_key(&mut state);
            values.clear();
            dynamic.find(black_box(key), &mut values);
            values.len()
        })
    });

    let mut state = 1u64;
    group.bench_function("binary_search", |b| {
        b.iter(|| {
            let key = next_key(&mut state);
            snapshot
                .binary_search_by_key(&black_box(key), |entry| entry.key)
                .ok()
        })
    });

    group.finish();
}

criterion_group!(benches, lookup_benchmark);
criterion_main!(benches);
