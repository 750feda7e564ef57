use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kvstores::{ArrayStore, HashStore, KvsEngine, RbTreeStore};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const SIZES: [usize; 3] = [64, 512, 4096];

fn build(name: &str, capacity: usize) -> Box<dyn KvsEngine> {
    match name {
        "array" => Box::new(ArrayStore::new(capacity)),
        "hash" => Box::new(HashStore::with_capacity(capacity)),
        _ => Box::new(RbTreeStore::new(capacity)),
    }
}

fn shuffled_keys(n: usize) -> Vec<String> {
    let mut keys: Vec<String> = (0..n).map(|i| format!("key{:06}", i)).collect();
    keys.shuffle(&mut SmallRng::seed_from_u64(1));
    keys
}

fn fill_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");
    for name in ["array", "hash", "rbtree"] {
        for size in SIZES {
            let keys = shuffled_keys(size);
            group.bench_with_input(BenchmarkId::new(name, size), &keys, |b, keys| {
                b.iter(|| {
                    let mut store = build(name, keys.len());
                    for key in keys {
                        store.insert(key.clone(), "value".to_owned()).unwrap();
                    }
                    black_box(store.len())
                })
            });
        }
    }
    group.finish();
}

fn get_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for name in ["array", "hash", "rbtree"] {
        for size in SIZES {
            let keys = shuffled_keys(size);
            let mut store = build(name, size);
            for key in &keys {
                store.insert(key.clone(), "value".to_owned()).unwrap();
            }
            group.bench_with_input(BenchmarkId::new(name, size), &keys, |b, keys| {
                b.iter(|| {
                    for key in keys {
                        black_box(store.get(key));
                    }
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, fill_bench, get_bench);
criterion_main!(benches);
