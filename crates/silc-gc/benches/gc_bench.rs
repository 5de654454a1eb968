//! GC Performance Benchmarks
//!
//! Measures collection pause times and allocation throughput.
//!
//! Run with: `cargo bench -p silc-gc`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use silc_gc::{GcConfig, Heap, NoRoots, Value};
use std::hint::black_box;

fn heap() -> Heap {
    Heap::with_config(GcConfig::default())
}

/// Build a list of `n` cells, keeping every other one reachable from `roots`
fn populate(heap: &mut Heap, n: usize) -> Vec<Value> {
    let mut roots = Vec::with_capacity(n / 2);
    for i in 0..n {
        let v = heap.alloc_cons(Value::int_unchecked(i as i32), Value::NIL, &roots);
        if i % 2 == 0 {
            roots.push(v);
        }
    }
    roots
}

/// Benchmark GC pause time for various heap populations
fn gc_pause_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_pause");

    for num_objects in [100, 1000, 10000, 50000].iter() {
        group.bench_with_input(
            BenchmarkId::new("objects", num_objects),
            num_objects,
            |b, &n| {
                b.iter_custom(|iters| {
                    let mut total_duration = std::time::Duration::ZERO;

                    for _ in 0..iters {
                        let mut heap = heap();
                        let roots = populate(&mut heap, n);

                        let start = std::time::Instant::now();
                        heap.collect(&roots);
                        total_duration += start.elapsed();

                        black_box(heap.stats());
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Benchmark allocation throughput with collections triggered by a full heap
fn allocation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");

    group.bench_function("cons_churn", |b| {
        let mut heap = Heap::with_config(GcConfig {
            capacity_words: 64 * 1024,
        });
        b.iter(|| {
            let v = heap.alloc_cons(Value::TRUE, Value::NIL, &NoRoots);
            black_box(v);
        });
    });

    group.bench_function("bytes_64", |b| {
        let mut heap = heap();
        let payload = [0x5a_u8; 64];
        b.iter(|| {
            let v = heap.alloc_bytes(1000, &payload, &NoRoots);
            black_box(v);
        });
    });

    group.finish();
}

criterion_group!(benches, gc_pause_benchmark, allocation_benchmark);
criterion_main!(benches);
