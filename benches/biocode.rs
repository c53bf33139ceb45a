use std::hint::black_box;

use biobench::biocode::{DEFAULT_LENGTH, generate};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::prelude::*;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Biocode");
    let mut rng = rand::rng();

    // FVC2004 的图片约为 288 × 384，这里取几个数量级
    for size in [64 * 64, 128 * 128, 288 * 384] {
        let mut features = vec![0u8; size];
        rng.fill_bytes(&mut features);

        group.throughput(Throughput::Elements((size * DEFAULT_LENGTH) as u64));
        group.bench_with_input(BenchmarkId::new("generate", size), &features, |b, features| {
            b.iter(|| generate(black_box(features), black_box(123), DEFAULT_LENGTH));
        });
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Biocode serialize");
    let mut rng = rand::rng();
    let mut features = vec![0u8; 64 * 64];
    rng.fill_bytes(&mut features);
    let code = generate(&features, 123, DEFAULT_LENGTH);

    group.bench_function("digit_string", |b| b.iter(|| black_box(&code).to_digit_string()));
    group.bench_function("le_i64_bytes", |b| b.iter(|| black_box(&code).to_le_i64_bytes()));
    group.finish();
}

criterion_group!(benches, bench_generate, bench_serialize);
criterion_main!(benches);
