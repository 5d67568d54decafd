//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rotation_core::traits::Indicator;
use rotation_indicators::Sma;

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn benchmark_sma(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMA");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        for period in [9, 14, 19] {
            group.bench_with_input(
                BenchmarkId::new(format!("period_{}", period), size),
                &data,
                |b, data| {
                    let sma = Sma::new(period);
                    b.iter(|| sma.calculate(black_box(data)))
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_sma);
criterion_main!(benches);
