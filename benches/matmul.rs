//! Square matrix products: serial and rayon-parallel `Tensor::matmul`
//! against `ndarray`'s `dot`.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gradfit::tensor::Tensor;
use ndarray::Array2;

fn filled(n: usize) -> Vec<f64> {
    (0..n * n).map(|i| (i as f64 * 0.01).sin()).collect()
}

fn bench_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");

    for n in [16, 64, 128, 256] {
        let a = Tensor::new(filled(n), vec![n, n]);
        let b = Tensor::new(filled(n), vec![n, n]);
        group.bench_with_input(BenchmarkId::new("serial", n), &n, |bench, _| {
            bench.iter(|| black_box(&a).matmul_serial(black_box(&b)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &n, |bench, _| {
            bench.iter(|| black_box(&a).matmul(black_box(&b)))
        });

        let x = Array2::from_shape_vec((n, n), filled(n)).expect("square shape");
        let y = Array2::from_shape_vec((n, n), filled(n)).expect("square shape");
        group.bench_with_input(BenchmarkId::new("ndarray", n), &n, |bench, _| {
            bench.iter(|| black_box(&x).dot(black_box(&y)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matmul);
criterion_main!(benches);
