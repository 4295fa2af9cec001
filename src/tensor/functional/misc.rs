use rayon::prelude::*;

use crate::tensor::numeric::*;

/// Products with at least this many multiply-adds split their output rows
/// across the rayon pool.
pub const PARALLEL_MATMUL_THRESHOLD: usize = 1 << 16;

pub(crate) fn dot<T: Numeric>(left: &[T], right: &[T]) -> T {
    //! generalised dot product: returns to acculumulated sum of the elementwise product.
    let mut result = T::zero();
    for (&x, &y) in left.iter().zip(right.iter()) {
        result += x * y;
    }
    result
}

/// `out += left_row · right` where `right` is a row-major `[k, n]` block.
#[inline]
fn accumulate_row<T: Numeric>(left_row: &[T], right: &[T], n: usize, out: &mut [T]) {
    for (p, &a) in left_row.iter().enumerate() {
        let right_row = &right[p * n..(p + 1) * n];
        for (o, &b) in out.iter_mut().zip(right_row.iter()) {
            *o += a * b;
        }
    }
}

/// Naive `[m, k] x [k, n]` product over flat row-major buffers.
pub(crate) fn matmul_serial<T: Numeric>(left: &[T], right: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    if k == 0 || n == 0 {
        return out;
    }
    out.chunks_mut(n)
        .zip(left.chunks(k))
        .for_each(|(out_row, left_row)| accumulate_row(left_row, right, n, out_row));
    out
}

/// Same as [`matmul_serial`], one rayon task per output row.
pub(crate) fn matmul_parallel<T>(left: &[T], right: &[T], m: usize, k: usize, n: usize) -> Vec<T>
where
    T: Numeric + Send + Sync,
{
    let mut out = vec![T::zero(); m * n];
    if k == 0 || n == 0 {
        return out;
    }
    out.par_chunks_mut(n)
        .zip(left.par_chunks(k))
        .for_each(|(out_row, left_row)| accumulate_row(left_row, right, n, out_row));
    out
}

#[test]
fn test_dot() {
    assert_eq!(dot(&[0, 1, 2], &[0, 1, 2]), 5);
}

#[test]
fn test_matmul_2x2() {
    let matrix = [0, 1, 2, 3];
    assert_eq!(matmul_serial(&matrix, &[1, 1], 2, 2, 1), vec![1, 5]);
    assert_eq!(matmul_serial(&matrix, &[0, 1], 2, 2, 1), vec![1, 3]);
    assert_eq!(matmul_parallel(&matrix, &[1, 0], 2, 2, 1), vec![0, 2]);
}

#[test]
fn test_matmul_empty_inner_dimension() {
    assert_eq!(matmul_serial::<f64>(&[], &[], 2, 0, 3), vec![0.0; 6]);
}
