//! Dense linear algebra on top of [`Tensor`]: the Gram product and the
//! eigendecomposition of real symmetric matrices.

use log::trace;
use nalgebra::DMatrix;

use super::numeric::*;
use super::{Tensor, TensorError};

/// Iteration cap handed to the implicit QR sweeps of the eigensolver.
pub const MAX_EIGEN_ITERATIONS: usize = 1_000;

/// `xᵀx` of a `[rows, cols]` matrix.
pub fn gram<T>(x: &Tensor<T>) -> Result<Tensor<T>, TensorError>
where
    T: Numeric + Send + Sync,
{
    x.transpose()?.matmul(x)
}

/// Eigenvalues in ascending order, with the matching unit eigenvectors stored
/// as the columns of `vectors`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricEigen<T: Real> {
    pub values: Vec<T>,
    pub vectors: Tensor<T>,
}

impl<T: Real> SymmetricEigen<T> {
    /// `V · diag(f(λ)) · Vᵀ`.
    pub fn reconstruct_with<F>(&self, f: F) -> Tensor<T>
    where
        F: Fn(T) -> T,
    {
        let n = self.values.len();
        let scaled: Vec<T> = self.values.iter().map(|&value| f(value)).collect();
        let v = &self.vectors.array;
        let mut array = vec![T::zero(); n * n];
        for i in 0..n {
            for j in i..n {
                let mut acc = T::zero();
                for (k, &s) in scaled.iter().enumerate() {
                    acc += v[i * n + k] * s * v[j * n + k];
                }
                array[i * n + j] = acc;
                array[j * n + i] = acc;
            }
        }
        Tensor {
            array,
            shape: vec![n, n],
        }
    }
}

/// Eigendecomposition of a real symmetric matrix, computed in `f64` by
/// `nalgebra`. Only the lower triangle of `matrix` is read.
///
/// ```
/// # use gradfit::tensor::*;
/// let matrix: Tensor<f64> = Tensor::from([[2.0, 1.0], [1.0, 2.0]]);
/// let eigen = linalg::symmetric_eigen(&matrix).unwrap();
///
/// assert!((eigen.values[0] - 1.0).abs() < 1e-12);
/// assert!((eigen.values[1] - 3.0).abs() < 1e-12);
/// ```
pub fn symmetric_eigen<T: Real>(matrix: &Tensor<T>) -> Result<SymmetricEigen<T>, TensorError> {
    let (n, cols) = matrix.matrix_dims()?;
    if n != cols {
        return Err(TensorError::ShapeMismatch {
            op: "symmetric_eigen",
            left: matrix.shape.clone(),
            right: vec![cols, n],
        });
    }
    if !matrix.is_finite() {
        return Err(TensorError::NotFinite { op: "symmetric_eigen" });
    }

    let entries: Vec<f64> = matrix.array.iter().map(|value| value.as_f64()).collect();
    let decomposition = nalgebra::SymmetricEigen::try_new(
        DMatrix::from_row_slice(n, n, &entries),
        f64::EPSILON,
        MAX_EIGEN_ITERATIONS,
    )
    .ok_or(TensorError::NoConvergence {
        op: "symmetric_eigen",
        iterations: MAX_EIGEN_ITERATIONS,
    })?;
    trace!("eigenvalues of a {n}x{n} matrix: {}", decomposition.eigenvalues);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| decomposition.eigenvalues[i].total_cmp(&decomposition.eigenvalues[j]));
    let values = order.iter().map(|&i| T::of(decomposition.eigenvalues[i])).collect();
    let mut vectors = Vec::with_capacity(n * n);
    for row in 0..n {
        for &col in order.iter() {
            vectors.push(T::of(decomposition.eigenvectors[(row, col)]));
        }
    }
    Ok(SymmetricEigen {
        values,
        vectors: Tensor {
            array: vectors,
            shape: vec![n, n],
        },
    })
}

#[test]
fn test_gram() {
    let x: Tensor<f64> = Tensor::from([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    assert_eq!(gram(&x).unwrap(), Tensor::from([[35.0, 44.0], [44.0, 56.0]]));
}

#[test]
fn test_eigen_reconstructs_input() {
    let matrix: Tensor<f64> = Tensor::from([
        [4.0, 1.0, -2.0, 2.0],
        [1.0, 2.0, 0.0, 1.0],
        [-2.0, 0.0, 3.0, -2.0],
        [2.0, 1.0, -2.0, -1.0],
    ]);
    let eigen = symmetric_eigen(&matrix).unwrap();
    let rebuilt = eigen.reconstruct_with(|value| value);
    for (x, y) in rebuilt.as_slice().iter().zip(matrix.as_slice()) {
        assert!((x - y).abs() < 1e-10, "{rebuilt} != {matrix}");
    }
    assert!(eigen.values.windows(2).all(|pair| pair[0] <= pair[1]));
    // trace is preserved
    let trace: f64 = eigen.values.iter().sum();
    assert!((trace - 8.0).abs() < 1e-10);
}

#[test]
fn test_eigenvectors_are_orthonormal() {
    let matrix: Tensor<f64> = Tensor::from([[5.0, 2.0, 0.0], [2.0, 5.0, 0.0], [0.0, 0.0, 1.0]]);
    let eigen = symmetric_eigen(&matrix).unwrap();
    let identity = eigen.vectors.transpose().unwrap().matmul(&eigen.vectors).unwrap();
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((identity[&vec![i, j]] - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn test_eigen_rejects_non_square() {
    let matrix = Tensor::new(vec![1.0f64; 6], vec![2, 3]);
    assert!(symmetric_eigen(&matrix).is_err());
}

#[test]
fn test_eigen_rejects_non_finite() {
    let matrix: Tensor<f64> = Tensor::from([[1.0, f64::NAN], [f64::NAN, 1.0]]);
    assert_eq!(
        symmetric_eigen(&matrix),
        Err(TensorError::NotFinite { op: "symmetric_eigen" })
    );
}

#[test]
fn test_eigen_of_widely_scaled_diagonal() {
    let matrix: Tensor<f64> = Tensor::from([[2.5e10, 0.0], [0.0, 4.0]]);
    let eigen = symmetric_eigen(&matrix).unwrap();
    assert!((eigen.values[0] - 4.0).abs() < 1e-4);
    assert!((eigen.values[1] / 2.5e10 - 1.0).abs() < 1e-12);
}
