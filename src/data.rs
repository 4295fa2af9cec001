//! Training data for the estimator and a generator for synthetic linear
//! problems.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{FitError, Result};
use crate::tensor::{Numeric, Real, Tensor};

/// An immutable set of `N` samples: an `[N, D]` feature matrix and a length
/// `N` target vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T>
where
    T: Numeric,
{
    features: Tensor<T>,
    targets: Tensor<T>,
}

impl<T> Dataset<T>
where
    T: Numeric,
{
    pub fn new(features: Tensor<T>, targets: Tensor<T>) -> Result<Dataset<T>> {
        let (rows, cols) = features.matrix_dims()?;
        if targets.rank() != 1 {
            return Err(FitError::ShapeMismatch {
                what: "targets rank",
                expected: 1,
                got: targets.rank(),
            });
        }
        if rows == 0 {
            return Err(FitError::EmptyDataset);
        }
        if cols == 0 {
            return Err(FitError::InvalidParameter(
                "dataset needs at least one feature column".to_string(),
            ));
        }
        if targets.count() != rows {
            return Err(FitError::ShapeMismatch {
                what: "targets",
                expected: rows,
                got: targets.count(),
            });
        }
        Ok(Dataset { features, targets })
    }

    pub fn features(&self) -> &Tensor<T> {
        &self.features
    }

    pub fn targets(&self) -> &Tensor<T> {
        &self.targets
    }

    pub fn n_samples(&self) -> usize {
        self.targets.count()
    }

    pub fn n_features(&self) -> usize {
        self.features.shape()[1]
    }

    /// The samples at `indices`, in that order. Indices may repeat.
    pub fn batch(&self, indices: &[usize]) -> Result<Dataset<T>> {
        if indices.is_empty() {
            return Err(FitError::EmptyDataset);
        }
        Ok(Dataset {
            features: self.features.select_rows(indices)?,
            targets: self.targets.select_rows(indices)?,
        })
    }

    /// The feature matrix with a leading column of ones for the intercept.
    pub fn design_matrix(&self) -> Result<Tensor<T>> {
        Ok(self.features.prepend_column(T::one())?)
    }
}

/// Draws `n_samples` rows with every feature from `N(0, 1)` and targets
/// `y = Σ coefficients_j x_j + intercept + N(0, noise_std²)`.
///
/// ```
/// # use gradfit::data::synthetic_linear;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let data = synthetic_linear(&mut rng, &[-11.0f64, 12.0], 3.0, 0.0, 100).unwrap();
///
/// assert_eq!(data.n_samples(), 100);
/// assert_eq!(data.n_features(), 2);
/// ```
pub fn synthetic_linear<T, R>(
    rng: &mut R,
    coefficients: &[T],
    intercept: T,
    noise_std: T,
    n_samples: usize,
) -> Result<Dataset<T>>
where
    T: Real,
    R: Rng + ?Sized,
{
    let standard = Normal::new(0.0, 1.0)
        .map_err(|e| FitError::InvalidParameter(format!("standard normal: {e}")))?;
    let noise = Normal::new(0.0, noise_std.as_f64())
        .map_err(|e| FitError::InvalidParameter(format!("noise_std={noise_std}: {e}")))?;

    let n_features = coefficients.len();
    let mut features = Vec::with_capacity(n_samples * n_features);
    let mut targets = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let mut y = intercept;
        for &coefficient in coefficients {
            let x = T::of(standard.sample(rng));
            features.push(x);
            y += coefficient * x;
        }
        targets.push(y + T::of(noise.sample(rng)));
    }
    Dataset::new(
        Tensor::try_new(features, vec![n_samples, n_features])?,
        Tensor::vector(targets),
    )
}

#[test]
fn test_dataset_rejects_mismatched_targets() {
    let features = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let err = Dataset::new(features, Tensor::vector(vec![1.0, 2.0, 3.0])).unwrap_err();
    assert_eq!(
        err,
        FitError::ShapeMismatch {
            what: "targets",
            expected: 2,
            got: 3
        }
    );
}

#[test]
fn test_dataset_rejects_empty() {
    let features: Tensor<f64> = Tensor::new(vec![], vec![0, 2]);
    assert_eq!(
        Dataset::new(features, Tensor::vector(vec![])).unwrap_err(),
        FitError::EmptyDataset
    );
}

#[test]
fn test_batch_and_design_matrix() {
    let features = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]);
    let data = Dataset::new(features, Tensor::vector(vec![10.0, 20.0, 30.0])).unwrap();

    let batch = data.batch(&[2, 2, 0]).unwrap();
    assert_eq!(batch.targets(), &Tensor::vector(vec![30.0, 30.0, 10.0]));
    assert_eq!(batch.n_features(), 2);
    assert!(data.batch(&[]).is_err());

    let design = data.design_matrix().unwrap();
    assert_eq!(design.shape(), &vec![3, 3]);
    assert_eq!(design.row(1).unwrap(), &[1.0, 3.0, 4.0]);
}

#[test]
fn test_synthetic_is_exact_without_noise() {
    use rand::SeedableRng;

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let data = synthetic_linear(&mut rng, &[2.0f64, -1.0], 0.5, 0.0, 20).unwrap();
    for i in 0..data.n_samples() {
        let row = data.features().row(i).unwrap();
        let expected = 2.0 * row[0] - row[1] + 0.5;
        assert!((data.targets().as_slice()[i] - expected).abs() < 1e-12);
    }
}
