use crate::data::Dataset;
use crate::error::{FitError, Result};
use crate::tensor::{Real, Tensor};

/// Weights and bias of `y = X·w + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters<T>
where
    T: Real,
{
    pub weights: Tensor<T>,
    pub bias: T,
}

impl<T> Parameters<T>
where
    T: Real,
{
    pub fn new(weights: Tensor<T>, bias: T) -> Result<Parameters<T>> {
        if weights.rank() != 1 {
            return Err(FitError::ShapeMismatch {
                what: "weights rank",
                expected: 1,
                got: weights.rank(),
            });
        }
        Ok(Parameters { weights, bias })
    }

    /// All-zero parameters for `n_features` inputs.
    pub fn zeros(n_features: usize) -> Parameters<T> {
        Parameters {
            weights: Tensor::zeros(vec![n_features]),
            bias: T::zero(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.weights.count()
    }

    /// Fails fast when the parameters cannot be applied to `data`.
    pub fn check_compatible(&self, data: &Dataset<T>) -> Result<()> {
        if self.n_features() != data.n_features() {
            return Err(FitError::ShapeMismatch {
                what: "weights",
                expected: data.n_features(),
                got: self.n_features(),
            });
        }
        Ok(())
    }

    /// `[b, w_1, .., w_D]`, the coefficient order of the design matrix.
    pub fn coefficients(&self) -> Vec<T> {
        std::iter::once(self.bias)
            .chain(self.weights.as_slice().iter().copied())
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.bias.is_finite() && self.weights.is_finite()
    }

    pub fn predict(&self, features: &Tensor<T>) -> Result<Tensor<T>> {
        let xw = features.matmul(&self.weights)?;
        Ok(xw.map(|v| v + self.bias))
    }

    /// `X·w + b - y` over every sample.
    pub fn residuals(&self, data: &Dataset<T>) -> Result<Tensor<T>> {
        self.check_compatible(data)?;
        let prediction = self.predict(data.features())?;
        Ok(&prediction - data.targets())
    }
}

/// `mean((X·w + b - y)^2)`.
pub fn mse_loss<T: Real>(params: &Parameters<T>, data: &Dataset<T>) -> Result<T> {
    let residuals = params.residuals(data)?;
    Ok(residuals.sum_of_squares() / T::of_usize(residuals.count()))
}

#[test]
fn test_predict() {
    let params = Parameters::new(Tensor::vector(vec![1.0, -2.0]), 0.5).unwrap();
    // rows: 1 - 2 + 0.5 and 3 - 2 + 0.5
    let features = Tensor::new(vec![1.0, 1.0, 3.0, 1.0], vec![2, 2]);
    let res = params.predict(&features).unwrap();
    assert_eq!(res, Tensor::vector(vec![-0.5, 1.5]));
}

#[test]
fn test_mse_loss() {
    let features = Tensor::new(vec![1.0, 2.0, 3.0], vec![3, 1]);
    let data = Dataset::new(features, Tensor::vector(vec![2.0, 4.0, 6.0])).unwrap();
    let exact = Parameters::new(Tensor::vector(vec![2.0]), 0.0).unwrap();
    assert_eq!(mse_loss(&exact, &data).unwrap(), 0.0);

    let shifted = Parameters::new(Tensor::vector(vec![2.0]), 1.0).unwrap();
    assert_eq!(mse_loss(&shifted, &data).unwrap(), 1.0);
}

#[test]
fn test_incompatible_parameters() {
    let features = Tensor::new(vec![1.0, 2.0, 3.0], vec![3, 1]);
    let data = Dataset::new(features, Tensor::vector(vec![2.0, 4.0, 6.0])).unwrap();
    let params = Parameters::<f64>::zeros(2);
    assert_eq!(
        mse_loss(&params, &data).unwrap_err(),
        FitError::ShapeMismatch {
            what: "weights",
            expected: 1,
            got: 2
        }
    );
}

#[test]
fn test_coefficients_order() {
    let params = Parameters::new(Tensor::vector(vec![1.0, 2.0]), 3.0).unwrap();
    assert_eq!(params.coefficients(), vec![3.0, 1.0, 2.0]);
}
