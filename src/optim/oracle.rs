//! Gradient oracles: anything that can tell the estimator the gradient of the
//! loss with respect to the weights and the bias.
//!
//! The estimator never looks at how a gradient was obtained. Closures with the
//! right signature are oracles too:
//!
//! ```
//! # use gradfit::optim::{Gradient, GradientOracle};
//! # use gradfit::linear_model::Parameters;
//! # use gradfit::data::Dataset;
//! # use gradfit::tensor::Tensor;
//! # use gradfit::error::Result;
//! let zero = |params: &Parameters<f64>, _: &Dataset<f64>| -> Result<Gradient<f64>> {
//!     Ok(Gradient {
//!         weights: Tensor::zeros(vec![params.n_features()]),
//!         bias: 0.0,
//!     })
//! };
//! # let data = Dataset::new(Tensor::new(vec![1.0], vec![1, 1]), Tensor::vector(vec![1.0])).unwrap();
//! let gradient = zero.gradient(&Parameters::zeros(1), &data).unwrap();
//! assert_eq!(gradient.bias, 0.0);
//! ```

use crate::data::Dataset;
use crate::error::{FitError, Result};
use crate::linear_model::{mse_loss, Parameters};
use crate::tensor::Real;
use crate::tensor::Tensor;

/// Gradient of a scalar loss with respect to [`Parameters`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient<T>
where
    T: Real,
{
    pub weights: Tensor<T>,
    pub bias: T,
}

pub trait GradientOracle<T: Real> {
    fn gradient(&self, params: &Parameters<T>, batch: &Dataset<T>) -> Result<Gradient<T>>;
}

impl<T, F> GradientOracle<T> for F
where
    T: Real,
    F: Fn(&Parameters<T>, &Dataset<T>) -> Result<Gradient<T>>,
{
    fn gradient(&self, params: &Parameters<T>, batch: &Dataset<T>) -> Result<Gradient<T>> {
        self(params, batch)
    }
}

/// Closed form gradient of the mean squared error:
/// `∇w = 2/n · Xᵀr`, `∇b = 2/n · Σr` with `r = X·w + b - y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MseGradient;

impl<T: Real> GradientOracle<T> for MseGradient {
    fn gradient(&self, params: &Parameters<T>, batch: &Dataset<T>) -> Result<Gradient<T>> {
        let residuals = params.residuals(batch)?;
        let scale = T::of(2.0) / T::of_usize(batch.n_samples());
        let weights = batch.features().transpose()?.matmul(&residuals)?;
        Ok(Gradient {
            weights: weights.scale(scale),
            bias: residuals.sum() * scale,
        })
    }
}

pub type LossFn<T> = fn(&Parameters<T>, &Dataset<T>) -> Result<T>;

/// Central finite differences of an arbitrary loss, one pair of loss
/// evaluations per coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FiniteDifference<T, L> {
    loss: L,
    step: T,
}

impl<T, L> FiniteDifference<T, L>
where
    T: Real,
    L: Fn(&Parameters<T>, &Dataset<T>) -> Result<T>,
{
    pub fn new(loss: L, step: T) -> Result<FiniteDifference<T, L>> {
        if !(step > T::zero() && step.is_finite()) {
            return Err(FitError::InvalidParameter(format!(
                "finite difference step must be positive and finite, got {step}"
            )));
        }
        Ok(FiniteDifference { loss, step })
    }

    fn central(&self, minus: &Parameters<T>, plus: &Parameters<T>, batch: &Dataset<T>) -> Result<T> {
        let two_h = self.step + self.step;
        Ok(((self.loss)(plus, batch)? - (self.loss)(minus, batch)?) / two_h)
    }
}

impl<T: Real> FiniteDifference<T, LossFn<T>> {
    /// Finite differences of [`mse_loss`].
    pub fn mse(step: T) -> Result<FiniteDifference<T, LossFn<T>>> {
        FiniteDifference::new(mse_loss as LossFn<T>, step)
    }
}

impl<T, L> GradientOracle<T> for FiniteDifference<T, L>
where
    T: Real,
    L: Fn(&Parameters<T>, &Dataset<T>) -> Result<T>,
{
    fn gradient(&self, params: &Parameters<T>, batch: &Dataset<T>) -> Result<Gradient<T>> {
        params.check_compatible(batch)?;
        let mut weights = Vec::with_capacity(params.n_features());
        for j in 0..params.n_features() {
            let value = params.weights.as_slice()[j];
            let mut minus = params.clone();
            let mut plus = params.clone();
            minus.weights.set(&[j], value - self.step)?;
            plus.weights.set(&[j], value + self.step)?;
            weights.push(self.central(&minus, &plus, batch)?);
        }
        let minus = Parameters {
            weights: params.weights.clone(),
            bias: params.bias - self.step,
        };
        let plus = Parameters {
            weights: params.weights.clone(),
            bias: params.bias + self.step,
        };
        Ok(Gradient {
            weights: Tensor::vector(weights),
            bias: self.central(&minus, &plus, batch)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_dataset() -> Dataset<f64> {
        let features = Tensor::new(vec![1.0, 0.5, -2.0, 1.5, 0.0, -1.0, 3.0, 2.0], vec![4, 2]);
        let targets = Tensor::vector(vec![1.0, -2.0, 0.5, 4.0]);
        Dataset::new(features, targets).unwrap()
    }

    #[test]
    fn mse_gradient_by_hand() {
        // one sample: r = w·x + b - y = 2 + 1 - 1 = 2
        let data = Dataset::new(Tensor::new(vec![1.0], vec![1, 1]), Tensor::vector(vec![1.0])).unwrap();
        let params = Parameters::new(Tensor::vector(vec![2.0]), 1.0).unwrap();
        let gradient = MseGradient.gradient(&params, &data).unwrap();
        assert_eq!(gradient.weights, Tensor::vector(vec![4.0]));
        assert_eq!(gradient.bias, 4.0);
    }

    #[test]
    fn finite_difference_agrees_with_closed_form() {
        let data = small_dataset();
        let params = Parameters::new(Tensor::vector(vec![0.3, -0.7]), 0.2).unwrap();
        let analytic = MseGradient.gradient(&params, &data).unwrap();
        let numeric = FiniteDifference::mse(1e-5_f64)
            .unwrap()
            .gradient(&params, &data)
            .unwrap();
        for (a, n) in analytic.weights.as_slice().iter().zip(numeric.weights.as_slice()) {
            assert_abs_diff_eq!(a, n, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(analytic.bias, numeric.bias, epsilon = 1e-6);
    }

    #[test]
    fn finite_difference_of_custom_loss() {
        // loss = b^2 + Σ w_j^2 has gradient (2w, 2b)
        let squared_norm =
            |p: &Parameters<f64>, _: &Dataset<f64>| -> Result<f64> { Ok(p.bias * p.bias + p.weights.sum_of_squares()) };
        let oracle = FiniteDifference::new(squared_norm, 1e-4).unwrap();
        let params = Parameters::new(Tensor::vector(vec![1.0, -2.0]), 0.5).unwrap();
        let gradient = oracle.gradient(&params, &small_dataset()).unwrap();
        assert_abs_diff_eq!(gradient.weights.as_slice()[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(gradient.weights.as_slice()[1], -4.0, epsilon = 1e-8);
        assert_abs_diff_eq!(gradient.bias, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn finite_difference_rejects_bad_step() {
        assert!(FiniteDifference::mse(0.0f64).is_err());
        assert!(FiniteDifference::mse(f64::INFINITY).is_err());
    }

    #[test]
    fn oracle_rejects_mismatched_parameters() {
        let params = Parameters::<f64>::zeros(3);
        assert!(matches!(
            MseGradient.gradient(&params, &small_dataset()),
            Err(FitError::ShapeMismatch { .. })
        ));
    }
}
