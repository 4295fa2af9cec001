use crate::error::{FitError, Result};
use crate::linear_model::Parameters;
use crate::optim::oracle::Gradient;
use crate::tensor::functional;
use crate::tensor::Real;

/// Plain gradient descent with a fixed step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd<T: Real> {
    learning_rate: T,
}

impl<T: Real> Sgd<T> {
    pub fn new(learning_rate: T) -> Result<Sgd<T>> {
        if !(learning_rate > T::zero() && learning_rate.is_finite()) {
            return Err(FitError::InvalidParameter(format!(
                "learning rate must be positive and finite, got {learning_rate}"
            )));
        }
        Ok(Sgd { learning_rate })
    }

    /// Returns `θ - learning_rate · scale · ∇`. The input parameters are left
    /// untouched.
    pub fn step(&self, params: &Parameters<T>, gradient: &Gradient<T>, scale: T) -> Result<Parameters<T>> {
        if gradient.weights.rank() != 1 || gradient.weights.count() != params.n_features() {
            return Err(FitError::ShapeMismatch {
                what: "gradient",
                expected: params.n_features(),
                got: gradient.weights.count(),
            });
        }
        let step_size = self.learning_rate * scale;
        let weights = functional::sub(&params.weights, &gradient.weights.scale(step_size))?;
        Ok(Parameters {
            weights,
            bias: params.bias - step_size * gradient.bias,
        })
    }
}

#[test]
fn test_sgd_step() {
    use crate::tensor::Tensor;

    let sgd = Sgd::new(0.5).unwrap();
    let params = Parameters::new(Tensor::vector(vec![1.0, 2.0]), 3.0).unwrap();
    let gradient = Gradient {
        weights: Tensor::vector(vec![2.0, -4.0]),
        bias: 1.0,
    };
    let next = sgd.step(&params, &gradient, 1.0).unwrap();
    assert_eq!(next.weights, Tensor::vector(vec![0.0, 4.0]));
    assert_eq!(next.bias, 2.5);

    let halved = sgd.step(&params, &gradient, 0.5).unwrap();
    assert_eq!(halved.weights, Tensor::vector(vec![0.5, 3.0]));
    assert_eq!(halved.bias, 2.75);
}

#[test]
fn test_sgd_rejects_bad_gradient() {
    use crate::tensor::Tensor;

    let sgd = Sgd::new(0.1).unwrap();
    let params = Parameters::<f64>::zeros(2);
    let gradient = Gradient {
        weights: Tensor::vector(vec![1.0, 1.0, 1.0]),
        bias: 0.0,
    };
    assert_eq!(
        sgd.step(&params, &gradient, 1.0).unwrap_err(),
        FitError::ShapeMismatch {
            what: "gradient",
            expected: 2,
            got: 3
        }
    );
}

#[test]
fn test_sgd_rejects_bad_learning_rate() {
    assert!(Sgd::new(0.0).is_err());
    assert!(Sgd::new(-1.0).is_err());
    assert!(Sgd::new(f64::NAN).is_err());
}
