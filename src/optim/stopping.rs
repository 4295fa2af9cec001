//! When to stop iterating.
//!
//! The fit loops report the parameter displacement of every epoch to a
//! [`StoppingPolicy`], which decides whether the loop goes on. A policy must
//! eventually answer with a [`StopReason`]; [`StoppingRule`] combines a
//! displacement tolerance with a hard epoch cap.

use crate::error::{FitError, Result};
use crate::linear_model::Parameters;
use crate::tensor::Real;

/// How far the parameters moved: the Euclidean norm of the weight change and
/// the absolute bias change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement<T> {
    pub weights: T,
    pub bias: T,
}

impl<T: Real> Displacement<T> {
    pub fn between(before: &Parameters<T>, after: &Parameters<T>) -> Result<Displacement<T>> {
        let delta = crate::tensor::functional::sub(&after.weights, &before.weights)?;
        Ok(Displacement {
            weights: delta.norm(),
            bias: (after.bias - before.bias).abs(),
        })
    }

    /// Both components strictly below `tolerance`.
    pub fn within(&self, tolerance: T) -> bool {
        self.weights < tolerance && self.bias < tolerance
    }

    /// Component-wise mean; zero for an empty slice.
    pub fn mean(displacements: &[Displacement<T>]) -> Displacement<T> {
        if displacements.is_empty() {
            return Displacement {
                weights: T::zero(),
                bias: T::zero(),
            };
        }
        let count = T::of_usize(displacements.len());
        Displacement {
            weights: displacements.iter().map(|d| d.weights).sum::<T>() / count,
            bias: displacements.iter().map(|d| d.bias).sum::<T>() / count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The displacement fell below the tolerance.
    Converged,
    /// The epoch cap was reached first.
    MaxEpochs,
}

pub trait StoppingPolicy<T: Real> {
    /// Called after every epoch with the number of epochs completed so far.
    fn check(&mut self, epochs: usize, displacement: &Displacement<T>) -> Option<StopReason>;
}

/// Stop once the displacement is within `tolerance`, or after `max_epochs`
/// epochs, whichever comes first. Convergence wins a tie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoppingRule<T> {
    pub tolerance: T,
    pub max_epochs: usize,
}

impl<T: Real> StoppingRule<T> {
    pub fn new(tolerance: T, max_epochs: usize) -> Result<StoppingRule<T>> {
        if !(tolerance > T::zero() && tolerance.is_finite()) {
            return Err(FitError::InvalidParameter(format!(
                "tolerance must be positive and finite, got {tolerance}"
            )));
        }
        if max_epochs == 0 {
            return Err(FitError::InvalidParameter(
                "max_epochs must be at least 1".to_string(),
            ));
        }
        Ok(StoppingRule {
            tolerance,
            max_epochs,
        })
    }
}

impl<T: Real> StoppingPolicy<T> for StoppingRule<T> {
    fn check(&mut self, epochs: usize, displacement: &Displacement<T>) -> Option<StopReason> {
        if displacement.within(self.tolerance) {
            Some(StopReason::Converged)
        } else if epochs >= self.max_epochs {
            Some(StopReason::MaxEpochs)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn displacement(weights: f64, bias: f64) -> Displacement<f64> {
        Displacement { weights, bias }
    }

    #[test]
    fn displacement_between_parameters() {
        let before = Parameters::new(Tensor::vector(vec![0.0, 0.0]), 1.0).unwrap();
        let after = Parameters::new(Tensor::vector(vec![3.0, 4.0]), 0.5).unwrap();
        assert_eq!(
            Displacement::between(&before, &after).unwrap(),
            displacement(5.0, 0.5)
        );
    }

    #[test]
    fn rule_needs_both_components_within_tolerance() {
        let mut rule = StoppingRule::new(0.1, 100).unwrap();
        assert_eq!(rule.check(1, &displacement(0.05, 0.2)), None);
        assert_eq!(rule.check(1, &displacement(0.2, 0.05)), None);
        assert_eq!(
            rule.check(1, &displacement(0.05, 0.05)),
            Some(StopReason::Converged)
        );
    }

    #[test]
    fn rule_caps_epochs() {
        let mut rule = StoppingRule::new(1e-9, 3).unwrap();
        assert_eq!(rule.check(2, &displacement(1.0, 1.0)), None);
        assert_eq!(rule.check(3, &displacement(1.0, 1.0)), Some(StopReason::MaxEpochs));
        assert_eq!(rule.check(3, &displacement(0.0, 0.0)), Some(StopReason::Converged));
    }

    #[test]
    fn rule_rejects_bad_settings() {
        assert!(StoppingRule::new(0.0, 10).is_err());
        assert!(StoppingRule::new(f64::NAN, 10).is_err());
        assert!(StoppingRule::new(1e-3, 0).is_err());
    }

    #[test]
    fn mean_displacement() {
        let mean = Displacement::mean(&[displacement(1.0, 0.0), displacement(3.0, 2.0)]);
        assert_eq!(mean, displacement(2.0, 1.0));
    }
}
