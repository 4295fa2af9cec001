use std::cell::Cell;

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;

use gradfit::data::{synthetic_linear, Dataset};
use gradfit::error::{FitError, Result};
use gradfit::linear_model::{mse_loss, Parameters};
use gradfit::optim::*;
use gradfit::tensor::Tensor;

fn regression_data(seed: u64, noise_std: f64) -> Dataset<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    synthetic_linear(&mut rng, &[-11.0, 12.0], 3.0, noise_std, 1000).unwrap()
}

#[test]
fn full_batch_recovers_generating_coefficients() {
    let data = regression_data(42, 0.1);
    let mut stopping = StoppingRule::new(1e-6, 10_000).unwrap();
    let fit = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01),
        &mut stopping,
    )
    .unwrap();

    assert!(fit.converged());
    assert!(fit.epochs < 2_000, "took {} epochs", fit.epochs);
    let weights = fit.params.weights.as_slice();
    assert_abs_diff_eq!(weights[0], -11.0, epsilon = 0.5);
    assert_abs_diff_eq!(weights[1], 12.0, epsilon = 0.5);
    assert_abs_diff_eq!(fit.params.bias, 3.0, epsilon = 0.5);
}

#[test]
fn full_batch_is_close_after_three_hundred_epochs() {
    let data = regression_data(42, 0.1);
    let mut stopping = StoppingRule::new(1e-300, 300).unwrap();
    let fit = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01).without_history(),
        &mut stopping,
    )
    .unwrap();

    assert_eq!(fit.stop_reason, StopReason::MaxEpochs);
    assert_eq!(fit.epochs, 300);
    let weights = fit.params.weights.as_slice();
    assert_abs_diff_eq!(weights[0], -11.0, epsilon = 0.5);
    assert_abs_diff_eq!(weights[1], 12.0, epsilon = 0.5);
    assert_abs_diff_eq!(fit.params.bias, 3.0, epsilon = 0.5);
}

#[test]
fn full_batch_is_exact_without_noise() {
    let data = regression_data(7, 0.0);
    let mut stopping = StoppingRule::new(1e-10, 20_000).unwrap();
    let fit = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.1),
        &mut stopping,
    )
    .unwrap();

    assert!(fit.converged());
    assert_abs_diff_eq!(fit.params.weights.as_slice()[0], -11.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.params.weights.as_slice()[1], 12.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.params.bias, 3.0, epsilon = 1e-6);
    assert!(fit.final_loss < 1e-10);
}

#[rstest]
#[case(0.001, 0.0, 0.0)]
#[case(0.01, 0.0, 0.0)]
#[case(0.1, 0.0, 0.0)]
#[case(0.05, 50.0, -20.0)]
fn loss_never_ends_above_start(#[case] learning_rate: f64, #[case] w: f64, #[case] b: f64) {
    let data = regression_data(1, 0.5);
    let initial = Parameters::new(Tensor::vector(vec![w, -w]), b).unwrap();
    let start = mse_loss(&initial, &data).unwrap();
    let mut stopping = StoppingRule::new(1e-6, 50).unwrap();
    let fit = fit_full_batch(
        &data,
        initial,
        &MseGradient,
        &FitOptions::new(learning_rate),
        &mut stopping,
    )
    .unwrap();

    assert_eq!(fit.history[0], start);
    assert!(fit.final_loss <= start);
    assert!(fit.history.windows(2).all(|pair| pair[1] <= pair[0]));
}

#[rstest]
#[case(EpochDisplacement::Mean)]
#[case(EpochDisplacement::LastBatch)]
fn minibatch_is_reproducible(#[case] displacement: EpochDisplacement) {
    let data = regression_data(42, 0.1);
    let minibatch = MinibatchOptions::new(16, 8).with_displacement(displacement);
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stopping = StoppingRule::new(1e-6, 25).unwrap();
        fit_minibatch(
            &data,
            Parameters::zeros(2),
            &MseGradient,
            &FitOptions::new(0.05),
            &minibatch,
            &mut stopping,
            &mut rng,
        )
        .unwrap()
    };

    let first = run(9);
    let second = run(9);
    assert_eq!(first, second);
    assert_ne!(first.params, run(10).params);
}

#[test]
fn minibatch_approaches_generating_coefficients() {
    let data = regression_data(42, 0.1);
    let mut rng = StdRng::seed_from_u64(42);
    let mut stopping = StoppingRule::new(1e-4, 2_000).unwrap();
    let fit = fit_minibatch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01),
        &MinibatchOptions::new(32, 32),
        &mut stopping,
        &mut rng,
    )
    .unwrap();

    let weights = fit.params.weights.as_slice();
    assert_abs_diff_eq!(weights[0], -11.0, epsilon = 0.5);
    assert_abs_diff_eq!(weights[1], 12.0, epsilon = 0.5);
    assert_abs_diff_eq!(fit.params.bias, 3.0, epsilon = 0.5);
    assert!(fit.final_loss < fit.history[0]);
}

#[test]
fn dimension_mismatch_fails_before_any_epoch() {
    let data = regression_data(3, 0.1);
    let calls = Cell::new(0);
    let counting = |params: &Parameters<f64>, batch: &Dataset<f64>| -> Result<Gradient<f64>> {
        calls.set(calls.get() + 1);
        MseGradient.gradient(params, batch)
    };
    let mut stopping = StoppingRule::new(1e-6, 100).unwrap();

    let err = fit_full_batch(
        &data,
        Parameters::zeros(3),
        &counting,
        &FitOptions::new(0.01),
        &mut stopping,
    )
    .unwrap_err();
    assert_eq!(
        err,
        FitError::ShapeMismatch {
            what: "weights",
            expected: 2,
            got: 3
        }
    );

    let mut rng = StdRng::seed_from_u64(0);
    let err = fit_minibatch(
        &data,
        Parameters::zeros(1),
        &counting,
        &FitOptions::new(0.01),
        &MinibatchOptions::new(8, 4),
        &mut stopping,
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, FitError::ShapeMismatch { .. }));
    assert_eq!(calls.get(), 0);
}

#[test]
fn oracle_with_wrong_gradient_shape_is_rejected() {
    let data = regression_data(3, 0.1);
    let broken = |_: &Parameters<f64>, _: &Dataset<f64>| -> Result<Gradient<f64>> {
        Ok(Gradient {
            weights: Tensor::vector(vec![0.0; 5]),
            bias: 0.0,
        })
    };
    let mut stopping = StoppingRule::new(1e-6, 100).unwrap();
    let err = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &broken,
        &FitOptions::new(0.01),
        &mut stopping,
    )
    .unwrap_err();
    assert_eq!(
        err,
        FitError::ShapeMismatch {
            what: "gradient",
            expected: 2,
            got: 5
        }
    );
}

#[rstest]
#[case(1)]
#[case(17)]
fn unreachable_tolerance_stops_at_the_cap(#[case] max_epochs: usize) {
    let data = regression_data(5, 0.1);

    let mut stopping = StoppingRule::new(1e-300, max_epochs).unwrap();
    let fit = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01),
        &mut stopping,
    )
    .unwrap();
    assert_eq!(fit.stop_reason, StopReason::MaxEpochs);
    assert_eq!(fit.epochs, max_epochs);
    assert_eq!(fit.history.len(), max_epochs);

    let mut rng = StdRng::seed_from_u64(5);
    let mut stopping = StoppingRule::new(1e-300, max_epochs).unwrap();
    let fit = fit_minibatch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01),
        &MinibatchOptions::new(10, 3),
        &mut stopping,
        &mut rng,
    )
    .unwrap();
    assert_eq!(fit.stop_reason, StopReason::MaxEpochs);
    assert_eq!(fit.epochs, max_epochs);
}

#[test]
fn finite_difference_oracle_drives_a_fit() {
    let data = regression_data(11, 0.1);
    let oracle = FiniteDifference::mse(1e-6_f64).unwrap();
    let mut stopping = StoppingRule::new(1e-6, 50).unwrap();
    let numeric = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &oracle,
        &FitOptions::new(0.05),
        &mut stopping,
    )
    .unwrap();

    let mut stopping = StoppingRule::new(1e-6, 50).unwrap();
    let analytic = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.05),
        &mut stopping,
    )
    .unwrap();

    assert_eq!(numeric.epochs, analytic.epochs);
    for (n, a) in numeric
        .params
        .weights
        .as_slice()
        .iter()
        .zip(analytic.params.weights.as_slice())
    {
        assert_abs_diff_eq!(n, a, epsilon = 1e-3);
    }
    assert_abs_diff_eq!(numeric.params.bias, analytic.params.bias, epsilon = 1e-3);
}

/// A policy that only counts epochs, to show policies are pluggable.
struct FixedEpochs(usize);

impl StoppingPolicy<f64> for FixedEpochs {
    fn check(&mut self, epochs: usize, _: &Displacement<f64>) -> Option<StopReason> {
        (epochs >= self.0).then_some(StopReason::MaxEpochs)
    }
}

#[test]
fn custom_stopping_policy() {
    let data = regression_data(2, 0.1);
    let fit = fit_full_batch(
        &data,
        Parameters::zeros(2),
        &MseGradient,
        &FitOptions::new(0.01).without_history(),
        &mut FixedEpochs(3),
    )
    .unwrap();
    assert_eq!(fit.epochs, 3);
    assert!(fit.history.is_empty());
}
