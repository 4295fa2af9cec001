//! The iterative least-squares estimator.
//!
//! Both fit functions own their loop state: they take the initial parameters
//! by value, produce a fresh [`Parameters`] value on every step and hand the
//! last one back inside a [`Fit`]. Gradients come from a [`GradientOracle`],
//! termination from a [`StoppingPolicy`].

use log::{debug, info, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{FitError, Result};
use crate::linear_model::{mse_loss, Parameters};
use crate::optim::oracle::GradientOracle;
use crate::optim::sgd::Sgd;
use crate::optim::stopping::{Displacement, StopReason, StoppingPolicy};
use crate::tensor::Real;

/// Epochs between two progress records at `debug` level.
pub const PROGRESS_LOG_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions<T: Real> {
    pub learning_rate: T,
    /// Keep the loss measured at the start of every epoch in [`Fit::history`].
    pub record_history: bool,
}

impl<T: Real> FitOptions<T> {
    pub fn new(learning_rate: T) -> FitOptions<T> {
        FitOptions {
            learning_rate,
            record_history: true,
        }
    }

    pub fn without_history(self) -> FitOptions<T> {
        FitOptions {
            record_history: false,
            ..self
        }
    }
}

/// Which displacement a mini-batch epoch reports to the stopping policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochDisplacement {
    /// Mean of the per-batch displacements of the epoch.
    #[default]
    Mean,
    /// Displacement of the last batch only.
    LastBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinibatchOptions {
    pub batch_size: usize,
    pub batches_per_epoch: usize,
    pub displacement: EpochDisplacement,
}

impl MinibatchOptions {
    pub fn new(batch_size: usize, batches_per_epoch: usize) -> MinibatchOptions {
        MinibatchOptions {
            batch_size,
            batches_per_epoch,
            displacement: EpochDisplacement::default(),
        }
    }

    pub fn with_displacement(self, displacement: EpochDisplacement) -> MinibatchOptions {
        MinibatchOptions { displacement, ..self }
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FitError::InvalidParameter(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.batches_per_epoch == 0 {
            return Err(FitError::InvalidParameter(
                "batches_per_epoch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Fit<T: Real> {
    pub params: Parameters<T>,
    pub epochs: usize,
    pub stop_reason: StopReason,
    /// Mean squared error of `params` over the whole dataset.
    pub final_loss: T,
    /// Loss over the whole dataset at the start of each epoch; empty unless
    /// history recording was requested.
    pub history: Vec<T>,
}

impl<T: Real> Fit<T> {
    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }
}

/// Gradient descent on the whole dataset, one step per epoch.
///
/// Fails with [`FitError::ShapeMismatch`] before the first epoch when the
/// initial parameters do not fit the data, and with [`FitError::Diverged`]
/// as soon as the loss or the parameters stop being finite. Hitting the epoch
/// cap of `stopping` is not an error: the returned [`Fit`] carries
/// [`StopReason::MaxEpochs`].
///
/// ```
/// # use gradfit::data::synthetic_linear;
/// # use gradfit::linear_model::Parameters;
/// # use gradfit::optim::{fit_full_batch, FitOptions, MseGradient, StoppingRule};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let data = synthetic_linear(&mut rng, &[2.0f64, -1.0], 0.5, 0.0, 200).unwrap();
/// let mut stopping = StoppingRule::new(1e-8, 5_000).unwrap();
///
/// let fit = fit_full_batch(
///     &data,
///     Parameters::zeros(2),
///     &MseGradient,
///     &FitOptions::new(0.1),
///     &mut stopping,
/// )
/// .unwrap();
///
/// assert!(fit.converged());
/// assert!((fit.params.bias - 0.5).abs() < 1e-4);
/// ```
pub fn fit_full_batch<T, O, S>(
    data: &Dataset<T>,
    initial: Parameters<T>,
    oracle: &O,
    options: &FitOptions<T>,
    stopping: &mut S,
) -> Result<Fit<T>>
where
    T: Real,
    O: GradientOracle<T> + ?Sized,
    S: StoppingPolicy<T> + ?Sized,
{
    initial.check_compatible(data)?;
    let sgd = Sgd::new(options.learning_rate)?;

    let mut params = initial;
    let mut history = Vec::new();
    let mut epochs = 0;
    loop {
        let loss = mse_loss(&params, data)?;
        if !loss.is_finite() {
            return Err(FitError::Diverged { epoch: epochs });
        }
        if options.record_history {
            history.push(loss);
        }

        let gradient = oracle.gradient(&params, data)?;
        let next = sgd.step(&params, &gradient, T::one())?;
        epochs += 1;
        if !next.is_finite() {
            return Err(FitError::Diverged { epoch: epochs });
        }
        let displacement = Displacement::between(&params, &next)?;
        params = next;

        trace!(
            "epoch {epochs}: loss={loss} |dw|={} |db|={}",
            displacement.weights,
            displacement.bias
        );
        if epochs % PROGRESS_LOG_INTERVAL == 0 {
            debug!("full batch: {epochs} epochs, loss {loss}");
        }
        if let Some(reason) = stopping.check(epochs, &displacement) {
            return finish(data, params, epochs, reason, history);
        }
    }
}

/// Stochastic gradient descent on batches sampled with replacement.
///
/// Every epoch draws `batches_per_epoch` batches of `batch_size` row indices
/// uniformly from `rng` and steps once per batch. The oracle gradient of a
/// batch is divided by `batch_size` before the learning rate is applied. The
/// displacement handed to `stopping` is chosen by
/// [`MinibatchOptions::displacement`].
///
/// The result depends only on the inputs and the state of `rng`, so a seeded
/// generator makes the fit reproducible.
pub fn fit_minibatch<T, O, S, R>(
    data: &Dataset<T>,
    initial: Parameters<T>,
    oracle: &O,
    options: &FitOptions<T>,
    minibatch: &MinibatchOptions,
    stopping: &mut S,
    rng: &mut R,
) -> Result<Fit<T>>
where
    T: Real,
    O: GradientOracle<T> + ?Sized,
    S: StoppingPolicy<T> + ?Sized,
    R: Rng + ?Sized,
{
    initial.check_compatible(data)?;
    minibatch.validate()?;
    let sgd = Sgd::new(options.learning_rate)?;
    let scale = T::one() / T::of_usize(minibatch.batch_size);
    let n_samples = data.n_samples();

    let mut params = initial;
    let mut history = Vec::new();
    let mut displacements = Vec::with_capacity(minibatch.batches_per_epoch);
    let mut indices = vec![0; minibatch.batch_size];
    let mut epochs = 0;
    loop {
        if options.record_history {
            let loss = mse_loss(&params, data)?;
            if !loss.is_finite() {
                return Err(FitError::Diverged { epoch: epochs });
            }
            history.push(loss);
        }

        displacements.clear();
        for _ in 0..minibatch.batches_per_epoch {
            indices
                .iter_mut()
                .for_each(|i| *i = rng.gen_range(0..n_samples));
            let batch = data.batch(&indices)?;
            let gradient = oracle.gradient(&params, &batch)?;
            let next = sgd.step(&params, &gradient, scale)?;
            if !next.is_finite() {
                return Err(FitError::Diverged { epoch: epochs + 1 });
            }
            displacements.push(Displacement::between(&params, &next)?);
            params = next;
        }
        epochs += 1;

        let displacement = match minibatch.displacement {
            EpochDisplacement::Mean => Displacement::mean(&displacements),
            // batches_per_epoch >= 1, so there is a last batch
            EpochDisplacement::LastBatch => displacements[displacements.len() - 1],
        };
        trace!(
            "epoch {epochs}: {} batches, |dw|={} |db|={}",
            displacements.len(),
            displacement.weights,
            displacement.bias
        );
        if epochs % PROGRESS_LOG_INTERVAL == 0 {
            debug!("minibatch: {epochs} epochs, bias {}", params.bias);
        }
        if let Some(reason) = stopping.check(epochs, &displacement) {
            return finish(data, params, epochs, reason, history);
        }
    }
}

fn finish<T: Real>(
    data: &Dataset<T>,
    params: Parameters<T>,
    epochs: usize,
    stop_reason: StopReason,
    history: Vec<T>,
) -> Result<Fit<T>> {
    let final_loss = mse_loss(&params, data)?;
    if !final_loss.is_finite() {
        return Err(FitError::Diverged { epoch: epochs });
    }
    match stop_reason {
        StopReason::Converged => info!("converged after {epochs} epochs, loss {final_loss}"),
        StopReason::MaxEpochs => warn!("stopped at the epoch cap ({epochs}) without converging, loss {final_loss}"),
    }
    Ok(Fit {
        params,
        epochs,
        stop_reason,
        final_loss,
        history,
    })
}
