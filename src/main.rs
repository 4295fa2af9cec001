use anyhow::{Context, Result};
use gradfit::config::ExperimentConfig;
use gradfit::data::synthetic_linear;
use gradfit::inference::summarize_coefficients;
use gradfit::linear_model::Parameters;
use gradfit::optim::{fit_full_batch, fit_minibatch, Fit, MseGradient};

use log::info;
use rand::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ExperimentConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ExperimentConfig::default(),
    };
    info!("configuration: {}", serde_json::to_string(&config)?);

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.data.seed);
    let data = synthetic_linear(
        &mut rng,
        &config.data.coefficients,
        config.data.intercept,
        config.data.noise_std,
        config.data.samples,
    )?;
    let initial = Parameters::zeros(data.n_features());
    let options = config.fit.options();

    let full = fit_full_batch(
        &data,
        initial.clone(),
        &MseGradient,
        &options,
        &mut config.fit.stopping_rule()?,
    )
    .context("full batch fit")?;
    report("full batch", &full);

    let minibatch = fit_minibatch(
        &data,
        initial,
        &MseGradient,
        &options,
        &config.minibatch.into(),
        &mut config.fit.stopping_rule()?,
        &mut rng,
    )
    .context("minibatch fit")?;
    report("minibatch", &minibatch);

    let summary = summarize_coefficients(&full.params, full.final_loss, data.features())
        .context("coefficient p-values")?;
    println!();
    println!("{:<12}{:>14}{:>14}{:>14}{:>14}", "coefficient", "estimate", "std error", "z", "p-value");
    for (i, row) in summary.iter().enumerate() {
        let name = if i == 0 { "b".to_string() } else { format!("w{i}") };
        println!(
            "{name:<12}{:>14.6}{:>14.6}{:>14.4}{:>14.3e}",
            row.estimate, row.std_error, row.z_score, row.p_value
        );
    }
    Ok(())
}

fn report(name: &str, fit: &Fit<f64>) {
    println!(
        "{name}: {:?} after {} epochs, loss {:.6}, w = {}, b = {:.6}",
        fit.stop_reason, fit.epochs, fit.final_loss, fit.params.weights, fit.params.bias
    );
}
