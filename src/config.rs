//! Experiment configuration for the `gradfit` binary.
//!
//! Every section and field has a default, so `{}` is a valid file and a
//! partial file only overrides what it names:
//!
//! ```json
//! { "fit": { "learning_rate": 0.05 }, "minibatch": { "displacement": "last_batch" } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FitError;
use crate::optim::{EpochDisplacement, FitOptions, MinibatchOptions, StoppingRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How the synthetic dataset is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub samples: usize,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            samples: 1000,
            coefficients: vec![-11.0, 12.0],
            intercept: 3.0,
            noise_std: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub learning_rate: f64,
    pub tolerance: f64,
    pub max_epochs: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            learning_rate: 0.01,
            tolerance: 1e-6,
            max_epochs: 10_000,
        }
    }
}

impl FitConfig {
    pub fn options(&self) -> FitOptions<f64> {
        FitOptions::new(self.learning_rate)
    }

    pub fn stopping_rule(&self) -> Result<StoppingRule<f64>, FitError> {
        StoppingRule::new(self.tolerance, self.max_epochs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinibatchConfig {
    pub batch_size: usize,
    pub batches_per_epoch: usize,
    pub displacement: EpochDisplacement,
}

impl Default for MinibatchConfig {
    fn default() -> Self {
        MinibatchConfig {
            batch_size: 32,
            batches_per_epoch: 32,
            displacement: EpochDisplacement::Mean,
        }
    }
}

impl From<MinibatchConfig> for MinibatchOptions {
    fn from(config: MinibatchConfig) -> Self {
        MinibatchOptions::new(config.batch_size, config.batches_per_epoch)
            .with_displacement(config.displacement)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub fit: FitConfig,
    pub minibatch: MinibatchConfig,
}

impl ExperimentConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<ExperimentConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ExperimentConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.data.samples == 0 {
            return invalid("data.samples must be at least 1");
        }
        if self.data.coefficients.is_empty() {
            return invalid("data.coefficients must not be empty");
        }
        if !(self.data.noise_std >= 0.0 && self.data.noise_std.is_finite()) {
            return invalid("data.noise_std must be finite and non-negative");
        }
        if !(self.fit.learning_rate > 0.0 && self.fit.learning_rate.is_finite()) {
            return invalid("fit.learning_rate must be positive");
        }
        if !(self.fit.tolerance > 0.0 && self.fit.tolerance.is_finite()) {
            return invalid("fit.tolerance must be positive");
        }
        if self.fit.max_epochs == 0 {
            return invalid("fit.max_epochs must be at least 1");
        }
        if self.minibatch.batch_size == 0 || self.minibatch.batches_per_epoch == 0 {
            return invalid("minibatch.batch_size and minibatch.batches_per_epoch must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default() {
        let config: ExperimentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExperimentConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: ExperimentConfig = serde_json::from_str(
            r#"{ "fit": { "learning_rate": 0.05 }, "minibatch": { "displacement": "last_batch" } }"#,
        )
        .unwrap();
        assert_eq!(config.fit.learning_rate, 0.05);
        assert_eq!(config.fit.max_epochs, 10_000);
        assert_eq!(config.minibatch.displacement, EpochDisplacement::LastBatch);
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{ "fit": { "learning_rate": -1.0 } }"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: ExperimentConfig =
            serde_json::from_str(r#"{ "minibatch": { "batch_size": 0 } }"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = serde_json::from_str::<ExperimentConfig>("{ \"fit\": ").unwrap_err();
        assert!(matches!(ConfigError::from(err), ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ExperimentConfig::from_path("/nonexistent/gradfit.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn converts_into_fit_settings() {
        let config = ExperimentConfig::default();
        let minibatch: MinibatchOptions = config.minibatch.into();
        assert_eq!(minibatch.batch_size, 32);
        assert_eq!(config.fit.stopping_rule().unwrap().max_epochs, 10_000);
        assert!(config.fit.options().record_history);
    }
}
