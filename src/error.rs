use thiserror::Error;

use crate::tensor::TensorError;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum FitError {
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dataset has no samples")]
    EmptyDataset,

    #[error("loss or parameters became non-finite at epoch {epoch}")]
    Diverged { epoch: usize },

    #[error("numerical instability: eigenvalue {eigenvalue} at position {index} is not safely positive, the design matrix is rank deficient")]
    NumericalInstability { index: usize, eigenvalue: f64 },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type Result<T> = std::result::Result<T, FitError>;
