use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TensorError {
    #[error("shape mismatch in {op}: left is {left:?}, right is {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    #[error("shape {shape:?} holds {expected} elements but data has {got}")]
    DataLength {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("{op} expects a tensor of rank {expected}, got shape {shape:?}")]
    Rank {
        op: &'static str,
        expected: usize,
        shape: Vec<usize>,
    },

    #[error("{op} needs finite input")]
    NotFinite { op: &'static str },

    #[error("{op} did not converge within {iterations} iterations")]
    NoConvergence { op: &'static str, iterations: usize },
}
