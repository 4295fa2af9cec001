//! Linear least-squares fitted by gradient descent, with coefficient
//! significance tests.

pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod linear_model;
pub mod optim;
pub mod tensor;
