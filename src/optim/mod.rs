mod estimator;
mod oracle;
mod sgd;
mod stopping;

pub use estimator::*;
pub use oracle::*;
pub use sgd::*;
pub use stopping::*;
