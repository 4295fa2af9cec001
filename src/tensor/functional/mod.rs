mod element_wise_ops;
mod misc;

pub use element_wise_ops::*;
pub use misc::PARALLEL_MATMUL_THRESHOLD;
pub(crate) use misc::{dot, matmul_parallel, matmul_serial};
