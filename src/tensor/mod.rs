mod dense;
mod error;
pub mod functional;
pub mod linalg;
mod numeric;
mod utils;

pub use dense::*;
pub use error::*;
pub use numeric::*;
pub use utils::*;
