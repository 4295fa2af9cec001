pub use num::{One, Zero};
use std::cmp::PartialEq;
use std::fmt::Display;
use std::iter::Sum;

pub use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

pub trait Numeric:
    Add<Output = Self>
    + AddAssign
    + Copy
    + Clone
    + One
    + Mul<Output = Self>
    + Sub<Output = Self>
    + PartialEq
    + Zero
    + std::fmt::Debug
{
}
// https://stackoverflow.com/questions/42381185/specifying-generic-parameter-to-belong-to-a-small-set-of-types
macro_rules! numeric_impl {
    ($($t: ty),+) => {
        $(
            impl Numeric for $t {}
        )+
    }
}

numeric_impl!(usize, u8, u32, u64, u128, i8, i32, i64, i128, f32, f64);

/// Floating point element types the estimator and the statistics run on.
pub trait Real: Numeric + num::Float + Sum + Display + Send + Sync {
    /// Lossy conversion of an `f64` constant into `Self`.
    fn of(value: f64) -> Self;

    fn of_usize(value: usize) -> Self {
        Self::of(value as f64)
    }

    /// Widening for error messages and logs.
    fn as_f64(self) -> f64;
}

macro_rules! real_impl {
    ($($t: ty),+) => {
        $(
            impl Real for $t {
                #[inline]
                fn of(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )+
    }
}

real_impl!(f32, f64);

#[test]
fn test_real_constants() {
    assert_eq!(f32::of(0.5), 0.5f32);
    assert_eq!(f64::of_usize(1000), 1000.0);
    assert_eq!(2.5f32.as_f64(), 2.5f64);
}
