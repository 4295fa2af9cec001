use itertools::Itertools;

use crate::tensor::numeric::*;
use crate::tensor::{Tensor, TensorError};

/// Applies `op` element by element. Equal shapes pair up position by position;
/// a scalar (rank 0) operand is broadcast against the other side.
fn zip_with<T, F>(
    left: &Tensor<T>,
    right: &Tensor<T>,
    op_name: &'static str,
    op: F,
) -> Result<Tensor<T>, TensorError>
where
    T: Numeric,
    F: Fn(T, T) -> T,
{
    if left.shape == right.shape {
        let array = left
            .array
            .iter()
            .zip_eq(right.array.iter())
            .map(|(&x, &y)| op(x, y))
            .collect();
        return Ok(Tensor {
            array,
            shape: left.shape.clone(),
        });
    }
    if right.is_scalar() {
        let y = right.array[0];
        return Ok(left.map(|x| op(x, y)));
    }
    if left.is_scalar() {
        let x = left.array[0];
        return Ok(right.map(|y| op(x, y)));
    }
    Err(TensorError::ShapeMismatch {
        op: op_name,
        left: left.shape.clone(),
        right: right.shape.clone(),
    })
}

/// ```
/// # use gradfit::tensor::*;
/// let tensor = Tensor::new((0..4).collect(), vec![2, 2]);
///
/// assert_eq!(
///     functional::add(&tensor, &Tensor::scalar(42)).unwrap(),
///     Tensor::new((42..46).collect(), vec![2, 2])
/// );
/// assert!(functional::add(&tensor, &Tensor::from([1, 2, 3])).is_err());
/// ```
pub fn add<T: Numeric>(left: &Tensor<T>, right: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
    zip_with(left, right, "add", |x, y| x + y)
}

pub fn sub<T: Numeric>(left: &Tensor<T>, right: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
    zip_with(left, right, "sub", |x, y| x - y)
}

pub fn element_wise_multiplication<T: Numeric>(
    left: &Tensor<T>,
    right: &Tensor<T>,
) -> Result<Tensor<T>, TensorError> {
    zip_with(left, right, "mul", |x, y| x * y)
}

#[test]
fn test_add() {
    let tensor1 = Tensor::new((0..8).collect(), vec![2, 4]);
    let tensor2 = Tensor::new_with_filler(vec![2, 4], 1);
    let tensor3 = Tensor::new((1..9).collect(), vec![2, 4]);
    assert_eq!(&tensor1 + &tensor2, tensor3);
    assert_eq!(&tensor2 + &tensor1, tensor3);
}

#[test]
fn test_sub_scalar_both_sides() {
    let tensor = Tensor::vector(vec![1.0, 2.0, 3.0]);
    let scalar = Tensor::scalar(1.0);
    assert_eq!(&tensor - &scalar, Tensor::vector(vec![0.0, 1.0, 2.0]));
    assert_eq!(&scalar - &tensor, Tensor::vector(vec![0.0, -1.0, -2.0]));
}

#[test]
fn test_element_wise_multiplication() {
    let left = Tensor::vector(vec![1, 2, 3]);
    let right = Tensor::vector(vec![7, 2, 8]);
    assert_eq!(&left * &right, Tensor::vector(vec![7, 4, 24]));
}

#[test]
fn test_mismatched_shapes() {
    let left = Tensor::vector(vec![1, 2, 3]);
    let right = Tensor::new(vec![1, 2, 3], vec![3, 1]);
    assert!(matches!(
        sub(&left, &right),
        Err(TensorError::ShapeMismatch { op: "sub", .. })
    ));
}
