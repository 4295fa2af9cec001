use itertools::Itertools;
use std::convert::From;
use std::fmt;
use std::ops::{Add, Index, Mul, Sub};

use super::error::TensorError;
use super::functional;
use super::numeric::*;
use super::utils::IndexIterator;

/// The core `struct` in this library.
///
/// A dense, row-major array of rank 0 (scalar), 1 (vector) or 2 (matrix).
#[derive(Debug, PartialEq, Clone)]
pub struct Tensor<T>
where
    T: Numeric,
{
    pub(in crate::tensor) array: Vec<T>,
    pub(in crate::tensor) shape: Vec<usize>,
}

impl<T> Tensor<T>
where
    T: Numeric,
{
    /// Panics when `array` does not hold exactly as many elements as `shape`
    /// describes; use [`Tensor::try_new`] for untrusted input.
    pub fn new(array: Vec<T>, shape: Vec<usize>) -> Tensor<T> {
        match Tensor::try_new(array, shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(array: Vec<T>, shape: Vec<usize>) -> Result<Tensor<T>, TensorError> {
        let expected = shape.iter().product::<usize>();
        if expected != array.len() {
            return Err(TensorError::DataLength {
                shape,
                expected,
                got: array.len(),
            });
        }
        Ok(Tensor { array, shape })
    }

    pub fn vector(array: Vec<T>) -> Tensor<T> {
        let shape = vec![array.len()];
        Tensor { array, shape }
    }

    pub fn scalar(scalar: T) -> Tensor<T> {
        Tensor {
            array: vec![scalar],
            shape: vec![],
        }
    }

    /// Note! An empty `shape` constructs a scalar.
    pub fn new_with_filler(shape: Vec<usize>, filler: T) -> Tensor<T> {
        let total = shape.iter().product::<usize>();
        Tensor {
            array: vec![filler; total],
            shape,
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Tensor<T> {
        Tensor::new_with_filler(shape, T::zero())
    }

    pub fn shape(&self) -> &Vec<usize> {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.array.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.array.len() == 1 && self.shape.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.array
    }

    /// `(rows, cols)` of a matrix.
    pub fn matrix_dims(&self) -> Result<(usize, usize), TensorError> {
        match self.shape[..] {
            [rows, cols] => Ok((rows, cols)),
            _ => Err(TensorError::Rank {
                op: "matrix_dims",
                expected: 2,
                shape: self.shape.clone(),
            }),
        }
    }

    pub(in crate::tensor) fn get_global_index(&self, index: &[usize]) -> Result<usize, TensorError> {
        if index.len() != self.shape.len() {
            return Err(TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        let mut global_idx = 0;
        let mut multiplier = 1;
        for (&dim, &idx_dim) in self.shape.iter().rev().zip(index.iter().rev()) {
            if dim <= idx_dim {
                return Err(TensorError::IndexOutOfBounds {
                    index: index.to_vec(),
                    shape: self.shape.clone(),
                });
            }
            global_idx += idx_dim * multiplier;
            multiplier *= dim;
        }
        Ok(global_idx)
    }

    /// ```
    /// # use gradfit::tensor::*;
    /// let matrix = Tensor::new(vec![0, 1, 2, 3, 4, 5], vec![2, 3]);
    ///
    /// assert_eq!(matrix.get(&[1, 0]), Ok(&3));
    /// assert!(matrix.get(&[2, 0]).is_err());
    /// ```
    pub fn get(&self, index: &[usize]) -> Result<&T, TensorError> {
        let global_idx = self.get_global_index(index)?;
        Ok(&self.array[global_idx])
    }

    pub fn set(&mut self, index: &[usize], value: T) -> Result<(), TensorError> {
        let global_idx = self.get_global_index(index)?;
        self.array[global_idx] = value;
        Ok(())
    }

    /// Borrow row `i` of a matrix.
    pub fn row(&self, i: usize) -> Result<&[T], TensorError> {
        let (rows, cols) = self.matrix_dims()?;
        if i >= rows {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![i],
                shape: self.shape.clone(),
            });
        }
        Ok(&self.array[i * cols..(i + 1) * cols])
    }

    /// Gather rows of a matrix (or elements of a vector) in the order given,
    /// repetitions allowed.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Tensor<T>, TensorError> {
        let (rows, cols) = match self.shape[..] {
            [rows] => (rows, 1),
            [rows, cols] => (rows, cols),
            _ => {
                return Err(TensorError::Rank {
                    op: "select_rows",
                    expected: 2,
                    shape: self.shape.clone(),
                })
            }
        };
        let mut array = Vec::with_capacity(indices.len() * cols);
        for &i in indices {
            if i >= rows {
                return Err(TensorError::IndexOutOfBounds {
                    index: vec![i],
                    shape: self.shape.clone(),
                });
            }
            array.extend_from_slice(&self.array[i * cols..(i + 1) * cols]);
        }
        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        Ok(Tensor { array, shape })
    }

    /// A new matrix with a leading column filled with `value`.
    pub fn prepend_column(&self, value: T) -> Result<Tensor<T>, TensorError> {
        let (rows, cols) = self.matrix_dims()?;
        let mut array = Vec::with_capacity(rows * (cols + 1));
        for i in 0..rows {
            array.push(value);
            array.extend_from_slice(&self.array[i * cols..(i + 1) * cols]);
        }
        Ok(Tensor {
            array,
            shape: vec![rows, cols + 1],
        })
    }

    /// ```
    /// # use gradfit::tensor::*;
    /// let matrix: Tensor<i32> = Tensor::from([[1, 2, 3], [4, 5, 6]]);
    ///
    /// assert_eq!(
    ///     matrix.transpose().unwrap(),
    ///     Tensor::from([[1, 4], [2, 5], [3, 6]])
    /// );
    /// ```
    pub fn transpose(&self) -> Result<Tensor<T>, TensorError> {
        let (rows, cols) = self.matrix_dims()?;
        let mut array = Vec::with_capacity(rows * cols);
        for idx in IndexIterator::new(vec![cols, rows]) {
            array.push(self.array[idx[1] * cols + idx[0]]);
        }
        Ok(Tensor {
            array,
            shape: vec![cols, rows],
        })
    }

    /// Matrix product of a matrix with a matrix (`[m, k] x [k, n] -> [m, n]`)
    /// or with a vector (`[m, k] x [k] -> [m]`). Output rows are computed in
    /// parallel once the product is large enough.
    ///
    /// ```
    /// # use gradfit::tensor::*;
    /// let matrix = Tensor::new(vec![0, 1, 2, 3], vec![2, 2]);
    /// let diag = Tensor::new(vec![1, 1], vec![2, 1]);
    ///
    /// assert_eq!(matrix.matmul(&diag).unwrap(), Tensor::new(vec![1, 5], vec![2, 1]));
    /// assert_eq!(matrix.matmul(&Tensor::from([1, 0])).unwrap(), Tensor::from([0, 2]));
    /// ```
    pub fn matmul(&self, right: &Tensor<T>) -> Result<Tensor<T>, TensorError>
    where
        T: Send + Sync,
    {
        let (m, k, n) = self.matmul_dims(right)?;
        if m * k * n >= functional::PARALLEL_MATMUL_THRESHOLD {
            Ok(self.matmul_output(
                right,
                functional::matmul_parallel(&self.array, &right.array, m, k, n),
            ))
        } else {
            self.matmul_serial(right)
        }
    }

    /// Single threaded [`Tensor::matmul`].
    pub fn matmul_serial(&self, right: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        let (m, k, n) = self.matmul_dims(right)?;
        Ok(self.matmul_output(
            right,
            functional::matmul_serial(&self.array, &right.array, m, k, n),
        ))
    }

    fn matmul_dims(&self, right: &Tensor<T>) -> Result<(usize, usize, usize), TensorError> {
        let (m, k) = self.matrix_dims()?;
        let (inner, n) = match right.shape[..] {
            [inner] => (inner, 1),
            [inner, n] => (inner, n),
            _ => {
                return Err(TensorError::Rank {
                    op: "matmul",
                    expected: 2,
                    shape: right.shape.clone(),
                })
            }
        };
        if inner != k {
            return Err(TensorError::ShapeMismatch {
                op: "matmul",
                left: self.shape.clone(),
                right: right.shape.clone(),
            });
        }
        Ok((m, k, n))
    }

    fn matmul_output(&self, right: &Tensor<T>, array: Vec<T>) -> Tensor<T> {
        let shape = if right.rank() == 1 {
            vec![self.shape[0]]
        } else {
            vec![self.shape[0], right.shape[1]]
        };
        Tensor { array, shape }
    }

    /// Generalised dot product: the accumulated sum of the elementwise product.
    pub fn dot(&self, other: &Tensor<T>) -> Result<T, TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                op: "dot",
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        Ok(functional::dot(&self.array, &other.array))
    }

    pub fn map<F>(&self, f: F) -> Tensor<T>
    where
        F: Fn(T) -> T,
    {
        Tensor {
            array: self.array.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn scale(&self, scalar: T) -> Tensor<T> {
        self.map(|x| scalar * x)
    }

    pub fn sum(&self) -> T {
        self.array.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    pub fn sum_of_squares(&self) -> T {
        self.array.iter().fold(T::zero(), |acc, &x| acc + x * x)
    }
}

impl<T> Tensor<T>
where
    T: Real,
{
    /// Arithmetic mean over every element; NaN for an empty tensor.
    pub fn mean(&self) -> T {
        self.sum() / T::of_usize(self.count())
    }

    /// Euclidean (Frobenius for matrices) norm.
    pub fn norm(&self) -> T {
        self.sum_of_squares().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.array.iter().all(|x| x.is_finite())
    }
}

impl<T> Index<&Vec<usize>> for Tensor<T>
where
    T: Numeric,
{
    type Output = T;

    fn index(&self, index: &Vec<usize>) -> &Self::Output {
        match self.get(index) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> Add<&Tensor<T>> for &Tensor<T>
where
    T: Numeric,
{
    type Output = Tensor<T>;

    /// Panics on incompatible shapes; see [`functional::add`].
    fn add(self, right: &Tensor<T>) -> Tensor<T> {
        match functional::add(self, right) {
            Ok(result) => result,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> Sub<&Tensor<T>> for &Tensor<T>
where
    T: Numeric,
{
    type Output = Tensor<T>;

    fn sub(self, right: &Tensor<T>) -> Tensor<T> {
        match functional::sub(self, right) {
            Ok(result) => result,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> Mul<&Tensor<T>> for &Tensor<T>
where
    T: Numeric,
{
    type Output = Tensor<T>;

    fn mul(self, right: &Tensor<T>) -> Tensor<T> {
        match functional::element_wise_multiplication(self, right) {
            Ok(result) => result,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> From<T> for Tensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        Tensor::scalar(value)
    }
}

impl<T, U> From<Vec<U>> for Tensor<T>
where
    T: Numeric,
    Tensor<T>: From<U>,
{
    /// Stacks equally shaped parts along a new leading dimension.
    fn from(value: Vec<U>) -> Tensor<T> {
        let parts: Vec<Tensor<T>> = value.into_iter().map(Tensor::from).collect();
        let inner_shape = parts.first().map(|t| t.shape.clone()).unwrap_or_default();
        assert!(
            parts.iter().all(|t| t.shape == inner_shape),
            "cannot stack ragged parts into a tensor"
        );
        let mut shape = vec![parts.len()];
        shape.extend_from_slice(&inner_shape);
        let array = parts.into_iter().flat_map(|t| t.array.into_iter()).collect();
        Tensor { array, shape }
    }
}

impl<T, U, const N: usize> From<[U; N]> for Tensor<T>
where
    T: Numeric,
    Tensor<T>: From<U>,
    U: Clone,
{
    fn from(value: [U; N]) -> Tensor<T> {
        From::from(value.to_vec())
    }
}

impl<T> fmt::Display for Tensor<T>
where
    T: Numeric + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape[..] {
            [] => write!(f, "{}", self.array.first().map_or(String::new(), |v| v.to_string())),
            [_] => write!(f, "[{}]", self.array.iter().join(", ")),
            [_, cols] => {
                let rows = self
                    .array
                    .chunks(cols.max(1))
                    .map(|row| format!("[{}]", row.iter().join(", ")))
                    .join(",\n ");
                write!(f, "[{}]", rows)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

#[test]
fn test_new_with_filler() {
    let vec = Tensor::new_with_filler(vec![4], 4);
    assert_eq!(vec.shape(), &vec![4]);
    assert_eq!(vec.get(&[2]).unwrap(), &4);
}

#[test]
fn test_try_new_rejects_wrong_length() {
    let err = Tensor::try_new(vec![1, 2, 3], vec![2, 2]).unwrap_err();
    assert_eq!(
        err,
        TensorError::DataLength {
            shape: vec![2, 2],
            expected: 4,
            got: 3
        }
    );
}

#[test]
fn test_get_3x3() {
    let matrix = Tensor::new(vec![0, 1, 2, 3, 4, 5, 6, 7, 8], vec![3, 3]);
    let mut prev = -1;
    for i in 0..3 {
        for j in 0..3 {
            let curr = matrix[&vec![i, j]];
            assert_eq!(prev + 1, curr);
            prev = curr;
        }
    }
    assert!(matrix.get(&[0, 3]).is_err());
    assert!(matrix.get(&[0]).is_err());
}

#[test]
fn test_select_rows_with_repetition() {
    let matrix: Tensor<f64> = Tensor::from([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    let batch = matrix.select_rows(&[2, 0, 2]).unwrap();
    assert_eq!(batch, Tensor::from([[5.0, 6.0], [1.0, 2.0], [5.0, 6.0]]));
    assert!(matrix.select_rows(&[3]).is_err());

    let targets: Tensor<f64> = Tensor::from([7.0, 8.0, 9.0]);
    assert_eq!(targets.select_rows(&[1, 1]).unwrap(), Tensor::from([8.0, 8.0]));
}

#[test]
fn test_prepend_column() {
    let matrix: Tensor<i32> = Tensor::from([[2, 3], [4, 5]]);
    assert_eq!(
        matrix.prepend_column(1).unwrap(),
        Tensor::from([[1, 2, 3], [1, 4, 5]])
    );
}

#[test]
fn test_matmul_shape_mismatch() {
    let matrix = Tensor::new(vec![0, 1, 2, 3, 4, 5], vec![2, 3]);
    let err = matrix.matmul(&Tensor::from([1, 2])).unwrap_err();
    assert!(matches!(err, TensorError::ShapeMismatch { op: "matmul", .. }));
}

#[test]
fn test_matmul_parallel_matches_serial() {
    let size = 64;
    let left = Tensor::new(
        (0..size * size).map(|x| (x % 7) as f64 - 3.0).collect(),
        vec![size, size],
    );
    let right = Tensor::new(
        (0..size * size).map(|x| (x % 5) as f64 * 0.5).collect(),
        vec![size, size],
    );
    assert_eq!(left.matmul(&right).unwrap(), left.matmul_serial(&right).unwrap());
}

#[test]
fn test_mean_and_norm() {
    let vec: Tensor<f64> = Tensor::from([3.0, 4.0]);
    assert_eq!(vec.mean(), 3.5);
    assert_eq!(vec.norm(), 5.0);
}

#[test]
fn test_display() {
    assert_eq!(Tensor::<i32>::from([[1, 2], [3, 4]]).to_string(), "[[1, 2],\n [3, 4]]");
    assert_eq!(Tensor::scalar(2).to_string(), "2");
}
