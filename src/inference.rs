//! Significance of fitted coefficients.
//!
//! Coefficients are always ordered `[b, w_1, .., w_D]`, matching a design
//! matrix whose first column is all ones.

use log::debug;

use crate::error::{FitError, Result};
use crate::linear_model::Parameters;
use crate::tensor::linalg::{gram, symmetric_eigen};
use crate::tensor::{Real, Tensor};

/// Standard normal cumulative distribution function.
///
/// ```
/// # use gradfit::inference::standard_normal_cdf;
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((standard_normal_cdf(1.959964) - 0.975).abs() < 1e-6);
/// ```
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function, Chebyshev fit with fractional error below
/// 1.2e-7 everywhere.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientSummary<T> {
    pub estimate: T,
    pub std_error: T,
    pub z_score: T,
    /// Two-tailed, in `[0, 1]`.
    pub p_value: T,
}

/// Standard errors, z scores and two-tailed p-values of `[b, w_1, .., w_D]`.
///
/// With `X₁` the feature matrix prefixed by a column of ones and
/// `A = X₁ᵀX₁ / σ²` decomposed as `V·diag(λ)·Vᵀ`, the standard errors are the
/// square roots of the diagonal of `σ²·V·diag(1/√λ)·Vᵀ`.
///
/// Rank is judged on `D·A·D` with `D = diag(1/√A_ii)`, which has a unit
/// diagonal, so features on very different scales are not mistaken for
/// collinear ones. A design whose rescaled eigenvalues are not safely positive
/// (above `λ_max·√ε`) is rank deficient and yields
/// [`FitError::NumericalInstability`] instead of meaningless numbers.
pub fn summarize_coefficients<T: Real>(
    params: &Parameters<T>,
    residual_variance: T,
    features: &Tensor<T>,
) -> Result<Vec<CoefficientSummary<T>>> {
    if !(residual_variance > T::zero() && residual_variance.is_finite()) {
        return Err(FitError::InvalidParameter(format!(
            "residual variance must be positive and finite, got {residual_variance}"
        )));
    }
    let (_, cols) = features.matrix_dims()?;
    if cols != params.n_features() {
        return Err(FitError::ShapeMismatch {
            what: "weights",
            expected: cols,
            got: params.n_features(),
        });
    }

    let design = features.prepend_column(T::one())?;
    let precision = gram(&design)?.scale(T::one() / residual_variance);
    check_full_rank(&precision)?;
    let eigen = symmetric_eigen(&precision)?;
    if let Some((index, &eigenvalue)) = eigen
        .values
        .iter()
        .enumerate()
        .find(|&(_, &value)| !(value > T::zero()))
    {
        return Err(FitError::NumericalInstability {
            index,
            eigenvalue: eigenvalue.as_f64(),
        });
    }
    debug!(
        "precision eigenvalues range from {} to {}",
        eigen.values[0],
        eigen.values[eigen.values.len() - 1]
    );

    let covariance = eigen.reconstruct_with(|value| residual_variance / value.sqrt());
    let summaries = params
        .coefficients()
        .into_iter()
        .enumerate()
        .map(|(i, estimate)| {
            let std_error = covariance[&vec![i, i]].sqrt();
            let z_score = estimate.abs() / std_error;
            let p_value = erfc(z_score.as_f64() / std::f64::consts::SQRT_2).clamp(0.0, 1.0);
            CoefficientSummary {
                estimate,
                std_error,
                z_score,
                p_value: T::of(p_value),
            }
        })
        .collect();
    Ok(summaries)
}

/// Rejects a symmetric matrix whose unit-diagonal rescaling has an eigenvalue
/// at or below `λ_max·√ε`. The error carries that eigenvalue's position in
/// ascending order.
fn check_full_rank<T: Real>(precision: &Tensor<T>) -> Result<()> {
    let (n, _) = precision.matrix_dims()?;
    let mut scales = Vec::with_capacity(n);
    for i in 0..n {
        let diagonal = precision[&vec![i, i]];
        if !(diagonal > T::zero()) {
            return Err(FitError::NumericalInstability {
                index: 0,
                eigenvalue: diagonal.as_f64(),
            });
        }
        scales.push(diagonal.sqrt().recip());
    }
    let mut rescaled = precision.clone();
    for i in 0..n {
        for j in 0..n {
            rescaled.set(&[i, j], precision[&vec![i, j]] * scales[i] * scales[j])?;
        }
    }

    let eigen = symmetric_eigen(&rescaled)?;
    let largest = eigen.values.iter().copied().fold(T::zero(), T::max);
    let floor = largest * T::epsilon().sqrt();
    match eigen
        .values
        .iter()
        .enumerate()
        .find(|&(_, &value)| !(value > T::zero() && value > floor))
    {
        Some((index, &eigenvalue)) => Err(FitError::NumericalInstability {
            index,
            eigenvalue: eigenvalue.as_f64(),
        }),
        None => Ok(()),
    }
}

/// The p-value column of [`summarize_coefficients`].
pub fn coefficient_p_values<T: Real>(
    params: &Parameters<T>,
    residual_variance: T,
    features: &Tensor<T>,
) -> Result<Vec<T>> {
    Ok(summarize_coefficients(params, residual_variance, features)?
        .into_iter()
        .map(|row| row.p_value)
        .collect())
}

#[test]
fn test_erfc_known_values() {
    assert!((erfc(0.0) - 1.0).abs() < 1e-7);
    assert!((erfc(1.0) - 0.157_299_207).abs() < 1e-7);
    assert!((erfc(-1.0) - 1.842_700_793).abs() < 1e-7);
    assert_eq!(erfc(40.0), 0.0);
}

#[test]
fn test_cdf_is_monotone() {
    let values: Vec<f64> = (-40..=40).map(|i| standard_normal_cdf(i as f64 * 0.2)).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(values[0] >= 0.0 && values[values.len() - 1] <= 1.0);
}

#[test]
fn test_summary_by_hand() {
    // X₁ᵀX₁ = 2·I, so with σ² = 1 every standard error is sqrt(1/√2)
    let features = Tensor::new(vec![-1.0, 1.0], vec![2, 1]);
    let se = std::f64::consts::FRAC_1_SQRT_2.sqrt();
    let params = Parameters::new(Tensor::vector(vec![0.0]), se).unwrap();
    let summary = summarize_coefficients(&params, 1.0, &features).unwrap();

    assert_eq!(summary.len(), 2);
    assert!((summary[0].std_error - se).abs() < 1e-12);
    assert!((summary[0].z_score - 1.0).abs() < 1e-12);
    assert!((summary[0].p_value - 0.317_310_508).abs() < 1e-6);
    assert_eq!(summary[1].p_value, 1.0);
}

#[test]
fn test_rejects_bad_residual_variance() {
    let features = Tensor::new(vec![-1.0, 1.0], vec![2, 1]);
    let params = Parameters::<f64>::zeros(1);
    for variance in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            coefficient_p_values(&params, variance, &features),
            Err(FitError::InvalidParameter(_))
        ));
    }
}

#[test]
fn test_widely_scaled_orthogonal_feature_is_full_rank() {
    // X₁ᵀX₁ = diag(4, 2.5·s²): orthogonal columns, only the scales differ
    for s in [1e5, 1e8] {
        let features = Tensor::new(vec![-s, s, -0.5 * s, 0.5 * s], vec![4, 1]);
        let params = Parameters::new(Tensor::vector(vec![1e-3 / s]), 0.5).unwrap();
        let summary = summarize_coefficients(&params, 1.0, &features).unwrap();

        assert!((summary[0].std_error - 0.5f64.sqrt()).abs() < 1e-12);
        let slope_se = (2.5f64.sqrt() * s).recip().sqrt();
        assert!((summary[1].std_error / slope_se - 1.0).abs() < 1e-9);
        for row in &summary {
            assert!((0.0..=1.0).contains(&row.p_value), "{row:?}");
        }
    }
}
