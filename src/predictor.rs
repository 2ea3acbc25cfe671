use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{MsmError, MsmResult};

/// Fitted or forecast volatility, one value per time step (one value for a forecast).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityPath(pub Vec<f64>);

impl VolatilityPath {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scales per-period volatility to a yearly figure, e.g. `trading_days = 252`.
    pub fn annualized(&self, trading_days: u32) -> VolatilityPath {
        let factor = f64::from(trading_days).sqrt();
        VolatilityPath(self.0.iter().map(|v| v * factor).collect())
    }
}

/// `A^h` by repeated squaring.
pub fn matrix_power(a: &DMatrix<f64>, h: usize) -> DMatrix<f64> {
    let mut result = DMatrix::identity(a.nrows(), a.ncols());
    let mut base = a.clone();
    let mut e = h;
    while e > 0 {
        if e & 1 == 1 {
            result = &result * &base;
        }
        e >>= 1;
        if e > 0 {
            base = &base * &base;
        }
    }
    result
}

/// Volatility implied by state distributions.
///
/// `filtered` is `D x T` (one state distribution per column). With
/// `horizon = None` every column is mapped to `sigma * (pi_t . g)`; with
/// `Some(h)` only the last column is propagated `h` steps through
/// `transition` and a single forecast is returned.
pub fn predict(
    multipliers: &[f64],
    sigma: f64,
    filtered: &DMatrix<f64>,
    transition: &DMatrix<f64>,
    horizon: Option<usize>,
) -> MsmResult<VolatilityPath> {
    let d = multipliers.len();
    if filtered.nrows() != d {
        return Err(MsmError::InvalidArgument(format!(
            "filtered probabilities cover {} states, multipliers cover {d}",
            filtered.nrows()
        )));
    }
    let g = nalgebra::DVector::from_column_slice(multipliers);

    let Some(h) = horizon else {
        let vol = filtered.tr_mul(&g) * sigma;
        return Ok(VolatilityPath(vol.as_slice().to_vec()));
    };

    if h < 1 {
        return Err(MsmError::InvalidArgument(format!(
            "forecast horizon must be at least 1, got {h}"
        )));
    }
    if transition.nrows() != d || transition.ncols() != d {
        return Err(MsmError::InvalidArgument(format!(
            "transition matrix is {}x{}, expected {d}x{d}",
            transition.nrows(),
            transition.ncols()
        )));
    }
    if filtered.ncols() == 0 {
        return Err(MsmError::InvalidArgument(
            "cannot forecast from an empty filtered history".to_string(),
        ));
    }
    let last = filtered.column(filtered.ncols() - 1);
    let p_hat = matrix_power(transition, h).tr_mul(&last);
    Ok(VolatilityPath(vec![sigma * p_hat.dot(&g)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_matches_repeated_products() {
        let a = DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.3, 0.7]);
        let p5 = matrix_power(&a, 5);
        let naive = &a * &a * &a * &a * &a;
        assert!((p5 - naive).abs().max() < 1e-14);
        assert_eq!(matrix_power(&a, 0), DMatrix::identity(2, 2));
    }

    #[test]
    fn zero_horizon_rejected() {
        let a = DMatrix::identity(2, 2);
        let pi = DMatrix::from_element(2, 1, 0.5);
        assert!(matches!(
            predict(&[1.0, 2.0], 1.0, &pi, &a, Some(0)),
            Err(MsmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn annualized_scales_by_sqrt_days() {
        let v = VolatilityPath(vec![0.01, 0.02]).annualized(252);
        assert!((v.0[0] - 0.01 * 252f64.sqrt()).abs() < 1e-15);
    }
}
