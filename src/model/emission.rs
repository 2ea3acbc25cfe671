use nalgebra::DMatrix;

use crate::error::{MsmError, MsmResult};
use crate::numeric::gaussian;

/// Added to every density so that the evidence of an observation is never exactly zero.
pub const DENSITY_FLOOR: f64 = 1e-16;

/// Per-state observation densities, one column per time step.
///
/// Column `t` holds `w[t, i] = N(returns[t]; 0, scales[i]) + DENSITY_FLOOR`,
/// so the result is `D x T` and each time slice is contiguous.
pub fn emission_matrix(returns: &[f64], scales: &[f64]) -> MsmResult<DMatrix<f64>> {
    let mut w = DMatrix::zeros(scales.len(), returns.len());
    emission_matrix_into(returns, scales, &mut w)?;
    Ok(w)
}

/// Fills a caller-owned buffer, resizing it only when the shape changed.
pub fn emission_matrix_into(
    returns: &[f64],
    scales: &[f64],
    out: &mut DMatrix<f64>,
) -> MsmResult<()> {
    if let Some(bad) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(MsmError::Domain(format!(
            "state volatility must be finite and positive, got {bad}"
        )));
    }
    let d = scales.len();
    if out.nrows() != d || out.ncols() != returns.len() {
        *out = DMatrix::zeros(d, returns.len());
    }
    for (col, &r) in out.as_mut_slice().chunks_exact_mut(d.max(1)).zip(returns) {
        for (cell, &s) in col.iter_mut().zip(scales) {
            *cell = gaussian::scaled_pdf(r, s) + DENSITY_FLOOR;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_time_slices() {
        let w = emission_matrix(&[0.0, 1.0, -2.0], &[1.0, 2.0]).unwrap();
        assert_eq!(w.shape(), (2, 3));
        let expected = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        assert!((w[(0, 0)] - expected).abs() < 1e-15);
        assert!((w[(1, 2)] - gaussian::pdf(-1.0) / 2.0).abs() < 1e-15);
    }

    #[test]
    fn zero_scale_is_a_domain_error() {
        assert!(matches!(
            emission_matrix(&[0.1], &[1.0, 0.0]),
            Err(MsmError::Domain(_))
        ));
    }

    #[test]
    fn far_tail_hits_the_floor() {
        let w = emission_matrix(&[100.0], &[0.01]).unwrap();
        assert_eq!(w[(0, 0)], DENSITY_FLOOR);
    }
}
