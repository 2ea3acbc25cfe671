use crate::error::{MsmError, MsmResult};
use crate::numeric::gaussian;

/// Gaussian copula.
///
/// `C(u, v; rho) = Phi2(Phi^-1(u), Phi^-1(v); rho)` and its density
/// `c(u, v; rho) = phi2(x, y; rho) / (phi(x) phi(y))` with `x = Phi^-1(u)`,
/// `y = Phi^-1(v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCopula {
    rho: f64,
}

impl GaussianCopula {
    /// Needs `rho` strictly inside (-1, 1) so that the density exists.
    pub fn new(rho: f64) -> MsmResult<Self> {
        if !rho.is_finite() || rho <= -1.0 || rho >= 1.0 {
            return Err(MsmError::Domain(format!(
                "copula correlation must lie in (-1, 1), got {rho}"
            )));
        }
        Ok(Self { rho })
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn cdf(&self, u: f64, v: f64) -> f64 {
        if u <= 0.0 || v <= 0.0 {
            return 0.0;
        }
        self.cdf_normal_scores(gaussian::inv_cdf(u), gaussian::inv_cdf(v))
    }

    pub fn density(&self, u: f64, v: f64) -> f64 {
        self.density_normal_scores(gaussian::inv_cdf(u), gaussian::inv_cdf(v))
    }

    /// Same as [`Self::cdf`] for pre-transformed scores `x = Phi^-1(u)`, `y = Phi^-1(v)`.
    #[inline]
    pub fn cdf_normal_scores(&self, x: f64, y: f64) -> f64 {
        gaussian::bivariate_cdf(x, y, self.rho)
    }

    /// Same as [`Self::density`] for pre-transformed scores.
    #[inline]
    pub fn density_normal_scores(&self, x: f64, y: f64) -> f64 {
        let r = self.rho;
        let one_minus = 1.0 - r * r;
        // phi2 / (phi phi) simplified to avoid 0 / 0 in the tails.
        (-(r * r * (x * x + y * y) - 2.0 * r * x * y) / (2.0 * one_minus)).exp() / one_minus.sqrt()
    }
}
