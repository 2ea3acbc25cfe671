//! One-step-ahead conditional distributions of a fitted MSM series.
//!
//! At time `t` the return is a zero-mean Gaussian mixture: state `i` has
//! volatility `sigma * g(i)` and weight `pi_t[i]`, the filtered posterior
//! after observation `t - 1` (the uniform prior for `t = 0`). The filtered
//! history passed in is therefore the full `D x (T + 1)` matrix.

use nalgebra::DMatrix;

use crate::error::{MsmError, MsmResult};
use crate::model::build_states;
use crate::numeric::gaussian;

/// Gaussian scale mixture with fixed weights.
#[derive(Debug, Clone)]
pub struct ConditionalMixture<'a> {
    scales: &'a [f64],
    weights: &'a [f64],
}

impl<'a> ConditionalMixture<'a> {
    pub fn new(scales: &'a [f64], weights: &'a [f64]) -> Self {
        Self { scales, weights }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        self.scales
            .iter()
            .zip(self.weights)
            .map(|(s, w)| w * gaussian::scaled_pdf(x, *s))
            .sum()
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.scales
            .iter()
            .zip(self.weights)
            .map(|(s, w)| w * gaussian::cdf(x / s))
            .sum()
    }

    /// Mixture standard deviation, used to size integration maps and root brackets.
    pub fn std_dev(&self) -> f64 {
        self.scales
            .iter()
            .zip(self.weights)
            .map(|(s, w)| w * s * s)
            .sum::<f64>()
            .sqrt()
    }
}

/// Per-state scales and the filtered history of one fitted series.
#[derive(Debug, Clone)]
pub struct MarginalModel {
    scales: Vec<f64>,
    filtered: DMatrix<f64>,
}

impl MarginalModel {
    pub fn new(filtered: DMatrix<f64>, sigma: f64, m0: f64, k: usize) -> MsmResult<Self> {
        let scales: Vec<f64> = build_states(k, m0)?.iter().map(|g| sigma * g).collect();
        if let Some(bad) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(MsmError::Domain(format!(
                "state volatility must be finite and positive, got {bad}"
            )));
        }
        if filtered.nrows() != scales.len() {
            return Err(MsmError::InvalidArgument(format!(
                "filtered history has {} states, a {k}-component model has {}",
                filtered.nrows(),
                scales.len()
            )));
        }
        Ok(Self { scales, filtered })
    }

    /// Number of time steps that have a conditional distribution.
    pub fn len(&self) -> usize {
        self.filtered.ncols().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Conditional distribution of the return at time `t`.
    ///
    /// Column `t` of the history: the prior at `t = 0`, the posterior after
    /// observation `t - 1` otherwise. A `t - 1` lookup that wraps to the last
    /// posterior at `t = 0` is deliberately not used.
    pub fn at(&self, t: usize) -> ConditionalMixture<'_> {
        let d = self.scales.len();
        let weights = &self.filtered.as_slice()[t * d..(t + 1) * d];
        ConditionalMixture::new(&self.scales, weights)
    }

    fn check_len(&self, returns: &[f64]) -> MsmResult<()> {
        MsmError::ensure_same_len("returns", returns.len(), "filtered history", self.len())
    }

    pub fn densities(&self, returns: &[f64]) -> MsmResult<Vec<f64>> {
        self.check_len(returns)?;
        Ok(returns
            .iter()
            .enumerate()
            .map(|(t, &y)| self.at(t).pdf(y))
            .collect())
    }

    pub fn cdfs(&self, returns: &[f64]) -> MsmResult<Vec<f64>> {
        self.check_len(returns)?;
        Ok(returns
            .iter()
            .enumerate()
            .map(|(t, &y)| self.at(t).cdf(y))
            .collect())
    }
}

/// Conditional densities `f(y_t | y_1..y_{t-1})`.
pub fn conditional_densities(
    returns: &[f64],
    filtered: &DMatrix<f64>,
    sigma: f64,
    m0: f64,
    k: usize,
) -> MsmResult<Vec<f64>> {
    MarginalModel::new(filtered.clone(), sigma, m0, k)?.densities(returns)
}

/// Conditional CDF values `F(y_t | y_1..y_{t-1})`.
pub fn conditional_cdfs(
    returns: &[f64],
    filtered: &DMatrix<f64>,
    sigma: f64,
    m0: f64,
    k: usize,
) -> MsmResult<Vec<f64>> {
    MarginalModel::new(filtered.clone(), sigma, m0, k)?.cdfs(returns)
}
