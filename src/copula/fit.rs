use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::brent::BrentOpt;
use serde::{Deserialize, Serialize};

use crate::copula::gaussian::GaussianCopula;
use crate::error::{MsmError, MsmResult};
use crate::numeric::gaussian;

/// Lower clamp on the copula density before taking logs.
pub const COPULA_DENSITY_FLOOR: f64 = 1e-20;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CopulaConfig {
    pub initial_rho: f64,
    pub rho_bounds: (f64, f64),
    pub max_iters: u64,
}

impl Default for CopulaConfig {
    fn default() -> Self {
        Self {
            initial_rho: 0.5,
            rho_bounds: (-0.99, 0.99),
            max_iters: 200,
        }
    }
}

impl CopulaConfig {
    pub fn validate(&self) -> MsmResult<()> {
        let (lo, hi) = self.rho_bounds;
        if !(lo > -1.0 && hi < 1.0 && lo < hi) {
            return Err(MsmError::Config(format!(
                "rho_bounds must satisfy -1 < lower < upper < 1, got ({lo}, {hi})"
            )));
        }
        if !self.initial_rho.is_finite() {
            return Err(MsmError::Config("initial_rho must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RhoFit {
    pub rho: f64,
    pub neg_log_likelihood: f64,
}

/// Joint negative log-likelihood of two marginals coupled by a Gaussian copula.
///
/// Normal scores and the marginal log-density sum are computed once; each
/// evaluation in `rho` is a single pass over the scores.
pub struct CopulaLikelihood {
    scores: Vec<(f64, f64)>,
    marginal_log_density: f64,
}

impl CopulaLikelihood {
    pub fn new(
        densities1: &[f64],
        densities2: &[f64],
        cdfs1: &[f64],
        cdfs2: &[f64],
    ) -> MsmResult<Self> {
        let n = densities1.len();
        MsmError::ensure_same_len("densities1", n, "densities2", densities2.len())?;
        MsmError::ensure_same_len("densities1", n, "cdfs1", cdfs1.len())?;
        MsmError::ensure_same_len("densities1", n, "cdfs2", cdfs2.len())?;
        let scores = cdfs1
            .iter()
            .zip(cdfs2)
            .map(|(u, v)| (gaussian::inv_cdf(*u), gaussian::inv_cdf(*v)))
            .collect();
        let marginal_log_density = densities1
            .iter()
            .zip(densities2)
            .map(|(f1, f2)| f1.ln() + f2.ln())
            .sum();
        Ok(Self {
            scores,
            marginal_log_density,
        })
    }

    pub fn neg_log_likelihood(&self, rho: f64) -> f64 {
        let Ok(copula) = GaussianCopula::new(rho) else {
            return f64::INFINITY;
        };
        let log_copula: f64 = self
            .scores
            .iter()
            .map(|&(x, y)| {
                let c = copula.density_normal_scores(x, y);
                if c.is_nan() {
                    COPULA_DENSITY_FLOOR.ln()
                } else {
                    c.max(COPULA_DENSITY_FLOOR).ln()
                }
            })
            .sum();
        -(log_copula + self.marginal_log_density)
    }
}

impl CostFunction for CopulaLikelihood {
    type Param = f64;
    type Output = f64;

    fn cost(&self, rho: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.neg_log_likelihood(*rho))
    }
}

/// Fits the copula correlation with Brent's bounded scalar minimizer.
///
/// Brent's method is driven by the bracket; `cfg.initial_rho` is evaluated
/// too and wins if the search ends on a worse point.
pub fn fit_rho(
    densities1: &[f64],
    densities2: &[f64],
    cdfs1: &[f64],
    cdfs2: &[f64],
    cfg: &CopulaConfig,
) -> MsmResult<RhoFit> {
    cfg.validate()?;
    let likelihood = CopulaLikelihood::new(densities1, densities2, cdfs1, cdfs2)?;
    let (lo, hi) = cfg.rho_bounds;
    let initial = cfg.initial_rho.clamp(lo, hi);
    let initial_cost = likelihood.neg_log_likelihood(initial);

    let res = Executor::new(likelihood, BrentOpt::new(lo, hi))
        .configure(|state| state.param(initial).max_iters(cfg.max_iters))
        .run()?;
    let state = res.state();
    let rho = *state
        .get_best_param()
        .ok_or_else(|| MsmError::Optimizer("Brent search produced no point".to_string()))?;
    let cost = state.get_best_cost();
    tracing::debug!(rho, cost, iterations = state.get_iter(), "copula rho fitted");

    if initial_cost < cost {
        return Ok(RhoFit {
            rho: initial,
            neg_log_likelihood: initial_cost,
        });
    }
    Ok(RhoFit {
        rho,
        neg_log_likelihood: cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_inputs_rejected() {
        let out = fit_rho(
            &[0.1, 0.2],
            &[0.1],
            &[0.5, 0.5],
            &[0.5, 0.5],
            &CopulaConfig::default(),
        );
        assert!(matches!(out, Err(MsmError::LengthMismatch { .. })));
    }

    #[test]
    fn likelihood_at_zero_is_marginal_only() {
        let lik = CopulaLikelihood::new(&[0.5, 2.0], &[1.0, 0.25], &[0.2, 0.9], &[0.6, 0.3]).unwrap();
        let expected = -(0.5f64.ln() + 2.0f64.ln() + 1.0f64.ln() + 0.25f64.ln());
        assert!((lik.neg_log_likelihood(0.0) - expected).abs() < 1e-12);
        assert_eq!(lik.neg_log_likelihood(1.0), f64::INFINITY);
    }
}
