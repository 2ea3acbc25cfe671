//! Copula-weighted Value-at-Risk.
//!
//! For each time step the solver finds `z` with
//!
//! ```text
//! ∫_{y ∈ R} ∫_{x <= z} K(F1(x), F2(y)) f1(x) f2(y) dx dy = alpha
//! ```
//!
//! where `f_i`/`F_i` are the one-step-ahead conditional mixtures of the two
//! fitted series and `K` is the Gaussian copula *CDF* (the default) or its
//! density. With the CDF weight and `rho = 0` the left side equals
//! `F1(z)^2 / 4`, so it never exceeds 1/4; levels above what the weight can
//! reach have no root and yield `NaN`. With the density weight the left side
//! is `F1(z)` for any `rho`, i.e. the plain univariate quantile.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::copula::GaussianCopula;
use crate::error::{MsmError, MsmResult};
use crate::marginal::{ConditionalMixture, MarginalModel};
use crate::numeric::{gaussian, GaussLegendre, Interval, Node, RootSearch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TailWeight {
    /// Copula CDF inside the density-weighted integral.
    #[serde(rename = "cdf")]
    CopulaCdf,
    /// Copula density; the integral collapses to the first marginal's CDF.
    #[serde(rename = "density")]
    CopulaDensity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailRiskConfig {
    pub alpha: f64,
    pub weight: TailWeight,
    pub quadrature_nodes: usize,
    pub tolerance: f64,
    pub max_iters: u64,
    pub max_expansions: usize,
    pub parallel: bool,
}

impl Default for TailRiskConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            weight: TailWeight::CopulaCdf,
            quadrature_nodes: 48,
            tolerance: 1e-10,
            max_iters: 100,
            max_expansions: 30,
            parallel: true,
        }
    }
}

impl TailRiskConfig {
    pub fn validate(&self) -> MsmResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(MsmError::InvalidArgument(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.quadrature_nodes < 4 {
            return Err(MsmError::InvalidArgument(format!(
                "quadrature_nodes must be at least 4, got {}",
                self.quadrature_nodes
            )));
        }
        Ok(())
    }
}

/// Values of one marginal at the quadrature nodes.
struct NodeValues {
    densities: Vec<f64>,
    scores: Vec<f64>,
}

impl NodeValues {
    fn new(nodes: &[Node], mix: &ConditionalMixture<'_>) -> Self {
        let mut densities = Vec::with_capacity(nodes.len());
        let mut scores = Vec::with_capacity(nodes.len());
        for n in nodes {
            densities.push(mix.pdf(n.x));
            scores.push(gaussian::inv_cdf(mix.cdf(n.x)));
        }
        Self {
            densities,
            scores,
        }
    }
}

pub struct TailRiskSolver {
    cfg: TailRiskConfig,
    rule: GaussLegendre,
}

impl TailRiskSolver {
    pub fn new(cfg: TailRiskConfig) -> MsmResult<Self> {
        cfg.validate()?;
        let rule = GaussLegendre::new(cfg.quadrature_nodes)?;
        Ok(Self { cfg, rule })
    }

    pub fn config(&self) -> &TailRiskConfig {
        &self.cfg
    }

    fn kernel(&self, copula: &GaussianCopula, x: f64, y: f64) -> f64 {
        match self.cfg.weight {
            TailWeight::CopulaCdf => copula.cdf_normal_scores(x, y),
            TailWeight::CopulaDensity => copula.density_normal_scores(x, y),
        }
    }

    /// Left side of the VaR equation at `z` for one time step.
    pub fn tail_mass(
        &self,
        first: &ConditionalMixture<'_>,
        second: &ConditionalMixture<'_>,
        copula: &GaussianCopula,
        z: f64,
    ) -> f64 {
        let outer = self.rule.nodes(&Interval::Real {
            center: 0.0,
            scale: second.std_dev(),
        });
        let ys = NodeValues::new(&outer, second);
        self.tail_mass_with(first, &outer, &ys, copula, z)
    }

    fn tail_mass_with(
        &self,
        first: &ConditionalMixture<'_>,
        outer: &[Node],
        ys: &NodeValues,
        copula: &GaussianCopula,
        z: f64,
    ) -> f64 {
        let inner = self.rule.nodes(&Interval::UpperBounded {
            upper: z,
            scale: first.std_dev(),
        });
        let xs = NodeValues::new(&inner, first);
        GaussLegendre::integrate_2d_nodes(outer, &inner, |o, i| {
            let (yi, xi) = (o.index, i.index);
            self.kernel(copula, xs.scores[xi], ys.scores[yi]) * xs.densities[xi] * ys.densities[yi]
        })
    }

    /// VaR at one time step, `NaN` if the level cannot be bracketed.
    pub fn solve_step(
        &self,
        first: &ConditionalMixture<'_>,
        second: &ConditionalMixture<'_>,
        copula: &GaussianCopula,
    ) -> MsmResult<f64> {
        let outer = self.rule.nodes(&Interval::Real {
            center: 0.0,
            scale: second.std_dev(),
        });
        let ys = NodeValues::new(&outer, second);
        let alpha = self.cfg.alpha;
        let search = RootSearch {
            initial_step: first.std_dev(),
            max_expansions: self.cfg.max_expansions,
            tolerance: self.cfg.tolerance * first.std_dev(),
            max_iters: self.cfg.max_iters,
        };
        let root = search.solve(
            |z| self.tail_mass_with(first, &outer, &ys, copula, z) - alpha,
            0.0,
        )?;
        Ok(root.unwrap_or(f64::NAN))
    }

    /// One VaR per time step. Both models must cover the same number of steps.
    pub fn var_series(
        &self,
        first: &MarginalModel,
        second: &MarginalModel,
        rho: f64,
    ) -> MsmResult<Vec<f64>> {
        MsmError::ensure_same_len("first marginal", first.len(), "second marginal", second.len())?;
        let copula = GaussianCopula::new(rho)?;
        let solve = |t: usize| self.solve_step(&first.at(t), &second.at(t), &copula);
        let out: Vec<f64> = if self.cfg.parallel {
            (0..first.len())
                .into_par_iter()
                .map(solve)
                .collect::<MsmResult<_>>()?
        } else {
            (0..first.len()).map(solve).collect::<MsmResult<_>>()?
        };

        let unsolved = out.iter().filter(|v| v.is_nan()).count();
        if unsolved > 0 {
            tracing::warn!(
                unsolved,
                steps = out.len(),
                alpha = self.cfg.alpha,
                rho,
                "VaR level not reachable for some steps"
            );
        }
        Ok(out)
    }
}

/// Full-signature entry point: builds both conditional models and solves every step.
#[allow(clippy::too_many_arguments)]
pub fn var_series(
    returns1: &[f64],
    filtered1: &nalgebra::DMatrix<f64>,
    sigma1: f64,
    m0_1: f64,
    returns2: &[f64],
    filtered2: &nalgebra::DMatrix<f64>,
    sigma2: f64,
    m0_2: f64,
    k: usize,
    rho: f64,
    cfg: &TailRiskConfig,
) -> MsmResult<Vec<f64>> {
    MsmError::ensure_same_len("returns1", returns1.len(), "returns2", returns2.len())?;
    let first = MarginalModel::new(filtered1.clone(), sigma1, m0_1, k)?;
    let second = MarginalModel::new(filtered2.clone(), sigma2, m0_2, k)?;
    MsmError::ensure_same_len("returns1", returns1.len(), "filtered1 steps", first.len())?;
    TailRiskSolver::new(cfg.clone())?.var_series(&first, &second, rho)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_outside_unit_interval_rejected() {
        for alpha in [0.0, 1.0, -0.2, f64::NAN] {
            let cfg = TailRiskConfig {
                alpha,
                ..TailRiskConfig::default()
            };
            assert!(TailRiskSolver::new(cfg).is_err());
        }
    }

    #[test]
    fn independent_cdf_weight_mass_is_quarter_of_squared_cdf() {
        let scales = [0.8, 1.3];
        let weights = [0.4, 0.6];
        let mix = ConditionalMixture::new(&scales, &weights);
        let solver = TailRiskSolver::new(TailRiskConfig::default()).unwrap();
        let copula = GaussianCopula::new(0.0).unwrap();
        for z in [-1.5, 0.0, 0.7] {
            let got = solver.tail_mass(&mix, &mix, &copula, z);
            let expected = mix.cdf(z).powi(2) / 4.0;
            assert!((got - expected).abs() < 1e-5, "z={z}: {got} vs {expected}");
        }
    }
}
