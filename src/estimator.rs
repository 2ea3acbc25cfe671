use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::particleswarm::ParticleSwarm;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use crate::error::{MsmError, MsmResult};
use crate::filter::{self, FilterOutput, FilterScratch};
use crate::model::{
    emission_matrix, emission_matrix_into, ModelParameters, ParamBounds, StateSpace,
    LARGE_STATE_SPACE_COMPONENTS,
};
use crate::predictor::{self, VolatilityPath};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub population_size: usize,
    pub seed: u64,
    pub max_iters: u64,
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
    pub bounds: ParamBounds,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            seed: 1,
            max_iters: 100,
            inertia: 1.0 / (2.0 * 2f64.ln()),
            cognitive: 0.5 + 2f64.ln(),
            social: 0.5 + 2f64.ln(),
            bounds: ParamBounds::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> MsmResult<()> {
        self.bounds.validate()?;
        if self.population_size < 2 {
            return Err(MsmError::Config(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.max_iters == 0 {
            return Err(MsmError::Config("max_iters must be positive".to_string()));
        }
        for (name, v) in [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(MsmError::Config(format!(
                    "{name} weight must be finite and non-negative, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ObjectiveScratch {
    emissions: DMatrix<f64>,
    filter: FilterScratch,
}

/// Negative log-likelihood of `[b, gamma_k, sigma, m0]` for a fixed series.
///
/// Candidates that break a closed-form domain check cost `+inf` instead of
/// aborting the search.
pub struct MsmObjective<'a> {
    returns: &'a [f64],
    components: usize,
    scratch: RefCell<ObjectiveScratch>,
}

impl<'a> MsmObjective<'a> {
    pub fn new(returns: &'a [f64], components: usize) -> Self {
        Self {
            returns,
            components,
            scratch: RefCell::new(ObjectiveScratch::default()),
        }
    }

    pub fn try_evaluate(&self, params: &ModelParameters) -> MsmResult<f64> {
        let space = StateSpace::new(self.components, params)?;
        let mut scratch = self.scratch.borrow_mut();
        let ObjectiveScratch { emissions, filter } = &mut *scratch;
        emission_matrix_into(self.returns, &space.scales(params.sigma), emissions)?;
        filter::negative_log_likelihood(&space.transition, emissions, filter)
    }

    pub fn evaluate(&self, theta: &[f64]) -> f64 {
        let outcome = ModelParameters::from_slice(theta).and_then(|p| self.try_evaluate(&p));
        match outcome {
            Ok(v) if v.is_nan() => f64::INFINITY,
            Ok(v) => v,
            Err(e) => {
                tracing::trace!(?theta, error = %e, "objective rejected candidate");
                f64::INFINITY
            }
        }
    }
}

impl CostFunction for MsmObjective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.evaluate(theta))
    }
}

/// A fitted MSM model and everything downstream stages read from it.
#[derive(Debug, Clone)]
pub struct MsmFit {
    pub components: usize,
    pub params: ModelParameters,
    pub neg_log_likelihood: f64,
    pub log_likelihoods: Vec<f64>,
    /// `D x (T + 1)`; column 0 is the prior.
    pub filtered: DMatrix<f64>,
    pub transition: DMatrix<f64>,
    pub multipliers: Vec<f64>,
}

impl MsmFit {
    /// Evaluates a fixed parameter vector on `returns` without any search.
    pub fn from_params(returns: &[f64], k: usize, params: ModelParameters) -> MsmResult<Self> {
        let space = StateSpace::new(k, &params)?;
        let emissions = emission_matrix(returns, &space.scales(params.sigma))?;
        let FilterOutput {
            neg_log_likelihood,
            log_likelihoods,
            filtered,
        } = filter::forward_filter(&space.transition, &emissions)?;
        Ok(Self {
            components: k,
            params,
            neg_log_likelihood,
            log_likelihoods,
            filtered,
            transition: space.transition,
            multipliers: space.multipliers,
        })
    }

    /// Posterior columns `1..=T`.
    pub fn posteriors(&self) -> DMatrix<f64> {
        self.filtered
            .columns(1, self.filtered.ncols().saturating_sub(1))
            .into_owned()
    }

    /// In-sample volatility, one value per observation.
    pub fn fitted_volatility(&self) -> MsmResult<VolatilityPath> {
        predictor::predict(
            &self.multipliers,
            self.params.sigma,
            &self.posteriors(),
            &self.transition,
            None,
        )
    }

    /// Volatility `h` steps past the last observation.
    pub fn forecast(&self, h: usize) -> MsmResult<f64> {
        let path = predictor::predict(
            &self.multipliers,
            self.params.sigma,
            &self.posteriors(),
            &self.transition,
            Some(h),
        )?;
        Ok(path.0[0])
    }
}

pub struct ParameterEstimator {
    cfg: EstimatorConfig,
}

impl ParameterEstimator {
    pub fn new(cfg: EstimatorConfig) -> MsmResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.cfg
    }

    /// Runs one seeded swarm over the parameter box and refits at the best point.
    pub fn estimate(&self, returns: &[f64], k: usize) -> MsmResult<MsmFit> {
        crate::model::state_count(k)?;
        if returns.is_empty() {
            return Err(MsmError::InvalidArgument(
                "cannot estimate an MSM model from an empty series".to_string(),
            ));
        }
        if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
            return Err(MsmError::InvalidArgument(format!(
                "return series contains a non-finite value ({bad})"
            )));
        }
        if k > LARGE_STATE_SPACE_COMPONENTS {
            tracing::warn!(
                components = k,
                states = 1usize << k,
                "large MSM state space, each likelihood evaluation is O(4^k)"
            );
        }

        let cfg = &self.cfg;
        let solver = ParticleSwarm::new(
            (cfg.bounds.lower(), cfg.bounds.upper()),
            cfg.population_size,
        )
        .with_inertia_factor(cfg.inertia)?
        .with_cognitive_factor(cfg.cognitive)?
        .with_social_factor(cfg.social)?
        .with_rng_generator(StdRng::seed_from_u64(cfg.seed));

        let res = Executor::new(MsmObjective::new(returns, k), solver)
            .configure(|state| state.max_iters(cfg.max_iters))
            .run()?;
        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| MsmError::Optimizer("particle swarm produced no candidate".into()))?;
        let params = ModelParameters::from_slice(&best.position)?;
        tracing::debug!(
            iterations = state.get_iter(),
            best_cost = state.get_best_cost(),
            ?params,
            "particle swarm finished"
        );

        MsmFit::from_params(returns, k, params)
    }
}
