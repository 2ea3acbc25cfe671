//! Two-series workflow: fit both marginals, couple them, solve the VaR path.

use serde::{Deserialize, Serialize};

use crate::copula::{fit_rho, CopulaConfig, RhoFit};
use crate::error::{MsmError, MsmResult};
use crate::estimator::{EstimatorConfig, MsmFit, ParameterEstimator};
use crate::marginal::MarginalModel;
use crate::model::ModelParameters;
use crate::predictor::VolatilityPath;
use crate::risk::{TailRiskConfig, TailRiskSolver, TailWeight};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of volatility components `k`.
    pub components: usize,
    pub trading_days: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            components: 3,
            trading_days: 252,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub estimator: EstimatorConfig,
    pub copula: CopulaConfig,
    pub tail_risk: TailRiskConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> MsmResult<()> {
        if self.model.components == 0 {
            return Err(MsmError::Config("model.components must be at least 1".into()));
        }
        if self.model.trading_days == 0 {
            return Err(MsmError::Config("model.trading_days must be positive".into()));
        }
        self.estimator.validate()?;
        self.copula.validate()?;
        self.tail_risk.validate()
    }
}

/// A centered return series and the name it is reported under.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub label: &'a str,
    pub returns: &'a [f64],
}

#[derive(Debug, Clone, Serialize)]
pub struct MarginalReport {
    pub label: String,
    pub observations: usize,
    pub params: ModelParameters,
    pub neg_log_likelihood: f64,
    pub volatility: VolatilityPath,
    pub annualized_volatility: VolatilityPath,
    /// One-step-ahead volatility after the last observation.
    pub forecast: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JointReport {
    pub components: usize,
    pub first: MarginalReport,
    pub second: MarginalReport,
    pub copula: RhoFit,
    pub alpha: f64,
    pub weight: TailWeight,
    /// Unreachable levels serialize as `null`.
    pub value_at_risk: Vec<f64>,
}

fn marginal_report(label: &str, fit: &MsmFit, trading_days: u32) -> MsmResult<MarginalReport> {
    let volatility = fit.fitted_volatility()?;
    Ok(MarginalReport {
        label: label.to_string(),
        observations: fit.log_likelihoods.len(),
        params: fit.params,
        neg_log_likelihood: fit.neg_log_likelihood,
        annualized_volatility: volatility.annualized(trading_days),
        volatility,
        forecast: fit.forecast(1)?,
    })
}

pub fn run_joint(
    first: SeriesInput<'_>,
    second: SeriesInput<'_>,
    cfg: &PipelineConfig,
) -> MsmResult<JointReport> {
    cfg.validate()?;
    MsmError::ensure_same_len("first series", first.returns.len(), "second series", second.returns.len())?;
    let k = cfg.model.components;
    let estimator = ParameterEstimator::new(cfg.estimator.clone())?;

    let (fit1, fit2) = rayon::join(
        || estimator.estimate(first.returns, k),
        || estimator.estimate(second.returns, k),
    );
    let (fit1, fit2) = (fit1?, fit2?);
    for (label, fit) in [(first.label, &fit1), (second.label, &fit2)] {
        tracing::info!(
            series = label,
            b = fit.params.b,
            gamma_k = fit.params.gamma_k,
            sigma = fit.params.sigma,
            m0 = fit.params.m0,
            neg_log_likelihood = fit.neg_log_likelihood,
            "fitted MSM marginal"
        );
    }

    let marginal1 = MarginalModel::new(fit1.filtered.clone(), fit1.params.sigma, fit1.params.m0, k)?;
    let marginal2 = MarginalModel::new(fit2.filtered.clone(), fit2.params.sigma, fit2.params.m0, k)?;
    let copula = fit_rho(
        &marginal1.densities(first.returns)?,
        &marginal2.densities(second.returns)?,
        &marginal1.cdfs(first.returns)?,
        &marginal2.cdfs(second.returns)?,
        &cfg.copula,
    )?;
    tracing::info!(
        rho = copula.rho,
        neg_log_likelihood = copula.neg_log_likelihood,
        "fitted copula correlation"
    );

    let solver = TailRiskSolver::new(cfg.tail_risk.clone())?;
    let value_at_risk = solver.var_series(&marginal1, &marginal2, copula.rho)?;
    tracing::info!(
        steps = value_at_risk.len(),
        alpha = cfg.tail_risk.alpha,
        "computed VaR series"
    );

    Ok(JointReport {
        components: k,
        first: marginal_report(first.label, &fit1, cfg.model.trading_days)?,
        second: marginal_report(second.label, &fit2, cfg.model.trading_days)?,
        copula,
        alpha: cfg.tail_risk.alpha,
        weight: cfg.tail_risk.weight,
        value_at_risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unequal_series_rejected_before_fitting() {
        let a = [0.01, -0.02, 0.005];
        let b = [0.01, -0.02];
        let out = run_joint(
            SeriesInput { label: "a", returns: &a },
            SeriesInput { label: "b", returns: &b },
            &PipelineConfig::default(),
        );
        assert!(matches!(out, Err(MsmError::LengthMismatch { .. })));
    }

    #[test]
    fn zero_components_is_a_config_error() {
        let cfg = PipelineConfig {
            model: ModelConfig {
                components: 0,
                ..ModelConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(MsmError::Config(_))));
    }
}
