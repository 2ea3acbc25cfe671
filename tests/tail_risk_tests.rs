use approx::assert_abs_diff_eq;
use msm_copula::estimator::MsmFit;
use msm_copula::marginal::{ConditionalMixture, MarginalModel};
use msm_copula::model::ModelParameters;
use msm_copula::risk::{var_series, TailRiskConfig, TailRiskSolver, TailWeight};
use msm_copula::MsmError;

const RETURNS: [f64; 10] = [0.5, -1.2, 0.3, 2.1, -0.7, 0.05, -1.8, 0.9, -0.2, 1.4];
const PARAMS: ModelParameters = ModelParameters {
    b: 2.0,
    gamma_k: 0.5,
    sigma: 1.0,
    m0: 1.5,
};

fn marginals() -> (MarginalModel, MarginalModel) {
    let second_returns: Vec<f64> = RETURNS.iter().rev().map(|r| 0.8 * r).collect();
    let fit1 = MsmFit::from_params(&RETURNS, 2, PARAMS).unwrap();
    let fit2 = MsmFit::from_params(&second_returns, 2, PARAMS).unwrap();
    (
        MarginalModel::new(fit1.filtered, PARAMS.sigma, PARAMS.m0, 2).unwrap(),
        MarginalModel::new(fit2.filtered, PARAMS.sigma, PARAMS.m0, 2).unwrap(),
    )
}

fn quantile(mix: &ConditionalMixture<'_>, p: f64) -> f64 {
    let (mut lo, mut hi) = (-50.0, 50.0);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mix.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

fn solver(alpha: f64, weight: TailWeight) -> TailRiskSolver {
    TailRiskSolver::new(TailRiskConfig {
        alpha,
        weight,
        ..TailRiskConfig::default()
    })
    .unwrap()
}

#[test]
fn density_weight_gives_first_marginal_quantile() {
    let (m1, m2) = marginals();
    let var = solver(0.05, TailWeight::CopulaDensity)
        .var_series(&m1, &m2, 0.4)
        .unwrap();
    assert_eq!(var.len(), RETURNS.len());
    for (t, v) in var.iter().enumerate() {
        assert_abs_diff_eq!(*v, quantile(&m1.at(t), 0.05), epsilon = 1e-3);
        assert!(*v < 0.0);
    }
}

#[test]
fn density_weight_median_is_zero_for_symmetric_marginals() {
    let (m1, m2) = marginals();
    let var = solver(0.5, TailWeight::CopulaDensity)
        .var_series(&m1, &m2, 0.0)
        .unwrap();
    for v in var {
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-3);
    }
}

#[test]
fn cdf_weight_independent_case_solves_closed_form() {
    // With rho = 0 the tail mass is F1(z)^2 / 4, so F1(VaR) = 2 sqrt(alpha).
    let (m1, m2) = marginals();
    let alpha = 0.05;
    let var = solver(alpha, TailWeight::CopulaCdf)
        .var_series(&m1, &m2, 0.0)
        .unwrap();
    for (t, v) in var.iter().enumerate() {
        assert_abs_diff_eq!(m1.at(t).cdf(*v), 2.0 * alpha.sqrt(), epsilon = 1e-4);
    }
}

#[test]
fn cdf_weight_unreachable_level_is_nan() {
    // The CDF-weighted mass never exceeds 1/4 when rho = 0.
    let (m1, m2) = marginals();
    let var = solver(0.5, TailWeight::CopulaCdf)
        .var_series(&m1, &m2, 0.0)
        .unwrap();
    assert!(var.iter().all(|v| v.is_nan()));
}

#[test]
fn var_is_monotone_in_alpha() {
    let (m1, m2) = marginals();
    let low = solver(0.01, TailWeight::CopulaCdf)
        .var_series(&m1, &m2, 0.5)
        .unwrap();
    let high = solver(0.05, TailWeight::CopulaCdf)
        .var_series(&m1, &m2, 0.5)
        .unwrap();
    for (l, h) in low.iter().zip(&high) {
        assert!(l < h, "{l} vs {h}");
    }
}

#[test]
fn parallel_and_sequential_agree() {
    let (m1, m2) = marginals();
    let parallel = solver(0.05, TailWeight::CopulaCdf)
        .var_series(&m1, &m2, 0.3)
        .unwrap();
    let sequential = TailRiskSolver::new(TailRiskConfig {
        parallel: false,
        ..TailRiskConfig::default()
    })
    .unwrap()
    .var_series(&m1, &m2, 0.3)
    .unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn free_function_matches_solver() {
    let second_returns: Vec<f64> = RETURNS.iter().rev().map(|r| 0.8 * r).collect();
    let fit1 = MsmFit::from_params(&RETURNS, 2, PARAMS).unwrap();
    let fit2 = MsmFit::from_params(&second_returns, 2, PARAMS).unwrap();
    let cfg = TailRiskConfig::default();
    let var = var_series(
        &RETURNS,
        &fit1.filtered,
        PARAMS.sigma,
        PARAMS.m0,
        &second_returns,
        &fit2.filtered,
        PARAMS.sigma,
        PARAMS.m0,
        2,
        0.3,
        &cfg,
    )
    .unwrap();
    let (m1, m2) = marginals();
    let direct = TailRiskSolver::new(cfg).unwrap().var_series(&m1, &m2, 0.3).unwrap();
    assert_eq!(var, direct);
}

#[test]
fn invalid_inputs_rejected() {
    let (m1, m2) = marginals();
    let s = solver(0.05, TailWeight::CopulaCdf);
    assert!(matches!(s.var_series(&m1, &m2, 1.0), Err(MsmError::Domain(_))));

    let fit = MsmFit::from_params(&RETURNS[..5], 2, PARAMS).unwrap();
    let short = MarginalModel::new(fit.filtered, PARAMS.sigma, PARAMS.m0, 2).unwrap();
    assert!(matches!(
        s.var_series(&m1, &short, 0.2),
        Err(MsmError::LengthMismatch { .. })
    ));
}
