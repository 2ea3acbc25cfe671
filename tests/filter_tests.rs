use approx::assert_abs_diff_eq;
use msm_copula::filter::{forward_filter, negative_log_likelihood, FilterScratch};
use msm_copula::model::{emission_matrix, ModelParameters, StateSpace};
use msm_copula::MsmError;
use nalgebra::DMatrix;

const RETURNS: [f64; 10] = [0.5, -1.2, 0.3, 2.1, -0.7, 0.05, -1.8, 0.9, -0.2, 1.4];

fn reference_params() -> ModelParameters {
    ModelParameters {
        b: 2.0,
        gamma_k: 0.5,
        sigma: 1.0,
        m0: 1.5,
    }
}

fn reference_inputs() -> (DMatrix<f64>, DMatrix<f64>) {
    let params = reference_params();
    let space = StateSpace::new(2, &params).unwrap();
    let w = emission_matrix(&RETURNS, &space.scales(params.sigma)).unwrap();
    (space.transition, w)
}

fn assert_column(filtered: &DMatrix<f64>, t: usize, expected: &[f64]) {
    for (i, e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(filtered[(i, t)], *e, epsilon = 1e-12);
    }
}

#[test]
fn two_component_reference_run() {
    let (a, w) = reference_inputs();
    let out = forward_filter(&a, &w).unwrap();

    assert_abs_diff_eq!(out.neg_log_likelihood, 16.601512665971043, epsilon = 1e-10);
    assert_eq!(out.log_likelihoods.len(), 10);
    assert_eq!(out.filtered.shape(), (4, 11));

    assert_column(&out.filtered, 0, &[0.25; 4]);
    assert_column(
        &out.filtered,
        1,
        &[
            0.16602041868517778,
            0.25731623584761215,
            0.25731623584761215,
            0.3193471096195979,
        ],
    );
    assert_column(
        &out.filtered,
        2,
        &[
            0.2753022166052698,
            0.305814948906194,
            0.3256621491078623,
            0.09322068538067396,
        ],
    );
    assert_column(
        &out.filtered,
        10,
        &[
            0.37368296592059563,
            0.3238372868349551,
            0.266652878756772,
            0.035826868487677285,
        ],
    );
}

#[test]
fn posteriors_are_distributions() {
    let (a, w) = reference_inputs();
    let out = forward_filter(&a, &w).unwrap();
    for col in out.filtered.column_iter() {
        assert_abs_diff_eq!(col.sum(), 1.0, epsilon = 1e-12);
        assert!(col.iter().all(|p| *p >= 0.0));
    }
    assert_eq!(out.posteriors().ncols(), 10);
}

#[test]
fn scratch_objective_matches_full_filter() {
    let (a, w) = reference_inputs();
    let full = forward_filter(&a, &w).unwrap();
    let mut scratch = FilterScratch::new(4);
    let first = negative_log_likelihood(&a, &w, &mut scratch).unwrap();
    let second = negative_log_likelihood(&a, &w, &mut scratch).unwrap();
    assert_eq!(first, full.neg_log_likelihood);
    assert_eq!(second, first);
}

#[test]
fn equal_scales_reduce_to_iid_normal_likelihood() {
    let params = ModelParameters {
        b: 2.0,
        gamma_k: 0.5,
        sigma: 0.7,
        m0: 1.0,
    };
    let space = StateSpace::new(1, &params).unwrap();
    let w = emission_matrix(&RETURNS, &space.scales(params.sigma)).unwrap();
    let out = forward_filter(&space.transition, &w).unwrap();
    assert_abs_diff_eq!(out.neg_log_likelihood, 18.61498283143489, epsilon = 1e-10);
}

#[test]
fn empty_series_has_zero_likelihood() {
    let (a, _) = reference_inputs();
    let w = DMatrix::zeros(4, 0);
    let out = forward_filter(&a, &w).unwrap();
    assert_eq!(out.neg_log_likelihood, 0.0);
    assert_eq!(out.filtered.shape(), (4, 1));
}

#[test]
fn mismatched_state_counts_rejected() {
    let (a, _) = reference_inputs();
    let w = DMatrix::from_element(2, 3, 0.1);
    assert!(matches!(
        forward_filter(&a, &w),
        Err(MsmError::InvalidArgument(_))
    ));
}
