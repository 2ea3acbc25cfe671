//! Hamilton-style forward filter over the joint MSM states.
//!
//! Inputs use the crate-wide layout: the transition matrix is `D x D`
//! (row-stochastic), the emission matrix is `D x T` with one column per
//! observation, and the filtered history is `D x (T + 1)` where column 0 is
//! the uniform prior and column `t + 1` the posterior after observation `t`.

use nalgebra::DMatrix;

use crate::error::{MsmError, MsmResult};

/// Evidence at or below this is treated as an underflow.
pub const EVIDENCE_FLOOR: f64 = 1e-5;

/// Working vectors reused across repeated filter runs of the same width.
#[derive(Debug, Clone, Default)]
pub struct FilterScratch {
    current: Vec<f64>,
    next: Vec<f64>,
    predicted: Vec<f64>,
}

impl FilterScratch {
    pub fn new(states: usize) -> Self {
        Self {
            current: vec![0.0; states],
            next: vec![0.0; states],
            predicted: vec![0.0; states],
        }
    }

    fn reset(&mut self, states: usize) {
        self.current.clear();
        self.current.resize(states, 1.0 / states as f64);
        self.next.resize(states, 0.0);
        self.predicted.resize(states, 0.0);
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutput {
    pub neg_log_likelihood: f64,
    pub log_likelihoods: Vec<f64>,
    /// `D x (T + 1)`; column 0 is the prior.
    pub filtered: DMatrix<f64>,
}

impl FilterOutput {
    /// Posterior columns `1..=T`, i.e. one state distribution per observation.
    pub fn posteriors(&self) -> DMatrix<f64> {
        self.filtered
            .columns(1, self.filtered.ncols().saturating_sub(1))
            .into_owned()
    }
}

fn check_shapes(transition: &DMatrix<f64>, emissions: &DMatrix<f64>) -> MsmResult<usize> {
    let d = transition.nrows();
    if d == 0 || transition.ncols() != d {
        return Err(MsmError::InvalidArgument(format!(
            "transition matrix must be square and non-empty, got {}x{}",
            transition.nrows(),
            transition.ncols()
        )));
    }
    if emissions.nrows() != d {
        return Err(MsmError::InvalidArgument(format!(
            "emission matrix has {} states, transition matrix has {d}",
            emissions.nrows()
        )));
    }
    Ok(d)
}

/// One Bayes step. Writes the posterior into `posterior` and returns the
/// observation's log-likelihood `ln(w_t . predicted)`.
///
/// When the evidence underflows, the posterior is the indicator of state 1
/// (state 0 for a single-state model) rather than a renormalization; the
/// log-likelihood still comes from the same dot product and may be `-inf`.
#[inline]
fn step(
    transition: &[f64],
    prior: &[f64],
    w_t: &[f64],
    predicted: &mut [f64],
    posterior: &mut [f64],
) -> f64 {
    let d = prior.len();
    // Column-major storage: column j of A is contiguous.
    for (j, slot) in predicted.iter_mut().enumerate() {
        let col = &transition[j * d..(j + 1) * d];
        *slot = prior.iter().zip(col).map(|(p, a)| p * a).sum();
    }

    let mut evidence = 0.0;
    for ((post, w), p) in posterior.iter_mut().zip(w_t).zip(predicted.iter()) {
        *post = w * p;
        evidence += *post;
    }

    if evidence.abs() <= EVIDENCE_FLOOR {
        posterior.fill(0.0);
        posterior[1.min(d - 1)] = 1.0;
    } else {
        posterior.iter_mut().for_each(|v| *v /= evidence);
    }

    w_t.iter()
        .zip(predicted.iter())
        .map(|(w, p)| w * p)
        .sum::<f64>()
        .ln()
}

/// Runs the filter and keeps the full history.
pub fn forward_filter(
    transition: &DMatrix<f64>,
    emissions: &DMatrix<f64>,
) -> MsmResult<FilterOutput> {
    let d = check_shapes(transition, emissions)?;
    let t_len = emissions.ncols();
    let mut filtered = DMatrix::zeros(d, t_len + 1);
    let mut log_likelihoods = Vec::with_capacity(t_len);
    let mut predicted = vec![0.0; d];

    let a = transition.as_slice();
    let w = emissions.as_slice();
    let hist = filtered.as_mut_slice();
    hist[..d].fill(1.0 / d as f64);
    for t in 0..t_len {
        let (done, rest) = hist.split_at_mut((t + 1) * d);
        let prior = &done[t * d..];
        let posterior = &mut rest[..d];
        let w_t = &w[t * d..(t + 1) * d];
        log_likelihoods.push(step(a, prior, w_t, &mut predicted, posterior));
    }

    let neg_log_likelihood = -log_likelihoods.iter().sum::<f64>();
    Ok(FilterOutput {
        neg_log_likelihood,
        log_likelihoods,
        filtered,
    })
}

/// Negative log-likelihood only, reusing `scratch` and allocating nothing
/// once the scratch has the right width. This is the optimizer's hot path.
pub fn negative_log_likelihood(
    transition: &DMatrix<f64>,
    emissions: &DMatrix<f64>,
    scratch: &mut FilterScratch,
) -> MsmResult<f64> {
    let d = check_shapes(transition, emissions)?;
    scratch.reset(d);
    let FilterScratch {
        current,
        next,
        predicted,
    } = scratch;

    let a = transition.as_slice();
    let mut total = 0.0;
    for w_t in emissions.as_slice().chunks_exact(d) {
        total += step(
            a,
            current.as_slice(),
            w_t,
            predicted.as_mut_slice(),
            next.as_mut_slice(),
        );
        std::mem::swap(current, next);
    }
    Ok(-total)
}
