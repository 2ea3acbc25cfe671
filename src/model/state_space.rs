//! Discrete state space of a `k`-component MSM.
//!
//! Every joint state is an integer `i` in `0..2^k`. Two conventions coexist
//! and are kept on purpose:
//!
//! - [`build_states`] reads component `j` from bit `j` (least significant first).
//! - [`build_transition_matrix`] compares component `c` (with probability
//!   `gamma_{c+1}`) at bit `k - 1 - c` (most significant first).
//!
//! The multiplier `g(i)` only depends on how many bits of `i` are set, so the
//! likelihood does not see the difference, but relabelling components is not
//! a symmetry of the transition matrix on its own.
//!
//! Building `A` costs `O(4^k)`; past `k = 12` (4096 states) a fit becomes slow
//! and memory hungry, so a warning is logged; past `k = 14` it is refused.

use nalgebra::DMatrix;

use crate::error::{MsmError, MsmResult};
use crate::model::params::ModelParameters;

/// Largest `k` that fits comfortably in memory and time.
pub const LARGE_STATE_SPACE_COMPONENTS: usize = 12;

/// Hard cap: the dense `2^k x 2^k` transition matrix is 2 GiB of `f64` at
/// `k = 14` and grows fourfold per extra component.
pub const MAX_COMPONENTS: usize = 14;

/// `D = 2^k`, or `InvalidArgument` when `k` is zero or absurdly large.
pub fn state_count(k: usize) -> MsmResult<usize> {
    if k == 0 {
        return Err(MsmError::InvalidArgument(
            "number of volatility components must be at least 1".to_string(),
        ));
    }
    if k > MAX_COMPONENTS {
        return Err(MsmError::InvalidArgument(format!(
            "{k} volatility components exceed the supported maximum of {MAX_COMPONENTS}"
        )));
    }
    Ok(1usize << k)
}

/// Square roots of the per-state variance multipliers.
pub fn build_states(k: usize, m0: f64) -> MsmResult<Vec<f64>> {
    let d = state_count(k)?;
    if !m0.is_finite() || !(0.0..=2.0).contains(&m0) {
        return Err(MsmError::Domain(format!("m0 must lie in [0, 2], got {m0}")));
    }
    let m1 = 2.0 - m0;
    let states = (0..d)
        .map(|i| {
            let mut product = 1.0;
            for j in 0..k {
                product *= if i & (1 << j) != 0 { m1 } else { m0 };
            }
            product.sqrt()
        })
        .collect();
    Ok(states)
}

/// Per-component switching probabilities `gamma_1..gamma_k`.
///
/// `gamma_1 = 1 - (1 - gamma_k)^(1 / b^(k-1))` and
/// `gamma_c = 1 - (1 - gamma_1)^(b^(c-1))`.
pub fn component_gammas(k: usize, b: f64, gamma_k: f64) -> MsmResult<Vec<f64>> {
    state_count(k)?;
    if !b.is_finite() || b <= 1.0 {
        return Err(MsmError::Domain(format!("b must be greater than 1, got {b}")));
    }
    if !gamma_k.is_finite() || gamma_k <= 0.0 || gamma_k >= 1.0 {
        return Err(MsmError::Domain(format!(
            "gamma_k must lie in (0, 1), got {gamma_k}"
        )));
    }
    let gamma_1 = 1.0 - (1.0 - gamma_k).powf(1.0 / b.powi(k as i32 - 1));
    let gammas = (0..k)
        .map(|c| {
            if c == 0 {
                gamma_1
            } else {
                1.0 - (1.0 - gamma_1).powf(b.powi(c as i32))
            }
        })
        .collect();
    Ok(gammas)
}

/// Row-stochastic `2^k x 2^k` transition matrix.
///
/// A component redraws its value with probability `gamma_c`, and a redraw
/// lands on either value with probability 1/2, so it flips with probability
/// `gamma_c / 2` and stays with `1 - gamma_c / 2`. Components move
/// independently, hence `A[i, j]` only depends on `i ^ j`.
pub fn build_transition_matrix(k: usize, b: f64, gamma_k: f64) -> MsmResult<DMatrix<f64>> {
    if k > LARGE_STATE_SPACE_COMPONENTS && k <= MAX_COMPONENTS {
        tracing::warn!(
            components = k,
            states = 1usize << k,
            "building a large MSM transition matrix, O(4^k) memory"
        );
    }
    transition_matrix(k, b, gamma_k)
}

/// Same as [`build_transition_matrix`] without the size warning, for callers
/// that rebuild the matrix per likelihood evaluation and warn once themselves.
pub(crate) fn transition_matrix(k: usize, b: f64, gamma_k: f64) -> MsmResult<DMatrix<f64>> {
    let d = state_count(k)?;
    let gammas = component_gammas(k, b, gamma_k)?;
    let flip: Vec<f64> = gammas.iter().map(|g| 0.5 * g).collect();

    let by_diff: Vec<f64> = (0..d)
        .map(|diff| {
            let mut p = 1.0;
            for (c, f) in flip.iter().enumerate() {
                let bit = 1 << (k - 1 - c);
                p *= if diff & bit == 0 { 1.0 - f } else { *f };
            }
            p
        })
        .collect();

    Ok(DMatrix::from_fn(d, d, |i, j| by_diff[i ^ j]))
}

/// States and transitions for one parameter vector.
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub components: usize,
    /// `g(i)`, so that state `i` has volatility `sigma * g(i)`.
    pub multipliers: Vec<f64>,
    pub transition: DMatrix<f64>,
}

impl StateSpace {
    pub fn new(k: usize, params: &ModelParameters) -> MsmResult<Self> {
        Ok(Self {
            components: k,
            multipliers: build_states(k, params.m0)?,
            transition: transition_matrix(k, params.b, params.gamma_k)?,
        })
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    /// Per-state volatilities `sigma * g(i)`.
    pub fn scales(&self, sigma: f64) -> Vec<f64> {
        self.multipliers.iter().map(|g| sigma * g).collect()
    }
}
