//! Scalar root finding: bracket expansion around a seed, then Brent via `argmin`.

use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::brent::BrentRoot;

use crate::error::MsmResult;

#[derive(Debug, Clone, Copy)]
pub struct RootSearch {
    /// First bracket half-width around the seed.
    pub initial_step: f64,
    /// Number of step doublings before giving up.
    pub max_expansions: usize,
    pub tolerance: f64,
    pub max_iters: u64,
}

impl Default for RootSearch {
    fn default() -> Self {
        Self {
            initial_step: 1.0,
            max_expansions: 40,
            tolerance: 1e-10,
            max_iters: 200,
        }
    }
}

struct Residual<F> {
    f: F,
}

impl<F> CostFunction for Residual<F>
where
    F: Fn(f64) -> f64,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, Error> {
        Ok((self.f)(*z))
    }
}

impl RootSearch {
    /// Walks outwards from `seed` in doubling steps until `f` changes sign.
    ///
    /// Returns `None` when no sign change is found, or when `f` is not finite
    /// at the seed.
    pub fn bracket<F>(&self, f: &F, seed: f64) -> Option<(f64, f64)>
    where
        F: Fn(f64) -> f64,
    {
        let f0 = f(seed);
        if !f0.is_finite() {
            return None;
        }
        if f0 == 0.0 {
            return Some((seed, seed));
        }
        let mut step = self.initial_step.abs().max(f64::MIN_POSITIVE);
        let (mut last_hi, mut last_lo) = (seed, seed);
        for _ in 0..self.max_expansions {
            let hi = seed + step;
            let fh = f(hi);
            if fh.is_finite() && fh.signum() != f0.signum() {
                return Some((last_hi, hi));
            }
            let lo = seed - step;
            let fl = f(lo);
            if fl.is_finite() && fl.signum() != f0.signum() {
                return Some((lo, last_lo));
            }
            last_hi = hi;
            last_lo = lo;
            step *= 2.0;
        }
        None
    }

    /// Root of `f` nearest the seed, or `None` if it could not be bracketed.
    pub fn solve<F>(&self, f: F, seed: f64) -> MsmResult<Option<f64>>
    where
        F: Fn(f64) -> f64,
    {
        let Some((lo, hi)) = self.bracket(&f, seed) else {
            return Ok(None);
        };
        if lo == hi {
            return Ok(Some(lo));
        }
        let solver = BrentRoot::new(lo, hi, self.tolerance);
        let res = Executor::new(Residual { f }, solver)
            .configure(|state| state.max_iters(self.max_iters))
            .run()?;
        Ok(res.state().get_best_param().copied())
    }
}
