use serde::{Deserialize, Serialize};

use crate::error::{MsmError, MsmResult};

/// The four free parameters of one MSM fit.
///
/// `sigma` is expressed in the units of the return series (no percentage
/// rescaling anywhere in the crate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Growth rate of the switching frequencies across components.
    pub b: f64,
    /// Switching probability of the highest-frequency component.
    pub gamma_k: f64,
    /// Unconditional volatility scale.
    pub sigma: f64,
    /// Value taken by a low multiplier; the high one is `2 - m0`.
    pub m0: f64,
}

impl ModelParameters {
    pub const DIM: usize = 4;

    /// Reads `[b, gamma_k, sigma, m0]`, the optimizer's vector layout.
    pub fn from_slice(theta: &[f64]) -> MsmResult<Self> {
        let [b, gamma_k, sigma, m0] = theta else {
            return Err(MsmError::InvalidArgument(format!(
                "expected {} parameters, got {}",
                Self::DIM,
                theta.len()
            )));
        };
        Ok(Self {
            b: *b,
            gamma_k: *gamma_k,
            sigma: *sigma,
            m0: *m0,
        })
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.b, self.gamma_k, self.sigma, self.m0]
    }

    pub fn m1(&self) -> f64 {
        2.0 - self.m0
    }
}

/// Closed search box for the swarm, one `(lower, upper)` pair per parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamBounds {
    pub b: (f64, f64),
    pub gamma_k: (f64, f64),
    pub sigma: (f64, f64),
    pub m0: (f64, f64),
}

impl Default for ParamBounds {
    fn default() -> Self {
        Self {
            b: (1.001, 50.0),
            gamma_k: (1e-3, 0.999_999),
            sigma: (1e-4, 5.0),
            m0: (1.0, 1.999_999),
        }
    }
}

impl ParamBounds {
    pub fn lower(&self) -> Vec<f64> {
        vec![self.b.0, self.gamma_k.0, self.sigma.0, self.m0.0]
    }

    pub fn upper(&self) -> Vec<f64> {
        vec![self.b.1, self.gamma_k.1, self.sigma.1, self.m0.1]
    }

    pub fn validate(&self) -> MsmResult<()> {
        let named = [
            ("b", self.b),
            ("gamma_k", self.gamma_k),
            ("sigma", self.sigma),
            ("m0", self.m0),
        ];
        for (name, (lo, hi)) in named {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(MsmError::Config(format!(
                    "bounds for {name} must be finite with lower < upper, got ({lo}, {hi})"
                )));
            }
        }
        if self.b.0 <= 1.0 {
            return Err(MsmError::Config(format!(
                "lower bound for b must exceed 1, got {}",
                self.b.0
            )));
        }
        if self.gamma_k.0 <= 0.0 || self.gamma_k.1 >= 1.0 {
            return Err(MsmError::Config(format!(
                "gamma_k bounds must lie inside (0, 1), got {:?}",
                self.gamma_k
            )));
        }
        if self.sigma.0 <= 0.0 {
            return Err(MsmError::Config(format!(
                "sigma lower bound must be positive, got {}",
                self.sigma.0
            )));
        }
        if self.m0.0 < 0.0 || self.m0.1 >= 2.0 {
            return Err(MsmError::Config(format!(
                "m0 bounds must lie inside [0, 2), got {:?}",
                self.m0
            )));
        }
        Ok(())
    }

    pub fn contains(&self, p: &ModelParameters) -> bool {
        let inside = |v: f64, (lo, hi): (f64, f64)| v >= lo && v <= hi;
        inside(p.b, self.b)
            && inside(p.gamma_k, self.gamma_k)
            && inside(p.sigma, self.sigma)
            && inside(p.m0, self.m0)
    }
}
