//! Tensor-product Gauss-Legendre quadrature over (semi-)infinite boxes.

use std::f64::consts::PI;

use crate::error::{MsmError, MsmResult};

/// One-dimensional integration domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interval {
    Finite { lower: f64, upper: f64 },
    /// `(-inf, upper]`, mapped with `x = upper - scale * (1 - t) / t`.
    UpperBounded { upper: f64, scale: f64 },
    /// `(-inf, inf)`, mapped with `x = center + scale * t / (1 - t^2)`.
    Real { center: f64, scale: f64 },
}

/// A mapped abscissa whose weight already carries the change-of-variable Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub index: usize,
    pub x: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct QuadratureEstimate {
    pub value: f64,
    pub error: f64,
}

#[derive(Debug, Clone)]
pub struct GaussLegendre {
    abscissae: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    pub fn new(points: usize) -> MsmResult<Self> {
        if points < 2 {
            return Err(MsmError::InvalidArgument(format!(
                "Gauss-Legendre rule needs at least 2 points, got {points}"
            )));
        }
        let (abscissae, weights) = legendre_nodes(points);
        Ok(Self { abscissae, weights })
    }

    pub fn points(&self) -> usize {
        self.abscissae.len()
    }

    /// Abscissae and Jacobian-weighted weights of this rule mapped onto `interval`.
    pub fn nodes(&self, interval: &Interval) -> Vec<Node> {
        self.abscissae
            .iter()
            .zip(&self.weights)
            .enumerate()
            .map(|(index, (&s, &w))| {
                let (x, jac) = match *interval {
                    Interval::Finite { lower, upper } => {
                        let half = 0.5 * (upper - lower);
                        (lower + half * (s + 1.0), half)
                    }
                    Interval::UpperBounded { upper, scale } => {
                        // s in (-1, 1) -> t in (0, 1)
                        let t = 0.5 * (s + 1.0);
                        (upper - scale * (1.0 - t) / t, 0.5 * scale / (t * t))
                    }
                    Interval::Real { center, scale } => {
                        let d = 1.0 - s * s;
                        (center + scale * s / d, scale * (1.0 + s * s) / (d * d))
                    }
                };
                Node {
                    index,
                    x,
                    weight: w * jac,
                }
            })
            .collect()
    }

    /// `∫_outer ∫_inner f(y, x) dx dy` with the integrand seeing mapped nodes.
    pub fn integrate_2d_nodes<F>(outer: &[Node], inner: &[Node], f: F) -> f64
    where
        F: Fn(&Node, &Node) -> f64,
    {
        let mut total = 0.0;
        for o in outer {
            let mut row = 0.0;
            for i in inner {
                let v = f(o, i);
                if v.is_finite() {
                    row += i.weight * v;
                }
            }
            total += o.weight * row;
        }
        total
    }

    /// `∫_outer ∫_inner f(outer_x, inner_x)`, error estimated against a half-size rule.
    pub fn integrate_2d<F>(
        &self,
        outer: &Interval,
        inner: &Interval,
        f: F,
    ) -> MsmResult<QuadratureEstimate>
    where
        F: Fn(f64, f64) -> f64,
    {
        let value = Self::integrate_2d_nodes(&self.nodes(outer), &self.nodes(inner), |o, i| {
            f(o.x, i.x)
        });
        let coarse = GaussLegendre::new((self.points() / 2).max(2))?;
        let rough = Self::integrate_2d_nodes(&coarse.nodes(outer), &coarse.nodes(inner), |o, i| {
            f(o.x, i.x)
        });
        Ok(QuadratureEstimate {
            value,
            error: (value - rough).abs(),
        })
    }
}

/// Legendre roots and weights on `[-1, 1]` by Newton iteration.
fn legendre_nodes(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];
    let m = n.div_ceil(2);
    let nf = n as f64;
    for i in 0..m {
        let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..100 {
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                let jf = j as f64;
                p1 = ((2.0 * jf + 1.0) * z * p2 - jf * p3) / (jf + 1.0);
            }
            dp = nf * (z * p1 - p2) / (z * z - 1.0);
            let prev = z;
            z = prev - p1 / dp;
            if (z - prev).abs() < 1e-15 {
                break;
            }
        }
        x[i] = -z;
        x[n - 1 - i] = z;
        let wi = 2.0 / ((1.0 - z * z) * dp * dp);
        w[i] = wi;
        w[n - 1 - i] = wi;
    }
    (x, w)
}
