//! Standard normal helpers and the bivariate normal distribution.
//!
//! Univariate functions go through `statrs::function::erf` so they stay free
//! of `Result` plumbing in the hot loops. The bivariate CDF follows Genz's
//! refinement of the Drezner-Wesolowsky Gauss-Legendre scheme.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::{erfc, erfc_inv};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal density.
#[inline]
pub fn pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF.
#[inline]
pub fn cdf(x: f64) -> f64 {
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile. Returns `-inf`/`+inf` at `p <= 0` / `p >= 1`.
///
/// `erfc_inv` alone round-trips through [`cdf`] to about 5e-12; one Halley
/// step on `cdf(x) - p` brings that down to rounding level.
#[inline]
pub fn inv_cdf(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let x = -SQRT_2 * erfc_inv(2.0 * p);
    let u = (cdf(x) - p) * (2.0 * PI).sqrt() * (0.5 * x * x).exp();
    if u.is_finite() {
        x - u / (1.0 + 0.5 * x * u)
    } else {
        x
    }
}

/// Density of a zero-mean normal with standard deviation `scale`.
#[inline]
pub fn scaled_pdf(x: f64, scale: f64) -> f64 {
    pdf(x / scale) / scale
}

/// Joint density of two standard normals with correlation `rho`.
pub fn bivariate_pdf(x: f64, y: f64, rho: f64) -> f64 {
    let one_minus = 1.0 - rho * rho;
    (1.0 / (2.0 * PI * one_minus.sqrt()))
        * (-(x * x - 2.0 * rho * x * y + y * y) / (2.0 * one_minus)).exp()
}

/// `P(X <= x, Y <= y)` for standard normals with correlation `rho`.
pub fn bivariate_cdf(x: f64, y: f64, rho: f64) -> f64 {
    upper_orthant(-x, -y, rho)
}

// Gauss-Legendre half rules (6, 12 and 20 points) used by the orthant integral.
const GL6_W: [f64; 3] = [0.171_324_492_379_170_5, 0.360_761_573_048_138_4, 0.467_913_934_572_690_4];
const GL6_X: [f64; 3] = [0.932_469_514_203_152_2, 0.661_209_386_466_264_7, 0.238_619_186_083_197];
const GL12_W: [f64; 6] = [
    0.047_175_336_386_511_77,
    0.106_939_325_995_318_3,
    0.160_078_328_543_346_4,
    0.203_167_426_723_065_9,
    0.233_492_536_538_354_7,
    0.249_147_045_813_402_9,
];
const GL12_X: [f64; 6] = [
    0.981_560_634_246_719_1,
    0.904_117_256_370_475,
    0.769_902_674_194_305,
    0.587_317_954_286_617_1,
    0.367_831_498_998_180_2,
    0.125_233_408_511_469_2,
];
const GL20_W: [f64; 10] = [
    0.017_614_007_139_152_12,
    0.040_601_429_800_386_94,
    0.062_672_048_334_109_06,
    0.083_276_741_576_704_75,
    0.101_930_119_817_240_4,
    0.118_194_531_961_518_4,
    0.131_688_638_449_176_6,
    0.142_096_109_318_382_1,
    0.149_172_986_472_603_7,
    0.152_753_387_130_725_9,
];
const GL20_X: [f64; 10] = [
    0.993_128_599_185_094_9,
    0.963_971_927_277_913_8,
    0.912_234_428_251_325_9,
    0.839_116_971_822_218_8,
    0.746_331_906_460_150_8,
    0.636_053_680_726_515,
    0.510_867_001_950_827_1,
    0.373_706_088_715_419_6,
    0.227_785_851_141_645_1,
    0.076_526_521_133_497_33,
];

/// `P(X > h, Y > k)` for standard normals with correlation `r`.
fn upper_orthant(h: f64, k: f64, r: f64) -> f64 {
    if h.is_nan() || k.is_nan() || r.is_nan() {
        return f64::NAN;
    }
    if h == f64::INFINITY || k == f64::INFINITY {
        return 0.0;
    }
    if h == f64::NEG_INFINITY {
        return if k == f64::NEG_INFINITY { 1.0 } else { cdf(-k) };
    }
    if k == f64::NEG_INFINITY {
        return cdf(-h);
    }

    let (w, x): (&[f64], &[f64]) = if r.abs() < 0.3 {
        (&GL6_W, &GL6_X)
    } else if r.abs() < 0.75 {
        (&GL12_W, &GL12_X)
    } else {
        (&GL20_W, &GL20_X)
    };

    let mut hk = h * k;
    let mut bvn = 0.0;
    if r.abs() < 0.925 {
        let hs = (h * h + k * k) / 2.0;
        let asr = r.asin();
        for (wi, xi) in w.iter().zip(x) {
            let sn = (asr * (1.0 - xi) / 2.0).sin();
            bvn += wi * ((sn * hk - hs) / (1.0 - sn * sn)).exp();
            let sn = (asr * (1.0 + xi) / 2.0).sin();
            bvn += wi * ((sn * hk - hs) / (1.0 - sn * sn)).exp();
        }
        bvn = bvn * asr / (4.0 * PI) + cdf(-h) * cdf(-k);
        return bvn.clamp(0.0, 1.0);
    }

    let mut k = k;
    if r < 0.0 {
        k = -k;
        hk = -hk;
    }
    if r.abs() < 1.0 {
        let a_s = (1.0 - r) * (1.0 + r);
        let mut a = a_s.sqrt();
        let bs = (h - k) * (h - k);
        let c = (4.0 - hk) / 8.0;
        let d = (12.0 - hk) / 16.0;
        let asr = -(bs / a_s + hk) / 2.0;
        if asr > -100.0 {
            bvn = a
                * asr.exp()
                * (1.0 - c * (bs - a_s) * (1.0 - d * bs / 5.0) / 3.0 + c * d * a_s * a_s / 5.0);
        }
        if hk > -100.0 {
            let b = bs.sqrt();
            let sp = (2.0 * PI).sqrt() * cdf(-b / a);
            bvn -= (-hk / 2.0).exp() * sp * b * (1.0 - c * bs * (1.0 - d * bs / 5.0) / 3.0);
        }
        a /= 2.0;
        for (wi, xi) in w.iter().zip(x) {
            for sign in [-1.0, 1.0] {
                let xs = (a + a * sign * xi).powi(2);
                let rs = (1.0 - xs).sqrt();
                let asr = -(bs / xs + hk) / 2.0;
                if asr > -100.0 {
                    let sp = 1.0 + c * xs * (1.0 + d * xs);
                    let ep = (-hk * xs / (2.0 * (1.0 + rs).powi(2))).exp() / rs;
                    bvn += a * wi * asr.exp() * (ep - sp);
                }
            }
        }
        bvn = -bvn / (2.0 * PI);
    }

    if r > 0.0 {
        bvn += cdf(-h.max(k));
    } else if h >= k {
        bvn = -bvn;
    } else {
        let l = if h < 0.0 {
            cdf(k) - cdf(h)
        } else {
            cdf(-h) - cdf(-k)
        };
        bvn = l - bvn;
    }
    bvn.clamp(0.0, 1.0)
}
