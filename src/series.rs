//! Price series to centered log-returns.

use crate::error::{MsmError, MsmResult};

/// Reads one price per line. Blank lines and placeholders that do not parse
/// as a finite number (e.g. `"."` for a missing quote) are skipped.
pub fn parse_price_lines(text: &str) -> Vec<f64> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .collect()
}

/// `ln(p[t+1]) - ln(p[t])`, dropping pairs that do not give a finite value.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| w[1].ln() - w[0].ln())
        .filter(|r| r.is_finite())
        .collect()
}

/// Subtracts the sample mean in place.
pub fn center(returns: &mut [f64]) {
    if returns.is_empty() {
        return;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    for r in returns.iter_mut() {
        *r -= mean;
    }
}

/// Log-differences then mean-centering. Needs at least two usable returns.
pub fn prepare_returns(prices: &[f64]) -> MsmResult<Vec<f64>> {
    let mut returns = log_returns(prices);
    if returns.len() < 2 {
        return Err(MsmError::InvalidArgument(format!(
            "need at least 2 finite log-returns, got {} from {} prices",
            returns.len(),
            prices.len()
        )));
    }
    center(&mut returns);
    Ok(returns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_and_blanks_are_skipped() {
        let prices = parse_price_lines("100.0\n.\n\n 101.5 \nNaN\n99\n");
        assert_eq!(prices, vec![100.0, 101.5, 99.0]);
    }

    #[test]
    fn centered_returns_have_zero_mean() {
        let r = prepare_returns(&[100.0, 102.0, 101.0, 105.0]).unwrap();
        assert_eq!(r.len(), 3);
        assert!(r.iter().sum::<f64>().abs() < 1e-15);
    }

    #[test]
    fn non_positive_prices_drop_out() {
        let r = log_returns(&[100.0, 0.0, 50.0, 55.0]);
        assert_eq!(r.len(), 1);
        assert!((r[0] - (55.0f64 / 50.0).ln()).abs() < 1e-15);
    }
}
