use approx::assert_abs_diff_eq;
use msm_copula::series::{center, log_returns, parse_price_lines, prepare_returns};
use msm_copula::MsmError;

#[test]
fn parses_one_price_per_line_with_gaps() {
    let text = "3000.5\n.\n3012.25\n\n   2998.0\r\n.\n";
    assert_eq!(parse_price_lines(text), vec![3000.5, 3012.25, 2998.0]);
}

#[test]
fn log_returns_are_differences_of_logs() {
    let r = log_returns(&[100.0, 110.0, 99.0]);
    assert_eq!(r.len(), 2);
    assert_abs_diff_eq!(r[0], (1.1f64).ln(), epsilon = 1e-15);
    assert_abs_diff_eq!(r[1], (0.9f64).ln(), epsilon = 1e-15);
}

#[test]
fn center_removes_mean() {
    let mut r = vec![1.0, 2.0, 6.0];
    center(&mut r);
    assert_eq!(r, vec![-2.0, -1.0, 3.0]);

    let mut empty: Vec<f64> = Vec::new();
    center(&mut empty);
    assert!(empty.is_empty());
}

#[test]
fn prepare_needs_enough_prices() {
    assert!(matches!(
        prepare_returns(&[100.0, 101.0]),
        Err(MsmError::InvalidArgument(_))
    ));
    let r = prepare_returns(&[100.0, 101.0, 99.5, 102.0]).unwrap();
    assert_abs_diff_eq!(r.iter().sum::<f64>(), 0.0, epsilon = 1e-15);
}
