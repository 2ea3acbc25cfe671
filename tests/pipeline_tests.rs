use msm_copula::estimator::EstimatorConfig;
use msm_copula::pipeline::{run_joint, ModelConfig, PipelineConfig, SeriesInput};
use msm_copula::risk::TailRiskConfig;
use msm_copula::series::prepare_returns;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

fn correlated_prices(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(2024);
    let (mut p1, mut p2) = (vec![100.0], vec![50.0]);
    for t in 0..n {
        let vol = if (t / 30) % 2 == 0 { 0.008 } else { 0.02 };
        let x: f64 = StandardNormal.sample(&mut rng);
        let z: f64 = StandardNormal.sample(&mut rng);
        let y = 0.7 * x + (1.0f64 - 0.49).sqrt() * z;
        let last1 = p1[p1.len() - 1];
        let last2 = p2[p2.len() - 1];
        p1.push(last1 * (vol * x).exp());
        p2.push(last2 * (vol * y).exp());
    }
    (p1, p2)
}

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        model: ModelConfig {
            components: 2,
            trading_days: 252,
        },
        estimator: EstimatorConfig {
            population_size: 10,
            max_iters: 15,
            seed: 5,
            ..EstimatorConfig::default()
        },
        tail_risk: TailRiskConfig {
            quadrature_nodes: 24,
            ..TailRiskConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn joint_run_produces_full_report() {
    let (p1, p2) = correlated_prices(120);
    let r1 = prepare_returns(&p1).unwrap();
    let r2 = prepare_returns(&p2).unwrap();
    let report = run_joint(
        SeriesInput {
            label: "A",
            returns: &r1,
        },
        SeriesInput {
            label: "B",
            returns: &r2,
        },
        &quick_config(),
    )
    .unwrap();

    assert_eq!(report.components, 2);
    assert_eq!(report.first.label, "A");
    assert_eq!(report.first.observations, 120);
    assert_eq!(report.second.volatility.len(), 120);
    assert_eq!(report.first.annualized_volatility.len(), 120);
    assert!(report.first.forecast > 0.0);
    assert!(report.copula.rho > 0.3 && report.copula.rho <= 0.99);
    assert_eq!(report.value_at_risk.len(), 120);
    assert!(report.value_at_risk.iter().all(|v| v.is_finite() && *v < 0.0));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["weight"], "cdf");
    assert_eq!(json["value_at_risk"].as_array().unwrap().len(), 120);
}
