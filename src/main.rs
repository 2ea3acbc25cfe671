use anyhow::{Context, Result};
use std::path::Path;

use msm_copula::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use msm_copula::pipeline::{run_joint, SeriesInput};
use msm_copula::series::{parse_price_lines, prepare_returns};

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_returns(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let prices = parse_price_lines(&text);
    prepare_returns(&prices).with_context(|| format!("unusable price series in {}", path.display()))
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Usage: msm-copula [config.toml] (default {DEFAULT_CONFIG_PATH})");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    tracing::info!(
        config = %config_path,
        components = config.model.components,
        first = %config.data.first.display(),
        second = %config.data.second.display(),
        "Starting msm-copula"
    );

    let first = load_returns(&config.data.first)?;
    let second = load_returns(&config.data.second)?;
    let report = run_joint(
        SeriesInput {
            label: &config.data.first_label,
            returns: &first,
        },
        SeriesInput {
            label: &config.data.second_label,
            returns: &second,
        },
        &config.pipeline(),
    )
    .context("joint MSM/copula fit failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
