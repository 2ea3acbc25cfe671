use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::copula::CopulaConfig;
use crate::estimator::EstimatorConfig;
use crate::pipeline::{ModelConfig, PipelineConfig};
use crate::risk::TailRiskConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub estimator: EstimatorConfig,
    pub copula: CopulaConfig,
    pub tail_risk: TailRiskConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// One price per line.
    pub first: PathBuf,
    pub second: PathBuf,
    pub first_label: String,
    pub second_label: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            first: PathBuf::from("data/sp500.txt"),
            second: PathBuf::from("data/nasdaq.txt"),
            first_label: "SP500".to_string(),
            second_label: "NASDAQCOM".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        if self.data.first_label == self.data.second_label {
            bail!(
                "data.first_label and data.second_label must differ, both are '{}'",
                self.data.first_label
            );
        }
        self.pipeline()
            .validate()
            .context("model configuration is inconsistent")?;
        Ok(())
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            model: self.model.clone(),
            estimator: self.estimator.clone(),
            copula: self.copula.clone(),
            tail_risk: self.tail_risk.clone(),
        }
    }
}
