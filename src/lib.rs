//! Markov-Switching Multifractal volatility estimation and a Gaussian-copula
//! Value-at-Risk layer over two fitted return series.

pub mod config;
pub mod copula;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod marginal;
pub mod model;
pub mod numeric;
pub mod pipeline;
pub mod predictor;
pub mod risk;
pub mod series;

pub use error::{MsmError, MsmResult};
pub use estimator::{EstimatorConfig, MsmFit, ParameterEstimator};
pub use pipeline::{run_joint, JointReport, PipelineConfig, SeriesInput};
