pub mod tail;

pub use tail::{var_series, TailRiskConfig, TailRiskSolver, TailWeight};
