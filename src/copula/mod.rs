pub mod fit;
pub mod gaussian;

pub use fit::{fit_rho, CopulaConfig, CopulaLikelihood, RhoFit, COPULA_DENSITY_FLOOR};
pub use gaussian::GaussianCopula;
