pub mod gaussian;
pub mod quadrature;
pub mod roots;

pub use quadrature::{GaussLegendre, Interval, Node, QuadratureEstimate};
pub use roots::RootSearch;
