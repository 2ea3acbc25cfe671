pub mod emission;
pub mod params;
pub mod state_space;

pub use emission::{emission_matrix, emission_matrix_into, DENSITY_FLOOR};
pub use params::{ModelParameters, ParamBounds};
pub use state_space::{
    build_states, build_transition_matrix, component_gammas, state_count, StateSpace,
    LARGE_STATE_SPACE_COMPONENTS,
};
