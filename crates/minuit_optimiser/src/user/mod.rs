//! User-facing parameter state and derived quantities.

mod global_cc;
mod parameter_state;

pub use global_cc::global_correlation;
pub use parameter_state::UserParameterState;
