//! Second-derivative matrix, positive-definiteness repair and covariance
//! squeezing.

mod hesse;
mod posdef;
mod squeeze;

pub use hesse::Hesse;
pub use posdef::{make_pos_def, make_state_pos_def};
pub use squeeze::{squeeze_covariance, squeeze_error};
