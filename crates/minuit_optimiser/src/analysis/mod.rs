//! Error analysis beyond the covariance matrix.
//!
//! - [`FunctionCross`]: where the profile of one or more parameters crosses
//!   `fmin + up` along a direction
//! - [`Minos`]: asymmetric errors from the profile crossings on both sides
//! - [`Contours`]: points of a two-parameter confidence region

mod contours;
mod cross;
mod minos;

pub use contours::{Contours, ContoursError};
pub use cross::{CrossOutcome, FunctionCross, MnCross};
pub use minos::{Minos, MinosError};
