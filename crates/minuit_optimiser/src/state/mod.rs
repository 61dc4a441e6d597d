//! Immutable snapshots of minimiser progress.
//!
//! - [`FunctionGradient`]: gradient, second derivatives and steps
//! - [`MinimumParameters`]: internal point, function value, optional step sizes
//! - [`MinimumError`]: inverse Hessian plus a tagged status
//! - [`MinimumState`]: one iteration of a minimiser
//! - [`MinimumSeed`]: starting state plus the transformation in effect
//! - [`FunctionMinimum`]: the result of a minimisation

mod error;
mod function_minimum;
mod gradient;
mod minimum_state;
mod parameters;
mod seed;

pub use error::{ErrorStatus, MinimumError};
pub use function_minimum::{FunctionMinimum, TerminalCondition};
pub use gradient::FunctionGradient;
pub use minimum_state::MinimumState;
pub use parameters::MinimumParameters;
pub use seed::MinimumSeed;
