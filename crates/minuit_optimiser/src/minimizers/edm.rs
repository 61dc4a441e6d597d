//! Estimated distance to minimum.

use crate::state::{FunctionGradient, MinimumError};

/// `EDM = 0.5 g^T V g`: the expected decrease of a quadratic model with
/// gradient `g` and inverse Hessian `V`. Zero for an unavailable matrix
/// or an empty parameter set.
pub fn estimate(gradient: &FunctionGradient, error: &MinimumError) -> f64 {
    if error.inv_hessian().size() == 0 || gradient.is_empty() {
        return 0.0;
    }
    0.5 * error.inv_hessian().similarity(gradient.grad())
}
