//! Gradient estimators in internal coordinates.
//!
//! | Calculator | Calls per parameter | Used for |
//! |------------|---------------------|----------|
//! | [`InitialGradient`] | 0 | seeds, from the user's error estimates |
//! | [`Numerical2PGradient`] | `2 x gradient_ncycles` | MIGRAD iterations |
//! | [`HessianGradient`] | `2 x hessian_gradient_ncycles` | Hesse refinement, gradient check |
//! | [`AnalyticalGradient`] | 0 (one gradient call) | objectives with [`minuit_core::Fcn::gradient`] |
//!
//! Every numerical calculator refines a previous [`FunctionGradient`]:
//! its second derivatives `g2` and steps `gstep` choose the new step sizes.

mod analytical;
mod hessian_gradient;
mod initial;
mod numerical;

pub use analytical::AnalyticalGradient;
pub use hessian_gradient::HessianGradient;
pub use initial::InitialGradient;
pub use numerical::Numerical2PGradient;

use crate::state::{FunctionGradient, MinimumParameters};

/// Gradient estimator.
pub trait GradientCalculator {
    /// Gradient at `par` from scratch.
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient;

    /// Gradient at `par` reusing step information from `previous`.
    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient;

    /// True if the gradient comes from the objective itself.
    fn is_analytical(&self) -> bool {
        false
    }
}
