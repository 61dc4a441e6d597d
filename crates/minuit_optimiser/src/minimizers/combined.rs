//! MIGRAD with a SIMPLEX fallback.

use minuit_core::Fcn;

use super::{migrad_seed, run_migrad, run_simplex};
use crate::fcn::MnFcn;
use crate::gradient::{GradientCalculator, Numerical2PGradient};
use crate::state::FunctionMinimum;
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "CombinedMinimumBuilder";

/// Run MIGRAD; if it fails, run SIMPLEX from the same seed and then MIGRAD
/// again at strategy 2 from the simplex result.
///
/// Returns the first valid result of that chain, or the simplex result
/// when the second MIGRAD does not converge either.
#[allow(clippy::too_many_arguments)]
pub(crate) fn combined<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    gc: &dyn GradientCalculator,
    state: &UserParameterState,
    strategy: Strategy,
    check_gradient: bool,
    max_calls: usize,
    toler: f64,
) -> FunctionMinimum {
    let seed = migrad_seed(mfcn, gc, state, strategy, check_gradient);
    let min1 = run_migrad(mfcn, gc, seed.clone(), strategy, max_calls, toler);
    if min1.is_valid() {
        return min1;
    }

    mfcn.warn(SOURCE, "MIGRAD failed, trying SIMPLEX");
    let min2 = run_simplex(mfcn, seed, max_calls, toler);
    if !min2.is_valid() {
        mfcn.warn(SOURCE, "SIMPLEX failed as well");
        return min2;
    }

    mfcn.info(SOURCE, "SIMPLEX converged, restarting MIGRAD at strategy 2");
    let high = Strategy::high();
    let numerical;
    let gc2: &dyn GradientCalculator = if gc.is_analytical() {
        gc
    } else {
        numerical = Numerical2PGradient::new(mfcn, high);
        &numerical
    };
    let reseed = migrad_seed(mfcn, gc2, min2.user_state(), high, false);
    let min3 = run_migrad(mfcn, gc2, reseed, high, max_calls, toler);
    if min3.is_valid() {
        min3
    } else {
        mfcn.warn(SOURCE, "second MIGRAD failed, returning SIMPLEX result");
        min2
    }
}
