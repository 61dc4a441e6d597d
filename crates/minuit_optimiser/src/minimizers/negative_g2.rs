//! Escape from regions of negative curvature before MIGRAD starts.

use minuit_core::math::vector;
use minuit_core::{Fcn, MachinePrecision, SymMatrix};

use super::{edm, line_search};
use crate::fcn::MnFcn;
use crate::gradient::GradientCalculator;
use crate::state::{MinimumError, MinimumParameters, MinimumState};

/// True if any second derivative is non-positive.
pub fn has_negative_g2(state: &MinimumState) -> bool {
    state.gradient().has_negative_g2()
}

/// Line-search along each coordinate with `g2 <= 0`, downhill by `gstep`,
/// until every curvature is positive or `2n` searches were made.
///
/// The returned state carries a diagonal `1/g2` matrix (1 where `|g2|` is
/// below eps2) with `dcovar = 1`.
pub fn negative_g2_search<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    state: &MinimumState,
    gc: &dyn GradientCalculator,
    prec: &MachinePrecision,
) -> MinimumState {
    let n = state.len();
    let eps2 = prec.eps2();
    let mut dgrad = state.gradient().clone();
    let mut pa = state.parameters().clone();

    let mut iter = 0;
    loop {
        let mut iterate = false;
        for i in 0..n {
            if dgrad.g2()[i] > 0.0 {
                continue;
            }
            let grd = dgrad.grad()[i];
            let mut step = vec![0.0; n];
            step[i] = dgrad.gstep()[i] * grd;
            if grd.abs() > eps2 {
                step[i] *= -1.0 / grd.abs();
            }
            let gdel = step[i] * grd;
            let (lambda, fval) = line_search(mfcn, &pa, &step, gdel, prec);
            step[i] *= lambda;
            pa = MinimumParameters::new(vector::axpy(pa.vec(), 1.0, &step), fval);
            dgrad = gc.gradient_with_previous(&pa, &dgrad);
            iterate = true;
            break;
        }
        let done = iter >= 2 * n || !iterate;
        iter += 1;
        if done {
            break;
        }
    }

    let diag: Vec<f64> = dgrad
        .g2()
        .iter()
        .map(|&g| if g.abs() > eps2 { 1.0 / g } else { 1.0 })
        .collect();
    let err = MinimumError::normal(SymMatrix::from_diagonal(&diag), 1.0);
    let edm = edm::estimate(&dgrad, &err);
    MinimumState::new(pa, err, dgrad, edm, mfcn.num_calls())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::gradient::Numerical2PGradient;
    use crate::state::FunctionGradient;
    use crate::strategy::Strategy;
    use minuit_core::{Parameter, UserTransformation};

    #[test]
    fn test_moves_out_of_concave_region() {
        // Double well x^4 - 2 x^2 with a start on the concave hump.
        let mut t = UserTransformation::new();
        t.add(Parameter::new("x", 0.1, 0.5)).unwrap();
        let f = |p: &[f64]| p[0].powi(4) - 2.0 * p[0] * p[0];
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let gc = Numerical2PGradient::new(&mfcn, Strategy::medium());

        let par = MinimumParameters::new(vec![0.1], f(&[0.1]));
        let grad = gc.gradient(&par);
        assert!(grad.has_negative_g2());
        let st = MinimumState::new(par, MinimumError::unavailable(1), grad, 0.0, mfcn.num_calls());

        let out = negative_g2_search(&mfcn, &st, &gc, &MachinePrecision::new());
        assert!(!has_negative_g2(&out));
        assert!(out.fval() < st.fval());
        assert!(out.vec()[0] > 0.3);
    }

    #[test]
    fn test_positive_curvature_is_untouched() {
        let mut t = UserTransformation::new();
        t.add(Parameter::new("x", 1.0, 0.5)).unwrap();
        let f = |p: &[f64]| p[0] * p[0];
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let gc = Numerical2PGradient::new(&mfcn, Strategy::medium());
        let grad = FunctionGradient::numerical(vec![2.0], vec![2.0], vec![0.1]);
        let st = MinimumState::new(
            MinimumParameters::new(vec![1.0], 1.0),
            MinimumError::unavailable(1),
            grad,
            0.0,
            0,
        );
        let out = negative_g2_search(&mfcn, &st, &gc, &MachinePrecision::new());
        assert_eq!(out.vec(), &[1.0]);
        assert_eq!(out.error().inv_hessian()[(0, 0)], 0.5);
        assert_eq!(mfcn.num_calls(), 0);
    }
}
