//! Starting states for the minimisers.

use minuit_core::{Fcn, SymMatrix};

use super::{edm, has_negative_g2, negative_g2_search};
use crate::fcn::MnFcn;
use crate::gradient::{
    GradientCalculator, HessianGradient, InitialGradient, Numerical2PGradient,
};
use crate::hessian::Hesse;
use crate::state::{FunctionGradient, MinimumError, MinimumParameters, MinimumSeed, MinimumState};
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "MnSeedGenerator";

/// MIGRAD seed.
///
/// Evaluates the objective at the starting point, takes the gradient from
/// `gc` (an analytic gradient borrows `g2`/`gstep` from the initial
/// estimate and is optionally cross-checked), and starts from the user's
/// covariance if one is known (`dcovar = 0`) or from `diag(1/g2)`
/// (`dcovar = 1`). Non-positive curvatures trigger the negative-g2
/// search; strategy 2 without a user covariance runs a full Hesse.
pub fn migrad_seed<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    gc: &dyn GradientCalculator,
    state: &UserParameterState,
    strategy: Strategy,
    check_gradient: bool,
) -> MinimumSeed {
    let trafo = state.trafo();
    let prec = trafo.precision();
    let n = state.variable_parameters();

    let x = state.int_parameters().to_vec();
    let fcnmin = mfcn.value(&x);
    let pa = MinimumParameters::new(x, fcnmin);

    let dgrad = if gc.is_analytical() {
        let initial = InitialGradient::new(mfcn).gradient(&pa);
        let provided = gc.gradient(&pa);
        let dgrad = FunctionGradient::analytical(
            provided.grad().to_vec(),
            initial.g2().to_vec(),
            initial.gstep().to_vec(),
        );
        if check_gradient && provided.is_valid() {
            check_analytical_gradient(mfcn, &pa, &dgrad);
        }
        dgrad
    } else {
        gc.gradient(&pa)
    };

    let (mat, dcovar) = match state.int_covariance() {
        Some(cov) => (cov.clone(), 0.0),
        None => {
            let diag: Vec<f64> = dgrad
                .g2()
                .iter()
                .map(|&g| if g.abs() > prec.eps2() { 1.0 / g } else { 1.0 })
                .collect();
            (SymMatrix::from_diagonal(&diag), 1.0)
        }
    };
    debug_assert_eq!(mat.size(), n);
    let err = MinimumError::normal(mat, dcovar);
    let edm = edm::estimate(&dgrad, &err);
    let mut seed_state = MinimumState::new(pa, err, dgrad, edm, mfcn.num_calls());

    if has_negative_g2(&seed_state) {
        mfcn.debug(SOURCE, "negative g2 found, running line search");
        seed_state = if gc.is_analytical() {
            let ngc = Numerical2PGradient::new(mfcn, strategy);
            negative_g2_search(mfcn, &seed_state, &ngc, prec)
        } else {
            negative_g2_search(mfcn, &seed_state, gc, prec)
        };
    }

    if strategy.is_high() && !state.has_covariance() {
        seed_state = Hesse::new(strategy).calculate(mfcn, &seed_state, 0);
    }

    MinimumSeed::new(seed_state, trafo.clone())
}

fn check_analytical_gradient<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    pa: &MinimumParameters,
    dgrad: &FunctionGradient,
) {
    let (calculated, delta) = HessianGradient::new(mfcn, Strategy::high()).delta_gradient(pa, dgrad);
    let trafo = mfcn.trafo();
    for (i, (&provided, &numerical)) in dgrad.grad().iter().zip(calculated.grad()).enumerate() {
        if (numerical - provided).abs() > delta[i] {
            mfcn.warn(
                SOURCE,
                format!(
                    "gradient discrepancy of parameter '{}' (internal {}) too large: expected {:e}, provided {:e}",
                    trafo.name(trafo.ext_of_int(i)),
                    i,
                    numerical,
                    provided
                ),
            );
        }
    }
}

/// SIMPLEX seed: objective at the starting point, initial gradient and
/// `diag(1/g2)`.
pub fn simplex_seed<F: Fcn + ?Sized>(mfcn: &MnFcn<'_, F>, state: &UserParameterState) -> MinimumSeed {
    let trafo = state.trafo();
    let eps2 = trafo.precision().eps2();

    let x = state.int_parameters().to_vec();
    let fcnmin = mfcn.value(&x);
    let pa = MinimumParameters::new(x, fcnmin);
    let dgrad = InitialGradient::new(mfcn).gradient(&pa);

    let diag: Vec<f64> = dgrad
        .g2()
        .iter()
        .map(|&g| if g.abs() > eps2 { 1.0 / g } else { 1.0 })
        .collect();
    let err = MinimumError::normal(SymMatrix::from_diagonal(&diag), 1.0);
    let edm = edm::estimate(&dgrad, &err);
    MinimumSeed::new(
        MinimumState::new(pa, err, dgrad, edm, mfcn.num_calls()),
        trafo.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Level, NullSink};
    use crate::gradient::AnalyticalGradient;
    use approx::assert_relative_eq;
    use minuit_core::FcnWithGradient;

    fn start() -> UserParameterState {
        let mut st = UserParameterState::new();
        st.add("x", 1.0, 0.5).unwrap().add("y", -1.0, 0.5).unwrap();
        st
    }

    #[test]
    fn test_seed_uses_diagonal_inverse_curvature() {
        let st = start();
        let f = |p: &[f64]| p[0] * p[0] + 2.0 * p[1] * p[1];
        let mfcn = MnFcn::new(&f, st.trafo(), 1.0, &NullSink);
        let gc = Numerical2PGradient::new(&mfcn, Strategy::medium());
        let seed = migrad_seed(&mfcn, &gc, &st, Strategy::medium(), true);

        assert_eq!(seed.fval(), 3.0);
        let v = seed.error().inv_hessian();
        assert_relative_eq!(v[(0, 0)], 0.5, max_relative = 1e-4);
        assert_relative_eq!(v[(1, 1)], 0.25, max_relative = 1e-4);
        assert_eq!(seed.error().dcovar(), 1.0);
        assert!(seed.edm() > 0.0);
        assert_eq!(seed.nfcn(), mfcn.num_calls());
    }

    #[test]
    fn test_seed_from_user_covariance() {
        let mut st = start();
        st.set_covariance(SymMatrix::from_diagonal(&[2.0, 4.0])).unwrap();
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        let mfcn = MnFcn::new(&f, st.trafo(), 1.0, &NullSink);
        let gc = Numerical2PGradient::new(&mfcn, Strategy::high());
        let seed = migrad_seed(&mfcn, &gc, &st, Strategy::high(), true);
        assert_eq!(seed.error().dcovar(), 0.0);
        assert_eq!(seed.error().inv_hessian()[(1, 1)], 2.0);
    }

    #[test]
    fn test_wrong_analytic_gradient_is_reported() {
        let st = start();
        let f = FcnWithGradient::new(
            |p: &[f64]| p[0] * p[0] + p[1] * p[1],
            |p: &[f64]| vec![2.0 * p[0], 5.0],
        );
        let sink = CollectingSink::new();
        let mfcn = MnFcn::new(&f, st.trafo(), 1.0, &sink);
        let gc = AnalyticalGradient::new(&mfcn);
        let seed = migrad_seed(&mfcn, &gc, &st, Strategy::medium(), true);
        assert!(seed.gradient().is_analytical());
        assert!(sink.contains(SOURCE, Level::Warn));
    }

    #[test]
    fn test_simplex_seed() {
        let st = start();
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        let mfcn = MnFcn::new(&f, st.trafo(), 1.0, &NullSink);
        let seed = simplex_seed(&mfcn, &st);
        assert_eq!(mfcn.num_calls(), 1);
        assert_relative_eq!(seed.error().inv_hessian()[(0, 0)], 0.125, epsilon = 1e-12);
    }
}
