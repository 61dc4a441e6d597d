//! MIGRAD: variable-metric descent with Davidon updates.

use minuit_core::math::vector;
use minuit_core::Fcn;

use super::{davidon, edm, line_search};
use crate::fcn::MnFcn;
use crate::gradient::GradientCalculator;
use crate::hessian::{make_state_pos_def, Hesse};
use crate::state::{
    ErrorStatus, FunctionMinimum, MinimumParameters, MinimumSeed, MinimumState, TerminalCondition,
};
use crate::strategy::Strategy;

const SOURCE: &str = "VariableMetricBuilder";

/// Run MIGRAD from `seed` until `EDM < 1e-4 edmval` or `max_calls`.
///
/// Each iteration steps along `-V g`, line-searches, recomputes the
/// gradient and applies the Davidon update to `V`. A matrix that does not
/// give a descent direction (or a negative EDM) is repaired once; if that
/// fails the run stops with a [`ErrorStatus::NotPosDef`] state. After the
/// loop, strategy 2 (or 1 with an inaccurate `V`) appends a Hesse state
/// limited to the calls left. Running out of calls anywhere takes
/// precedence over every other terminal condition.
pub fn variable_metric<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    gc: &dyn GradientCalculator,
    seed: MinimumSeed,
    strategy: Strategy,
    max_calls: usize,
    edmval: f64,
) -> FunctionMinimum {
    let edmval = edmval * 1.0e-4;
    let mut min = iterate(mfcn, gc, seed, max_calls, edmval);
    if mfcn.num_calls() >= max_calls {
        return min.with_condition(TerminalCondition::ReachedCallLimit);
    }

    let state = min.state();
    if strategy.is_high() || (strategy.is_medium() && state.error().dcovar() > 0.05) {
        let remaining = max_calls.saturating_sub(mfcn.num_calls());
        if remaining == 0 {
            mfcn.warn(SOURCE, "no calls left for Hesse");
            return min.with_condition(TerminalCondition::ReachedCallLimit);
        }
        mfcn.debug(SOURCE, "running Hesse on the last state");
        let hesse_state = Hesse::new(strategy).calculate(mfcn, state, remaining);
        let above = hesse_state.edm() > 10.0 * edmval;
        min = min.with_state(hesse_state);
        if mfcn.num_calls() >= max_calls {
            mfcn.warn(SOURCE, "call limit exceeded in Hesse");
            min = min.with_condition(TerminalCondition::ReachedCallLimit);
        } else if above {
            min = min.with_condition(TerminalCondition::AboveMaxEdm);
        }
    }

    if !min.is_valid() {
        mfcn.warn(SOURCE, "minimum not valid");
    }
    min
}

fn iterate<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    gc: &dyn GradientCalculator,
    seed: MinimumSeed,
    max_calls: usize,
    edmval: f64,
) -> FunctionMinimum {
    let up = mfcn.error_def();
    if seed.parameters().is_empty() {
        return FunctionMinimum::seed_only(seed, up, TerminalCondition::Converged);
    }

    let prec = *seed.precision();
    let mut edm = seed.edm();
    if edm < 0.0 {
        mfcn.warn(SOURCE, "initial matrix not pos.def.");
        return FunctionMinimum::seed_only(seed, up, TerminalCondition::AboveMaxEdm);
    }

    let mut result: Vec<MinimumState> = vec![seed.state().clone()];
    edm *= 1.0 + 3.0 * seed.error().dcovar();

    loop {
        let mut s0 = result[result.len() - 1].clone();

        let mut step = vector::scaled(&s0.error().inv_hessian().mul_vec(s0.gradient().grad()), -1.0);
        let mut gdel = vector::dot(&step, s0.gradient().grad());
        if gdel > 0.0 {
            mfcn.warn(SOURCE, format!("matrix not pos.def., gdel = {gdel:e} > 0"));
            s0 = make_state_pos_def(&s0, &prec);
            step = vector::scaled(&s0.error().inv_hessian().mul_vec(s0.gradient().grad()), -1.0);
            gdel = vector::dot(&step, s0.gradient().grad());
            if gdel > 0.0 {
                mfcn.warn(SOURCE, format!("gdel = {gdel:e} still positive, giving up"));
                result.push(s0.with_error(s0.error().with_status(ErrorStatus::NotPosDef)));
                return FunctionMinimum::new(seed, result, up, TerminalCondition::AboveMaxEdm);
            }
        }

        let (lambda, fval) = line_search(mfcn, s0.parameters(), &step, gdel, &prec);
        if (fval - s0.fval()).abs() < prec.eps() {
            mfcn.debug(SOURCE, "no improvement in line search");
            break;
        }

        let p = MinimumParameters::new(vector::axpy(s0.vec(), lambda, &step), fval);
        let g = gc.gradient_with_previous(&p, s0.gradient());
        if !g.is_valid() {
            mfcn.warn(SOURCE, "invalid gradient");
            return FunctionMinimum::new(seed, result, up, TerminalCondition::AboveMaxEdm);
        }

        edm = edm::estimate(&g, s0.error());
        if edm < 0.0 {
            mfcn.warn(SOURCE, "matrix not pos.def., edm < 0");
            s0 = make_state_pos_def(&s0, &prec);
            edm = edm::estimate(&g, s0.error());
            if edm < 0.0 {
                result.push(s0.with_error(s0.error().with_status(ErrorStatus::NotPosDef)));
                return FunctionMinimum::new(seed, result, up, TerminalCondition::AboveMaxEdm);
            }
        }

        let e = davidon::update(&s0, p.vec(), g.grad(), mfcn.sink());
        let dcovar = e.dcovar();
        result.push(MinimumState::new(p, e, g, edm, mfcn.num_calls()));
        edm *= 1.0 + 3.0 * dcovar;

        if !(edm > edmval && mfcn.num_calls() < max_calls) {
            break;
        }
    }

    if mfcn.num_calls() >= max_calls {
        mfcn.warn(SOURCE, "call limit exceeded");
        return FunctionMinimum::new(seed, result, up, TerminalCondition::ReachedCallLimit);
    }

    if edm > edmval {
        let last_fval = result[result.len() - 1].fval();
        if edm < (prec.eps2() * last_fval).abs() {
            mfcn.info(SOURCE, "machine accuracy limits further improvement");
        } else if edm >= 10.0 * edmval {
            mfcn.warn(SOURCE, format!("edm = {edm:e} above target {edmval:e}"));
            return FunctionMinimum::new(seed, result, up, TerminalCondition::AboveMaxEdm);
        }
    }
    FunctionMinimum::new(seed, result, up, TerminalCondition::Converged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::gradient::Numerical2PGradient;
    use crate::minimizers::migrad_seed;
    use crate::user::UserParameterState;
    use approx::assert_relative_eq;

    fn run(
        f: &dyn Fn(&[f64]) -> f64,
        st: &UserParameterState,
        strategy: Strategy,
        max_calls: usize,
    ) -> FunctionMinimum {
        let mfcn = MnFcn::new(f, st.trafo(), 1.0, &NullSink);
        let gc = Numerical2PGradient::new(&mfcn, strategy);
        let seed = migrad_seed(&mfcn, &gc, st, strategy, true);
        variable_metric(&mfcn, &gc, seed, strategy, max_calls, 0.1)
    }

    #[test]
    fn test_quadratic_bowl() {
        let mut st = UserParameterState::new();
        st.add("x", 0.0, 1.0).unwrap().add("y", 0.0, 1.0).unwrap();
        let f = |p: &[f64]| (p[0] - 3.0).powi(2) + 10.0 * (p[1] + 1.0).powi(2);
        let min = run(&f, &st, Strategy::medium(), 1000);

        assert!(min.is_valid());
        assert_relative_eq!(min.user_state().value("x").unwrap(), 3.0, epsilon = 1e-4);
        assert_relative_eq!(min.user_state().value("y").unwrap(), -1.0, epsilon = 1e-4);
        assert!(min.fval() < 1e-8);
        assert!(min.edm() < 1e-5);
    }

    #[test]
    fn test_rosenbrock() {
        let mut st = UserParameterState::new();
        st.add("x", -1.2, 0.1).unwrap().add("y", 1.0, 0.1).unwrap();
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let min = run(&f, &st, Strategy::medium(), 5000);

        assert!(min.is_valid());
        assert_relative_eq!(min.user_state().value("x").unwrap(), 1.0, epsilon = 1e-2);
        assert_relative_eq!(min.user_state().value("y").unwrap(), 1.0, epsilon = 2e-2);
    }

    #[test]
    fn test_call_limit() {
        let mut st = UserParameterState::new();
        st.add("x", -1.2, 0.1).unwrap().add("y", 1.0, 0.1).unwrap();
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let min = run(&f, &st, Strategy::low(), 30);
        assert!(min.has_reached_call_limit());
        assert!(!min.is_valid());
    }

    #[test]
    fn test_call_limit_wins_over_edm_with_hesse_strategy() {
        let mut st = UserParameterState::new();
        st.add("x", -1.2, 1.0).unwrap().add("y", 1.0, 1.0).unwrap();
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        for max_calls in [10, 20, 50] {
            let min = run(&f, &st, Strategy::medium(), max_calls);
            assert_eq!(
                min.condition(),
                TerminalCondition::ReachedCallLimit,
                "max_calls = {max_calls}"
            );
            assert!(!min.is_valid());
        }
    }
}
