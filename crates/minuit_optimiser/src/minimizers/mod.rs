//! Minimisation algorithms.
//!
//! [`minimize`] is the single entry point: it builds the evaluation
//! context, picks a gradient calculator, seeds the chosen algorithm and
//! runs it.
//!
//! - MIGRAD: variable-metric descent with Davidon updates and a parabolic
//!   line search; produces a covariance matrix
//! - SIMPLEX: Nelder-Mead, robust but without error estimates
//! - Combined: MIGRAD, falling back to SIMPLEX and a second MIGRAD

mod combined;
mod davidon;
pub mod edm;
mod line_search;
mod negative_g2;
mod seed;
mod simplex;
mod variable_metric;

pub use line_search::line_search;
pub use negative_g2::{has_negative_g2, negative_g2_search};
pub use seed::{migrad_seed, simplex_seed};

use minuit_core::Fcn;

use crate::config::MinimizerConfig;
use crate::diagnostics::DiagnosticSink;
use crate::fcn::MnFcn;
use crate::gradient::{AnalyticalGradient, GradientCalculator, Numerical2PGradient};
use crate::state::{FunctionMinimum, MinimumSeed, TerminalCondition};
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "ModularFunctionMinimizer";

/// Minimisation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Variable metric.
    Migrad,
    /// Nelder-Mead simplex.
    Simplex,
    /// MIGRAD with a SIMPLEX fallback.
    #[default]
    Combined,
}

/// Minimise `fcn` starting from `state`.
///
/// The call budget is `config.max_calls` (or the automatic budget for the
/// number of free parameters) and the EDM target is
/// `1e-4 * tolerance * error_def`, never below machine accuracy. The
/// objective's own gradient is used when it has one and
/// `config.use_analytical_gradient` is set.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::diagnostics::NullSink;
/// use minuit_optimiser::{minimize, Algorithm, MinimizerConfig, Strategy, UserParameterState};
///
/// let mut start = UserParameterState::new();
/// start.add("x", 0.0, 1.0).unwrap();
///
/// let f = |p: &[f64]| (p[0] - 1.5).powi(2);
/// let min = minimize(
///     &f,
///     &start,
///     Strategy::default(),
///     &MinimizerConfig::default(),
///     Algorithm::Migrad,
///     &NullSink,
/// );
/// assert!(min.is_valid());
/// assert!((min.user_state().value("x").unwrap() - 1.5).abs() < 1e-4);
/// ```
pub fn minimize<F: Fcn + ?Sized>(
    fcn: &F,
    state: &UserParameterState,
    strategy: Strategy,
    config: &MinimizerConfig,
    algorithm: Algorithm,
    sink: &dyn DiagnosticSink,
) -> FunctionMinimum {
    let max_calls = config.resolved_max_calls(state.variable_parameters());
    let toler = (config.tolerance * config.error_def).max(state.trafo().precision().eps2());

    let mfcn = MnFcn::new(fcn, state.trafo(), config.error_def, sink);
    let analytical = AnalyticalGradient::new(&mfcn);
    let numerical = Numerical2PGradient::new(&mfcn, strategy);
    let gc: &dyn GradientCalculator = if fcn.has_gradient() && config.use_analytical_gradient {
        &analytical
    } else {
        &numerical
    };

    match algorithm {
        Algorithm::Migrad => {
            let seed = migrad_seed(&mfcn, gc, state, strategy, config.check_gradient);
            run_migrad(&mfcn, gc, seed, strategy, max_calls, toler)
        }
        Algorithm::Simplex => {
            let seed = simplex_seed(&mfcn, state);
            run_simplex(&mfcn, seed, max_calls, toler)
        }
        Algorithm::Combined => combined::combined(
            &mfcn,
            gc,
            state,
            strategy,
            config.check_gradient,
            max_calls,
            toler,
        ),
    }
}

fn budget_exhausted<F: Fcn + ?Sized>(mfcn: &MnFcn<'_, F>, max_calls: usize) -> bool {
    if mfcn.num_calls() >= max_calls {
        mfcn.warn(SOURCE, "call limit reached while seeding");
        return true;
    }
    false
}

pub(crate) fn run_migrad<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    gc: &dyn GradientCalculator,
    seed: MinimumSeed,
    strategy: Strategy,
    max_calls: usize,
    toler: f64,
) -> FunctionMinimum {
    if budget_exhausted(mfcn, max_calls) {
        return FunctionMinimum::seed_only(seed, mfcn.error_def(), TerminalCondition::ReachedCallLimit);
    }
    variable_metric::variable_metric(mfcn, gc, seed, strategy, max_calls, toler)
}

pub(crate) fn run_simplex<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    seed: MinimumSeed,
    max_calls: usize,
    toler: f64,
) -> FunctionMinimum {
    if budget_exhausted(mfcn, max_calls) {
        return FunctionMinimum::seed_only(seed, mfcn.error_def(), TerminalCondition::ReachedCallLimit);
    }
    simplex::simplex(mfcn, seed, max_calls, toler)
}
