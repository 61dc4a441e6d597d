//! Full second-derivative matrix by finite differences.

use minuit_core::{Fcn, SymMatrix};

use super::make_pos_def;
use crate::config::default_max_calls;
use crate::diagnostics::DiagnosticSink;
use crate::fcn::MnFcn;
use crate::gradient::{GradientCalculator, HessianGradient, InitialGradient, Numerical2PGradient};
use crate::minimizers::edm;
use crate::state::{
    ErrorStatus, FunctionGradient, FunctionMinimum, MinimumError, MinimumParameters, MinimumState,
};
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "MnHesse";

/// Hesse error analysis.
///
/// Computes the Hessian at a point by finite differences and replaces the
/// state's error matrix with its inverse. Diagonal elements adapt their
/// step until the second derivative is stable to `hessian_g2_tolerance`;
/// off-diagonal elements reuse the diagonal steps. Any failure (zero
/// curvature, call budget, singular matrix) yields a diagonal
/// `1/g2` matrix tagged [`ErrorStatus::HesseFailed`].
///
/// # Examples
///
/// ```
/// use minuit_optimiser::{Hesse, UserParameterState};
/// use minuit_optimiser::diagnostics::NullSink;
///
/// let mut state = UserParameterState::new();
/// state.add("x", 1.0, 0.1).unwrap();
/// state.add("y", 2.0, 0.1).unwrap();
/// let f = |p: &[f64]| p[0] * p[0] + 4.0 * p[1] * p[1];
///
/// let result = Hesse::default().calculate_state(&f, &state, 1.0, 0, &NullSink);
/// let cov = result.covariance().unwrap();
/// assert!((cov[(0, 0)] - 1.0).abs() < 1e-6);
/// assert!((cov[(1, 1)] - 0.25).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hesse {
    strategy: Strategy,
}

impl Hesse {
    /// Hesse with the tolerances of `strategy`.
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Strategy in use.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Hessian for an arbitrary parameter state, without a prior minimum.
    ///
    /// `max_calls` = 0 selects `200 + 100 n + 5 n^2`. Calls are counted on
    /// top of `state.nfcn()` and the budget covers only the calls made here.
    pub fn calculate_state<F: Fcn + ?Sized>(
        &self,
        fcn: &F,
        state: &UserParameterState,
        error_def: f64,
        max_calls: usize,
        sink: &dyn DiagnosticSink,
    ) -> UserParameterState {
        let trafo = state.trafo();
        let mfcn = MnFcn::new(fcn, trafo, error_def, sink).with_initial_calls(state.nfcn());
        let x = state.int_parameters().to_vec();
        let n = x.len();
        let amin = mfcn.value(&x);
        let par = MinimumParameters::new(x, amin);
        let gradient = Numerical2PGradient::new(&mfcn, self.strategy).gradient(&par);
        let seed = MinimumState::new(
            par,
            MinimumError::normal(SymMatrix::new(n), 1.0),
            gradient,
            state.edm(),
            state.nfcn(),
        );
        let result = self.calculate(&mfcn, &seed, max_calls);
        UserParameterState::from_state(&result, error_def, trafo)
    }

    /// Append a Hesse state to an existing minimum.
    ///
    /// Function calls continue to count from the minimum's total.
    pub fn calculate_minimum<F: Fcn + ?Sized>(
        &self,
        fcn: &F,
        minimum: &FunctionMinimum,
        max_calls: usize,
        sink: &dyn DiagnosticSink,
    ) -> FunctionMinimum {
        let trafo = minimum.seed().trafo();
        let mfcn =
            MnFcn::new(fcn, trafo, minimum.error_def(), sink).with_initial_calls(minimum.nfcn());
        let state = self.calculate(&mfcn, minimum.state(), max_calls);
        minimum.clone().with_state(state)
    }

    /// Hesse on an internal state.
    ///
    /// `mfcn` is expected to count from `state.nfcn()`; the budget applies
    /// to calls made here.
    pub fn calculate<F: Fcn + ?Sized>(
        &self,
        mfcn: &MnFcn<'_, F>,
        state: &MinimumState,
        max_calls: usize,
    ) -> MinimumState {
        let n = state.len();
        let max_calls = if max_calls == 0 {
            default_max_calls(n)
        } else {
            max_calls
        };

        let mut g2 = state.gradient().g2().to_vec();
        let mut gst = state.gradient().gstep().to_vec();
        if state.gradient().is_analytical() {
            let initial = InitialGradient::new(mfcn).gradient(state.parameters());
            g2 = initial.g2().to_vec();
            gst = initial.gstep().to_vec();
        }

        match self.try_calculate(mfcn, state, max_calls, &mut g2, gst) {
            Ok(st) => st,
            Err(reason) => {
                mfcn.warn(SOURCE, format!("{reason}; returning diagonal matrix"));
                let eps2 = mfcn.trafo().precision().eps2();
                let diag: Vec<f64> = g2
                    .iter()
                    .map(|&g| {
                        let tmp = if g < eps2 { 1.0 } else { 1.0 / g };
                        if tmp < eps2 {
                            1.0
                        } else {
                            tmp
                        }
                    })
                    .collect();
                MinimumState::new(
                    state.parameters().clone(),
                    MinimumError::new(SymMatrix::from_diagonal(&diag), ErrorStatus::HesseFailed),
                    state.gradient().clone(),
                    state.edm(),
                    mfcn.num_calls(),
                )
            }
        }
    }

    fn try_calculate<F: Fcn + ?Sized>(
        &self,
        mfcn: &MnFcn<'_, F>,
        state: &MinimumState,
        max_calls: usize,
        g2: &mut [f64],
        mut gst: Vec<f64>,
    ) -> Result<MinimumState, &'static str> {
        let trafo = mfcn.trafo();
        let prec = trafo.precision();
        let eps2 = prec.eps2();
        let n = state.len();

        let amin = mfcn.value(state.vec());
        let aimsag = eps2.sqrt() * (amin.abs() + mfcn.error_def());

        let mut grd = state.gradient().grad().to_vec();
        let mut dirin = gst.clone();
        let mut yy = vec![0.0; n];
        let mut vhmat = SymMatrix::new(n);
        let mut x = state.vec().to_vec();

        for i in 0..n {
            let xtf = x[i];
            let bounded = trafo.parameter(trafo.ext_of_int(i)).has_limits();
            let dmin = 8.0 * eps2 * (xtf.abs() + eps2);
            let mut d = gst[i].abs().max(dmin);

            for _ in 0..self.strategy.hessian_ncycles() {
                let mut sag = 0.0;
                let mut fs1 = 0.0;
                let mut fs2 = 0.0;
                let mut multpy = 0;
                while multpy < 5 {
                    x[i] = xtf + d;
                    fs1 = mfcn.value(&x);
                    x[i] = xtf - d;
                    fs2 = mfcn.value(&x);
                    x[i] = xtf;
                    sag = 0.5 * (fs1 + fs2 - 2.0 * amin);
                    if sag > eps2 {
                        break;
                    }
                    if bounded {
                        if d > 0.5 {
                            return Err("2nd derivative zero for bounded parameter");
                        }
                        d *= 10.0;
                        if d > 0.5 {
                            d = 0.51;
                        }
                    } else {
                        d *= 10.0;
                    }
                    multpy += 1;
                }
                if multpy >= 5 {
                    return Err("2nd derivative zero for parameter");
                }

                let g2bfor = g2[i];
                g2[i] = 2.0 * sag / (d * d);
                grd[i] = (fs1 - fs2) / (2.0 * d);
                gst[i] = d;
                dirin[i] = d;
                yy[i] = fs1;

                let dlast = d;
                d = (2.0 * aimsag / g2[i].abs()).sqrt();
                if bounded {
                    d = d.min(0.5);
                }
                d = d.max(dmin);

                if ((d - dlast) / d).abs() < self.strategy.hessian_step_tolerance() {
                    break;
                }
                if ((g2[i] - g2bfor) / g2[i]).abs() < self.strategy.hessian_g2_tolerance() {
                    break;
                }
                d = d.min(10.0 * dlast).max(0.1 * dlast);
            }

            vhmat[(i, i)] = g2[i];
            if mfcn.num_calls().saturating_sub(state.nfcn()) > max_calls {
                return Err("maximum number of allowed function calls exhausted");
            }
        }

        if self.strategy.level() > 0 {
            let refined = HessianGradient::new(mfcn, self.strategy).gradient_with_previous(
                state.parameters(),
                &FunctionGradient::numerical(grd.clone(), g2.to_vec(), gst.clone()),
            );
            grd = refined.grad().to_vec();
        }

        for i in 0..n {
            x[i] += dirin[i];
            for j in (i + 1)..n {
                x[j] += dirin[j];
                let fs1 = mfcn.value(&x);
                vhmat[(i, j)] = (fs1 + amin - yy[i] - yy[j]) / (dirin[i] * dirin[j]);
                x[j] -= dirin[j];
            }
            x[i] -= dirin[i];
        }

        let checked = make_pos_def(&MinimumError::normal(vhmat, 1.0), prec);
        let mut inv = checked.inv_hessian().clone();
        if inv.invert().is_err() {
            return Err("matrix inversion fails");
        }

        let gradient = FunctionGradient::numerical(grd, g2.to_vec(), gst);
        if checked.is_made_pos_def() {
            mfcn.warn(SOURCE, "matrix was forced pos. def.");
            return Ok(MinimumState::new(
                state.parameters().clone(),
                MinimumError::new(inv, ErrorStatus::MadePosDef),
                gradient,
                state.edm(),
                mfcn.num_calls(),
            ));
        }

        let error = MinimumError::normal(inv, 0.0);
        let edm = edm::estimate(&gradient, &error);
        Ok(MinimumState::new(
            state.parameters().clone(),
            error,
            gradient,
            edm,
            mfcn.num_calls(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Level, NullSink};
    use approx::assert_relative_eq;

    fn state(values: &[f64]) -> UserParameterState {
        let mut st = UserParameterState::new();
        for (i, &v) in values.iter().enumerate() {
            st.add(&format!("p{i}"), v, 0.1).unwrap();
        }
        st
    }

    #[test]
    fn test_correlated_quadratic() {
        // f = x^2 + y^2 + x y: Hessian [[2, 1], [1, 2]], covariance 2 H^-1.
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1] + p[0] * p[1];
        let out = Hesse::default().calculate_state(&f, &state(&[0.3, -0.2]), 1.0, 0, &NullSink);
        let cov = out.covariance().unwrap();
        assert_relative_eq!(cov[(0, 0)], 4.0 / 3.0, max_relative = 1e-5);
        assert_relative_eq!(cov[(0, 1)], -2.0 / 3.0, max_relative = 1e-5);
        assert_relative_eq!(cov[(1, 1)], 4.0 / 3.0, max_relative = 1e-5);
        assert!(out.is_valid());
    }

    #[test]
    fn test_error_def_scales_covariance() {
        let f = |p: &[f64]| p[0] * p[0];
        let out = Hesse::default().calculate_state(&f, &state(&[0.0]), 0.5, 0, &NullSink);
        assert_relative_eq!(out.covariance().unwrap()[(0, 0)], 0.5, max_relative = 1e-6);
        assert_relative_eq!(out.error("p0").unwrap(), 0.5f64.sqrt(), max_relative = 1e-6);
    }

    #[test]
    fn test_flat_direction_fails_to_diagonal() {
        let f = |p: &[f64]| p[0] * p[0];
        let sink = CollectingSink::new();
        let out = Hesse::default().calculate_state(&f, &state(&[0.0, 1.0]), 1.0, 0, &sink);
        assert!(!out.is_valid());
        assert!(!out.has_covariance());
        assert!(sink.contains(SOURCE, Level::Warn));
    }

    #[test]
    fn test_fitted_state_keeps_counting() {
        use crate::config::MinimizerConfig;
        use crate::minimizers::{minimize, Algorithm};
        use crate::strategy::Strategy;

        let f = |p: &[f64]| (p[0] - 3.0).powi(2) + 10.0 * (p[1] + 1.0).powi(2);
        let min = minimize(
            &f,
            &state(&[0.0, 0.0]),
            Strategy::medium(),
            &MinimizerConfig::default(),
            Algorithm::Migrad,
            &NullSink,
        );
        let fitted = min.user_state();
        assert!(fitted.nfcn() > 4);

        let starved = Hesse::default().calculate_state(&f, fitted, 1.0, 4, &NullSink);
        assert!(!starved.is_valid());
        assert!(!starved.has_covariance());
        assert!(starved.nfcn() > fitted.nfcn());

        let full = Hesse::default().calculate_state(&f, fitted, 1.0, 0, &NullSink);
        assert!(full.is_valid());
        assert!(full.nfcn() > fitted.nfcn());
    }

    #[test]
    fn test_call_budget() {
        let f = |p: &[f64]| p.iter().map(|v| v * v).sum::<f64>();
        let sink = CollectingSink::new();
        let out = Hesse::default().calculate_state(&f, &state(&[1.0, 2.0, 3.0]), 1.0, 4, &sink);
        assert!(!out.is_valid());
        assert!(sink.contains(SOURCE, Level::Warn));
    }
}
