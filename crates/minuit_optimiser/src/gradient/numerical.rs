//! Two-point central-difference gradient.

use minuit_core::Fcn;

use super::{GradientCalculator, InitialGradient};
use crate::fcn::MnFcn;
use crate::state::{FunctionGradient, MinimumParameters};
use crate::strategy::Strategy;

/// Central differences with per-parameter step optimisation.
///
/// For every parameter the step is driven towards
/// `sqrt(dfmin / (|g2| + epspri))`, the size balancing truncation against
/// rounding error, within `[max(8 eps^2, 8 |eps2 x|), 10 |gstep|]` (0.5
/// for bounded parameters). Up to `gradient_ncycles` iterations stop
/// early once the step or the gradient settles.
pub struct Numerical2PGradient<'a, F: Fcn + ?Sized> {
    mfcn: &'a MnFcn<'a, F>,
    strategy: Strategy,
}

impl<'a, F: Fcn + ?Sized> Numerical2PGradient<'a, F> {
    /// Calculator over `mfcn` with `strategy`'s tolerances.
    pub fn new(mfcn: &'a MnFcn<'a, F>, strategy: Strategy) -> Self {
        Self { mfcn, strategy }
    }
}

impl<F: Fcn + ?Sized> GradientCalculator for Numerical2PGradient<'_, F> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let initial = InitialGradient::new(self.mfcn).gradient(par);
        self.gradient_with_previous(par, &initial)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        assert!(par.is_valid(), "gradient requested at invalid parameters");
        let trafo = self.mfcn.trafo();
        let prec = trafo.precision();
        let eps2 = prec.eps2();

        let mut x = par.vec().to_vec();
        let fcnmin = par.fval();
        let dfmin = 8.0 * eps2 * (fcnmin.abs() + self.mfcn.error_def());
        let vrysml = 8.0 * prec.eps() * prec.eps();

        let mut grd = previous.grad().to_vec();
        let mut g2 = previous.g2().to_vec();
        let mut gstep = previous.gstep().to_vec();

        for i in 0..x.len() {
            let xtf = x[i];
            let epspri = eps2 + (grd[i] * eps2).abs();
            let bounded = trafo.parameter(trafo.ext_of_int(i)).has_limits();
            let mut stepb4 = 0.0;

            for _ in 0..self.strategy.gradient_ncycles() {
                let optstp = (dfmin / (g2[i].abs() + epspri)).sqrt();
                let mut step = optstp.max((0.1 * gstep[i]).abs());
                if bounded && step > 0.5 {
                    step = 0.5;
                }
                let stpmax = 10.0 * gstep[i].abs();
                if step > stpmax {
                    step = stpmax;
                }
                let stpmin = vrysml.max(8.0 * (eps2 * x[i]).abs());
                if step < stpmin {
                    step = stpmin;
                }
                if ((step - stepb4) / step).abs() < self.strategy.gradient_step_tolerance() {
                    break;
                }
                gstep[i] = step;
                stepb4 = step;

                x[i] = xtf + step;
                let fs1 = self.mfcn.value(&x);
                x[i] = xtf - step;
                let fs2 = self.mfcn.value(&x);
                x[i] = xtf;

                let grdb4 = grd[i];
                grd[i] = 0.5 * (fs1 - fs2) / step;
                g2[i] = (fs1 + fs2 - 2.0 * fcnmin) / step / step;

                if (grdb4 - grd[i]).abs() / (grd[i].abs() + dfmin / step)
                    < self.strategy.gradient_tolerance()
                {
                    break;
                }
            }
        }

        FunctionGradient::numerical(grd, g2, gstep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use approx::assert_relative_eq;
    use minuit_core::{Parameter, UserTransformation};

    fn trafo() -> UserTransformation {
        let mut t = UserTransformation::new();
        t.add(Parameter::new("x", 1.0, 0.1)).unwrap();
        t.add(Parameter::new("y", -2.0, 0.1)).unwrap();
        t
    }

    #[test]
    fn test_quadratic_gradient_and_curvature() {
        let t = trafo();
        let f = |p: &[f64]| 3.0 * p[0] * p[0] + 0.5 * p[1] * p[1];
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let x = vec![1.0, -2.0];
        let par = MinimumParameters::new(x.clone(), f(&x));

        let g = Numerical2PGradient::new(&mfcn, Strategy::medium()).gradient(&par);
        assert_relative_eq!(g.grad()[0], 6.0, max_relative = 1e-6);
        assert_relative_eq!(g.grad()[1], -2.0, max_relative = 1e-6);
        assert_relative_eq!(g.g2()[0], 6.0, max_relative = 1e-4);
        assert_relative_eq!(g.g2()[1], 1.0, max_relative = 1e-4);
        assert!(mfcn.num_calls() > 0);
        assert!(mfcn.num_calls() <= 2 * 2 * Strategy::medium().gradient_ncycles() as usize);
    }

    #[test]
    fn test_high_strategy_is_at_least_as_accurate() {
        let t = trafo();
        let f = |p: &[f64]| p[0].exp() + p[1].powi(4);
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let x = vec![1.0, -2.0];
        let par = MinimumParameters::new(x.clone(), f(&x));

        let g = Numerical2PGradient::new(&mfcn, Strategy::high()).gradient(&par);
        assert_relative_eq!(g.grad()[0], 1.0f64.exp(), max_relative = 1e-5);
        assert_relative_eq!(g.grad()[1], -32.0, max_relative = 1e-5);
    }
}
