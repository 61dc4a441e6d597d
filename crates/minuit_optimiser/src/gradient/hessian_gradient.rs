//! Gradient refinement with shrinking steps.

use minuit_core::Fcn;

use super::{GradientCalculator, InitialGradient};
use crate::fcn::MnFcn;
use crate::state::{FunctionGradient, MinimumParameters};
use crate::strategy::Strategy;

/// Central differences whose step starts at `min(0.2 |gstep|, optstp)`
/// and shrinks by 0.2 per cycle until the gradient stabilises.
///
/// Unlike [`super::Numerical2PGradient`] it also reports the uncertainty of
/// each component, which the analytic-gradient check compares against.
/// Second derivatives and steps are passed through unchanged.
pub struct HessianGradient<'a, F: Fcn + ?Sized> {
    mfcn: &'a MnFcn<'a, F>,
    strategy: Strategy,
}

impl<'a, F: Fcn + ?Sized> HessianGradient<'a, F> {
    /// Calculator over `mfcn` running `hessian_gradient_ncycles` cycles.
    pub fn new(mfcn: &'a MnFcn<'a, F>, strategy: Strategy) -> Self {
        Self { mfcn, strategy }
    }

    /// Refined gradient plus the per-component uncertainty.
    pub fn delta_gradient(
        &self,
        par: &MinimumParameters,
        gradient: &FunctionGradient,
    ) -> (FunctionGradient, Vec<f64>) {
        assert!(par.is_valid(), "gradient requested at invalid parameters");
        let prec = self.mfcn.trafo().precision();
        let (eps, eps2) = (prec.eps(), prec.eps2());

        let mut x = par.vec().to_vec();
        let mut grd = gradient.grad().to_vec();
        let g2 = gradient.g2();
        let gstep = gradient.gstep();
        let fcnmin = par.fval();
        let dfmin = 4.0 * eps2 * (fcnmin.abs() + self.mfcn.error_def());
        let n = x.len();
        let mut dgrd = vec![0.0; n];

        for i in 0..n {
            let xtf = x[i];
            let dmin = 4.0 * eps2 * (xtf.abs() + eps2);
            let epspri = eps2 + (grd[i] * eps2).abs();
            let optstp = (dfmin / (g2[i].abs() + epspri)).sqrt();
            let mut d = (0.2 * gstep[i].abs()).min(optstp).max(dmin);

            let mut chgold = 10_000.0;
            let mut dgmin = 0.0;
            let mut grdold = 0.0;
            let mut grdnew = 0.0;
            for j in 0..self.strategy.hessian_gradient_ncycles() {
                x[i] = xtf + d;
                let fs1 = self.mfcn.value(&x);
                x[i] = xtf - d;
                let fs2 = self.mfcn.value(&x);
                x[i] = xtf;

                grdold = grd[i];
                grdnew = (fs1 - fs2) / (2.0 * d);
                dgmin = eps * (fs1.abs() + fs2.abs()) / d;
                if grdnew.abs() < eps {
                    break;
                }
                let change = ((grdold - grdnew) / grdnew).abs();
                if change > chgold && j > 1 {
                    break;
                }
                chgold = change;
                grd[i] = grdnew;
                if change < 0.05 || (grdold - grdnew).abs() < dgmin || d < dmin {
                    break;
                }
                d *= 0.2;
            }
            dgrd[i] = dgmin.max((grdold - grdnew).abs());
        }

        (
            FunctionGradient::numerical(grd, g2.to_vec(), gstep.to_vec()),
            dgrd,
        )
    }
}

impl<F: Fcn + ?Sized> GradientCalculator for HessianGradient<'_, F> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let initial = InitialGradient::new(self.mfcn).gradient(par);
        self.gradient_with_previous(par, &initial)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        self.delta_gradient(par, previous).0
    }
}
