//! Gradient guess from the parameter errors.

use minuit_core::Fcn;

use super::GradientCalculator;
use crate::fcn::MnFcn;
use crate::state::{FunctionGradient, MinimumParameters};

/// First gradient estimate, costing no function calls.
///
/// Each parameter's user error `werr` is mapped into internal space
/// (`dirin`, half the internal width of `value +- werr`, truncated at the
/// bounds) and the objective is assumed to rise by `up` over it:
/// `g2 = 2 up / dirin^2`, `grd = g2 dirin`.
pub struct InitialGradient<'a, F: Fcn + ?Sized> {
    mfcn: &'a MnFcn<'a, F>,
}

impl<'a, F: Fcn + ?Sized> InitialGradient<'a, F> {
    /// Calculator over `mfcn`'s transformation and error definition.
    pub fn new(mfcn: &'a MnFcn<'a, F>) -> Self {
        Self { mfcn }
    }
}

impl<F: Fcn + ?Sized> GradientCalculator for InitialGradient<'_, F> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let trafo = self.mfcn.trafo();
        let eps2 = trafo.precision().eps2();
        let up = self.mfcn.error_def();
        let n = par.len();

        let mut grd = vec![0.0; n];
        let mut g2 = vec![0.0; n];
        let mut gstep = vec![0.0; n];

        for i in 0..n {
            let ext = trafo.ext_of_int(i);
            let p = trafo.parameter(ext);
            let var = par.vec()[i];
            let werr = p.error();
            let sav = trafo.int2ext(i, var);

            let mut plus = sav + werr;
            if let Some(upper) = p.upper_limit() {
                plus = plus.min(upper);
            }
            let vplu = trafo.ext2int(ext, plus) - var;

            let mut minus = sav - werr;
            if let Some(lower) = p.lower_limit() {
                minus = minus.max(lower);
            }
            let vmin = trafo.ext2int(ext, minus) - var;

            let dirin = 0.5 * (vplu.abs() + vmin.abs());
            g2[i] = 2.0 * up / (dirin * dirin);
            grd[i] = g2[i] * dirin;
            gstep[i] = (8.0 * eps2 * (var.abs() + eps2)).max(0.1 * dirin);
            if p.has_limits() && gstep[i] > 0.5 {
                gstep[i] = 0.5;
            }
        }

        FunctionGradient::numerical(grd, g2, gstep)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        _previous: &FunctionGradient,
    ) -> FunctionGradient {
        self.gradient(par)
    }
}
