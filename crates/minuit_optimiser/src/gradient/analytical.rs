//! Adapter for objectives that supply their own gradient.

use minuit_core::Fcn;

use super::GradientCalculator;
use crate::fcn::MnFcn;
use crate::state::{FunctionGradient, MinimumParameters};

/// Gradient from [`Fcn::gradient`], chained through the transformation's
/// Jacobian into internal coordinates.
///
/// Second derivatives and steps are not computed; they are carried over
/// from the previous gradient (zero when there is none). A missing or
/// mis-sized user gradient yields an invalid [`FunctionGradient`].
pub struct AnalyticalGradient<'a, F: Fcn + ?Sized> {
    mfcn: &'a MnFcn<'a, F>,
}

impl<'a, F: Fcn + ?Sized> AnalyticalGradient<'a, F> {
    /// Adapter over `mfcn`.
    pub fn new(mfcn: &'a MnFcn<'a, F>) -> Self {
        Self { mfcn }
    }

    fn internal_gradient(&self, par: &MinimumParameters) -> Option<Vec<f64>> {
        let trafo = self.mfcn.trafo();
        let external = trafo.transform(par.vec());
        let grad = self.mfcn.fcn().gradient(&external)?;
        if grad.len() != trafo.len() {
            self.mfcn.warn(
                "AnalyticalGradientCalculator",
                format!(
                    "gradient has {} components, expected {}",
                    grad.len(),
                    trafo.len()
                ),
            );
            return None;
        }
        Some(
            par.vec()
                .iter()
                .enumerate()
                .map(|(i, &v)| grad[trafo.ext_of_int(i)] * trafo.dint2ext(i, v))
                .collect(),
        )
    }
}

impl<F: Fcn + ?Sized> GradientCalculator for AnalyticalGradient<'_, F> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let n = par.len();
        self.gradient_with_previous(
            par,
            &FunctionGradient::numerical(vec![0.0; n], vec![0.0; n], vec![0.0; n]),
        )
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        match self.internal_gradient(par) {
            Some(v) => {
                FunctionGradient::analytical(v, previous.g2().to_vec(), previous.gstep().to_vec())
            }
            None => FunctionGradient::invalid(par.len()),
        }
    }

    fn is_analytical(&self) -> bool {
        true
    }
}
