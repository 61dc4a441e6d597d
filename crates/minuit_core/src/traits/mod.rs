//! The objective function abstraction.
//!
//! Any `Fn(&[f64]) -> f64` is an objective. Objectives with an analytic
//! gradient implement [`Fcn::gradient`] (or wrap two closures in
//! [`FcnWithGradient`]); the minimiser then uses the supplied gradient in
//! external coordinates and applies the chain rule itself.
//!
//! The error definition (`up`: 1 for chi-square, 0.5 for negative
//! log-likelihood) is a property of the fit and is configured on the
//! minimiser, not on the objective.

/// Scalar objective of the external parameter vector.
///
/// # Examples
/// ```
/// use minuit_core::traits::Fcn;
///
/// let chi2 = |p: &[f64]| (p[0] - 1.0).powi(2);
/// assert_eq!(chi2.value(&[3.0]), 4.0);
/// assert!(!chi2.has_gradient());
/// ```
pub trait Fcn {
    /// Objective value at `x` (external coordinates, all parameters).
    fn value(&self, x: &[f64]) -> f64;

    /// Analytic gradient at `x`, or `None` when not provided.
    fn gradient(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// True if [`Fcn::gradient`] returns a value.
    fn has_gradient(&self) -> bool {
        false
    }
}

impl<F> Fcn for F
where
    F: Fn(&[f64]) -> f64 + ?Sized,
{
    fn value(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Objective built from a value closure and a gradient closure.
///
/// # Examples
/// ```
/// use minuit_core::traits::{Fcn, FcnWithGradient};
///
/// let f = FcnWithGradient::new(
///     |p: &[f64]| p[0] * p[0],
///     |p: &[f64]| vec![2.0 * p[0]],
/// );
/// assert!(f.has_gradient());
/// assert_eq!(f.gradient(&[1.5]), Some(vec![3.0]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FcnWithGradient<F, G> {
    value: F,
    gradient: G,
}

impl<F, G> FcnWithGradient<F, G>
where
    F: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    /// Combine a value and a gradient closure.
    pub fn new(value: F, gradient: G) -> Self {
        Self { value, gradient }
    }
}

impl<F, G> Fcn for FcnWithGradient<F, G>
where
    F: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    fn value(&self, x: &[f64]) -> f64 {
        (self.value)(x)
    }

    fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
        Some((self.gradient)(x))
    }

    fn has_gradient(&self) -> bool {
        true
    }
}
