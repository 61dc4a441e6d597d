//! Machine precision determination.
//!
//! The minimiser derives all of its finite-difference step floors and
//! convergence guards from two numbers:
//!
//! - `eps`: the smallest relative increment that survives `1 + eps`
//!   (scaled by a safety factor of 8)
//! - `eps2 = 2 * sqrt(eps)`: the relative accuracy of a function value
//!
//! The measurement is generic over [`num_traits::Float`] so it reports the right
//! scale for whichever floating-point type the caller evaluates in.

use num_traits::Float;

/// Probe value used before the epsilon has been measured.
const DEFAULT_EPS: f64 = 4.0e-7;

/// Maximum number of halvings attempted when measuring.
const MAX_HALVINGS: usize = 100;

/// Machine precision in use by the minimiser.
///
/// # Examples
///
/// ```
/// use minuit_core::math::MachinePrecision;
///
/// let prec = MachinePrecision::new();
/// assert!(prec.eps() < 1e-15);
/// assert!((prec.eps2() - 2.0 * prec.eps().sqrt()).abs() < 1e-20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachinePrecision {
    eps: f64,
    eps2: f64,
}

impl Default for MachinePrecision {
    fn default() -> Self {
        Self::new()
    }
}

impl MachinePrecision {
    /// Measure the precision of `f64`.
    pub fn new() -> Self {
        Self::for_float::<f64>()
    }

    /// Measure the precision of the floating-point type `T`.
    ///
    /// Falls back to the conservative default of `4e-7` if the measurement
    /// cannot resolve an epsilon for `T`.
    pub fn for_float<T: Float>() -> Self {
        let eps = measure_epsilon::<T>()
            .and_then(|e| e.to_f64())
            .unwrap_or(DEFAULT_EPS);
        Self::with_eps(eps)
    }

    /// Use a caller-supplied precision, e.g. for an objective that is only
    /// accurate to a few digits.
    pub fn with_eps(eps: f64) -> Self {
        Self {
            eps,
            eps2: 2.0 * eps.sqrt(),
        }
    }

    /// Relative machine epsilon (times 8).
    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Relative accuracy of function values, `2 * sqrt(eps)`.
    #[inline]
    pub fn eps2(&self) -> f64 {
        self.eps2
    }

    /// Replace the precision.
    pub fn set_precision(&mut self, eps: f64) {
        *self = Self::with_eps(eps);
    }
}

/// Halve a trial increment until `1 + trial` rounds back to one.
fn measure_epsilon<T: Float>() -> Option<T> {
    let one = T::one();
    let half = T::from(0.5)?;
    let eight = T::from(8.0)?;
    let mut trial = half;
    for _ in 0..MAX_HALVINGS {
        trial = trial * half;
        let sum = std::hint::black_box(one + trial);
        if sum - one < trial {
            return Some(eight * trial);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_f64_precision() {
        let prec = MachinePrecision::new();
        assert_relative_eq!(prec.eps(), 8.0 * 2f64.powi(-53), max_relative = 1e-12);
        assert_relative_eq!(prec.eps2(), 2.0 * prec.eps().sqrt());
    }

    #[test]
    fn test_f32_precision_is_coarser() {
        let p32 = MachinePrecision::for_float::<f32>();
        let p64 = MachinePrecision::for_float::<f64>();
        assert!(p32.eps() > p64.eps());
        assert_relative_eq!(p32.eps(), 8.0 * 2f64.powi(-24), max_relative = 1e-6);
    }

    #[test]
    fn test_set_precision() {
        let mut prec = MachinePrecision::new();
        prec.set_precision(1e-10);
        assert_eq!(prec.eps(), 1e-10);
        assert_relative_eq!(prec.eps2(), 2e-5, max_relative = 1e-12);
    }
}
