//! User-facing (external) parameters.
//!
//! A [`Parameter`] carries a name, a value, a step/error estimate, optional
//! box bounds and the fixed/constant flags. Constant parameters never enter
//! the internal vector; fixed ones leave it until released.

use super::error::MinuitError;

/// Box bounds of a parameter.
///
/// The transformation between external and internal space depends on
/// which side is bounded, see [`crate::types::transformation`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bounds {
    /// Unbounded.
    #[default]
    None,
    /// Bounded from below.
    Lower(f64),
    /// Bounded from above.
    Upper(f64),
    /// Bounded on both sides, `lower < upper`.
    Both {
        /// Lower limit
        lower: f64,
        /// Upper limit
        upper: f64,
    },
}

impl Bounds {
    /// Lower limit, if any.
    pub fn lower(&self) -> Option<f64> {
        match *self {
            Bounds::Lower(l) | Bounds::Both { lower: l, .. } => Some(l),
            _ => None,
        }
    }

    /// Upper limit, if any.
    pub fn upper(&self) -> Option<f64> {
        match *self {
            Bounds::Upper(u) | Bounds::Both { upper: u, .. } => Some(u),
            _ => None,
        }
    }

    /// True unless [`Bounds::None`].
    pub fn is_bounded(&self) -> bool {
        !matches!(self, Bounds::None)
    }

    /// Clamp `value` into the bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        let v = self.lower().map_or(value, |l| value.max(l));
        self.upper().map_or(v, |u| v.min(u))
    }
}

/// A single external parameter.
///
/// # Examples
///
/// ```
/// use minuit_core::types::Parameter;
///
/// let mut p = Parameter::new("mass", 91.2, 0.5);
/// p.set_limits(80.0, 100.0).unwrap();
/// assert!(p.has_limits());
/// assert_eq!(p.lower_limit(), Some(80.0));
///
/// p.fix();
/// assert!(p.is_fixed());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    name: String,
    value: f64,
    error: f64,
    bounds: Bounds,
    fixed: bool,
    constant: bool,
}

impl Parameter {
    /// Free, unbounded parameter with a starting step `error`.
    pub fn new(name: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error,
            bounds: Bounds::None,
            fixed: false,
            constant: false,
        }
    }

    /// Constant parameter (never varied).
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error: 0.0,
            bounds: Bounds::None,
            fixed: false,
            constant: true,
        }
    }

    /// Free parameter bounded on both sides.
    ///
    /// # Errors
    ///
    /// Returns [`MinuitError::InvalidLimits`] if `lower == upper`.
    pub fn with_limits(
        name: impl Into<String>,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> Result<Self, MinuitError> {
        let mut p = Self::new(name, value, error);
        p.set_limits(lower, upper)?;
        Ok(p)
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Current error (step) estimate.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// True when fixed by the user.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// True for constant parameters.
    pub fn is_const(&self) -> bool {
        self.constant
    }

    /// True when the parameter enters the internal vector.
    pub fn is_free(&self) -> bool {
        !self.fixed && !self.constant
    }

    /// True when any limit is set.
    pub fn has_limits(&self) -> bool {
        self.bounds.is_bounded()
    }

    /// True when a lower limit is set.
    pub fn has_lower_limit(&self) -> bool {
        self.bounds.lower().is_some()
    }

    /// True when an upper limit is set.
    pub fn has_upper_limit(&self) -> bool {
        self.bounds.upper().is_some()
    }

    /// Lower limit, if any.
    pub fn lower_limit(&self) -> Option<f64> {
        self.bounds.lower()
    }

    /// Upper limit, if any.
    pub fn upper_limit(&self) -> Option<f64> {
        self.bounds.upper()
    }

    /// Set the value (not clamped to the limits).
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Set the error; clears the constant flag.
    pub fn set_error(&mut self, error: f64) {
        self.error = error;
        self.constant = false;
    }

    /// Bound on both sides. Reversed limits are swapped.
    ///
    /// # Errors
    ///
    /// Returns [`MinuitError::InvalidLimits`] if `lower == upper` or either
    /// limit is not finite.
    pub fn set_limits(&mut self, lower: f64, upper: f64) -> Result<(), MinuitError> {
        if lower == upper || !lower.is_finite() || !upper.is_finite() {
            return Err(self.invalid_limits(lower, upper));
        }
        let (lower, upper) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };
        self.bounds = Bounds::Both { lower, upper };
        Ok(())
    }

    /// Bound from below only (clears any upper limit).
    ///
    /// # Errors
    ///
    /// Returns [`MinuitError::InvalidLimits`] if `lower` is not finite.
    pub fn set_lower_limit(&mut self, lower: f64) -> Result<(), MinuitError> {
        if !lower.is_finite() {
            return Err(self.invalid_limits(lower, f64::INFINITY));
        }
        self.bounds = Bounds::Lower(lower);
        Ok(())
    }

    /// Bound from above only (clears any lower limit).
    ///
    /// # Errors
    ///
    /// Returns [`MinuitError::InvalidLimits`] if `upper` is not finite.
    pub fn set_upper_limit(&mut self, upper: f64) -> Result<(), MinuitError> {
        if !upper.is_finite() {
            return Err(self.invalid_limits(f64::NEG_INFINITY, upper));
        }
        self.bounds = Bounds::Upper(upper);
        Ok(())
    }

    fn invalid_limits(&self, lower: f64, upper: f64) -> MinuitError {
        MinuitError::InvalidLimits {
            name: self.name.clone(),
            lower,
            upper,
        }
    }

    /// Remove all limits.
    pub fn remove_limits(&mut self) {
        self.bounds = Bounds::None;
    }

    /// Fix the parameter.
    pub fn fix(&mut self) {
        self.fixed = true;
    }

    /// Release a fixed parameter.
    pub fn release(&mut self) {
        self.fixed = false;
    }
}

/// Something that identifies a parameter: its index or its name.
pub trait ParameterKey {
    /// Resolve to an external index.
    ///
    /// # Errors
    ///
    /// [`MinuitError::IndexOutOfRange`] or [`MinuitError::UnknownParameter`].
    fn resolve(&self, parameters: &[Parameter]) -> Result<usize, MinuitError>;
}

impl ParameterKey for usize {
    fn resolve(&self, parameters: &[Parameter]) -> Result<usize, MinuitError> {
        if *self < parameters.len() {
            Ok(*self)
        } else {
            Err(MinuitError::IndexOutOfRange {
                index: *self,
                len: parameters.len(),
            })
        }
    }
}

impl ParameterKey for &str {
    fn resolve(&self, parameters: &[Parameter]) -> Result<usize, MinuitError> {
        parameters
            .iter()
            .position(|p| p.name() == *self)
            .ok_or_else(|| MinuitError::unknown_parameter(*self))
    }
}

impl ParameterKey for String {
    fn resolve(&self, parameters: &[Parameter]) -> Result<usize, MinuitError> {
        self.as_str().resolve(parameters)
    }
}

impl ParameterKey for &String {
    fn resolve(&self, parameters: &[Parameter]) -> Result<usize, MinuitError> {
        self.as_str().resolve(parameters)
    }
}
