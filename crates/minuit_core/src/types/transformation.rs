//! External <-> internal parameter transformation.
//!
//! The minimiser works on an unbounded internal vector holding only the free
//! parameters, in external index order. Bounded parameters are mapped with:
//!
//! | bounds        | internal -> external                     |
//! |---------------|------------------------------------------|
//! | both          | `low + (up - low) / 2 * (sin(v) + 1)`    |
//! | lower only    | `low - 1 + sqrt(v^2 + 1)`                |
//! | upper only    | `up + 1 - sqrt(v^2 + 1)`                 |
//! | none          | identity                                 |
//!
//! Values at or beyond a bound are mapped to a clamped internal value a few
//! `sqrt(eps2)` inside the singular point of the inverse map.

use std::f64::consts::FRAC_PI_2;

use super::error::MinuitError;
use super::parameter::{Bounds, Parameter, ParameterKey};
use crate::math::{MachinePrecision, SymMatrix};

impl Bounds {
    /// Map an internal value to external space.
    pub fn int2ext(&self, value: f64) -> f64 {
        match *self {
            Bounds::None => value,
            Bounds::Both { lower, upper } => lower + 0.5 * (upper - lower) * (value.sin() + 1.0),
            Bounds::Lower(lower) => lower - 1.0 + (value * value + 1.0).sqrt(),
            Bounds::Upper(upper) => upper + 1.0 - (value * value + 1.0).sqrt(),
        }
    }

    /// Map an external value to internal space.
    pub fn ext2int(&self, value: f64, prec: &MachinePrecision) -> f64 {
        match *self {
            Bounds::None => value,
            Bounds::Both { lower, upper } => {
                let distnc = 8.0 * prec.eps2().sqrt();
                let yy = 2.0 * (value - lower) / (upper - lower) - 1.0;
                if yy * yy > 1.0 - prec.eps2() {
                    if yy < 0.0 {
                        -FRAC_PI_2 + distnc
                    } else {
                        FRAC_PI_2 - distnc
                    }
                } else {
                    yy.asin()
                }
            }
            Bounds::Lower(lower) => sqrt_ext2int(value - lower + 1.0, prec),
            Bounds::Upper(upper) => sqrt_ext2int(upper - value + 1.0, prec),
        }
    }

    /// Derivative `d ext / d int` at the internal value.
    pub fn dint2ext(&self, value: f64) -> f64 {
        match *self {
            Bounds::None => 1.0,
            Bounds::Both { lower, upper } => 0.5 * (upper - lower) * value.cos(),
            Bounds::Lower(_) => value / (value * value + 1.0).sqrt(),
            Bounds::Upper(_) => -value / (value * value + 1.0).sqrt(),
        }
    }
}

fn sqrt_ext2int(yy: f64, prec: &MachinePrecision) -> f64 {
    let yy2 = yy * yy;
    if yy2 < 1.0 + prec.eps2() {
        8.0 * prec.eps2().sqrt()
    } else {
        (yy2 - 1.0).sqrt()
    }
}

/// Parameter set plus the mapping between external and internal vectors.
///
/// # Examples
///
/// ```
/// use minuit_core::types::{Parameter, UserTransformation};
///
/// let mut trafo = UserTransformation::default();
/// trafo.add(Parameter::new("a", 1.0, 0.1)).unwrap();
/// trafo.add(Parameter::constant("b", 2.0)).unwrap();
/// trafo.add(Parameter::new("c", 3.0, 0.1)).unwrap();
///
/// assert_eq!(trafo.variable_parameters(), 2);
/// assert_eq!(trafo.transform(&[10.0, 30.0]), vec![10.0, 2.0, 30.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserTransformation {
    precision: MachinePrecision,
    parameters: Vec<Parameter>,
    ext_of_int: Vec<usize>,
}

impl UserTransformation {
    /// Empty parameter set with measured machine precision.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    ///
    /// # Errors
    ///
    /// Duplicate names and non-finite values or errors are rejected.
    pub fn add(&mut self, parameter: Parameter) -> Result<usize, MinuitError> {
        if self.parameters.iter().any(|p| p.name() == parameter.name()) {
            return Err(MinuitError::DuplicateParameter(parameter.name().to_string()));
        }
        if !parameter.value().is_finite() {
            return Err(MinuitError::non_finite(parameter.name(), parameter.value()));
        }
        if !parameter.error().is_finite() {
            return Err(MinuitError::non_finite(parameter.name(), parameter.error()));
        }
        let ext = self.parameters.len();
        if parameter.is_free() {
            self.ext_of_int.push(ext);
        }
        self.parameters.push(parameter);
        Ok(ext)
    }

    /// Machine precision in use.
    pub fn precision(&self) -> &MachinePrecision {
        &self.precision
    }

    /// Override the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.precision.set_precision(eps);
    }

    /// All declared parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameter by external index.
    pub fn parameter(&self, ext: usize) -> &Parameter {
        &self.parameters[ext]
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True if no parameter is declared.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of free parameters (dimension of the internal vector).
    pub fn variable_parameters(&self) -> usize {
        self.ext_of_int.len()
    }

    /// Resolve a name or index to an external index.
    pub fn index<K: ParameterKey>(&self, key: K) -> Result<usize, MinuitError> {
        key.resolve(&self.parameters)
    }

    /// Name of the parameter at external index `ext`.
    pub fn name(&self, ext: usize) -> &str {
        self.parameters[ext].name()
    }

    /// External index of internal parameter `int`.
    pub fn ext_of_int(&self, int: usize) -> usize {
        self.ext_of_int[int]
    }

    /// Internal index of external parameter `ext`, if it is free.
    pub fn int_of_ext(&self, ext: usize) -> Option<usize> {
        self.ext_of_int.binary_search(&ext).ok()
    }

    /// External values of every parameter.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::value).collect()
    }

    /// External errors of every parameter.
    pub fn errors(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::error).collect()
    }

    /// Internal vector for the current parameter values.
    pub fn internal_values(&self) -> Vec<f64> {
        self.ext_of_int
            .iter()
            .map(|&e| self.ext2int(e, self.parameters[e].value()))
            .collect()
    }

    /// Full external vector for an internal vector: fixed and constant
    /// parameters keep their current values.
    pub fn transform(&self, internal: &[f64]) -> Vec<f64> {
        assert_eq!(
            internal.len(),
            self.ext_of_int.len(),
            "internal vector has wrong dimension"
        );
        let mut ext = self.values();
        for (i, &e) in self.ext_of_int.iter().enumerate() {
            ext[e] = self.int2ext(i, internal[i]);
        }
        ext
    }

    /// External value of internal parameter `int`.
    pub fn int2ext(&self, int: usize, value: f64) -> f64 {
        self.parameters[self.ext_of_int[int]].bounds().int2ext(value)
    }

    /// Internal value of external parameter `ext`.
    pub fn ext2int(&self, ext: usize, value: f64) -> f64 {
        self.parameters[ext].bounds().ext2int(value, &self.precision)
    }

    /// Jacobian `d ext / d int` for internal parameter `int`.
    pub fn dint2ext(&self, int: usize, value: f64) -> f64 {
        self.parameters[self.ext_of_int[int]].bounds().dint2ext(value)
    }

    /// External error for an internal error `err` at internal `value`.
    ///
    /// Bounded parameters average the images of `value +- err`; for a
    /// doubly bounded parameter an internal error above 1 spans the full
    /// range on the upper side.
    pub fn int2ext_error(&self, int: usize, value: f64, err: f64) -> f64 {
        let bounds = self.parameters[self.ext_of_int[int]].bounds();
        match bounds {
            Bounds::None => err,
            _ => {
                let ui = bounds.int2ext(value);
                let mut du1 = bounds.int2ext(value + err) - ui;
                let du2 = bounds.int2ext(value - err) - ui;
                if let Bounds::Both { lower, upper } = bounds {
                    if err > 1.0 {
                        du1 = upper - lower;
                    }
                }
                0.5 * (du1.abs() + du2.abs())
            }
        }
    }

    /// External covariance for an internal covariance at internal point `internal`.
    pub fn int2ext_covariance(&self, internal: &[f64], cov: &SymMatrix) -> SymMatrix {
        let n = cov.size();
        let jac: Vec<f64> = (0..n).map(|i| self.dint2ext(i, internal[i])).collect();
        let mut out = SymMatrix::new(n);
        for i in 0..n {
            for j in 0..=i {
                out.set(i, j, jac[i] * cov.get(i, j) * jac[j]);
            }
        }
        out
    }

    /// Write an internal point and internal errors back into the external
    /// parameters: values through [`Self::int2ext`], errors through
    /// [`Self::int2ext_error`]. Non-finite errors leave the old error.
    pub fn apply_internal(&mut self, internal: &[f64], int_errors: &[f64]) {
        assert_eq!(
            internal.len(),
            self.ext_of_int.len(),
            "internal vector has wrong dimension"
        );
        for i in 0..internal.len() {
            let value = self.int2ext(i, internal[i]);
            let error = self.int2ext_error(i, internal[i], int_errors[i]);
            let p = &mut self.parameters[self.ext_of_int[i]];
            p.set_value(value);
            if error.is_finite() {
                p.set_error(error);
            }
        }
    }

    fn free_index<K: ParameterKey>(&self, key: K) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        if self.parameters[ext].is_const() {
            return Err(MinuitError::ParameterConst(self.name(ext).to_string()));
        }
        Ok(ext)
    }

    /// Fix a parameter; no-op if already fixed.
    ///
    /// Returns the internal index the parameter occupied, if it was free.
    pub fn fix<K: ParameterKey>(&mut self, key: K) -> Result<Option<usize>, MinuitError> {
        let ext = self.free_index(key)?;
        let int = self.int_of_ext(ext);
        if let Some(i) = int {
            self.ext_of_int.remove(i);
        }
        self.parameters[ext].fix();
        Ok(int)
    }

    /// Release a fixed parameter; no-op if already free.
    ///
    /// Returns the new internal index if the parameter was fixed.
    pub fn release<K: ParameterKey>(&mut self, key: K) -> Result<Option<usize>, MinuitError> {
        let ext = self.free_index(key)?;
        if !self.parameters[ext].is_fixed() {
            return Ok(None);
        }
        self.parameters[ext].release();
        let pos = self.ext_of_int.partition_point(|&e| e < ext);
        self.ext_of_int.insert(pos, ext);
        Ok(Some(pos))
    }

    /// Set the external value.
    pub fn set_value<K: ParameterKey>(&mut self, key: K, value: f64) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        if !value.is_finite() {
            return Err(MinuitError::non_finite(self.name(ext), value));
        }
        self.parameters[ext].set_value(value);
        Ok(ext)
    }

    /// Set the external error. A constant parameter becomes free.
    pub fn set_error<K: ParameterKey>(&mut self, key: K, error: f64) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        if !error.is_finite() {
            return Err(MinuitError::non_finite(self.name(ext), error));
        }
        let was_const = self.parameters[ext].is_const();
        self.parameters[ext].set_error(error);
        if was_const && !self.parameters[ext].is_fixed() {
            let pos = self.ext_of_int.partition_point(|&e| e < ext);
            self.ext_of_int.insert(pos, ext);
        }
        Ok(ext)
    }

    /// Bound on both sides.
    pub fn set_limits<K: ParameterKey>(
        &mut self,
        key: K,
        lower: f64,
        upper: f64,
    ) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        self.parameters[ext].set_limits(lower, upper)?;
        Ok(ext)
    }

    /// Bound from below only.
    ///
    /// # Errors
    ///
    /// Unknown parameter or a limit that is not finite.
    pub fn set_lower_limit<K: ParameterKey>(&mut self, key: K, lower: f64) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        self.parameters[ext].set_lower_limit(lower)?;
        Ok(ext)
    }

    /// Bound from above only.
    ///
    /// # Errors
    ///
    /// Unknown parameter or a limit that is not finite.
    pub fn set_upper_limit<K: ParameterKey>(&mut self, key: K, upper: f64) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        self.parameters[ext].set_upper_limit(upper)?;
        Ok(ext)
    }

    /// Remove all limits.
    pub fn remove_limits<K: ParameterKey>(&mut self, key: K) -> Result<usize, MinuitError> {
        let ext = self.index(key)?;
        self.parameters[ext].remove_limits();
        Ok(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn bounded_set() -> UserTransformation {
        let mut t = UserTransformation::new();
        t.add(Parameter::new("free", 1.0, 0.1)).unwrap();
        t.add(Parameter::with_limits("both", 0.5, 0.1, -1.0, 2.0).unwrap())
            .unwrap();
        let mut low = Parameter::new("low", 3.0, 0.1);
        low.set_lower_limit(1.0).unwrap();
        t.add(low).unwrap();
        let mut up = Parameter::new("up", -3.0, 0.1);
        up.set_upper_limit(0.0).unwrap();
        t.add(up).unwrap();
        t
    }

    // ========================================================================
    // Mapping functions
    // ========================================================================

    #[test]
    fn test_ext2int_clamps_at_bounds() {
        let prec = MachinePrecision::new();
        let both = Bounds::Both {
            lower: 0.0,
            upper: 1.0,
        };
        let hi = both.ext2int(1.0, &prec);
        let lo = both.ext2int(-5.0, &prec);
        let distnc = 8.0 * prec.eps2().sqrt();
        assert_relative_eq!(hi, FRAC_PI_2 - distnc);
        assert_relative_eq!(lo, -FRAC_PI_2 + distnc);

        let lower = Bounds::Lower(2.0);
        assert_relative_eq!(lower.ext2int(2.0, &prec), distnc);
        assert_relative_eq!(lower.ext2int(0.0, &prec), distnc);
    }

    #[test]
    fn test_jacobian_matches_finite_difference() {
        let h = 1e-6;
        for b in [
            Bounds::None,
            Bounds::Both {
                lower: -1.0,
                upper: 3.0,
            },
            Bounds::Lower(0.5),
            Bounds::Upper(-0.5),
        ] {
            let v = 0.3;
            let fd = (b.int2ext(v + h) - b.int2ext(v - h)) / (2.0 * h);
            assert_relative_eq!(b.dint2ext(v), fd, epsilon = 1e-8);
        }
    }

    // ========================================================================
    // Parameter set operations
    // ========================================================================

    #[test]
    fn test_fix_and_release_keep_external_order() {
        let mut t = bounded_set();
        assert_eq!(t.fix("both").unwrap(), Some(1));
        assert_eq!(t.variable_parameters(), 3);
        assert_eq!(t.ext_of_int(1), 2);
        assert_eq!(t.fix("both").unwrap(), None);

        assert_eq!(t.release("both").unwrap(), Some(1));
        assert_eq!(t.ext_of_int(1), 1);
        assert_eq!(t.int_of_ext(3), Some(3));
        assert_eq!(t.release("both").unwrap(), None);
    }

    #[test]
    fn test_const_parameter_cannot_be_fixed_or_released() {
        let mut t = UserTransformation::new();
        t.add(Parameter::constant("c", 1.0)).unwrap();
        assert!(matches!(t.fix("c"), Err(MinuitError::ParameterConst(_))));
        assert!(matches!(t.release(0usize), Err(MinuitError::ParameterConst(_))));
        assert_eq!(t.variable_parameters(), 0);

        t.set_error("c", 0.2).unwrap();
        assert_eq!(t.variable_parameters(), 1);
    }

    #[test]
    fn test_add_rejects_duplicates_and_nan() {
        let mut t = UserTransformation::new();
        t.add(Parameter::new("x", 0.0, 1.0)).unwrap();
        assert!(matches!(
            t.add(Parameter::new("x", 1.0, 1.0)),
            Err(MinuitError::DuplicateParameter(_))
        ));
        assert!(matches!(
            t.add(Parameter::new("y", f64::NAN, 1.0)),
            Err(MinuitError::NonFinite { .. })
        ));
        assert!(matches!(
            t.set_value("x", f64::INFINITY),
            Err(MinuitError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_int2ext_error_unbounded_is_identity() {
        let t = bounded_set();
        assert_eq!(t.int2ext_error(0, 1.0, 0.25), 0.25);
    }

    #[test]
    fn test_int2ext_error_double_bound_large_error() {
        let t = bounded_set();
        let v = t.ext2int(1, 0.5);
        let err = t.int2ext_error(1, v, 2.0);
        let ui = t.int2ext(1, v);
        let du2 = (t.int2ext(1, v - 2.0) - ui).abs();
        assert_relative_eq!(err, 0.5 * (3.0 + du2));
    }

    #[test]
    fn test_int2ext_covariance_scales_by_jacobian() {
        let t = bounded_set();
        let internal = t.internal_values();
        let cov = SymMatrix::identity(4);
        let ext = t.int2ext_covariance(&internal, &cov);
        assert_eq!(ext[(0, 0)], 1.0);
        let d = t.dint2ext(1, internal[1]);
        assert_relative_eq!(ext[(1, 1)], d * d);
        assert_eq!(ext[(1, 2)], 0.0);
    }

    #[test]
    fn test_apply_internal_updates_free_parameters() {
        let mut t = bounded_set();
        t.fix("low").unwrap();
        let internal = vec![2.0, 0.0, 0.0];
        t.apply_internal(&internal, &[0.5, 0.1, f64::NAN]);
        assert_eq!(t.parameter(0).value(), 2.0);
        assert_eq!(t.parameter(0).error(), 0.5);
        assert_relative_eq!(t.parameter(1).value(), 0.5);
        assert_eq!(t.parameter(2).value(), 3.0);
        assert_relative_eq!(t.parameter(3).value(), 0.0);
        assert_eq!(t.parameter(3).error(), 0.1);
    }

    proptest! {
        #[test]
        fn prop_double_bound_round_trip(frac in 0.001f64..0.999, lower in -50.0f64..50.0, width in 0.1f64..100.0) {
            let prec = MachinePrecision::new();
            let b = Bounds::Both { lower, upper: lower + width };
            let x = lower + frac * width;
            let back = b.int2ext(b.ext2int(x, &prec));
            prop_assert!((back - x).abs() <= prec.eps2() * (1.0 + x.abs() + width));
        }

        #[test]
        fn prop_single_bound_round_trip(offset in 0.001f64..100.0, limit in -50.0f64..50.0) {
            let prec = MachinePrecision::new();
            let lower = Bounds::Lower(limit);
            let x = limit + offset;
            prop_assert!((lower.int2ext(lower.ext2int(x, &prec)) - x).abs() <= prec.eps2() * (1.0 + x.abs()));

            let upper = Bounds::Upper(limit);
            let y = limit - offset;
            prop_assert!((upper.int2ext(upper.ext2int(y, &prec)) - y).abs() <= prec.eps2() * (1.0 + y.abs()));
        }
    }
}
