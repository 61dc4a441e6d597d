//! User-facing parameter state.

use minuit_core::{MinuitError, Parameter, ParameterKey, SymMatrix, UserTransformation};

use super::global_correlation;
use crate::diagnostics::TracingSink;
use crate::hessian::squeeze_covariance;
use crate::state::MinimumState;

/// Parameters, their internal representation and, after a minimisation,
/// the fit results.
///
/// Built by hand before a fit (`add`, `add_limited`, `add_const`, ...)
/// and rebuilt from the last [`MinimumState`] after one. Covariances are
/// kept in two forms: the external covariance (scaled by `2 up`, in user
/// units) and the internal inverse Hessian used to seed later runs.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::UserParameterState;
///
/// let mut state = UserParameterState::new();
/// state.add("x", 1.0, 0.1).unwrap();
/// state.add_limited("sigma", 2.0, 0.5, 0.0, 10.0).unwrap();
/// state.add_const("offset", 3.0).unwrap();
/// state.fix("x").unwrap();
///
/// assert_eq!(state.len(), 3);
/// assert_eq!(state.variable_parameters(), 1);
/// assert_eq!(state.value("offset").unwrap(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UserParameterState {
    trafo: UserTransformation,
    int_parameters: Vec<f64>,
    covariance: Option<SymMatrix>,
    int_covariance: Option<SymMatrix>,
    global_cc: Option<Vec<f64>>,
    valid: bool,
    fval: f64,
    edm: f64,
    nfcn: usize,
}

impl Default for UserParameterState {
    fn default() -> Self {
        Self::new()
    }
}

impl UserParameterState {
    /// Empty, valid state.
    pub fn new() -> Self {
        Self::from_transformation(UserTransformation::new())
    }

    /// State over an existing parameter set.
    pub fn from_transformation(trafo: UserTransformation) -> Self {
        let int_parameters = trafo.internal_values();
        Self {
            trafo,
            int_parameters,
            covariance: None,
            int_covariance: None,
            global_cc: None,
            valid: true,
            fval: 0.0,
            edm: 0.0,
            nfcn: 0,
        }
    }

    /// State describing a minimiser result.
    ///
    /// Free parameters take the external images of the state's internal
    /// point. Errors come from the inverse Hessian (`sqrt(2 up V_ii)`) when
    /// the state carries one, otherwise from the step sizes; both are
    /// mapped through the transformation's Jacobian. A valid error matrix
    /// also yields the external covariance and the global correlations.
    pub fn from_state(state: &MinimumState, error_def: f64, trafo: &UserTransformation) -> Self {
        let mut trafo = trafo.clone();
        let vec = state.vec();
        let n = vec.len();

        let int_errors: Vec<f64> = if state.has_covariance() {
            let inv = state.error().inv_hessian();
            (0..n).map(|i| (2.0 * error_def * inv[(i, i)]).sqrt()).collect()
        } else {
            state.parameters().dirin().to_vec()
        };
        trafo.apply_internal(vec, &int_errors);

        let (covariance, int_covariance, global_cc) = if state.error().is_valid() {
            let inv = state.error().inv_hessian();
            let mut cov = trafo.int2ext_covariance(vec, inv);
            cov.scale(2.0 * error_def);
            (Some(cov), Some(inv.clone()), global_correlation(inv))
        } else {
            (None, None, None)
        };

        Self {
            trafo,
            int_parameters: vec.to_vec(),
            covariance,
            int_covariance,
            global_cc,
            valid: state.is_valid(),
            fval: state.fval(),
            edm: state.edm(),
            nfcn: state.nfcn(),
        }
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Add a free, unbounded parameter.
    ///
    /// # Errors
    ///
    /// Duplicate names and non-finite values are rejected.
    pub fn add(&mut self, name: &str, value: f64, error: f64) -> Result<&mut Self, MinuitError> {
        self.push(Parameter::new(name, value, error))
    }

    /// Add a free parameter bounded to `[lower, upper]`.
    pub fn add_limited(
        &mut self,
        name: &str,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> Result<&mut Self, MinuitError> {
        self.push(Parameter::with_limits(name, value, error, lower, upper)?)
    }

    /// Add a constant parameter.
    pub fn add_const(&mut self, name: &str, value: f64) -> Result<&mut Self, MinuitError> {
        self.push(Parameter::constant(name, value))
    }

    fn push(&mut self, parameter: Parameter) -> Result<&mut Self, MinuitError> {
        let free = parameter.is_free();
        let value = parameter.value();
        let ext = self.trafo.add(parameter)?;
        if free {
            let internal = self.trafo.ext2int(ext, value);
            self.int_parameters.push(internal);
            self.invalidate_covariance();
        }
        Ok(self)
    }

    /// Supply an external covariance for the free parameters.
    ///
    /// The internal inverse Hessian used to seed a minimisation is taken
    /// as half of it.
    ///
    /// # Errors
    ///
    /// [`MinuitError::DimensionMismatch`] if `cov` does not match the
    /// number of free parameters.
    pub fn set_covariance(&mut self, cov: SymMatrix) -> Result<(), MinuitError> {
        let expected = self.variable_parameters();
        if cov.size() != expected {
            return Err(MinuitError::DimensionMismatch {
                expected,
                actual: cov.size(),
            });
        }
        self.global_cc = global_correlation(&cov);
        self.int_covariance = Some(&cov * 0.5);
        self.covariance = Some(cov);
        Ok(())
    }

    /// Override the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.trafo.set_precision(eps);
    }

    // ------------------------------------------------------------------
    // Parameter operations
    // ------------------------------------------------------------------

    /// Fix a parameter at its current value.
    ///
    /// A known covariance is squeezed rather than discarded.
    pub fn fix<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        if let Some(i) = self.trafo.fix(key)? {
            self.covariance = self
                .covariance
                .take()
                .map(|c| squeeze_covariance(&c, i, &TracingSink));
            self.int_covariance = self
                .int_covariance
                .take()
                .map(|c| squeeze_covariance(&c, i, &TracingSink));
            self.int_parameters.remove(i);
            self.global_cc = None;
        }
        Ok(())
    }

    /// Release a fixed parameter at its current value.
    pub fn release<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        let ext = self.trafo.index(key)?;
        if let Some(i) = self.trafo.release(ext)? {
            let internal = self.trafo.ext2int(ext, self.trafo.parameter(ext).value());
            self.int_parameters.insert(i, internal);
            self.invalidate_covariance();
        }
        Ok(())
    }

    /// Set a parameter value.
    pub fn set_value<K: ParameterKey>(&mut self, key: K, value: f64) -> Result<(), MinuitError> {
        let ext = self.trafo.set_value(key, value)?;
        if let Some(i) = self.trafo.int_of_ext(ext) {
            self.int_parameters[i] = self.trafo.ext2int(ext, value);
        }
        Ok(())
    }

    /// Set a parameter error. A constant parameter becomes free.
    pub fn set_error<K: ParameterKey>(&mut self, key: K, error: f64) -> Result<(), MinuitError> {
        let ext = self.trafo.index(key)?;
        let was_free = self.trafo.int_of_ext(ext).is_some();
        self.trafo.set_error(ext, error)?;
        if !was_free {
            if let Some(i) = self.trafo.int_of_ext(ext) {
                let internal = self.trafo.ext2int(ext, self.trafo.parameter(ext).value());
                self.int_parameters.insert(i, internal);
                self.invalidate_covariance();
            }
        }
        Ok(())
    }

    /// Bound a parameter on both sides. A value outside the new range is
    /// moved to its midpoint.
    pub fn set_limits<K: ParameterKey>(
        &mut self,
        key: K,
        lower: f64,
        upper: f64,
    ) -> Result<(), MinuitError> {
        let ext = self.trafo.set_limits(key, lower, upper)?;
        let p = self.trafo.parameter(ext);
        let (lo, up) = (p.lower_limit().unwrap_or(lower), p.upper_limit().unwrap_or(upper));
        let value = p.value();
        if !(lo < value && value < up) {
            self.trafo.set_value(ext, 0.5 * (lo + up))?;
        }
        self.after_limit_change(ext);
        Ok(())
    }

    /// Bound a parameter from below. A value at or below the bound is
    /// moved to `lower + |lower + 1| / 2`.
    pub fn set_lower_limit<K: ParameterKey>(&mut self, key: K, lower: f64) -> Result<(), MinuitError> {
        let ext = self.trafo.set_lower_limit(key, lower)?;
        if self.trafo.parameter(ext).value() <= lower {
            self.trafo.set_value(ext, lower + 0.5 * (lower + 1.0).abs())?;
        }
        self.after_limit_change(ext);
        Ok(())
    }

    /// Bound a parameter from above. A value at or above the bound is
    /// moved to `upper - |upper + 1| / 2`.
    pub fn set_upper_limit<K: ParameterKey>(&mut self, key: K, upper: f64) -> Result<(), MinuitError> {
        let ext = self.trafo.set_upper_limit(key, upper)?;
        if self.trafo.parameter(ext).value() >= upper {
            self.trafo.set_value(ext, upper - 0.5 * (upper + 1.0).abs())?;
        }
        self.after_limit_change(ext);
        Ok(())
    }

    /// Drop all bounds of a parameter.
    pub fn remove_limits<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        let ext = self.trafo.remove_limits(key)?;
        self.after_limit_change(ext);
        Ok(())
    }

    fn after_limit_change(&mut self, ext: usize) {
        self.invalidate_covariance();
        if let Some(i) = self.trafo.int_of_ext(ext) {
            self.int_parameters[i] = self.trafo.ext2int(ext, self.trafo.parameter(ext).value());
        }
    }

    fn invalidate_covariance(&mut self) {
        self.covariance = None;
        self.int_covariance = None;
        self.global_cc = None;
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// All parameters in external order.
    pub fn parameters(&self) -> &[Parameter] {
        self.trafo.parameters()
    }

    /// Parameter by name or index.
    pub fn parameter<K: ParameterKey>(&self, key: K) -> Result<&Parameter, MinuitError> {
        let ext = self.trafo.index(key)?;
        Ok(self.trafo.parameter(ext))
    }

    /// External index of a parameter.
    pub fn index<K: ParameterKey>(&self, key: K) -> Result<usize, MinuitError> {
        self.trafo.index(key)
    }

    /// Name of external parameter `ext`.
    pub fn name(&self, ext: usize) -> &str {
        self.trafo.name(ext)
    }

    /// Current value.
    pub fn value<K: ParameterKey>(&self, key: K) -> Result<f64, MinuitError> {
        Ok(self.parameter(key)?.value())
    }

    /// Current error.
    pub fn error<K: ParameterKey>(&self, key: K) -> Result<f64, MinuitError> {
        Ok(self.parameter(key)?.error())
    }

    /// Values of all parameters.
    pub fn values(&self) -> Vec<f64> {
        self.trafo.values()
    }

    /// Errors of all parameters.
    pub fn errors(&self) -> Vec<f64> {
        self.trafo.errors()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.trafo.len()
    }

    /// True if no parameter was added.
    pub fn is_empty(&self) -> bool {
        self.trafo.is_empty()
    }

    /// Number of free parameters.
    pub fn variable_parameters(&self) -> usize {
        self.trafo.variable_parameters()
    }

    /// Internal values of the free parameters.
    pub fn int_parameters(&self) -> &[f64] {
        &self.int_parameters
    }

    /// The transformation between internal and external values.
    pub fn trafo(&self) -> &UserTransformation {
        &self.trafo
    }

    /// External covariance of the free parameters, if known.
    pub fn covariance(&self) -> Option<&SymMatrix> {
        self.covariance.as_ref()
    }

    /// Internal inverse Hessian, if known.
    pub fn int_covariance(&self) -> Option<&SymMatrix> {
        self.int_covariance.as_ref()
    }

    /// True if a covariance is known.
    pub fn has_covariance(&self) -> bool {
        self.covariance.is_some()
    }

    /// Global correlation coefficients of the free parameters.
    pub fn global_cc(&self) -> Option<&[f64]> {
        self.global_cc.as_deref()
    }

    /// Function value at the minimum (0 before a fit).
    pub fn fval(&self) -> f64 {
        self.fval
    }

    /// Estimated distance to minimum.
    pub fn edm(&self) -> f64 {
        self.edm
    }

    /// Function calls used to produce this state.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// False if this state comes from an invalid minimum.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FunctionGradient, MinimumError, MinimumParameters};
    use approx::assert_relative_eq;

    fn three() -> UserParameterState {
        let mut st = UserParameterState::new();
        st.add("a", 1.0, 0.1)
            .unwrap()
            .add("b", 2.0, 0.2)
            .unwrap()
            .add("c", 3.0, 0.3)
            .unwrap();
        st
    }

    // ========================================================================
    // Building
    // ========================================================================

    #[test]
    fn test_add_tracks_internal_values() {
        let mut st = three();
        st.add_limited("d", 0.5, 0.1, 0.0, 1.0).unwrap();
        assert_eq!(st.int_parameters().len(), 4);
        assert_relative_eq!(st.int_parameters()[3], 0.0, epsilon = 1e-12);
        assert!(st.is_valid());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut st = three();
        assert!(matches!(
            st.add("a", 0.0, 1.0),
            Err(MinuitError::DuplicateParameter(_))
        ));
    }

    #[test]
    fn test_set_covariance_checks_dimension() {
        let mut st = three();
        assert!(st.set_covariance(SymMatrix::identity(2)).is_err());
        st.set_covariance(SymMatrix::identity(3)).unwrap();
        assert_eq!(st.int_covariance().unwrap()[(1, 1)], 0.5);
        assert_eq!(st.global_cc().unwrap().len(), 3);
    }

    // ========================================================================
    // Fix / release
    // ========================================================================

    #[test]
    fn test_fix_squeezes_covariance() {
        let mut st = three();
        st.set_covariance(SymMatrix::from_diagonal(&[1.0, 4.0, 9.0]))
            .unwrap();
        st.fix("b").unwrap();
        let cov = st.covariance().unwrap();
        assert_eq!(cov.size(), 2);
        assert_relative_eq!(cov[(1, 1)], 9.0, epsilon = 1e-12);
        assert_eq!(st.int_parameters(), &[1.0, 3.0]);
        assert!(st.global_cc().is_none());
    }

    #[test]
    fn test_release_reinserts_in_order() {
        let mut st = three();
        st.fix(0).unwrap();
        st.set_value("a", 5.0).unwrap();
        assert_eq!(st.int_parameters(), &[2.0, 3.0]);
        st.release("a").unwrap();
        assert_eq!(st.int_parameters(), &[5.0, 2.0, 3.0]);
        assert!(!st.has_covariance());
    }

    #[test]
    fn test_const_cannot_be_fixed() {
        let mut st = three();
        st.add_const("k", 1.0).unwrap();
        assert!(st.fix("k").is_err());
        st.set_error("k", 0.1).unwrap();
        assert_eq!(st.variable_parameters(), 4);
        assert_eq!(st.int_parameters()[3], 1.0);
    }

    // ========================================================================
    // Limits
    // ========================================================================

    #[test]
    fn test_set_limits_moves_outside_value_to_midpoint() {
        let mut st = three();
        st.set_limits("c", -1.0, 1.0).unwrap();
        assert_eq!(st.value("c").unwrap(), 0.0);
        assert_relative_eq!(st.int_parameters()[2], 0.0, epsilon = 1e-12);

        st.set_limits("b", 0.0, 4.0).unwrap();
        assert_eq!(st.value("b").unwrap(), 2.0);
    }

    #[test]
    fn test_single_sided_limits() {
        let mut st = three();
        st.set_lower_limit("a", 2.0).unwrap();
        assert_eq!(st.value("a").unwrap(), 3.5);
        st.set_upper_limit("c", 1.0).unwrap();
        assert_eq!(st.value("c").unwrap(), 0.0);
        st.remove_limits("a").unwrap();
        assert_eq!(st.int_parameters()[0], 3.5);
    }

    #[test]
    fn test_non_finite_limits_leave_state_untouched() {
        let mut st = three();
        let before = st.int_parameters().to_vec();
        assert!(matches!(
            st.set_limits("a", f64::NEG_INFINITY, 1.0),
            Err(MinuitError::InvalidLimits { .. })
        ));
        assert!(matches!(
            st.set_lower_limit("a", f64::NAN),
            Err(MinuitError::InvalidLimits { .. })
        ));
        assert!(matches!(
            st.set_upper_limit("c", f64::NAN),
            Err(MinuitError::InvalidLimits { .. })
        ));
        assert_eq!(st.int_parameters(), before.as_slice());
        assert!(st.int_parameters().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unknown_parameter() {
        let st = three();
        assert!(matches!(
            st.value("zzz"),
            Err(MinuitError::UnknownParameter(_))
        ));
    }

    // ========================================================================
    // From a minimiser state
    // ========================================================================

    #[test]
    fn test_from_state_maps_errors_and_covariance() {
        let mut st = UserParameterState::new();
        st.add("x", 0.0, 1.0).unwrap();
        st.add_const("k", 7.0).unwrap();
        st.add("y", 0.0, 1.0).unwrap();

        let inv = SymMatrix::from_diagonal(&[0.5, 0.05]);
        let ms = MinimumState::new(
            MinimumParameters::new(vec![3.0, -1.0], 0.25),
            MinimumError::normal(inv, 0.0),
            FunctionGradient::invalid(2),
            1e-6,
            42,
        );
        let user = UserParameterState::from_state(&ms, 1.0, st.trafo());

        assert_eq!(user.value("x").unwrap(), 3.0);
        assert_eq!(user.value("k").unwrap(), 7.0);
        assert_relative_eq!(user.error("x").unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(user.error("y").unwrap(), 0.1f64.sqrt(), epsilon = 1e-12);
        let cov = user.covariance().unwrap();
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 0.1, epsilon = 1e-12);
        assert_eq!(user.nfcn(), 42);
        assert_eq!(user.fval(), 0.25);
        assert!(user.is_valid());
    }
}
