//! MINOS: asymmetric errors from the profile of the objective.

use minuit_core::{Fcn, MinuitError, ParameterKey};

use super::cross::{FunctionCross, MnCross};
use crate::config::default_max_calls;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::state::FunctionMinimum;
use crate::strategy::Strategy;

const SOURCE: &str = "MnMinos";

const TOLERANCE: f64 = 0.1;

/// Lower and upper MINOS errors of one parameter.
///
/// Each side is the distance from the minimum to the point where the
/// profiled objective rises by `up`. A side that hit a parameter bound
/// reports the distance to that bound; a side without a crossing falls
/// back to the parabolic error.
#[derive(Debug, Clone, PartialEq)]
pub struct MinosError {
    parameter: usize,
    min_value: f64,
    error: f64,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
    lower: MnCross,
    upper: MnCross,
}

impl MinosError {
    /// External index of the parameter.
    pub fn parameter(&self) -> usize {
        self.parameter
    }

    /// Parameter value at the minimum.
    pub fn min(&self) -> f64 {
        self.min_value
    }

    /// Lower error (negative).
    pub fn lower(&self) -> f64 {
        if self.lower.is_valid() {
            return -self.error * (1.0 + self.lower.value());
        }
        match self.lower_limit {
            Some(limit) if self.lower.at_limit() => limit - self.min_value,
            _ => -self.error,
        }
    }

    /// Upper error (positive).
    pub fn upper(&self) -> f64 {
        if self.upper.is_valid() {
            return self.error * (1.0 + self.upper.value());
        }
        match self.upper_limit {
            Some(limit) if self.upper.at_limit() => limit - self.min_value,
            _ => self.error,
        }
    }

    /// `(lower, upper)`.
    pub fn range(&self) -> (f64, f64) {
        (self.lower(), self.upper())
    }

    /// Both crossings found.
    pub fn is_valid(&self) -> bool {
        self.lower.is_valid() && self.upper.is_valid()
    }

    /// Lower crossing found.
    pub fn lower_valid(&self) -> bool {
        self.lower.is_valid()
    }

    /// Upper crossing found.
    pub fn upper_valid(&self) -> bool {
        self.upper.is_valid()
    }

    /// Lower side stopped at a bound.
    pub fn at_lower_limit(&self) -> bool {
        self.lower.at_limit()
    }

    /// Upper side stopped at a bound.
    pub fn at_upper_limit(&self) -> bool {
        self.upper.at_limit()
    }

    /// Lower side ran out of calls.
    pub fn at_lower_max_fcn(&self) -> bool {
        self.lower.at_max_fcn()
    }

    /// Upper side ran out of calls.
    pub fn at_upper_max_fcn(&self) -> bool {
        self.upper.at_max_fcn()
    }

    /// A lower minimum was found on the lower side.
    pub fn lower_new_min(&self) -> bool {
        self.lower.new_minimum()
    }

    /// A lower minimum was found on the upper side.
    pub fn upper_new_min(&self) -> bool {
        self.upper.new_minimum()
    }

    /// Crossing search below the minimum.
    pub fn lower_cross(&self) -> &MnCross {
        &self.lower
    }

    /// Crossing search above the minimum.
    pub fn upper_cross(&self) -> &MnCross {
        &self.upper
    }

    /// Function calls of both searches.
    pub fn nfcn(&self) -> usize {
        self.lower.nfcn() + self.upper.nfcn()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

impl Side {
    fn sign(self) -> f64 {
        match self {
            Side::Lower => -1.0,
            Side::Upper => 1.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Side::Lower => "lower",
            Side::Upper => "upper",
        }
    }
}

/// MINOS error analysis around a valid minimum.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::{minimize, Algorithm, MinimizerConfig, Minos, Strategy, UserParameterState};
/// use minuit_optimiser::diagnostics::NullSink;
///
/// let mut start = UserParameterState::new();
/// start.add("x", 1.0, 0.5).unwrap();
/// let f = |p: &[f64]| p[0] * p[0];
/// let min = minimize(&f, &start, Strategy::default(), &MinimizerConfig::default(), Algorithm::Migrad, &NullSink);
///
/// let err = Minos::new(&f, &min, Strategy::default()).minos("x", 1.0).unwrap();
/// assert!((err.upper() - 1.0).abs() < 0.05);
/// assert!((err.lower() + 1.0).abs() < 0.05);
/// ```
pub struct Minos<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    minimum: &'a FunctionMinimum,
    strategy: Strategy,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, F: Fcn + ?Sized> Minos<'a, F> {
    /// Analysis reporting to `tracing`.
    pub fn new(fcn: &'a F, minimum: &'a FunctionMinimum, strategy: Strategy) -> Self {
        Self {
            fcn,
            minimum,
            strategy,
            sink: &TracingSink,
        }
    }

    /// Report diagnostics to `sink` instead.
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// Both errors of `key` for `up` scaled by `scale`, with the automatic
    /// call budget.
    pub fn minos<K: ParameterKey>(&self, key: K, scale: f64) -> Result<MinosError, MinuitError> {
        self.minos_with_calls(key, scale, 0)
    }

    /// Both errors with an explicit call budget (0 = automatic).
    ///
    /// # Errors
    ///
    /// Unknown, fixed or constant parameters; an invalid minimum; a
    /// parameter without a positive error.
    pub fn minos_with_calls<K: ParameterKey>(
        &self,
        key: K,
        scale: f64,
        max_calls: usize,
    ) -> Result<MinosError, MinuitError> {
        let state = self.minimum.user_state();
        let ext = state.index(key)?;
        let upper = self.crossing(ext, scale, max_calls, Side::Upper)?;
        let lower = self.crossing(ext, scale, max_calls, Side::Lower)?;
        let p = &state.parameters()[ext];
        Ok(MinosError {
            parameter: ext,
            min_value: p.value(),
            error: p.error(),
            lower_limit: p.lower_limit(),
            upper_limit: p.upper_limit(),
            lower,
            upper,
        })
    }

    /// Lower error, with the fallbacks of [`MinosError::lower`].
    pub fn lower<K: ParameterKey>(&self, key: K, scale: f64, max_calls: usize) -> Result<f64, MinuitError> {
        let ext = self.minimum.user_state().index(key)?;
        let cross = self.loval(ext, scale, max_calls)?;
        Ok(self.side_error(ext, cross, Side::Lower))
    }

    /// Upper error, with the fallbacks of [`MinosError::upper`].
    pub fn upper<K: ParameterKey>(&self, key: K, scale: f64, max_calls: usize) -> Result<f64, MinuitError> {
        let ext = self.minimum.user_state().index(key)?;
        let cross = self.upval(ext, scale, max_calls)?;
        Ok(self.side_error(ext, cross, Side::Upper))
    }

    /// `(lower, upper)` of [`Minos::minos_with_calls`].
    pub fn range<K: ParameterKey>(&self, key: K, scale: f64, max_calls: usize) -> Result<(f64, f64), MinuitError> {
        Ok(self.minos_with_calls(key, scale, max_calls)?.range())
    }

    /// Crossing search below the minimum.
    pub fn loval<K: ParameterKey>(&self, key: K, scale: f64, max_calls: usize) -> Result<MnCross, MinuitError> {
        let ext = self.minimum.user_state().index(key)?;
        self.crossing(ext, scale, max_calls, Side::Lower)
    }

    /// Crossing search above the minimum.
    pub fn upval<K: ParameterKey>(&self, key: K, scale: f64, max_calls: usize) -> Result<MnCross, MinuitError> {
        let ext = self.minimum.user_state().index(key)?;
        self.crossing(ext, scale, max_calls, Side::Upper)
    }

    fn side_error(&self, ext: usize, cross: MnCross, side: Side) -> f64 {
        let p = &self.minimum.user_state().parameters()[ext];
        let error = MinosError {
            parameter: ext,
            min_value: p.value(),
            error: p.error(),
            lower_limit: p.lower_limit(),
            upper_limit: p.upper_limit(),
            lower: cross.clone(),
            upper: cross,
        };
        match side {
            Side::Lower => error.lower(),
            Side::Upper => error.upper(),
        }
    }

    fn crossing(&self, ext: usize, scale: f64, max_calls: usize, side: Side) -> Result<MnCross, MinuitError> {
        if !self.minimum.is_valid() {
            return Err(MinuitError::InvalidMinimum);
        }
        let state = self.minimum.user_state();
        let p = &state.parameters()[ext];
        if p.is_const() {
            return Err(MinuitError::ParameterConst(p.name().to_string()));
        }
        if p.is_fixed() {
            return Err(MinuitError::ParameterFixed(p.name().to_string()));
        }
        let err = p.error();
        if !(err.is_finite() && err > 0.0) {
            return Err(MinuitError::invalid_argument(format!(
                "parameter {} has no positive error",
                p.name()
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MinuitError::invalid_argument("scale must be positive"));
        }

        let up = scale * self.minimum.error_def();
        let max_calls = if max_calls == 0 {
            let nvar = state.variable_parameters();
            2 * (nvar + 1) * default_max_calls(nvar)
        } else {
            max_calls
        };

        let sign = side.sign();
        let mut upar = state.clone();
        let xmid = p.value() + sign * err;
        let xdir = sign * err;

        // Move correlated parameters along with the shifted one.
        if let Some(ind) = state.trafo().int_of_ext(ext) {
            let m = self.minimum.state().error().matrix();
            let xunit = (up / err).sqrt();
            for i in 0..m.size() {
                if i == ind {
                    continue;
                }
                let other = state.trafo().ext_of_int(i);
                let shifted = upar.parameters()[other].value() + sign * xunit * m[(ind, i)];
                upar.set_value(other, shifted)?;
            }
        }
        upar.fix(ext)?;
        upar.set_value(ext, xmid)?;

        let cross = FunctionCross::new(self.fcn, &upar, self.minimum.fval(), self.strategy, up, self.sink)
            .cross(&[ext], &[xmid], &[xdir], TOLERANCE, max_calls);

        let name = p.name();
        if cross.at_limit() {
            self.sink.emit(Diagnostic::info(
                SOURCE,
                format!("parameter {name} is at its {} limit", side.name()),
            ));
        }
        if cross.at_max_fcn() {
            self.sink.emit(Diagnostic::warn(
                SOURCE,
                format!("maximum number of function calls exceeded for parameter {name}"),
            ));
        }
        if cross.new_minimum() {
            self.sink.emit(Diagnostic::warn(
                SOURCE,
                format!("new minimum found while looking for parameter {name}"),
            ));
        }
        if !cross.is_valid() {
            self.sink.emit(Diagnostic::warn(
                SOURCE,
                format!("could not find {} value for parameter {name}", side.name()),
            ));
        }
        Ok(cross)
    }
}

#[cfg(feature = "parallel")]
impl<F: Fcn + Sync + ?Sized> Minos<'_, F> {
    /// MINOS errors of several parameters, one thread per parameter.
    ///
    /// Every parameter gets its own evaluation contexts; the objective must
    /// tolerate concurrent calls.
    pub fn minos_parallel(&self, keys: &[usize], scale: f64) -> Result<Vec<MinosError>, MinuitError> {
        use rayon::prelude::*;

        keys.par_iter()
            .map(|&ext| self.minos(ext, scale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimizerConfig;
    use crate::diagnostics::NullSink;
    use crate::minimizers::{minimize, Algorithm};
    use crate::user::UserParameterState;
    use approx::assert_relative_eq;

    fn fit(f: &dyn Fn(&[f64]) -> f64, st: &UserParameterState) -> FunctionMinimum {
        minimize(
            f,
            st,
            Strategy::medium(),
            &MinimizerConfig::default(),
            Algorithm::Migrad,
            &NullSink,
        )
    }

    // ========================================
    // Symmetric and asymmetric profiles
    // ========================================

    #[test]
    fn test_parabola_is_symmetric() {
        let mut st = UserParameterState::new();
        st.add("x", 1.0, 0.5).unwrap().add("y", 1.0, 0.5).unwrap();
        let f = |p: &[f64]| p[0] * p[0] + 4.0 * p[1] * p[1];
        let min = fit(&f, &st);
        let minos = Minos::new(&f, &min, Strategy::medium()).with_sink(&NullSink);

        let e = minos.minos("x", 1.0).unwrap();
        assert!(e.is_valid());
        assert_relative_eq!(e.upper(), 1.0, epsilon = 0.02);
        assert_relative_eq!(e.lower(), -1.0, epsilon = 0.02);
        assert!(e.nfcn() > 0);

        let e = minos.minos("y", 1.0).unwrap();
        assert_relative_eq!(e.upper(), 0.5, epsilon = 0.02);
        assert_relative_eq!(e.lower(), -0.5, epsilon = 0.02);
    }

    #[test]
    fn test_scale_multiplies_error_def() {
        let mut st = UserParameterState::new();
        st.add("x", 1.0, 0.5).unwrap();
        let f = |p: &[f64]| p[0] * p[0];
        let min = fit(&f, &st);
        let minos = Minos::new(&f, &min, Strategy::medium()).with_sink(&NullSink);
        let (lo, hi) = minos.range("x", 4.0, 0).unwrap();
        assert_relative_eq!(hi, 2.0, epsilon = 0.05);
        assert_relative_eq!(lo, -2.0, epsilon = 0.05);
    }

    #[test]
    fn test_asymmetric_profile() {
        // 4 (e^x - 1)^2 crosses 1 at ln 1.5 above and ln 0.5 below.
        let mut st = UserParameterState::new();
        st.add("x", 0.5, 0.5).unwrap();
        let f = |p: &[f64]| 4.0 * (p[0].exp() - 1.0).powi(2);
        let min = fit(&f, &st);
        let e = Minos::new(&f, &min, Strategy::medium())
            .with_sink(&NullSink)
            .minos(0, 1.0)
            .unwrap();
        assert!(e.is_valid());
        assert_relative_eq!(e.upper(), 1.5f64.ln(), epsilon = 0.02);
        assert_relative_eq!(e.lower(), 0.5f64.ln(), epsilon = 0.03);
    }

    #[test]
    fn test_limit_side_reports_distance_to_bound() {
        let mut st = UserParameterState::new();
        st.add_limited("x", 0.2, 0.1, -5.0, 0.35).unwrap();
        let f = |p: &[f64]| 4.0 * (p[0].exp() - 1.0).powi(2);
        let min = fit(&f, &st);
        assert!(min.is_valid());
        let e = Minos::new(&f, &min, Strategy::medium())
            .with_sink(&NullSink)
            .minos("x", 1.0)
            .unwrap();
        assert!(e.at_upper_limit());
        assert_relative_eq!(e.upper(), 0.35 - e.min(), epsilon = 1e-9);
        assert!(e.lower_valid());
    }

    // ========================================
    // Rejected requests
    // ========================================

    #[test]
    fn test_fixed_parameter_is_rejected() {
        let mut st = UserParameterState::new();
        st.add("x", 1.0, 0.5).unwrap().add("y", 1.0, 0.5).unwrap();
        st.fix("y").unwrap();
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        let min = fit(&f, &st);
        let minos = Minos::new(&f, &min, Strategy::medium()).with_sink(&NullSink);
        assert!(matches!(minos.minos("y", 1.0), Err(MinuitError::ParameterFixed(_))));
        assert!(matches!(minos.minos("z", 1.0), Err(MinuitError::UnknownParameter(_))));
    }

    #[test]
    fn test_invalid_minimum_is_rejected() {
        let mut st = UserParameterState::new();
        st.add("x", -1.2, 0.1).unwrap().add("y", 1.0, 0.1).unwrap();
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let min = minimize(
            &f,
            &st,
            Strategy::low(),
            &MinimizerConfig::default().with_max_calls(10),
            Algorithm::Migrad,
            &NullSink,
        );
        assert!(!min.is_valid());
        let minos = Minos::new(&f, &min, Strategy::medium()).with_sink(&NullSink);
        assert_eq!(minos.minos("x", 1.0), Err(MinuitError::InvalidMinimum));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut st = UserParameterState::new();
        st.add("x", 1.0, 0.5).unwrap().add("y", 1.0, 0.5).unwrap();
        let f = |p: &[f64]| p[0] * p[0] + 4.0 * p[1] * p[1] + 0.5 * p[0] * p[1];
        let min = fit(&f, &st);
        let minos = Minos::new(&f, &min, Strategy::medium()).with_sink(&NullSink);
        let par = minos.minos_parallel(&[0, 1], 1.0).unwrap();
        for (i, e) in par.iter().enumerate() {
            let seq = minos.minos(i, 1.0).unwrap();
            assert_eq!(e.parameter(), i);
            assert_relative_eq!(e.upper(), seq.upper(), epsilon = 1e-12);
            assert_relative_eq!(e.lower(), seq.lower(), epsilon = 1e-12);
        }
    }
}
