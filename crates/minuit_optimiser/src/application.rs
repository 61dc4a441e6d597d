//! Stateful front end over the minimisation and error analyses.

use minuit_core::{Fcn, MinuitError, ParameterKey};

use crate::analysis::{ContoursError, Contours, Minos, MinosError};
use crate::config::MinimizerConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::hessian::Hesse;
use crate::minimizers::{minimize, Algorithm};
use crate::scan::Scan;
use crate::state::FunctionMinimum;
use crate::strategy::Strategy;
use crate::user::UserParameterState;

/// An objective together with its current parameter state.
///
/// Every minimisation starts from the current state and replaces it with
/// the result, so calls can be chained: fix a parameter, minimise, release
/// it, minimise again.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::{Minuit, UserParameterState};
///
/// let f = |p: &[f64]| (p[0] - 3.0).powi(2) + 10.0 * (p[1] + 1.0).powi(2);
/// let mut start = UserParameterState::new();
/// start.add("x", 0.0, 1.0).unwrap();
/// start.add("y", 0.0, 1.0).unwrap();
///
/// let mut minuit = Minuit::new(&f, start);
/// let min = minuit.minimize(0, 0.1).unwrap();
/// assert!(min.is_valid());
/// assert!((minuit.value("x").unwrap() - 3.0).abs() < 1e-3);
///
/// let minos = minuit.minos(&min, "y", 1.0).unwrap();
/// assert!((minos.upper() - 0.1f64.sqrt()).abs() < 1e-2);
/// ```
pub struct Minuit<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    state: UserParameterState,
    strategy: Strategy,
    config: MinimizerConfig,
    algorithm: Algorithm,
    sink: &'a dyn DiagnosticSink,
    num_calls: usize,
}

impl<'a, F: Fcn + ?Sized> Minuit<'a, F> {
    /// Combined minimiser at the default strategy, reporting to `tracing`.
    pub fn new(fcn: &'a F, state: UserParameterState) -> Self {
        Self {
            fcn,
            state,
            strategy: Strategy::default(),
            config: MinimizerConfig::default(),
            algorithm: Algorithm::default(),
            sink: &TracingSink,
            num_calls: 0,
        }
    }

    /// Use `strategy` from now on.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use `config` from now on. Its call budget and tolerance are
    /// overridden by each [`Minuit::minimize`] call.
    pub fn with_config(mut self, config: MinimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `algorithm` from now on.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Report diagnostics to `sink`.
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    // ------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------

    /// Minimise from the current state and adopt the result.
    ///
    /// `max_calls` = 0 selects `200 + 100 n + 5 n^2`. Minimisation stops
    /// once the EDM is below `1e-4 * tolerance * error_def`.
    ///
    /// # Errors
    ///
    /// An invalid current state or a tolerance that is not positive.
    pub fn minimize(&mut self, max_calls: usize, tolerance: f64) -> Result<FunctionMinimum, MinuitError> {
        if !self.state.is_valid() {
            return Err(MinuitError::invalid_argument("parameter state is not valid"));
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(MinuitError::invalid_argument(format!(
                "tolerance must be positive, got {tolerance}"
            )));
        }
        let config = self.config.with_max_calls(max_calls).with_tolerance(tolerance);
        let min = minimize(self.fcn, &self.state, self.strategy, &config, self.algorithm, self.sink);
        self.num_calls += min.nfcn();
        self.state = min.user_state().clone();
        Ok(min)
    }

    /// Hesse at the current values; the state takes the new covariance.
    ///
    /// `max_calls` = 0 selects the automatic budget.
    pub fn hesse(&mut self, max_calls: usize) -> &UserParameterState {
        let before = self.state.nfcn();
        let result = Hesse::new(self.strategy).calculate_state(
            self.fcn,
            &self.state,
            self.config.error_def,
            max_calls,
            self.sink,
        );
        self.num_calls += result.nfcn().saturating_sub(before);
        self.state = result;
        &self.state
    }

    /// MINOS errors of one parameter around `minimum`.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn minos<K: ParameterKey>(
        &self,
        minimum: &FunctionMinimum,
        key: K,
        scale: f64,
    ) -> Result<MinosError, MinuitError> {
        Minos::new(self.fcn, minimum, self.strategy)
            .with_sink(self.sink)
            .minos(key, scale)
    }

    /// Contour of two parameters around `minimum`.
    ///
    /// # Errors
    ///
    /// See [`Contours::contour`].
    pub fn contour<KX: ParameterKey, KY: ParameterKey>(
        &self,
        minimum: &FunctionMinimum,
        px: KX,
        py: KY,
        scale: f64,
        npoints: usize,
    ) -> Result<ContoursError, MinuitError> {
        Contours::new(self.fcn, minimum, self.strategy)
            .with_sink(self.sink)
            .contour(px, py, scale, npoints)
    }

    /// Scan one parameter; see [`Scan::scan`]. A better point found by
    /// the scan becomes the parameter's value.
    ///
    /// # Errors
    ///
    /// Unknown parameter.
    pub fn scan<K: ParameterKey>(
        &mut self,
        key: K,
        nsteps: usize,
        low: f64,
        high: f64,
    ) -> Result<Vec<(f64, f64)>, MinuitError> {
        let mut scan = Scan::new(self.fcn, &self.state);
        let points = scan.scan(key, nsteps, low, high)?;
        self.num_calls += points.len();
        self.state = scan.into_state();
        Ok(points)
    }

    // ------------------------------------------------------------------
    // Parameter operations
    // ------------------------------------------------------------------

    /// Add a free parameter.
    pub fn add(&mut self, name: &str, value: f64, error: f64) -> Result<&mut Self, MinuitError> {
        self.state.add(name, value, error)?;
        Ok(self)
    }

    /// Add a parameter with limits.
    pub fn add_limited(
        &mut self,
        name: &str,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> Result<&mut Self, MinuitError> {
        self.state.add_limited(name, value, error, lower, upper)?;
        Ok(self)
    }

    /// Add a constant parameter.
    pub fn add_const(&mut self, name: &str, value: f64) -> Result<&mut Self, MinuitError> {
        self.state.add_const(name, value)?;
        Ok(self)
    }

    /// Fix a parameter.
    pub fn fix<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        self.state.fix(key)
    }

    /// Release a fixed parameter.
    pub fn release<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        self.state.release(key)
    }

    /// Set a parameter value.
    pub fn set_value<K: ParameterKey>(&mut self, key: K, value: f64) -> Result<(), MinuitError> {
        self.state.set_value(key, value)
    }

    /// Set a parameter error.
    pub fn set_error<K: ParameterKey>(&mut self, key: K, error: f64) -> Result<(), MinuitError> {
        self.state.set_error(key, error)
    }

    /// Bound a parameter on both sides.
    pub fn set_limits<K: ParameterKey>(&mut self, key: K, lower: f64, upper: f64) -> Result<(), MinuitError> {
        self.state.set_limits(key, lower, upper)
    }

    /// Bound a parameter from below.
    pub fn set_lower_limit<K: ParameterKey>(&mut self, key: K, lower: f64) -> Result<(), MinuitError> {
        self.state.set_lower_limit(key, lower)
    }

    /// Bound a parameter from above.
    pub fn set_upper_limit<K: ParameterKey>(&mut self, key: K, upper: f64) -> Result<(), MinuitError> {
        self.state.set_upper_limit(key, upper)
    }

    /// Drop the limits of a parameter.
    pub fn remove_limits<K: ParameterKey>(&mut self, key: K) -> Result<(), MinuitError> {
        self.state.remove_limits(key)
    }

    /// Override the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.state.set_precision(eps);
    }

    /// Set the error definition (1 for chi-square, 0.5 for -log L).
    ///
    /// # Panics
    ///
    /// Panics if `error_def <= 0`.
    pub fn set_error_def(&mut self, error_def: f64) {
        self.config = self.config.with_error_def(error_def);
    }

    /// Switch use of the objective's own gradient.
    pub fn set_use_analytical_gradient(&mut self, enabled: bool) {
        self.config = self.config.with_analytical_gradient(enabled);
    }

    /// Switch the check of the objective's own gradient.
    pub fn set_check_gradient(&mut self, enabled: bool) {
        self.config = self.config.with_gradient_check(enabled);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current value of a parameter.
    pub fn value<K: ParameterKey>(&self, key: K) -> Result<f64, MinuitError> {
        self.state.value(key)
    }

    /// Current error of a parameter.
    pub fn error<K: ParameterKey>(&self, key: K) -> Result<f64, MinuitError> {
        self.state.error(key)
    }

    /// Current parameter state.
    pub fn state(&self) -> &UserParameterState {
        &self.state
    }

    /// Strategy in use.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Configuration in use.
    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    /// Algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Error definition in use.
    pub fn error_def(&self) -> f64 {
        self.config.error_def
    }

    /// Function calls made through this application.
    pub fn num_calls(&self) -> usize {
        self.num_calls
    }

    /// Number of free parameters.
    pub fn variable_parameters(&self) -> usize {
        self.state.variable_parameters()
    }
}
