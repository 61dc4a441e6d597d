//! Minimiser configuration types.

/// Default EDM tolerance factor.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Default error definition (chi-square).
pub const DEFAULT_ERROR_DEF: f64 = 1.0;

/// Automatic call budget for `n` free parameters: `200 + 100 n + 5 n^2`.
pub fn default_max_calls(n: usize) -> usize {
    200 + 100 * n + 5 * n * n
}

/// Configuration of a minimisation run.
///
/// # Fields
///
/// * `max_calls` - Function call budget; 0 selects [`default_max_calls`]
/// * `tolerance` - Convergence when `EDM < 1e-4 * tolerance * error_def`
/// * `error_def` - Function change defining one standard deviation
///   (1 for chi-square, 0.5 for negative log-likelihood)
/// * `use_analytical_gradient` - Use [`minuit_core::Fcn::gradient`] when available
/// * `check_gradient` - Compare the analytic gradient with a numerical one
///   at the start and report discrepancies
///
/// # Example
///
/// ```
/// use minuit_optimiser::MinimizerConfig;
///
/// let config = MinimizerConfig::default();
/// assert_eq!(config.max_calls, 0);
/// assert_eq!(config.tolerance, 0.1);
///
/// let nll = MinimizerConfig::default().with_error_def(0.5);
/// assert_eq!(nll.error_def, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinimizerConfig {
    /// Function call budget (0 = automatic).
    pub max_calls: usize,
    /// EDM tolerance factor.
    pub tolerance: f64,
    /// Error definition `up`.
    pub error_def: f64,
    /// Use the objective's analytic gradient if it has one.
    pub use_analytical_gradient: bool,
    /// Cross-check the analytic gradient against a numerical estimate.
    pub check_gradient: bool,
}

impl Default for MinimizerConfig {
    /// Default values:
    /// - `max_calls`: 0 (automatic)
    /// - `tolerance`: 0.1
    /// - `error_def`: 1.0
    /// - `use_analytical_gradient`: true
    /// - `check_gradient`: true
    fn default() -> Self {
        Self {
            max_calls: 0,
            tolerance: DEFAULT_TOLERANCE,
            error_def: DEFAULT_ERROR_DEF,
            use_analytical_gradient: true,
            check_gradient: true,
        }
    }
}

impl MinimizerConfig {
    /// Create a configuration with the given budget and tolerance.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance <= 0`.
    pub fn new(max_calls: usize, tolerance: f64) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        Self {
            max_calls,
            tolerance,
            ..Self::default()
        }
    }

    /// Tight tolerance (0.01) for well-behaved objectives where the last
    /// digits of the minimum matter.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 0.01,
            ..Self::default()
        }
    }

    /// Relaxed tolerance (1.0) for quick exploratory fits.
    pub fn fast() -> Self {
        Self {
            tolerance: 1.0,
            ..Self::default()
        }
    }

    /// Set the call budget.
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    /// Set the tolerance.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance <= 0`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        self.tolerance = tolerance;
        self
    }

    /// Set the error definition.
    ///
    /// # Panics
    ///
    /// Panics if `error_def <= 0`.
    pub fn with_error_def(mut self, error_def: f64) -> Self {
        assert!(error_def > 0.0, "error_def must be positive");
        self.error_def = error_def;
        self
    }

    /// Enable or disable the analytic gradient.
    pub fn with_analytical_gradient(mut self, enabled: bool) -> Self {
        self.use_analytical_gradient = enabled;
        self
    }

    /// Enable or disable the analytic gradient check.
    pub fn with_gradient_check(mut self, enabled: bool) -> Self {
        self.check_gradient = enabled;
        self
    }

    /// Call budget for `n` free parameters.
    pub fn resolved_max_calls(&self, n: usize) -> usize {
        if self.max_calls == 0 {
            default_max_calls(n)
        } else {
            self.max_calls
        }
    }
}
