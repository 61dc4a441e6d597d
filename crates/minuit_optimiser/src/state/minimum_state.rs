use super::{FunctionGradient, MinimumError, MinimumParameters};

/// One iteration of a minimiser: point, error estimate, gradient, EDM and
/// the number of function calls used so far.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumState {
    parameters: MinimumParameters,
    error: MinimumError,
    gradient: FunctionGradient,
    edm: f64,
    nfcn: usize,
}

impl MinimumState {
    /// Assemble a state.
    pub fn new(
        parameters: MinimumParameters,
        error: MinimumError,
        gradient: FunctionGradient,
        edm: f64,
        nfcn: usize,
    ) -> Self {
        Self {
            parameters,
            error,
            gradient,
            edm,
            nfcn,
        }
    }

    /// Same state with a replaced error.
    pub fn with_error(&self, error: MinimumError) -> Self {
        Self {
            error,
            ..self.clone()
        }
    }

    /// Point and value.
    pub fn parameters(&self) -> &MinimumParameters {
        &self.parameters
    }

    /// Error estimate.
    pub fn error(&self) -> &MinimumError {
        &self.error
    }

    /// Gradient.
    pub fn gradient(&self) -> &FunctionGradient {
        &self.gradient
    }

    /// Internal parameter vector.
    pub fn vec(&self) -> &[f64] {
        self.parameters.vec()
    }

    /// Function value.
    pub fn fval(&self) -> f64 {
        self.parameters.fval()
    }

    /// Estimated vertical distance to the minimum.
    pub fn edm(&self) -> f64 {
        self.edm
    }

    /// Function calls used.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// Dimension.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True for the zero-dimensional state.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// True if the parameters are valid.
    pub fn has_parameters(&self) -> bool {
        self.parameters.is_valid()
    }

    /// True if an error matrix is attached.
    pub fn has_covariance(&self) -> bool {
        self.error.is_available()
    }

    /// Parameters valid and, when an error matrix is attached, the error
    /// matrix valid too.
    pub fn is_valid(&self) -> bool {
        if !self.has_parameters() {
            return false;
        }
        if self.has_covariance() {
            self.error.is_valid()
        } else {
            true
        }
    }
}
