use minuit_core::{MachinePrecision, UserTransformation};

use super::{FunctionGradient, MinimumError, MinimumParameters, MinimumState};

/// Starting state of a minimisation plus the transformation in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumSeed {
    state: MinimumState,
    trafo: UserTransformation,
}

impl MinimumSeed {
    /// Seed from a state and the transformation it was computed with.
    pub fn new(state: MinimumState, trafo: UserTransformation) -> Self {
        Self { state, trafo }
    }

    /// Starting state.
    pub fn state(&self) -> &MinimumState {
        &self.state
    }

    /// Transformation in effect.
    pub fn trafo(&self) -> &UserTransformation {
        &self.trafo
    }

    /// Machine precision of the transformation.
    pub fn precision(&self) -> &MachinePrecision {
        self.trafo.precision()
    }

    /// Starting point.
    pub fn parameters(&self) -> &MinimumParameters {
        self.state.parameters()
    }

    /// Starting error estimate.
    pub fn error(&self) -> &MinimumError {
        self.state.error()
    }

    /// Starting gradient.
    pub fn gradient(&self) -> &FunctionGradient {
        self.state.gradient()
    }

    /// Starting function value.
    pub fn fval(&self) -> f64 {
        self.state.fval()
    }

    /// Starting EDM.
    pub fn edm(&self) -> f64 {
        self.state.edm()
    }

    /// Calls used to compute the seed.
    pub fn nfcn(&self) -> usize {
        self.state.nfcn()
    }

    /// True if the starting state is valid.
    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }
}
