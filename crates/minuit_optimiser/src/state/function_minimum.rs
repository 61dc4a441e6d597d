//! Result of a minimisation.

use super::{MinimumSeed, MinimumState};
use crate::user::UserParameterState;

/// Why a minimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminalCondition {
    /// EDM target reached (or accepted at machine accuracy).
    Converged,
    /// Stopped with the EDM above the target.
    AboveMaxEdm,
    /// Function call budget exhausted.
    ReachedCallLimit,
}

/// Seed, iteration history and terminal condition of a run.
///
/// The user-facing [`UserParameterState`] for the last state is computed
/// once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMinimum {
    seed: MinimumSeed,
    states: Vec<MinimumState>,
    error_def: f64,
    condition: TerminalCondition,
    user_state: UserParameterState,
}

impl FunctionMinimum {
    /// Minimum from a non-empty list of states.
    ///
    /// # Panics
    ///
    /// Panics if `states` is empty.
    pub fn new(
        seed: MinimumSeed,
        states: Vec<MinimumState>,
        error_def: f64,
        condition: TerminalCondition,
    ) -> Self {
        assert!(!states.is_empty(), "FunctionMinimum needs at least one state");
        let user_state =
            UserParameterState::from_state(&states[states.len() - 1], error_def, seed.trafo());
        Self {
            seed,
            states,
            error_def,
            condition,
            user_state,
        }
    }

    /// Minimum consisting of the seed state only.
    pub fn seed_only(seed: MinimumSeed, error_def: f64, condition: TerminalCondition) -> Self {
        let states = vec![seed.state().clone()];
        Self::new(seed, states, error_def, condition)
    }

    /// Append a state (typically from Hesse) and recompute the user state.
    ///
    /// A run that stopped above the EDM target counts as converged once a
    /// new state is appended.
    pub fn with_state(mut self, state: MinimumState) -> Self {
        self.states.push(state);
        if self.condition == TerminalCondition::AboveMaxEdm {
            self.condition = TerminalCondition::Converged;
        }
        self.refresh_user_state();
        self
    }

    /// Override the terminal condition.
    pub fn with_condition(mut self, condition: TerminalCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Replace the last state with `state`.
    pub fn with_last_state(mut self, state: MinimumState) -> Self {
        self.states.pop();
        self.states.push(state);
        self.refresh_user_state();
        self
    }

    fn refresh_user_state(&mut self) {
        if let Some(last) = self.states.last() {
            self.user_state = UserParameterState::from_state(last, self.error_def, self.seed.trafo());
        }
    }

    /// The seed.
    pub fn seed(&self) -> &MinimumSeed {
        &self.seed
    }

    /// All states, seed first.
    pub fn states(&self) -> &[MinimumState] {
        &self.states
    }

    /// The final state.
    pub fn state(&self) -> &MinimumState {
        // `new` guarantees at least one state and nothing removes the last one
        // without pushing another.
        &self.states[self.states.len() - 1]
    }

    /// User parameters at the minimum.
    pub fn user_state(&self) -> &UserParameterState {
        &self.user_state
    }

    /// Function value at the minimum.
    pub fn fval(&self) -> f64 {
        self.state().fval()
    }

    /// Estimated distance to minimum.
    pub fn edm(&self) -> f64 {
        self.state().edm()
    }

    /// Total function calls.
    pub fn nfcn(&self) -> usize {
        self.state().nfcn()
    }

    /// Error definition of the run.
    pub fn error_def(&self) -> f64 {
        self.error_def
    }

    /// Why the minimiser stopped.
    pub fn condition(&self) -> TerminalCondition {
        self.condition
    }

    /// Final state valid and the run converged.
    pub fn is_valid(&self) -> bool {
        self.state().is_valid() && self.condition == TerminalCondition::Converged
    }

    /// The final state has an error matrix.
    pub fn has_covariance(&self) -> bool {
        self.state().has_covariance()
    }

    /// The final error matrix is positive-definite and available.
    pub fn has_accurate_covariance(&self) -> bool {
        self.state().error().is_valid() && self.state().error().is_accurate()
    }

    /// The final error matrix had to be forced positive-definite.
    pub fn has_made_pos_def_covariance(&self) -> bool {
        self.state().error().is_made_pos_def()
    }

    /// Hesse failed on the final state.
    pub fn hesse_failed(&self) -> bool {
        self.state().error().hesse_failed()
    }

    /// Stopped above the EDM target.
    pub fn is_above_max_edm(&self) -> bool {
        self.condition == TerminalCondition::AboveMaxEdm
    }

    /// Stopped on the call budget.
    pub fn has_reached_call_limit(&self) -> bool {
        self.condition == TerminalCondition::ReachedCallLimit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FunctionGradient, MinimumError, MinimumParameters};
    use minuit_core::{Parameter, SymMatrix, UserTransformation};

    fn seed() -> MinimumSeed {
        let mut trafo = UserTransformation::new();
        trafo.add(Parameter::new("x", 1.0, 0.5)).unwrap();
        let st = MinimumState::new(
            MinimumParameters::with_step(vec![1.0], vec![0.5], 2.0),
            MinimumError::normal(SymMatrix::identity(1), 1.0),
            FunctionGradient::numerical(vec![2.0], vec![2.0], vec![0.1]),
            2.0,
            3,
        );
        MinimumSeed::new(st, trafo)
    }

    fn at_minimum(nfcn: usize) -> MinimumState {
        MinimumState::new(
            MinimumParameters::new(vec![0.0], 0.0),
            MinimumError::normal(SymMatrix::from_diagonal(&[0.5]), 0.0),
            FunctionGradient::numerical(vec![0.0], vec![2.0], vec![0.1]),
            0.0,
            nfcn,
        )
    }

    #[test]
    fn test_seed_only_keeps_seed_values() {
        let m = FunctionMinimum::seed_only(seed(), 1.0, TerminalCondition::ReachedCallLimit);
        assert_eq!(m.fval(), 2.0);
        assert_eq!(m.edm(), 2.0);
        assert_eq!(m.nfcn(), 3);
        assert!(!m.is_valid());
        assert!(m.has_reached_call_limit());
    }

    #[test]
    fn test_with_state_clears_above_max_edm() {
        let m = FunctionMinimum::new(seed(), vec![at_minimum(10)], 1.0, TerminalCondition::AboveMaxEdm);
        assert!(!m.is_valid());
        let m = m.with_state(at_minimum(15));
        assert!(m.is_valid());
        assert_eq!(m.states().len(), 2);
        assert_eq!(m.user_state().nfcn(), 15);
        assert_eq!(m.user_state().value("x").unwrap(), 0.0);
        assert_eq!(m.user_state().error("x").unwrap(), 1.0);
    }
}
