//! One-dimensional parameter scans.

use minuit_core::{Fcn, MinuitError, ParameterKey};

use crate::user::UserParameterState;

/// Largest number of points in one scan.
pub const MAX_STEPS: usize = 101;

/// Default number of points in a scan.
pub const DEFAULT_STEPS: usize = 41;

/// Objective along one parameter, every other parameter held at its
/// current value.
///
/// The scanner keeps its own copy of the parameter state. Whenever a scan
/// finds a value below the best seen so far, the scanned parameter is moved
/// there, so consecutive scans walk towards a minimum.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::{Scan, UserParameterState};
///
/// let mut state = UserParameterState::new();
/// state.add("x", 0.0, 1.0).unwrap();
/// let f = |p: &[f64]| (p[0] - 1.0).powi(2);
///
/// let mut scan = Scan::new(&f, &state);
/// let points = scan.scan("x", 5, -2.0, 2.0).unwrap();
/// assert_eq!(points.len(), 6);
/// assert_eq!(scan.state().value("x").unwrap(), 1.0);
/// ```
pub struct Scan<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    state: UserParameterState,
    fval: f64,
}

impl<'a, F: Fcn + ?Sized> Scan<'a, F> {
    /// Scanner starting at the values of `state`. Costs one call.
    pub fn new(fcn: &'a F, state: &UserParameterState) -> Self {
        let fval = fcn.value(&state.values());
        Self {
            fcn,
            state: state.clone(),
            fval,
        }
    }

    /// Scan a parameter over `[low, high]` in `nsteps` points.
    ///
    /// The first entry is the current `(value, fval)`; the grid follows.
    /// `nsteps` is capped at [`MAX_STEPS`]. `low == high == 0` selects
    /// `value +- 2 error`. Limits of a bounded parameter clamp the range.
    /// Only the current point is returned if `low > high` or `nsteps < 2`.
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
        let ext = self.state.index(key)?;
        let nsteps = nsteps.min(MAX_STEPS);
        let parameter = self.state.parameter(ext)?.clone();
        let mut result = vec![(parameter.value(), self.fval)];
        if low > high || nsteps < 2 {
            return Ok(result);
        }

        let (mut low, mut high) = (low, high);
        if low == 0.0 && high == 0.0 {
            low = parameter.value() - 2.0 * parameter.error();
            high = parameter.value() + 2.0 * parameter.error();
        }
        if let Some(lower) = parameter.lower_limit() {
            low = low.max(lower);
        }
        if let Some(upper) = parameter.upper_limit() {
            high = high.min(upper);
        }

        let mut params = self.state.values();
        let step = (high - low) / (nsteps - 1) as f64;
        for i in 0..nsteps {
            let x = low + i as f64 * step;
            params[ext] = x;
            let fval = self.fcn.value(&params);
            if fval < self.fval {
                self.state.set_value(ext, x)?;
                self.fval = fval;
            }
            result.push((x, fval));
        }
        Ok(result)
    }

    /// Lowest value seen.
    pub fn fval(&self) -> f64 {
        self.fval
    }

    /// Parameters at the lowest value seen.
    pub fn state(&self) -> &UserParameterState {
        &self.state
    }

    /// Consume the scanner, keeping its parameters.
    pub fn into_state(self) -> UserParameterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state() -> UserParameterState {
        let mut st = UserParameterState::new();
        st.add("x", 0.0, 1.0).unwrap();
        st.add_limited("y", 1.0, 1.0, 0.5, 2.0).unwrap();
        st
    }

    fn f(p: &[f64]) -> f64 {
        (p[0] - 1.0).powi(2) + p[1]
    }

    #[test]
    fn test_default_range_is_two_errors() {
        let mut scan = Scan::new(&f, &state());
        let points = scan.scan("x", 5, 0.0, 0.0).unwrap();
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, -2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_relative_eq!(scan.fval(), 1.0);
        assert_relative_eq!(scan.state().value("x").unwrap(), 1.0);
    }

    #[test]
    fn test_range_is_clamped_to_limits() {
        let mut scan = Scan::new(&f, &state());
        let points = scan.scan("y", 3, 0.0, 0.0).unwrap();
        assert_relative_eq!(points[1].0, 0.5);
        assert_relative_eq!(points[3].0, 2.0);
        assert_relative_eq!(scan.state().value("y").unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_steps_are_capped() {
        let mut scan = Scan::new(&f, &state());
        assert_eq!(scan.scan(0, 500, -1.0, 1.0).unwrap().len(), MAX_STEPS + 1);
    }

    #[test]
    fn test_degenerate_requests_return_current_point() {
        let mut scan = Scan::new(&f, &state());
        assert_eq!(scan.scan(0, 10, 1.0, -1.0).unwrap(), vec![(0.0, 2.0)]);
        assert_eq!(scan.scan(0, 1, -1.0, 1.0).unwrap().len(), 1);
        assert!(matches!(
            scan.scan("z", 10, 0.0, 1.0),
            Err(MinuitError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_no_improvement_keeps_state() {
        let mut scan = Scan::new(&f, &state());
        scan.scan("x", 4, 5.0, 8.0).unwrap();
        assert_eq!(scan.state().value("x").unwrap(), 0.0);
        assert_relative_eq!(scan.fval(), 2.0);
    }
}
