//! Minimisation strategy.
//!
//! The strategy level trades function calls for reliability:
//!
//! | level | gradient cycles | step tol | grad tol | Hesse cycles | step tol | g2 tol | Hesse-gradient cycles |
//! |-------|-----------------|----------|----------|--------------|----------|--------|-----------------------|
//! | 0     | 2               | 0.5      | 0.1      | 3            | 0.5      | 0.1    | 1                     |
//! | 1     | 3               | 0.3      | 0.05     | 5            | 0.3      | 0.05   | 2                     |
//! | 2     | 5               | 0.1      | 0.02     | 7            | 0.1      | 0.02   | 6                     |
//!
//! Level 2 additionally computes a full Hessian for the seed, and always
//! runs Hesse after MIGRAD; level 1 only does so when the variable-metric
//! covariance estimate is inaccurate.

/// Strategy level plus its numerical tunables.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::Strategy;
///
/// let s = Strategy::high().with_gradient_ncycles(8);
/// assert!(s.is_high());
/// assert_eq!(s.gradient_ncycles(), 8);
/// assert_eq!(Strategy::default().level(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strategy {
    level: u32,
    gradient_ncycles: u32,
    gradient_step_tolerance: f64,
    gradient_tolerance: f64,
    hessian_ncycles: u32,
    hessian_step_tolerance: f64,
    hessian_g2_tolerance: f64,
    hessian_gradient_ncycles: u32,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::medium()
    }
}

impl Strategy {
    /// Strategy for `level`; levels above 2 are treated as 2.
    pub fn new(level: u32) -> Self {
        match level {
            0 => Self::low(),
            1 => Self::medium(),
            _ => Self::high(),
        }
    }

    /// Level 0: fewest function calls.
    pub fn low() -> Self {
        Self {
            level: 0,
            gradient_ncycles: 2,
            gradient_step_tolerance: 0.5,
            gradient_tolerance: 0.1,
            hessian_ncycles: 3,
            hessian_step_tolerance: 0.5,
            hessian_g2_tolerance: 0.1,
            hessian_gradient_ncycles: 1,
        }
    }

    /// Level 1: the default.
    pub fn medium() -> Self {
        Self {
            level: 1,
            gradient_ncycles: 3,
            gradient_step_tolerance: 0.3,
            gradient_tolerance: 0.05,
            hessian_ncycles: 5,
            hessian_step_tolerance: 0.3,
            hessian_g2_tolerance: 0.05,
            hessian_gradient_ncycles: 2,
        }
    }

    /// Level 2: most reliable.
    pub fn high() -> Self {
        Self {
            level: 2,
            gradient_ncycles: 5,
            gradient_step_tolerance: 0.1,
            gradient_tolerance: 0.02,
            hessian_ncycles: 7,
            hessian_step_tolerance: 0.1,
            hessian_g2_tolerance: 0.02,
            hessian_gradient_ncycles: 6,
        }
    }

    /// One level lower (saturating at 0), used for the nested
    /// minimisations of MINOS and contours.
    pub fn lowered(&self) -> Self {
        Self::new(self.level.saturating_sub(1))
    }

    /// Strategy level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Level 0.
    pub fn is_low(&self) -> bool {
        self.level == 0
    }

    /// Level 1.
    pub fn is_medium(&self) -> bool {
        self.level == 1
    }

    /// Level 2.
    pub fn is_high(&self) -> bool {
        self.level >= 2
    }

    /// Cycles of the two-point gradient.
    pub fn gradient_ncycles(&self) -> u32 {
        self.gradient_ncycles
    }

    /// Relative step change ending the gradient cycles.
    pub fn gradient_step_tolerance(&self) -> f64 {
        self.gradient_step_tolerance
    }

    /// Relative gradient change ending the gradient cycles.
    pub fn gradient_tolerance(&self) -> f64 {
        self.gradient_tolerance
    }

    /// Cycles per diagonal Hesse element.
    pub fn hessian_ncycles(&self) -> u32 {
        self.hessian_ncycles
    }

    /// Relative step change ending the Hesse cycles.
    pub fn hessian_step_tolerance(&self) -> f64 {
        self.hessian_step_tolerance
    }

    /// Relative second-derivative change ending the Hesse cycles.
    pub fn hessian_g2_tolerance(&self) -> f64 {
        self.hessian_g2_tolerance
    }

    /// Cycles of the Hessian-gradient refinement.
    pub fn hessian_gradient_ncycles(&self) -> u32 {
        self.hessian_gradient_ncycles
    }

    /// Override the gradient cycles.
    pub fn with_gradient_ncycles(mut self, n: u32) -> Self {
        self.gradient_ncycles = n;
        self
    }

    /// Override the gradient step tolerance.
    pub fn with_gradient_step_tolerance(mut self, tol: f64) -> Self {
        self.gradient_step_tolerance = tol;
        self
    }

    /// Override the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: f64) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Override the Hesse cycles.
    pub fn with_hessian_ncycles(mut self, n: u32) -> Self {
        self.hessian_ncycles = n;
        self
    }

    /// Override the Hesse step tolerance.
    pub fn with_hessian_step_tolerance(mut self, tol: f64) -> Self {
        self.hessian_step_tolerance = tol;
        self
    }

    /// Override the Hesse g2 tolerance.
    pub fn with_hessian_g2_tolerance(mut self, tol: f64) -> Self {
        self.hessian_g2_tolerance = tol;
        self
    }

    /// Override the Hessian-gradient cycles.
    pub fn with_hessian_gradient_ncycles(mut self, n: u32) -> Self {
        self.hessian_gradient_ncycles = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert!(Strategy::new(0).is_low());
        assert!(Strategy::new(1).is_medium());
        assert!(Strategy::new(7).is_high());
        assert_eq!(Strategy::new(7).level(), 2);
    }

    #[test]
    fn test_medium_tunables() {
        let s = Strategy::medium();
        assert_eq!(s.gradient_ncycles(), 3);
        assert_eq!(s.gradient_step_tolerance(), 0.3);
        assert_eq!(s.gradient_tolerance(), 0.05);
        assert_eq!(s.hessian_ncycles(), 5);
        assert_eq!(s.hessian_g2_tolerance(), 0.05);
        assert_eq!(s.hessian_gradient_ncycles(), 2);
    }

    #[test]
    fn test_lowered() {
        assert_eq!(Strategy::high().lowered().level(), 1);
        assert_eq!(Strategy::low().lowered().level(), 0);
    }

    #[test]
    fn test_builders() {
        let s = Strategy::low()
            .with_hessian_ncycles(9)
            .with_hessian_step_tolerance(0.2)
            .with_gradient_tolerance(0.01);
        assert_eq!(s.hessian_ncycles(), 9);
        assert_eq!(s.hessian_step_tolerance(), 0.2);
        assert_eq!(s.gradient_tolerance(), 0.01);
        assert!(s.is_low());
    }
}
