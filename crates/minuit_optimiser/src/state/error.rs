use minuit_core::SymMatrix;

/// Why a [`MinimumError`] looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorStatus {
    /// Regular estimate. `dcovar` is the relative change of the last
    /// update: 0 for an exact Hessian, >= 0.1 when not accurate.
    Normal {
        /// Relative covariance change
        dcovar: f64,
    },
    /// The matrix was forced positive-definite.
    MadePosDef,
    /// Hesse failed; the matrix is a diagonal fallback.
    HesseFailed,
    /// Inversion failed while squeezing; the matrix is a diagonal fallback.
    InvertFailed,
    /// The variable-metric update could not produce a descent direction.
    NotPosDef,
    /// No error matrix (simplex states).
    Unavailable,
}

/// Inverse Hessian in internal coordinates plus its status.
///
/// # Examples
///
/// ```
/// use minuit_core::SymMatrix;
/// use minuit_optimiser::state::{ErrorStatus, MinimumError};
///
/// let err = MinimumError::new(SymMatrix::from_diagonal(&[0.5]), ErrorStatus::Normal { dcovar: 0.0 });
/// assert!(err.is_valid());
/// assert_eq!(err.matrix()[(0, 0)], 1.0);
/// assert_eq!(err.dcovar(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumError {
    inv_hessian: SymMatrix,
    status: ErrorStatus,
}

impl MinimumError {
    /// Inverse Hessian with a status.
    pub fn new(inv_hessian: SymMatrix, status: ErrorStatus) -> Self {
        Self {
            inv_hessian,
            status,
        }
    }

    /// Regular estimate with accuracy `dcovar`.
    pub fn normal(inv_hessian: SymMatrix, dcovar: f64) -> Self {
        Self::new(inv_hessian, ErrorStatus::Normal { dcovar })
    }

    /// No error matrix of dimension `n`.
    pub fn unavailable(n: usize) -> Self {
        Self::new(SymMatrix::new(n), ErrorStatus::Unavailable)
    }

    /// Same matrix with a different status.
    pub fn with_status(&self, status: ErrorStatus) -> Self {
        Self::new(self.inv_hessian.clone(), status)
    }

    /// Inverse Hessian `V`.
    pub fn inv_hessian(&self) -> &SymMatrix {
        &self.inv_hessian
    }

    /// Error matrix `2 V` (covariance for `up = 1`).
    pub fn matrix(&self) -> SymMatrix {
        &self.inv_hessian * 2.0
    }

    /// Hessian, i.e. the inverse of `V`; a diagonal `1 / V_ii` if `V`
    /// cannot be inverted.
    pub fn hessian(&self) -> SymMatrix {
        self.inv_hessian.inverse().unwrap_or_else(|_| {
            let diag: Vec<f64> = self.inv_hessian.diagonal().iter().map(|d| 1.0 / d).collect();
            SymMatrix::from_diagonal(&diag)
        })
    }

    /// Status tag.
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Relative accuracy of the estimate (1 for any non-normal status).
    pub fn dcovar(&self) -> f64 {
        match self.status {
            ErrorStatus::Normal { dcovar } => dcovar,
            _ => 1.0,
        }
    }

    /// True unless [`ErrorStatus::Unavailable`].
    pub fn is_available(&self) -> bool {
        self.status != ErrorStatus::Unavailable
    }

    /// True if the matrix is believed positive-definite.
    pub fn is_pos_def(&self) -> bool {
        matches!(
            self.status,
            ErrorStatus::Normal { .. } | ErrorStatus::InvertFailed
        )
    }

    /// True if usable as a covariance estimate.
    pub fn is_valid(&self) -> bool {
        self.is_available() && self.is_pos_def()
    }

    /// True if accurate to better than 10%.
    pub fn is_accurate(&self) -> bool {
        self.dcovar() < 0.1
    }

    /// True if forced positive-definite.
    pub fn is_made_pos_def(&self) -> bool {
        self.status == ErrorStatus::MadePosDef
    }

    /// True if Hesse failed.
    pub fn hesse_failed(&self) -> bool {
        self.status == ErrorStatus::HesseFailed
    }

    /// True if an inversion failed.
    pub fn invert_failed(&self) -> bool {
        self.status == ErrorStatus::InvertFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_flags() {
        let m = SymMatrix::identity(2);
        let made = MinimumError::new(m.clone(), ErrorStatus::MadePosDef);
        assert!(made.is_available() && !made.is_valid() && made.is_made_pos_def());
        assert_eq!(made.dcovar(), 1.0);

        let failed = MinimumError::new(m.clone(), ErrorStatus::HesseFailed);
        assert!(failed.hesse_failed() && !failed.is_valid());

        let inv = MinimumError::new(m.clone(), ErrorStatus::InvertFailed);
        assert!(inv.is_valid() && inv.invert_failed());

        let notpd = MinimumError::new(m, ErrorStatus::NotPosDef);
        assert!(notpd.is_available() && !notpd.is_pos_def());

        assert!(!MinimumError::unavailable(2).is_available());
    }

    #[test]
    fn test_accuracy() {
        let m = SymMatrix::identity(1);
        assert!(MinimumError::normal(m.clone(), 0.05).is_accurate());
        assert!(!MinimumError::normal(m, 0.2).is_accurate());
    }

    #[test]
    fn test_hessian_inverts_or_falls_back() {
        let err = MinimumError::normal(SymMatrix::from_diagonal(&[0.5, 0.25]), 0.0);
        let h = err.hessian();
        assert_eq!(h[(0, 0)], 2.0);
        assert_eq!(h[(1, 1)], 4.0);

        let mut singular = SymMatrix::from_diagonal(&[-0.5, 0.25]);
        singular[(0, 1)] = 0.0;
        let h = MinimumError::normal(singular, 0.0).hessian();
        assert_eq!(h[(0, 0)], -2.0);
    }
}
