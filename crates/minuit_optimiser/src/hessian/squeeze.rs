//! Removal of one parameter from a covariance.
//!
//! Deleting a row and column from a covariance is not the same as fixing
//! the parameter: the correct reduced covariance is the inverse of the
//! Hessian with that row and column removed. Both squeezes below go
//! through the Hessian and fall back to a diagonal approximation when an
//! inversion fails.

use minuit_core::SymMatrix;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::state::{ErrorStatus, MinimumError};

const SOURCE: &str = "MnCovarianceSqueeze";

/// Reduced covariance after removing parameter `n` from `cov`.
pub fn squeeze_covariance(cov: &SymMatrix, n: usize, sink: &dyn DiagnosticSink) -> SymMatrix {
    assert!(n < cov.size(), "squeeze index out of range");

    let hess = match cov.inverse() {
        Ok(h) => h,
        Err(e) => {
            sink.emit(Diagnostic::warn(
                SOURCE,
                format!("covariance inversion failed ({e}); returning diagonal"),
            ));
            let diag: Vec<f64> = cov
                .diagonal()
                .into_iter()
                .enumerate()
                .filter(|&(i, _)| i != n)
                .map(|(_, d)| d)
                .collect();
            return SymMatrix::from_diagonal(&diag);
        }
    };

    let squeezed = hess.without(n);
    match squeezed.inverse() {
        Ok(c) => c,
        Err(e) => {
            sink.emit(Diagnostic::warn(
                SOURCE,
                format!("back-inversion failed ({e}); returning diagonal"),
            ));
            diagonal_inverse(&squeezed)
        }
    }
}

/// Reduced [`MinimumError`] after removing internal parameter `n`.
///
/// An inversion failure yields the diagonal approximation tagged
/// [`ErrorStatus::InvertFailed`].
pub fn squeeze_error(error: &MinimumError, n: usize, sink: &dyn DiagnosticSink) -> MinimumError {
    let squeezed = error.hessian().without(n);
    match squeezed.inverse() {
        Ok(inv) => MinimumError::normal(inv, error.dcovar()),
        Err(e) => {
            sink.emit(Diagnostic::warn(
                SOURCE,
                format!("inverse Hessian inversion failed ({e}); returning diagonal"),
            ));
            MinimumError::new(diagonal_inverse(&squeezed), ErrorStatus::InvertFailed)
        }
    }
}

fn diagonal_inverse(m: &SymMatrix) -> SymMatrix {
    let diag: Vec<f64> = m.diagonal().iter().map(|d| 1.0 / d).collect();
    SymMatrix::from_diagonal(&diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Level};
    use approx::assert_relative_eq;

    fn correlated() -> SymMatrix {
        let mut m = SymMatrix::from_diagonal(&[2.0, 1.0, 3.0]);
        m[(0, 1)] = 0.5;
        m[(1, 2)] = -0.4;
        m
    }

    #[test]
    fn test_squeeze_uncorrelated_matches_deletion() {
        let cov = SymMatrix::from_diagonal(&[1.0, 4.0, 9.0]);
        let sink = CollectingSink::new();
        let out = squeeze_covariance(&cov, 1, &sink);
        assert_eq!(out.size(), 2);
        assert_relative_eq!(out[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[(1, 1)], 9.0, epsilon = 1e-12);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_squeeze_is_conditional_covariance() {
        // Removing a parameter leaves the inverse of the reduced Hessian.
        let cov = correlated();
        let sink = CollectingSink::new();
        let out = squeeze_covariance(&cov, 2, &sink);
        let expected = cov.inverse().unwrap().without(2).inverse().unwrap();
        assert_relative_eq!(out[(0, 1)], expected[(0, 1)], epsilon = 1e-12);
        assert!(out[(1, 1)] < cov[(1, 1)]);
    }

    #[test]
    fn test_singular_covariance_falls_back_to_diagonal() {
        let mut cov = SymMatrix::from_diagonal(&[1.0, 1.0]);
        cov[(0, 1)] = 1.0;
        let sink = CollectingSink::new();
        let out = squeeze_covariance(&cov, 0, &sink);
        assert_eq!(out.size(), 1);
        assert_eq!(out[(0, 0)], 1.0);
        assert!(sink.contains(SOURCE, Level::Warn));
    }

    #[test]
    fn test_squeeze_error_keeps_dcovar() {
        let err = MinimumError::normal(correlated(), 0.2);
        let sink = CollectingSink::new();
        let out = squeeze_error(&err, 0, &sink);
        assert_eq!(out.inv_hessian().size(), 2);
        assert_eq!(out.dcovar(), 0.2);
        assert!(out.is_valid());
    }
}
