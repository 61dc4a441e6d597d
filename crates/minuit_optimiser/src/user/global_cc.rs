//! Global correlation coefficients.

use minuit_core::SymMatrix;

/// Global correlation coefficient of each parameter: the largest
/// correlation between that parameter and any linear combination of the
/// others, `sqrt(1 - 1/(cov_ii * inv_ii))`.
///
/// Returns `None` when `cov` cannot be inverted. Rounding can push
/// `cov_ii * inv_ii` slightly below 1; such entries report 0.
pub fn global_correlation(cov: &SymMatrix) -> Option<Vec<f64>> {
    let inv = cov.inverse().ok()?;
    Some(
        (0..cov.size())
            .map(|i| {
                let denom = inv[(i, i)] * cov[(i, i)];
                if denom < 1.0 && denom > 0.0 {
                    0.0
                } else {
                    (1.0 - 1.0 / denom).sqrt()
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uncorrelated_is_zero() {
        let gcc = global_correlation(&SymMatrix::from_diagonal(&[1.0, 4.0])).unwrap();
        assert_relative_eq!(gcc[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(gcc[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_two_parameters_equal_abs_correlation() {
        let mut cov = SymMatrix::from_diagonal(&[1.0, 1.0]);
        cov[(0, 1)] = -0.6;
        let gcc = global_correlation(&cov).unwrap();
        assert_relative_eq!(gcc[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(gcc[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_is_none() {
        let mut cov = SymMatrix::from_diagonal(&[1.0, 1.0]);
        cov[(0, 1)] = 1.0;
        assert!(global_correlation(&cov).is_none());
    }
}
