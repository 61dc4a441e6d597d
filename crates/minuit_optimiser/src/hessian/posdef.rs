//! Positive-definiteness repair of an inverse Hessian.

use minuit_core::{MachinePrecision, SymMatrix};

use crate::state::{ErrorStatus, MinimumError, MinimumState};

/// Force `error`'s matrix positive-definite.
///
/// A non-positive diagonal is shifted by `0.5 + epspdf - dgmin`; the
/// matrix is then scaled to unit diagonal and, if its smallest eigenvalue
/// is below `epspdf * max(|max|, 1)`, the diagonal is inflated by
/// `1 + 0.001 max - min` and the result tagged
/// [`ErrorStatus::MadePosDef`]. A matrix that passes keeps its `dcovar`.
///
/// Callers decide whether the repair is worth reporting.
pub fn make_pos_def(error: &MinimumError, prec: &MachinePrecision) -> MinimumError {
    let src = error.inv_hessian();
    let n = src.size();
    if n == 0 {
        return error.clone();
    }
    if n == 1 {
        let v = src[(0, 0)];
        if v < prec.eps() {
            return MinimumError::new(SymMatrix::from_diagonal(&[1.0]), ErrorStatus::MadePosDef);
        }
        if v > prec.eps() {
            return error.clone();
        }
    }

    let epspdf = prec.eps2().max(1.0e-6);
    let dgmin = src.diagonal().into_iter().fold(f64::INFINITY, f64::min);
    let dg = if dgmin <= 0.0 {
        0.5 + epspdf - dgmin
    } else {
        0.0
    };

    let mut err = src.clone();
    let mut s = vec![0.0; n];
    for i in 0..n {
        err[(i, i)] += dg;
        if err[(i, i)] < 0.0 {
            err[(i, i)] = 1.0;
        }
        s[i] = 1.0 / err[(i, i)].sqrt();
    }
    let mut p = SymMatrix::new(n);
    for i in 0..n {
        for j in 0..=i {
            p.set(i, j, err.get(i, j) * s[i] * s[j]);
        }
    }

    let (pmin, pmax) = match p.eigenvalues() {
        Ok(eval) => (eval[0], eval[n - 1].abs().max(1.0)),
        Err(_) => {
            // No spectrum: keep only the (shifted) diagonal.
            return MinimumError::new(
                SymMatrix::from_diagonal(&err.diagonal()),
                ErrorStatus::MadePosDef,
            );
        }
    };
    if pmin > epspdf * pmax {
        return MinimumError::normal(err, error.dcovar());
    }

    let padd = 0.001 * pmax - pmin;
    for i in 0..n {
        err[(i, i)] *= 1.0 + padd;
    }
    MinimumError::new(err, ErrorStatus::MadePosDef)
}

/// [`make_pos_def`] applied to the error of a state.
pub fn make_state_pos_def(state: &MinimumState, prec: &MachinePrecision) -> MinimumState {
    state.with_error(make_pos_def(state.error(), prec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prec() -> MachinePrecision {
        MachinePrecision::new()
    }

    #[test]
    fn test_positive_matrix_unchanged() {
        let mut m = SymMatrix::from_diagonal(&[2.0, 1.0]);
        m[(0, 1)] = 0.5;
        let e = MinimumError::normal(m.clone(), 0.3);
        let out = make_pos_def(&e, &prec());
        assert_eq!(out.inv_hessian(), &m);
        assert_eq!(out.dcovar(), 0.3);
        assert!(!out.is_made_pos_def());
    }

    #[test]
    fn test_one_by_one_negative_becomes_unit() {
        let e = MinimumError::normal(SymMatrix::from_diagonal(&[-3.0]), 0.0);
        let out = make_pos_def(&e, &prec());
        assert!(out.is_made_pos_def());
        assert_eq!(out.inv_hessian()[(0, 0)], 1.0);
    }

    #[test]
    fn test_indefinite_matrix_is_repaired() {
        let mut m = SymMatrix::from_diagonal(&[1.0, 1.0]);
        m[(0, 1)] = 2.0;
        let out = make_pos_def(&MinimumError::normal(m, 0.0), &prec());
        assert!(out.is_made_pos_def());
        let eval = out.inv_hessian().eigenvalues().unwrap();
        assert!(eval[0] > 0.0);
    }

    #[test]
    fn test_negative_diagonal_is_shifted() {
        let m = SymMatrix::from_diagonal(&[-1.0, 2.0]);
        let out = make_pos_def(&MinimumError::normal(m, 0.0), &prec());
        assert!(out.inv_hessian().diagonal().iter().all(|&d| d > 0.0));
    }

    proptest! {
        #[test]
        fn prop_result_is_positive_definite(
            a in -5.0f64..5.0,
            b in -5.0f64..5.0,
            c in -5.0f64..5.0,
        ) {
            let mut m = SymMatrix::from_diagonal(&[a, c]);
            m[(0, 1)] = b;
            let out = make_pos_def(&MinimumError::normal(m, 0.0), &prec());
            let eval = out.inv_hessian().eigenvalues().unwrap();
            prop_assert!(eval[0] > 0.0);
        }
    }
}
