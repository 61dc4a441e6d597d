//! Packed symmetric matrix.
//!
//! Only the lower triangle is stored, row by row: element `(row, col)` with
//! `row >= col` lives at `col + row * (row + 1) / 2`. Both index orders are
//! accepted by the accessors.
//!
//! Inversion follows the classical MINUIT scheme: scale to unit diagonal,
//! eliminate in place without pivoting, scale back. Eigenvalues use cyclic
//! Jacobi rotations on a dense copy, which is accurate enough for the
//! positive-definiteness test the minimiser needs.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub};

use crate::types::MatrixError;

/// Maximum number of Jacobi sweeps before giving up.
const MAX_JACOBI_SWEEPS: usize = 60;

/// Symmetric `n x n` matrix in packed storage.
///
/// # Examples
///
/// ```
/// use minuit_core::math::SymMatrix;
///
/// let mut m = SymMatrix::from_diagonal(&[2.0, 4.0]);
/// m[(1, 0)] = 1.0;
/// assert_eq!(m[(0, 1)], 1.0);
///
/// let inv = m.inverse().unwrap();
/// assert!((inv[(0, 0)] - 4.0 / 7.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SymMatrix {
    /// Zero matrix of dimension `n`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * (n + 1) / 2],
        }
    }

    /// Identity matrix of dimension `n`.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Diagonal matrix from the given entries.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let mut m = Self::new(diag.len());
        for (i, &d) in diag.iter().enumerate() {
            m[(i, i)] = d;
        }
        m
    }

    /// Symmetric outer product `v v^T`.
    pub fn outer_product(v: &[f64]) -> Self {
        let n = v.len();
        let mut m = Self::new(n);
        for i in 0..n {
            for j in 0..=i {
                m[(i, j)] = v[i] * v[j];
            }
        }
        m
    }

    /// Dimension.
    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    /// True for the 0 x 0 matrix.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Packed lower-triangle storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(row: usize, col: usize) -> usize {
        if row >= col {
            col + row * (row + 1) / 2
        } else {
            row + col * (col + 1) / 2
        }
    }

    /// Element `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.n && col < self.n);
        self.data[Self::offset(row, col)]
    }

    /// Set element `(row, col)` (and its mirror).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n && col < self.n);
        self.data[Self::offset(row, col)] = value;
    }

    /// Diagonal entries.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.n, "dimension mismatch in SymMatrix::mul_vec");
        (0..self.n)
            .map(|i| (0..self.n).map(|j| self.get(i, j) * v[j]).sum())
            .collect()
    }

    /// Quadratic form `v^T M v`.
    pub fn similarity(&self, v: &[f64]) -> f64 {
        crate::math::vector::dot(v, &self.mul_vec(v))
    }

    /// Sum of the absolute values of the stored (packed) elements.
    pub fn abs_sum(&self) -> f64 {
        self.data.iter().map(|x| x.abs()).sum()
    }

    /// Multiply every element by `factor` in place.
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|x| *x *= factor);
    }

    /// True if every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Invert in place.
    ///
    /// On failure the contents are unspecified; callers keep a copy.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Singular`] when a diagonal entry is not
    /// positive after scaling or an elimination pivot vanishes.
    pub fn invert(&mut self) -> Result<(), MatrixError> {
        let n = self.n;
        if n == 0 {
            return Ok(());
        }
        if n == 1 {
            let tmp = self.data[0];
            if tmp <= 0.0 || !tmp.is_finite() {
                return Err(MatrixError::Singular);
            }
            self.data[0] = 1.0 / tmp;
            return Ok(());
        }

        let mut s = vec![0.0; n];
        let mut q = vec![0.0; n];
        let mut pp = vec![0.0; n];

        for i in 0..n {
            let si = self.get(i, i);
            if si <= 0.0 {
                return Err(MatrixError::Singular);
            }
            s[i] = 1.0 / si.sqrt();
        }
        for i in 0..n {
            for j in 0..=i {
                let v = self.get(i, j) * s[i] * s[j];
                self.set(i, j, v);
            }
        }

        for k in 0..n {
            let pivot = self.get(k, k);
            if pivot == 0.0 {
                return Err(MatrixError::Singular);
            }
            q[k] = 1.0 / pivot;
            pp[k] = 1.0;
            self.set(k, k, 0.0);
            for j in 0..k {
                let a = self.get(j, k);
                pp[j] = a;
                q[j] = a * q[k];
                self.set(j, k, 0.0);
            }
            for j in (k + 1)..n {
                let a = self.get(k, j);
                pp[j] = a;
                q[j] = -a * q[k];
                self.set(k, j, 0.0);
            }
            for j in 0..n {
                for kk in j..n {
                    let idx = Self::offset(j, kk);
                    self.data[idx] += pp[j] * q[kk];
                }
            }
        }

        for j in 0..n {
            for k in 0..=j {
                let v = self.get(k, j) * s[k] * s[j];
                self.set(k, j, v);
            }
        }

        if self.is_finite() {
            Ok(())
        } else {
            Err(MatrixError::Singular)
        }
    }

    /// Inverted copy.
    pub fn inverse(&self) -> Result<Self, MatrixError> {
        let mut m = self.clone();
        m.invert()?;
        Ok(m)
    }

    /// Eigenvalues in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::EigenvalueNoConvergence`] if the Jacobi sweeps
    /// fail to annihilate the off-diagonal part (non-finite input).
    pub fn eigenvalues(&self) -> Result<Vec<f64>, MatrixError> {
        let n = self.n;
        let mut a: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| self.get(i, j)).collect())
            .collect();
        let norm: f64 = a.iter().flatten().map(|x| x * x).sum::<f64>().sqrt();

        for _ in 0..MAX_JACOBI_SWEEPS {
            let mut off = 0.0;
            for p in 0..n {
                for q in (p + 1)..n {
                    off += a[p][q] * a[p][q];
                }
            }
            if off.sqrt() <= 1e-15 * norm || off == 0.0 {
                let mut eig: Vec<f64> = (0..n).map(|i| a[i][i]).collect();
                eig.sort_by(|x, y| x.total_cmp(y));
                return Ok(eig);
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[p][q];
                    if apq == 0.0 {
                        continue;
                    }
                    let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;
                    for row in a.iter_mut() {
                        let (akp, akq) = (row[p], row[q]);
                        row[p] = c * akp - s * akq;
                        row[q] = s * akp + c * akq;
                    }
                    for k in 0..n {
                        let (apk, aqk) = (a[p][k], a[q][k]);
                        a[p][k] = c * apk - s * aqk;
                        a[q][k] = s * apk + c * aqk;
                    }
                }
            }
        }
        Err(MatrixError::EigenvalueNoConvergence {
            sweeps: MAX_JACOBI_SWEEPS,
        })
    }

    /// Copy with row and column `index` removed.
    pub fn without(&self, index: usize) -> Self {
        assert!(index < self.n, "index out of range in SymMatrix::without");
        let mut out = Self::new(self.n - 1);
        for i in 0..self.n {
            if i == index {
                continue;
            }
            let ii = if i > index { i - 1 } else { i };
            for j in 0..=i {
                if j == index {
                    continue;
                }
                let jj = if j > index { j - 1 } else { j };
                out.set(ii, jj, self.get(i, j));
            }
        }
        out
    }
}

impl Index<(usize, usize)> for SymMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[Self::offset(row, col)]
    }
}

impl IndexMut<(usize, usize)> for SymMatrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[Self::offset(row, col)]
    }
}

impl AddAssign<&SymMatrix> for SymMatrix {
    fn add_assign(&mut self, rhs: &SymMatrix) {
        assert_eq!(self.n, rhs.n, "dimension mismatch in SymMatrix addition");
        self.data
            .iter_mut()
            .zip(&rhs.data)
            .for_each(|(a, b)| *a += b);
    }
}

impl Add for &SymMatrix {
    type Output = SymMatrix;

    fn add(self, rhs: &SymMatrix) -> SymMatrix {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub for &SymMatrix {
    type Output = SymMatrix;

    fn sub(self, rhs: &SymMatrix) -> SymMatrix {
        assert_eq!(self.n, rhs.n, "dimension mismatch in SymMatrix subtraction");
        SymMatrix {
            n: self.n,
            data: self.data.iter().zip(&rhs.data).map(|(a, b)| a - b).collect(),
        }
    }
}

impl Mul<f64> for &SymMatrix {
    type Output = SymMatrix;

    fn mul(self, rhs: f64) -> SymMatrix {
        let mut out = self.clone();
        out.scale(rhs);
        out
    }
}
