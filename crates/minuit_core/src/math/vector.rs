//! Dense vector helpers on `&[f64]`.

/// Inner product.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `a - b`.
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `a + s * b`.
pub fn axpy(a: &[f64], s: f64, b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x + s * y).collect()
}

/// `s * a`.
pub fn scaled(a: &[f64], s: f64) -> Vec<f64> {
    a.iter().map(|x| s * x).collect()
}

/// True if every component is finite.
pub fn is_finite(a: &[f64]) -> bool {
    a.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_ops() {
        let a = [1.0, 2.0];
        let b = [3.0, -1.0];
        assert_eq!(dot(&a, &b), 1.0);
        assert_eq!(sub(&a, &b), vec![-2.0, 3.0]);
        assert_eq!(axpy(&a, 2.0, &b), vec![7.0, 0.0]);
        assert_eq!(scaled(&b, -1.0), vec![-3.0, 1.0]);
        assert!(!is_finite(&[1.0, f64::NAN]));
    }
}
