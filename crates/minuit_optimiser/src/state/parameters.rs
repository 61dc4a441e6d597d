use minuit_core::math::vector;

/// A point in internal coordinates with its function value.
///
/// `dirin` holds per-parameter step sizes when the producer has them (the
/// simplex reports the vertex spread here, scaled to approximate errors).
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumParameters {
    vec: Vec<f64>,
    dirin: Vec<f64>,
    fval: f64,
    valid: bool,
    has_step: bool,
}

impl MinimumParameters {
    /// Point and value.
    pub fn new(vec: Vec<f64>, fval: f64) -> Self {
        let n = vec.len();
        Self::build(vec, vec![0.0; n], fval, false)
    }

    /// Point, step sizes and value.
    pub fn with_step(vec: Vec<f64>, dirin: Vec<f64>, fval: f64) -> Self {
        Self::build(vec, dirin, fval, true)
    }

    fn build(vec: Vec<f64>, dirin: Vec<f64>, fval: f64, has_step: bool) -> Self {
        let valid = vector::is_finite(&vec) && !fval.is_nan();
        Self {
            vec,
            dirin,
            fval,
            valid,
            has_step,
        }
    }

    /// Internal parameter vector.
    pub fn vec(&self) -> &[f64] {
        &self.vec
    }

    /// Step sizes (zero unless [`Self::has_step_size`]).
    pub fn dirin(&self) -> &[f64] {
        &self.dirin
    }

    /// Function value.
    pub fn fval(&self) -> f64 {
        self.fval
    }

    /// True if the point and value are usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True if step sizes were supplied.
    pub fn has_step_size(&self) -> bool {
        self.has_step
    }

    /// Dimension.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    /// True for the zero-dimensional point.
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}
