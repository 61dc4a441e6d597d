use minuit_core::math::vector;

/// Gradient in internal coordinates, with the diagonal second derivatives
/// and the finite-difference steps that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionGradient {
    grad: Vec<f64>,
    g2: Vec<f64>,
    gstep: Vec<f64>,
    analytical: bool,
    valid: bool,
}

impl FunctionGradient {
    /// Numerically estimated gradient.
    pub fn numerical(grad: Vec<f64>, g2: Vec<f64>, gstep: Vec<f64>) -> Self {
        debug_assert!(grad.len() == g2.len() && g2.len() == gstep.len());
        let valid = vector::is_finite(&grad);
        Self {
            grad,
            g2,
            gstep,
            analytical: false,
            valid,
        }
    }

    /// User-supplied gradient; `g2` and `gstep` come from a numerical
    /// estimate (or are zero when unknown).
    pub fn analytical(grad: Vec<f64>, g2: Vec<f64>, gstep: Vec<f64>) -> Self {
        Self {
            analytical: true,
            ..Self::numerical(grad, g2, gstep)
        }
    }

    /// Placeholder for states without a gradient (simplex).
    pub fn invalid(n: usize) -> Self {
        Self {
            grad: vec![0.0; n],
            g2: vec![0.0; n],
            gstep: vec![0.0; n],
            analytical: false,
            valid: false,
        }
    }

    /// First derivatives.
    pub fn grad(&self) -> &[f64] {
        &self.grad
    }

    /// Diagonal second derivatives.
    pub fn g2(&self) -> &[f64] {
        &self.g2
    }

    /// Step sizes.
    pub fn gstep(&self) -> &[f64] {
        &self.gstep
    }

    /// True for a user-supplied gradient.
    pub fn is_analytical(&self) -> bool {
        self.analytical
    }

    /// True if the gradient was computed and is finite.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Dimension.
    pub fn len(&self) -> usize {
        self.grad.len()
    }

    /// True for the zero-dimensional gradient.
    pub fn is_empty(&self) -> bool {
        self.grad.is_empty()
    }

    /// True if some second derivative is not positive.
    pub fn has_negative_g2(&self) -> bool {
        self.g2.iter().any(|&g| g <= 0.0)
    }
}
