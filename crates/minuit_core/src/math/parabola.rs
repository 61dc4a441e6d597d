//! Parabola `y = a x^2 + b x + c` through three points.
//!
//! Used by the line search and the function-cross root finder.

/// Coefficients of `a x^2 + b x + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parabola {
    a: f64,
    b: f64,
    c: f64,
}

impl Parabola {
    /// Parabola from explicit coefficients.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Fit through `(x1, y1)`, `(x2, y2)`, `(x3, y3)`.
    ///
    /// The abscissae are centred on their mean before solving, which keeps
    /// the divided differences well conditioned for nearly coincident points.
    /// The abscissae must be distinct.
    pub fn through(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> Self {
        let xm = (p1.0 + p2.0 + p3.0) / 3.0;
        let (x1, y1) = (p1.0 - xm, p1.1);
        let (x2, y2) = (p2.0 - xm, p2.1);
        let (x3, y3) = (p3.0 - xm, p3.1);

        let d12 = x1 - x2;
        let d13 = x1 - x3;
        let d23 = x2 - x3;

        let a = y1 / (d12 * d13) - y2 / (d12 * d23) + y3 / (d13 * d23);
        let b = -y1 * (x2 + x3) / (d12 * d13) + y2 * (x1 + x3) / (d12 * d23)
            - y3 * (x1 + x2) / (d13 * d23);
        let c = y1 - a * x1 * x1 - b * x1;

        Self {
            a,
            b: b - 2.0 * xm * a,
            c: c + xm * (xm * a - b),
        }
    }

    /// Quadratic coefficient.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Linear coefficient.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// Constant term.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Value at `x`.
    pub fn y(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }

    /// Abscissa of the extremum, `-b / 2a`.
    pub fn min(&self) -> f64 {
        -self.b / (2.0 * self.a)
    }

    /// Value at the extremum.
    pub fn ymin(&self) -> f64 {
        -self.b * self.b / (4.0 * self.a) + self.c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_through_recovers_coefficients() {
        let f = |x: f64| 2.0 * x * x - 3.0 * x + 1.5;
        let p = Parabola::through((10.0, f(10.0)), (10.5, f(10.5)), (12.0, f(12.0)));
        assert_relative_eq!(p.a(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(p.b(), -3.0, epsilon = 1e-8);
        assert_relative_eq!(p.c(), 1.5, epsilon = 1e-7);
        assert_relative_eq!(p.min(), 0.75, epsilon = 1e-9);
        assert_relative_eq!(p.ymin(), f(0.75), epsilon = 1e-7);
    }
}
