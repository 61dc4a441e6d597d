//! Two-parameter confidence contours.

use minuit_core::{Fcn, MinuitError, ParameterKey};

use super::cross::FunctionCross;
use super::minos::{Minos, MinosError};
use crate::config::MinimizerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::minimizers::{minimize, Algorithm};
use crate::state::FunctionMinimum;
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "MnContours";

const TOLERANCE: f64 = 0.05;

/// Points of a contour plus the MINOS errors it was started from.
#[derive(Debug, Clone, PartialEq)]
pub struct ContoursError {
    px: usize,
    py: usize,
    points: Vec<(f64, f64)>,
    xminos: MinosError,
    yminos: MinosError,
    nfcn: usize,
}

impl ContoursError {
    /// External index of the x parameter.
    pub fn px(&self) -> usize {
        self.px
    }

    /// External index of the y parameter.
    pub fn py(&self) -> usize {
        self.py
    }

    /// Contour points in order around the minimum.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of points found.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no point was found.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// MINOS errors of the x parameter.
    pub fn xminos(&self) -> &MinosError {
        &self.xminos
    }

    /// MINOS errors of the y parameter.
    pub fn yminos(&self) -> &MinosError {
        &self.yminos
    }

    /// x value at the minimum.
    pub fn xmin(&self) -> f64 {
        self.xminos.min()
    }

    /// y value at the minimum.
    pub fn ymin(&self) -> f64 {
        self.yminos.min()
    }

    /// Function calls spent, MINOS included.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }
}

/// Contour of `fmin + scale * up` in the plane of two parameters, all
/// others minimised.
///
/// The first four points come from the MINOS errors of both parameters and
/// the minima of the other coordinate at those values. Further points are
/// inserted between the two most distant neighbours by a crossing search
/// along the perpendicular bisector.
pub struct Contours<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    minimum: &'a FunctionMinimum,
    strategy: Strategy,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, F: Fcn + ?Sized> Contours<'a, F> {
    /// Contour analysis reporting to `tracing`.
    pub fn new(fcn: &'a F, minimum: &'a FunctionMinimum, strategy: Strategy) -> Self {
        Self {
            fcn,
            minimum,
            strategy,
            sink: &TracingSink,
        }
    }

    /// Report diagnostics to `sink` instead.
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// Only the points of [`Contours::contour`].
    pub fn points<KX: ParameterKey, KY: ParameterKey>(
        &self,
        px: KX,
        py: KY,
        scale: f64,
        npoints: usize,
    ) -> Result<Vec<(f64, f64)>, MinuitError> {
        Ok(self.contour(px, py, scale, npoints)?.points)
    }

    /// Up to `npoints` points of the contour.
    ///
    /// Fewer points are returned when a point cannot be found or the call
    /// budget `100 (npoints + 5) (nvar + 1)` runs out; both cases are
    /// reported to the sink. No point is returned if either MINOS analysis
    /// fails.
    ///
    /// # Errors
    ///
    /// `npoints <= 3`, identical or unknown parameters, fixed parameters,
    /// or an invalid minimum.
    pub fn contour<KX: ParameterKey, KY: ParameterKey>(
        &self,
        px: KX,
        py: KY,
        scale: f64,
        npoints: usize,
    ) -> Result<ContoursError, MinuitError> {
        if npoints <= 3 {
            return Err(MinuitError::invalid_argument(format!(
                "a contour needs more than 3 points, got {npoints}"
            )));
        }
        let state = self.minimum.user_state();
        let px = state.index(px)?;
        let py = state.index(py)?;
        if px == py {
            return Err(MinuitError::invalid_argument("contour parameters must differ"));
        }

        let up = scale * self.minimum.error_def();
        let max_calls = 100 * (npoints + 5) * (state.variable_parameters() + 1);
        let mut nfcn = 0;
        let mut points: Vec<(f64, f64)> = Vec::with_capacity(npoints);

        let minos = Minos::new(self.fcn, self.minimum, self.strategy).with_sink(self.sink);
        let valx = state.value(px)?;
        let valy = state.value(py)?;

        let mex = minos.minos(px, scale)?;
        nfcn += mex.nfcn();
        if !mex.is_valid() {
            self.warn("unable to find the first two points");
            return Ok(self.finish(px, py, points, mex.clone(), mex, nfcn));
        }
        let mey = minos.minos(py, scale)?;
        nfcn += mey.nfcn();
        if !mey.is_valid() {
            self.warn("unable to find the second two points");
            return Ok(self.finish(px, py, points, mex, mey, nfcn));
        }
        let (ex_lo, ex_up) = mex.range();
        let (ey_lo, ey_up) = mey.range();

        let (exy_up, calls) = self.profile(state, px, valx + ex_up, up)?;
        nfcn += calls;
        let Some(exy_up) = exy_up else {
            self.warn(format!("unable to find upper y value for x parameter {px}"));
            return Ok(self.finish(px, py, points, mex, mey, nfcn));
        };
        let (exy_lo, calls) = self.profile(state, px, valx + ex_lo, up)?;
        nfcn += calls;
        let Some(exy_lo) = exy_lo else {
            self.warn(format!("unable to find lower y value for x parameter {px}"));
            return Ok(self.finish(px, py, points, mex, mey, nfcn));
        };
        let (eyx_up, calls) = self.profile(state, py, valy + ey_up, up)?;
        nfcn += calls;
        let Some(eyx_up) = eyx_up else {
            self.warn(format!("unable to find upper x value for y parameter {py}"));
            return Ok(self.finish(px, py, points, mex, mey, nfcn));
        };
        let (eyx_lo, calls) = self.profile(state, py, valy + ey_lo, up)?;
        nfcn += calls;
        let Some(eyx_lo) = eyx_lo else {
            self.warn(format!("unable to find lower x value for y parameter {py}"));
            return Ok(self.finish(px, py, points, mex, mey, nfcn));
        };

        let scalx = 1.0 / (ex_up - ex_lo);
        let scaly = 1.0 / (ey_up - ey_lo);

        points.push((valx + ex_lo, exy_lo.value(py)?));
        points.push((eyx_lo.value(px)?, valy + ey_lo));
        points.push((valx + ex_up, exy_up.value(py)?));
        points.push((eyx_up.value(px)?, valy + ey_up));

        let mut upar = state.clone();
        upar.fix(px)?;
        upar.fix(py)?;
        let cross = FunctionCross::new(self.fcn, &upar, self.minimum.fval(), self.strategy, up, self.sink);
        let scaled_dist = |a: (f64, f64), b: (f64, f64)| {
            let dx = scalx * (a.0 - b.0);
            let dy = scaly * (a.1 - b.1);
            dx * dx + dy * dy
        };

        for i in 4..npoints {
            // Widest gap, the closing pair (last, first) included.
            let mut p1 = points[points.len() - 1];
            let mut p2 = points[0];
            let mut pos2 = 0;
            let mut bigdis = scaled_dist(p1, p2);
            for j in 0..points.len() - 1 {
                let dist = scaled_dist(points[j], points[j + 1]);
                if dist > bigdis {
                    bigdis = dist;
                    p1 = points[j];
                    p2 = points[j + 1];
                    pos2 = j + 1;
                }
            }

            let mut sca = 1.0;
            loop {
                if nfcn > max_calls {
                    self.warn("maximum number of function calls exhausted");
                    return Ok(self.finish(px, py, points, mex, mey, nfcn));
                }
                let xmidcr = 0.5 * (p1.0 + p2.0);
                let ymidcr = 0.5 * (p1.1 + p2.1);
                let xdir = p2.1 - p1.1;
                let ydir = p1.0 - p2.0;
                let scalfac = sca * (xdir * scalx).abs().max((ydir * scaly).abs());
                let xdircr = xdir / scalfac;
                let ydircr = ydir / scalfac;

                let opt = cross.cross(&[px, py], &[xmidcr, ymidcr], &[xdircr, ydircr], TOLERANCE, max_calls);
                nfcn += opt.nfcn();
                if opt.is_valid() {
                    let a = opt.value();
                    let point = (xmidcr + a * xdircr, ymidcr + a * ydircr);
                    if pos2 == 0 {
                        points.push(point);
                    } else {
                        points.insert(pos2, point);
                    }
                    break;
                }
                if sca < 0.0 {
                    self.warn(format!(
                        "unable to find point {} on contour, returning {i} points",
                        i + 1
                    ));
                    return Ok(self.finish(px, py, points, mex, mey, nfcn));
                }
                sca = -1.0;
            }
        }

        Ok(self.finish(px, py, points, mex, mey, nfcn))
    }

    /// Minimum over the other parameters with `fixed` held at `value`,
    /// if valid, plus the calls it took.
    fn profile(
        &self,
        state: &UserParameterState,
        fixed: usize,
        value: f64,
        up: f64,
    ) -> Result<(Option<UserParameterState>, usize), MinuitError> {
        let mut st = state.clone();
        st.fix(fixed)?;
        st.set_value(fixed, value)?;
        let config = MinimizerConfig::default().with_error_def(up);
        let min = minimize(self.fcn, &st, self.strategy.lowered(), &config, Algorithm::Migrad, self.sink);
        let found = min.is_valid().then(|| min.user_state().clone());
        Ok((found, min.nfcn()))
    }

    fn warn(&self, message: impl Into<String>) {
        self.sink.emit(Diagnostic::warn(SOURCE, message));
    }

    fn finish(
        &self,
        px: usize,
        py: usize,
        points: Vec<(f64, f64)>,
        xminos: MinosError,
        yminos: MinosError,
        nfcn: usize,
    ) -> ContoursError {
        ContoursError {
            px,
            py,
            points,
            xminos,
            yminos,
            nfcn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use approx::assert_relative_eq;

    fn fit(f: &dyn Fn(&[f64]) -> f64) -> FunctionMinimum {
        let mut st = UserParameterState::new();
        st.add("x", 0.5, 0.5).unwrap().add("y", 0.5, 0.5).unwrap();
        minimize(
            f,
            &st,
            Strategy::medium(),
            &MinimizerConfig::default(),
            Algorithm::Migrad,
            &NullSink,
        )
    }

    #[test]
    fn test_circle_contour() {
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        let min = fit(&f);
        let c = Contours::new(&f, &min, Strategy::medium())
            .with_sink(&NullSink)
            .contour("x", "y", 1.0, 8)
            .unwrap();

        assert_eq!(c.len(), 8);
        assert_eq!((c.px(), c.py()), (0, 1));
        for &(x, y) in c.points() {
            assert_relative_eq!((x * x + y * y).sqrt(), 1.0, epsilon = 0.05);
        }
        assert!(c.nfcn() > c.xminos().nfcn());
    }

    #[test]
    fn test_ellipse_contains_minos_extremes() {
        let f = |p: &[f64]| p[0] * p[0] + 4.0 * p[1] * p[1];
        let min = fit(&f);
        let pts = Contours::new(&f, &min, Strategy::medium())
            .with_sink(&NullSink)
            .points(0, 1, 1.0, 5)
            .unwrap();
        assert_eq!(pts.len(), 5);

        // insertion order depends on where refinement points land
        for (ex, ey) in [(-1.0, 0.0), (0.0, -0.5), (1.0, 0.0), (0.0, 0.5)] {
            assert!(
                pts.iter()
                    .any(|&(x, y)| (x - ex).abs() < 0.02 && (y - ey).abs() < 0.02),
                "no contour point near ({ex}, {ey}): {pts:?}"
            );
        }
        for &(x, y) in &pts {
            assert_relative_eq!(x * x + 4.0 * y * y, 1.0, epsilon = 0.1);
        }
    }

    #[test]
    fn test_too_few_points_is_rejected() {
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        let min = fit(&f);
        let contours = Contours::new(&f, &min, Strategy::medium()).with_sink(&NullSink);
        assert!(matches!(
            contours.contour("x", "y", 1.0, 3),
            Err(MinuitError::InvalidArgument(_))
        ));
        assert!(matches!(
            contours.contour("x", "x", 1.0, 10),
            Err(MinuitError::InvalidArgument(_))
        ));
    }
}
