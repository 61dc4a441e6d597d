//! Parabolic line search along a descent direction.

use minuit_core::math::{vector, Parabola};
use minuit_core::{Fcn, MachinePrecision};

use crate::fcn::MnFcn;
use crate::state::MinimumParameters;

const OVERAL: f64 = 1000.0;
const UNDRAL: f64 = -100.0;
const TOLER: f64 = 0.05;
const SLAMBG: f64 = 5.0;
const ALPHA: f64 = 2.0;
const MAX_ITER: usize = 12;

/// Best point `(lambda, f)` found along `x + lambda step`, starting from
/// the trial `lambda = 1`.
///
/// `gdel` is the directional derivative `step . g` at `lambda = 0`. The
/// first phase fits the parabola through `(0, f0)` with slope `gdel` and
/// the last trial; the second fits parabolas through three points,
/// replacing the worst point each time. The returned value is never
/// above `st.fval()`; `(0, f0)` is returned when nothing better is found.
pub fn line_search<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    st: &MinimumParameters,
    step: &[f64],
    gdel: f64,
    prec: &MachinePrecision,
) -> (f64, f64) {
    let (eps, eps2) = (prec.eps(), prec.eps2());
    let mut overal = OVERAL;
    let mut undral = UNDRAL;
    let mut niter = 0;

    let mut slamin = 0.0_f64;
    for (x, s) in st.vec().iter().zip(step) {
        if s.abs() < eps {
            continue;
        }
        let ratio = (x / s).abs();
        if slamin.abs() < eps || ratio < slamin {
            slamin = ratio;
        }
    }
    if slamin.abs() < eps {
        slamin = eps;
    }
    slamin *= eps2;

    let f0 = st.fval();
    let f1 = mfcn.value(&vector::axpy(st.vec(), 1.0, step));
    let mut fvmin = f0;
    let mut xvmin = 0.0;
    if f1 < f0 {
        fvmin = f1;
        xvmin = 1.0;
    }

    let mut toler8 = TOLER;
    let mut slamax = SLAMBG;
    let mut flast = f1;
    let mut slam = 1.0;
    let mut p0 = (0.0, f0);
    let mut p1 = (slam, flast);
    let mut f2;

    // Phase 1: parabola from the slope at 0 and the last trial.
    loop {
        let mut denom = 2.0 * (flast - f0 - gdel * slam) / (slam * slam);
        if denom.abs() < eps {
            denom = -0.1 * gdel;
            slam = 1.0;
        }
        if denom.abs() > eps {
            slam = -gdel / denom;
        }
        if slam < 0.0 || slam > slamax {
            slam = slamax;
        }
        if slam < toler8 {
            slam = toler8;
        }
        if slam < slamin {
            return (xvmin, fvmin);
        }
        if (slam - 1.0).abs() < toler8 {
            if p1.1 < p0.1 {
                return (xvmin, fvmin);
            }
            slam = 1.0 + toler8;
        }

        f2 = mfcn.value(&vector::axpy(st.vec(), slam, step));
        if f2 < fvmin {
            fvmin = f2;
            xvmin = slam;
        }
        // Keep extrapolating while the function is flat around f0.
        if p0.1 - eps < fvmin && fvmin < p0.1 + eps {
            flast = f2;
            toler8 = TOLER * slam;
            overal = slam - toler8;
            slamax = overal;
            p1 = (slam, flast);
            niter += 1;
            if niter < MAX_ITER {
                continue;
            }
            return (xvmin, fvmin);
        }
        break;
    }

    // Phase 2: three-point parabolas.
    let mut p2 = (slam, f2);
    loop {
        slamax = slamax.max(ALPHA * xvmin.abs());
        let pb = Parabola::through(p0, p1, p2);
        if pb.a() < eps2 {
            let slopem = 2.0 * pb.a() * xvmin + pb.b();
            slam = if slopem < 0.0 {
                xvmin + slamax
            } else {
                xvmin - slamax
            };
        } else {
            slam = pb.min().clamp(xvmin - slamax, xvmin + slamax);
        }
        if slam > 0.0 {
            slam = slam.min(overal);
        } else {
            slam = slam.max(undral);
        }

        let mut f3;
        loop {
            let toler9 = toler8.max((toler8 * slam).abs());
            if (p0.0 - slam).abs() < toler9
                || (p1.0 - slam).abs() < toler9
                || (p2.0 - slam).abs() < toler9
            {
                return (xvmin, fvmin);
            }
            f3 = mfcn.value(&vector::axpy(st.vec(), slam, step));
            // Worse than all three: shrink towards the best point.
            if f3 > p0.1 && f3 > p1.1 && f3 > p2.1 {
                if slam > xvmin {
                    overal = overal.min(slam - toler8);
                }
                if slam < xvmin {
                    undral = undral.max(slam + toler8);
                }
                slam = 0.5 * (slam + xvmin);
                niter += 1;
                if niter < MAX_ITER {
                    continue;
                }
                return (xvmin, fvmin);
            }
            break;
        }

        let p3 = (slam, f3);
        if p0.1 > p1.1 && p0.1 > p2.1 {
            p0 = p3;
        } else if p1.1 > p0.1 && p1.1 > p2.1 {
            p1 = p3;
        } else {
            p2 = p3;
        }
        if f3 < fvmin {
            fvmin = f3;
            xvmin = slam;
        } else {
            if slam > xvmin {
                overal = overal.min(slam - toler8);
            }
            if slam < xvmin {
                undral = undral.max(slam + toler8);
            }
        }
        niter += 1;
        if niter >= MAX_ITER {
            return (xvmin, fvmin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use approx::assert_relative_eq;
    use minuit_core::{Parameter, UserTransformation};
    use proptest::prelude::*;

    fn one_dim() -> UserTransformation {
        let mut t = UserTransformation::new();
        t.add(Parameter::new("x", 0.0, 1.0)).unwrap();
        t
    }

    #[test]
    fn test_exact_step_is_accepted() {
        let t = one_dim();
        let f = |p: &[f64]| (p[0] - 2.0).powi(2);
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let st = MinimumParameters::new(vec![0.0], 4.0);
        // Newton step lands on the minimum.
        let (x, fx) = line_search(&mfcn, &st, &[2.0], -8.0, &MachinePrecision::new());
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fx, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_step_is_extended() {
        let t = one_dim();
        let f = |p: &[f64]| (p[0] - 2.0).powi(2);
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let st = MinimumParameters::new(vec![0.0], 4.0);
        let (x, fx) = line_search(&mfcn, &st, &[0.5], -2.0, &MachinePrecision::new());
        assert_relative_eq!(x, 4.0, max_relative = 1e-6);
        assert!(fx < 1e-10);
    }

    #[test]
    fn test_overshoot_is_pulled_back() {
        let t = one_dim();
        let f = |p: &[f64]| (p[0] - 2.0).powi(2);
        let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
        let st = MinimumParameters::new(vec![0.0], 4.0);
        let (x, fx) = line_search(&mfcn, &st, &[10.0], -40.0, &MachinePrecision::new());
        assert_relative_eq!(x, 0.2, max_relative = 1e-6);
        assert!(fx < 1e-10);
    }

    proptest! {
        #[test]
        fn prop_never_worse_than_start(
            x0 in -5.0f64..5.0,
            s in -3.0f64..3.0,
            c in 0.1f64..10.0,
        ) {
            let t = one_dim();
            let f = move |p: &[f64]| c * (p[0] - 1.0).powi(2) + (3.0 * p[0]).sin();
            let mfcn = MnFcn::new(&f, &t, 1.0, &NullSink);
            let f0 = f(&[x0]);
            let st = MinimumParameters::new(vec![x0], f0);
            let gdel = s * (2.0 * c * (x0 - 1.0) + 3.0 * (3.0 * x0).cos());
            let (_, fx) = line_search(&mfcn, &st, &[s], gdel, &MachinePrecision::new());
            prop_assert!(fx <= f0);
        }
    }
}
