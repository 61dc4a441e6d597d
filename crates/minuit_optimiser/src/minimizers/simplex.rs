//! Nelder-Mead simplex with Minuit's expansion rule.

use minuit_core::Fcn;

use crate::fcn::MnFcn;
use crate::state::{
    FunctionGradient, FunctionMinimum, MinimumError, MinimumParameters, MinimumSeed, MinimumState,
    TerminalCondition,
};

const SOURCE: &str = "SimplexBuilder";

const ALPHA: f64 = 1.0;
const BETA: f64 = 0.5;
const GAMMA: f64 = 2.0;
const RHOMIN: f64 = 4.0;
const RHOMAX: f64 = 8.0;

/// The `n + 1` vertices with the indices of the best and worst one.
struct Vertices {
    points: Vec<(f64, Vec<f64>)>,
    jl: usize,
    jh: usize,
}

impl Vertices {
    fn new(points: Vec<(f64, Vec<f64>)>) -> Self {
        let mut v = Self { points, jl: 0, jh: 0 };
        v.refresh();
        v
    }

    fn refresh(&mut self) {
        let (mut jl, mut jh) = (0, 0);
        for (j, (f, _)) in self.points.iter().enumerate() {
            if *f < self.points[jl].0 {
                jl = j;
            }
            if *f > self.points[jh].0 {
                jh = j;
            }
        }
        self.jl = jl;
        self.jh = jh;
    }

    fn f(&self, j: usize) -> f64 {
        self.points[j].0
    }

    fn x(&self, j: usize) -> &[f64] {
        &self.points[j].1
    }

    /// Replace the worst vertex.
    fn update(&mut self, y: f64, p: Vec<f64>) {
        self.points[self.jh] = (y, p);
        self.refresh();
    }

    fn edm(&self) -> f64 {
        self.f(self.jh) - self.f(self.jl)
    }

    /// Centroid of all vertices but the worst.
    fn centroid(&self) -> Vec<f64> {
        let n = self.points.len() - 1;
        let wg = 1.0 / n as f64;
        let mut pbar = vec![0.0; n];
        for (j, (_, x)) in self.points.iter().enumerate() {
            if j == self.jh {
                continue;
            }
            for (b, xi) in pbar.iter_mut().zip(x) {
                *b += wg * xi;
            }
        }
        pbar
    }

    /// Per-coordinate spread of the vertices.
    fn spread(&self) -> Vec<f64> {
        let n = self.points.len() - 1;
        (0..n)
            .map(|i| {
                let (lo, hi) = self
                    .points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, x)| {
                        (lo.min(x[i]), hi.max(x[i]))
                    });
                hi - lo
            })
            .collect()
    }
}

fn combine(a: f64, x: &[f64], b: f64, y: &[f64]) -> Vec<f64> {
    x.iter().zip(y).map(|(xi, yi)| a * xi + b * yi).collect()
}

/// Minimise with the simplex method until the spread of function values
/// over the vertices drops below `minedm` or `max_calls` is reached.
///
/// The initial simplex displaces each coordinate by ten times the seed's
/// gradient step. The final state carries no covariance and no gradient;
/// its step sizes are the vertex spread scaled by `sqrt(up / edm)`.
pub fn simplex<F: Fcn + ?Sized>(
    mfcn: &MnFcn<'_, F>,
    seed: MinimumSeed,
    max_calls: usize,
    minedm: f64,
) -> FunctionMinimum {
    let up = mfcn.error_def();
    let n = seed.parameters().len();
    if n == 0 {
        return FunctionMinimum::seed_only(seed, up, TerminalCondition::Converged);
    }
    let eps2 = seed.precision().eps2();

    let x = seed.parameters().vec().to_vec();
    let mut amin = seed.fval();
    let mut points = Vec::with_capacity(n + 1);
    points.push((amin, x.clone()));
    for i in 0..n {
        let dmin = 8.0 * eps2 * (x[i].abs() + eps2);
        let step = (10.0 * seed.gradient().gstep()[i]).abs().max(dmin);
        let mut xi = x.clone();
        xi[i] += step;
        let fi = mfcn.value(&xi);
        points.push((fi, xi));
    }
    let mut simplex = Vertices::new(points);

    let rho1 = 1.0 + ALPHA;
    let rho2 = 1.0 + ALPHA * GAMMA;

    'iterate: loop {
        'step: {
            let (jl, jh) = (simplex.jl, simplex.jh);
            amin = simplex.f(jl);
            let pbar = simplex.centroid();

            let pstar = combine(1.0 + ALPHA, &pbar, -ALPHA, simplex.x(jh));
            let ystar = mfcn.value(&pstar);

            if ystar > amin {
                if ystar < simplex.f(jh) {
                    simplex.update(ystar, pstar);
                    if jh != simplex.jh {
                        break 'step;
                    }
                }
                let pstst = combine(BETA, simplex.x(simplex.jh), 1.0 - BETA, &pbar);
                let ystst = mfcn.value(&pstst);
                if ystst > simplex.f(simplex.jh) {
                    break 'iterate;
                }
                simplex.update(ystst, pstst);
                break 'step;
            }

            let pstst = combine(GAMMA, &pstar, 1.0 - GAMMA, &pbar);
            let ystst = mfcn.value(&pstst);

            let fh = simplex.f(jh);
            let y1 = (ystar - fh) * rho2;
            let y2 = (ystst - fh) * rho1;
            let mut rho = 0.5 * (rho2 * y1 - rho1 * y2) / (y1 - y2);
            if rho.is_nan() || rho < RHOMIN {
                if ystst < simplex.f(jl) {
                    simplex.update(ystst, pstst);
                } else {
                    simplex.update(ystar, pstar);
                }
                break 'step;
            }
            rho = rho.min(RHOMAX);

            let prho = combine(rho, &pbar, 1.0 - rho, simplex.x(jh));
            let yrho = mfcn.value(&prho);
            let fl = simplex.f(jl);
            if yrho < fl && yrho < ystst {
                simplex.update(yrho, prho);
            } else if ystst < fl {
                simplex.update(ystst, pstst);
            } else if yrho > fl {
                if ystst < fl {
                    simplex.update(ystst, pstst);
                } else {
                    simplex.update(ystar, pstar);
                }
            } else if ystar > simplex.f(jh) {
                let pstst = combine(BETA, simplex.x(jh), 1.0 - BETA, &pbar);
                let ystst = mfcn.value(&pstst);
                if ystst > simplex.f(jh) {
                    break 'iterate;
                }
                simplex.update(ystst, pstst);
            }
        }

        if !(simplex.edm() > minedm && mfcn.num_calls() < max_calls) {
            break;
        }
    }

    let exit_edm = simplex.edm();
    let exit_calls = mfcn.num_calls();

    amin = simplex.f(simplex.jl);
    let pbar = simplex.centroid();
    let ybar = mfcn.value(&pbar);
    if ybar < amin {
        simplex.update(ybar, pbar);
    }
    let best = simplex.jl;
    let xbest = simplex.x(best).to_vec();
    let fbest = simplex.f(best);

    let edm = simplex.edm();
    let mut dirin = simplex.spread();
    if edm > 0.0 {
        let scale = (up / edm).sqrt();
        dirin.iter_mut().for_each(|d| *d *= scale);
    }

    mfcn.debug(SOURCE, format!("finished with edm = {edm:e}"));
    let state = MinimumState::new(
        MinimumParameters::with_step(xbest, dirin, fbest),
        MinimumError::unavailable(n),
        FunctionGradient::invalid(n),
        edm,
        mfcn.num_calls(),
    );

    // the centroid move can widen the spread; convergence is judged at loop exit
    let condition = if exit_edm <= minedm {
        TerminalCondition::Converged
    } else if exit_calls >= max_calls {
        mfcn.warn(SOURCE, "call limit exceeded");
        TerminalCondition::ReachedCallLimit
    } else {
        mfcn.warn(SOURCE, format!("edm = {exit_edm:e} above target {minedm:e}"));
        TerminalCondition::AboveMaxEdm
    };
    FunctionMinimum::new(seed, vec![state], up, condition)
}
