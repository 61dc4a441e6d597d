//! Search for the point where the profiled objective crosses `fmin + up`.

use minuit_core::math::Parabola;
use minuit_core::Fcn;

use crate::config::MinimizerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::minimizers::{minimize, Algorithm};
use crate::strategy::Strategy;
use crate::user::UserParameterState;

const SOURCE: &str = "MnFunctionCross";

const MAX_ITER: usize = 15;
const MAX_STEP: f64 = 100.0;

/// How a crossing search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrossOutcome {
    /// Crossing found.
    Valid,
    /// No crossing: a re-minimisation failed or the iteration did not close in.
    Invalid,
    /// A parameter bound stops the search before the crossing.
    ParameterLimit,
    /// Call budget exhausted.
    CallLimit,
    /// A re-minimisation went below the original minimum.
    NewMinimum,
}

/// Result of a crossing search.
///
/// `value` is the crossing in units of the search direction, measured from
/// the start point; it is only meaningful for [`CrossOutcome::Valid`].
#[derive(Debug, Clone, PartialEq)]
pub struct MnCross {
    value: f64,
    state: Option<UserParameterState>,
    nfcn: usize,
    outcome: CrossOutcome,
}

impl MnCross {
    fn new(value: f64, state: Option<UserParameterState>, nfcn: usize, outcome: CrossOutcome) -> Self {
        Self {
            value,
            state,
            nfcn,
            outcome,
        }
    }

    /// A search that never ran (a side that was not computed).
    pub fn invalid(nfcn: usize) -> Self {
        Self::new(0.0, None, nfcn, CrossOutcome::Invalid)
    }

    /// Crossing position along the direction.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// State of the last re-minimisation, if any.
    pub fn state(&self) -> Option<&UserParameterState> {
        self.state.as_ref()
    }

    /// Function calls spent.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// Outcome tag.
    pub fn outcome(&self) -> CrossOutcome {
        self.outcome
    }

    /// Crossing found.
    pub fn is_valid(&self) -> bool {
        self.outcome == CrossOutcome::Valid
    }

    /// Stopped at a parameter bound.
    pub fn at_limit(&self) -> bool {
        self.outcome == CrossOutcome::ParameterLimit
    }

    /// Stopped on the call budget.
    pub fn at_max_fcn(&self) -> bool {
        self.outcome == CrossOutcome::CallLimit
    }

    /// A lower minimum was found on the way.
    pub fn new_minimum(&self) -> bool {
        self.outcome == CrossOutcome::NewMinimum
    }
}

/// Crossing search around a minimum.
///
/// `state` holds the parameters being scanned already fixed; every trial
/// point sets them to `pmid + a pdir` and re-minimises the others with
/// MIGRAD at one strategy level lower. Each re-minimisation starts from the
/// previous result.
pub struct FunctionCross<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    state: &'a UserParameterState,
    fval: f64,
    strategy: Strategy,
    error_def: f64,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, F: Fcn + ?Sized> FunctionCross<'a, F> {
    /// Search context for a minimum of value `fval`; the target is
    /// `fval + error_def`.
    pub fn new(
        fcn: &'a F,
        state: &'a UserParameterState,
        fval: f64,
        strategy: Strategy,
        error_def: f64,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            fcn,
            state,
            fval,
            strategy,
            error_def,
            sink,
        }
    }

    /// Find `a` such that the minimum over the free parameters with
    /// `par = pmid + a pdir` equals `fval + error_def`.
    ///
    /// `tlr` is the relative tolerance on `a` and on the function value (in
    /// units of `error_def`); `max_calls` is the budget of each
    /// re-minimisation.
    pub fn cross(&self, par: &[usize], pmid: &[f64], pdir: &[f64], tlr: f64, max_calls: usize) -> MnCross {
        assert_eq!(par.len(), pmid.len(), "one start value per crossing parameter");
        assert_eq!(par.len(), pdir.len(), "one direction per crossing parameter");
        match self.search(par, pmid, pdir, tlr, max_calls) {
            Ok(cross) | Err(cross) => cross,
        }
    }

    fn step_limit(&self, par: &[usize], pmid: &[f64], pdir: &[f64]) -> f64 {
        let eps = self.state.trafo().precision().eps();
        let mut aulim = MAX_STEP;
        for ((&kex, &zmid), &zdir) in par.iter().zip(pmid).zip(pdir) {
            let p = &self.state.parameters()[kex];
            if !p.has_limits() || zdir.abs() < eps {
                continue;
            }
            let bound = if zdir > 0.0 { p.upper_limit() } else { p.lower_limit() };
            if let Some(zlim) = bound {
                aulim = aulim.min((zlim - zmid) / zdir);
            }
        }
        aulim
    }

    fn search(
        &self,
        par: &[usize],
        pmid: &[f64],
        pdir: &[f64],
        tlr: f64,
        max_calls: usize,
    ) -> Result<MnCross, MnCross> {
        let up = self.error_def;
        let tlf = tlr * up;
        let aim = self.fval + up;
        let eps = self.state.trafo().precision().eps();

        let mut run = Trials {
            owner: self,
            work: self.state.clone(),
            last: None,
            par,
            pmid,
            pdir,
            aim,
            aulim: self.step_limit(par, pmid, pdir),
            config: MinimizerConfig::default()
                .with_max_calls(max_calls)
                .with_tolerance(tlr)
                .with_error_def(up)
                .with_gradient_check(false),
            nfcn: 0,
            ipt: 0,
        };

        let mut alsb = [0.0; 3];
        let mut flsb = [0.0; 3];

        // First point at the start of the direction.
        let limset = run.aulim < tlr;
        flsb[0] = run.evaluate(0.0, limset)?.max(self.fval + 0.1 * up);
        let mut aopt = (up / (flsb[0] - self.fval)).sqrt() - 1.0;
        if (flsb[0] - aim).abs() < tlf {
            return Ok(run.valid(aopt));
        }

        // Second point from the quadratic guess.
        aopt = aopt.clamp(-0.5, 1.0);
        let (a, limset) = run.limited(aopt);
        alsb[1] = a;
        flsb[1] = run.evaluate(a, limset)?;
        let mut dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);

        // Secant steps until the three points bracket the target.
        let mut ibest = 'bracket: loop {
            if dfda < 0.0 {
                let maxlk = MAX_ITER.saturating_sub(run.ipt);
                for it in 0..maxlk {
                    alsb[0] = alsb[1];
                    flsb[0] = flsb[1];
                    let (a, limset) = run.limited(alsb[0] + 0.2 * it as f64);
                    alsb[1] = a;
                    flsb[1] = run.evaluate(a, limset)?;
                    dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);
                    if dfda > 0.0 {
                        break;
                    }
                }
                if run.ipt > MAX_ITER {
                    return Ok(run.invalid());
                }
            }

            loop {
                aopt = alsb[1] + (aim - flsb[1]) / dfda;
                let fdist = (aim - flsb[0]).abs().min((aim - flsb[1]).abs());
                let adist = (aopt - alsb[0]).abs().min((aopt - alsb[1]).abs());
                let tla = if aopt.abs() > 1.0 { tlr * aopt.abs() } else { tlr };
                if adist < tla && fdist < tlf {
                    return Ok(run.valid(aopt));
                }
                if run.ipt > MAX_ITER {
                    return Ok(run.invalid());
                }
                let bmin = alsb[0].min(alsb[1]) - 1.0;
                let bmax = alsb[0].max(alsb[1]) + 1.0;
                let (a, limset) = run.limited(aopt.clamp(bmin, bmax));
                alsb[2] = a;
                flsb[2] = run.evaluate(a, limset)?;

                let mut ecarmn = (flsb[2] - aim).abs();
                let mut ecarmx = 0.0;
                let mut ibest = 2;
                let mut iworst = 0;
                let mut noless = 0;
                for i in 0..3 {
                    let ecart = (flsb[i] - aim).abs();
                    if ecart > ecarmx {
                        ecarmx = ecart;
                        iworst = i;
                    }
                    if ecart < ecarmn {
                        ecarmn = ecart;
                        ibest = i;
                    }
                    if flsb[i] < aim {
                        noless += 1;
                    }
                }
                if noless == 1 || noless == 2 {
                    break 'bracket ibest;
                }
                if noless == 0 && ibest != 2 {
                    return Ok(run.invalid());
                }
                if noless == 3 && ibest != 2 {
                    alsb[1] = alsb[2];
                    flsb[1] = flsb[2];
                    continue 'bracket;
                }
                flsb[iworst] = flsb[2];
                alsb[iworst] = alsb[2];
                dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);
            }
        };

        // Parabola through the bracket, replacing the outlying point.
        loop {
            let parbol = Parabola::through((alsb[0], flsb[0]), (alsb[1], flsb[1]), (alsb[2], flsb[2]));
            let (c, b, a) = (parbol.c(), parbol.b(), parbol.a());
            let determ = b * b - 4.0 * a * (c - aim);
            if determ < eps {
                return Ok(run.invalid());
            }
            let rt = determ.sqrt();
            let x1 = (-b + rt) / (2.0 * a);
            let x2 = (-b - rt) / (2.0 * a);
            let s1 = b + 2.0 * x1 * a;
            let s2 = b + 2.0 * x2 * a;
            if s1 * s2 > 0.0 {
                self.sink
                    .emit(Diagnostic::debug(SOURCE, "both parabola roots have the same slope sign"));
            }
            let (mut aopt, slope) = if s2 > 0.0 { (x2, s2) } else { (x1, s1) };
            let tla = if aopt.abs() > 1.0 { tlr * aopt.abs() } else { tlr };
            if (aopt - alsb[ibest]).abs() < tla && (flsb[ibest] - aim).abs() < tlf {
                return Ok(run.valid(aopt));
            }

            let mut ileft = None;
            let mut iright: Option<usize> = None;
            let mut iout = None;
            let mut ecarmx = 0.0;
            let mut ecarmn = (aim - flsb[0]).abs();
            ibest = 0;
            for i in 0..3 {
                let ecart = (flsb[i] - aim).abs();
                if ecart < ecarmn {
                    ecarmn = ecart;
                    ibest = i;
                }
                if ecart > ecarmx {
                    ecarmx = ecart;
                }
                if flsb[i] > aim {
                    match iright {
                        None => iright = Some(i),
                        Some(r) if flsb[i] > flsb[r] => iout = Some(i),
                        Some(r) => {
                            iout = Some(r);
                            iright = Some(i);
                        }
                    }
                } else {
                    match ileft {
                        None => ileft = Some(i),
                        Some(l) if flsb[i] < flsb[l] => iout = Some(i),
                        Some(l) => {
                            iout = Some(l);
                            ileft = Some(i);
                        }
                    }
                }
            }
            let (Some(ileft), Some(iright), Some(iout)) = (ileft, iright, iout) else {
                return Ok(run.invalid());
            };

            if ecarmx > 10.0 * (flsb[iout] - aim).abs() {
                aopt = 0.5 * (aopt + 0.5 * (alsb[iright] + alsb[ileft]));
            }
            let mut smalla = 0.1 * tla;
            if slope * smalla > tlf {
                smalla = tlf / slope;
            }
            let aleft = alsb[ileft] + smalla;
            let aright = alsb[iright] - smalla;
            if aleft > aright {
                aopt = 0.5 * (aleft + aright);
            } else {
                aopt = aopt.clamp(aleft, aright);
            }

            let (a, limset) = run.limited(aopt);
            alsb[iout] = a;
            flsb[iout] = run.evaluate(a, limset)?;
            ibest = iout;
            if run.ipt >= MAX_ITER {
                return Ok(run.invalid());
            }
        }
    }
}

/// Trial-point bookkeeping of one crossing search.
struct Trials<'c, 'a, F: Fcn + ?Sized> {
    owner: &'c FunctionCross<'a, F>,
    work: UserParameterState,
    last: Option<UserParameterState>,
    par: &'c [usize],
    pmid: &'c [f64],
    pdir: &'c [f64],
    aim: f64,
    aulim: f64,
    config: MinimizerConfig,
    nfcn: usize,
    ipt: usize,
}

impl<F: Fcn + ?Sized> Trials<'_, '_, F> {
    /// `a` capped at the bound limit, and whether the cap applied.
    fn limited(&self, a: f64) -> (f64, bool) {
        if a > self.aulim {
            (self.aulim, true)
        } else {
            (a, false)
        }
    }

    /// Minimum over the free parameters at `pmid + a pdir`.
    fn evaluate(&mut self, a: f64, limset: bool) -> Result<f64, MnCross> {
        for ((&kex, &mid), &dir) in self.par.iter().zip(self.pmid).zip(self.pdir) {
            if self.work.set_value(kex, mid + a * dir).is_err() {
                return Err(MnCross::invalid(self.nfcn));
            }
        }
        let owner = self.owner;
        let min = minimize(
            owner.fcn,
            &self.work,
            owner.strategy.lowered(),
            &self.config,
            Algorithm::Migrad,
            owner.sink,
        );
        self.nfcn += min.nfcn();
        let state = min.user_state().clone();

        if min.has_reached_call_limit() {
            return Err(MnCross::new(0.0, Some(state), self.nfcn, CrossOutcome::CallLimit));
        }
        if !min.is_valid() {
            return Err(MnCross::invalid(self.nfcn));
        }
        if min.fval() < owner.fval - self.config.tolerance * owner.error_def {
            owner.sink.emit(Diagnostic::info(
                SOURCE,
                format!("new minimum {:e} below {:e}", min.fval(), owner.fval),
            ));
            return Err(MnCross::new(0.0, Some(state), self.nfcn, CrossOutcome::NewMinimum));
        }
        if limset && min.fval() < self.aim {
            return Err(MnCross::new(0.0, Some(state), self.nfcn, CrossOutcome::ParameterLimit));
        }

        self.ipt += 1;
        self.work = state.clone();
        self.last = Some(state);
        Ok(min.fval())
    }

    fn valid(&mut self, a: f64) -> MnCross {
        MnCross::new(a, self.last.take(), self.nfcn, CrossOutcome::Valid)
    }

    fn invalid(&mut self) -> MnCross {
        MnCross::new(0.0, self.last.take(), self.nfcn, CrossOutcome::Invalid)
    }
}
