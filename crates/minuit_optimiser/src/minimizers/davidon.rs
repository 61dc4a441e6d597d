//! Davidon-Fletcher-Powell update of the inverse Hessian.

use minuit_core::math::vector;
use minuit_core::SymMatrix;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::state::{MinimumError, MinimumState};

const SOURCE: &str = "DavidonErrorUpdator";

/// Update the inverse Hessian of `s0` with the step to `p1` and the
/// gradient change to `g1`.
///
/// `V' = V + dx dx^T / delgam - Vg Vg^T / gvg`, plus the rank-one
/// correction `gvg u u^T` with `u = dx/delgam - Vg/gvg` when
/// `delgam > gvg`. `dcovar` tracks the relative size of the update.
/// A vanishing `delgam` or non-positive `gvg` leaves `V` unchanged.
pub fn update(
    s0: &MinimumState,
    p1: &[f64],
    g1: &[f64],
    sink: &dyn DiagnosticSink,
) -> MinimumError {
    let v0 = s0.error().inv_hessian();
    let dx = vector::sub(p1, s0.vec());
    let dg = vector::sub(g1, s0.gradient().grad());

    let delgam = vector::dot(&dx, &dg);
    let gvg = v0.similarity(&dg);

    if delgam == 0.0 {
        sink.emit(Diagnostic::warn(SOURCE, "delgam = 0 : cannot update - return same matrix"));
        return s0.error().clone();
    }
    if delgam < 0.0 {
        sink.emit(Diagnostic::warn(SOURCE, format!("delgam = {delgam:e} < 0")));
    }
    if gvg <= 0.0 {
        sink.emit(Diagnostic::warn(
            SOURCE,
            format!("gvg = {gvg:e} <= 0 : cannot update - return same matrix"),
        ));
        return s0.error().clone();
    }

    let vg = v0.mul_vec(&dg);
    let mut v_upd =
        &(&SymMatrix::outer_product(&dx) * (1.0 / delgam)) - &(&SymMatrix::outer_product(&vg) * (1.0 / gvg));

    if delgam > gvg {
        let u: Vec<f64> = dx
            .iter()
            .zip(&vg)
            .map(|(d, v)| d / delgam - v / gvg)
            .collect();
        v_upd += &(&SymMatrix::outer_product(&u) * gvg);
    }

    let sum_upd = v_upd.abs_sum();
    v_upd += v0;
    let dcovar = 0.5 * (s0.error().dcovar() + sum_upd / v_upd.abs_sum());

    MinimumError::normal(v_upd, dcovar)
}
