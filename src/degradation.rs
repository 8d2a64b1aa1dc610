//! Extended solve: component model selection, losses and degradation.
//!
//! Degradation is a pre-processing step. It folds the efficiency factors and
//! losses of an [`ExtendedCycleInput`] into an ordinary [`CycleInput`], which
//! the unmodified Newton solver then iterates on. The component model tags
//! only act afterwards, as corrections to the already converged output.

use serde::Serialize;

use crate::components::{clamp_efficiency, clamp_loss, clamp_loss_factor};
use crate::solver;
use crate::types::{ComponentModel, CycleInput, CycleOutput, Diagnostics, ExtendedCycleInput};

/// T4 growth per point of compressor inefficiency under the advanced
/// compressor model.
const ADVANCED_COMPRESSOR_T4_SENSITIVITY: f64 = 0.02;
const ADVANCED_TURBINE_THRUST_FACTOR: f64 = 0.98;
const ADVANCED_NOZZLE_THRUST_FACTOR: f64 = 0.985;

/// Efficiencies after degradation factors, losses and clamps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EffectiveEfficiencies {
    pub eta_comp: f64,
    pub eta_turb: f64,
    pub eta_nozz: f64,
}

pub fn effective_efficiencies(ext: &ExtendedCycleInput) -> EffectiveEfficiencies {
    let losses = clamp_loss(ext.inlet_loss)
        + clamp_loss(ext.burner_loss)
        + clamp_loss(ext.turbine_mech_loss)
        + clamp_loss(ext.nozzle_loss)
        + clamp_loss(ext.loss_adder);
    let loss_factor = clamp_loss_factor(1.0 - losses);

    EffectiveEfficiencies {
        eta_comp: clamp_efficiency(ext.base.eta_comp * ext.eta_comp_factor),
        eta_turb: clamp_efficiency(ext.base.eta_turb * ext.eta_turb_factor),
        eta_nozz: clamp_efficiency(ext.base.eta_nozz * loss_factor),
    }
}

/// The plain solver input equivalent to `ext`.
pub fn effective_input(ext: &ExtendedCycleInput) -> CycleInput {
    let eff = effective_efficiencies(ext);
    CycleInput {
        eta_comp: eff.eta_comp,
        eta_turb: eff.eta_turb,
        eta_nozz: eff.eta_nozz,
        ..ext.base
    }
}

/// Post-convergence corrections for the selected component models and the
/// degradation flag. These are never fed back into the iteration.
pub fn apply_model_corrections(ext: &ExtendedCycleInput, eff: &EffectiveEfficiencies, out: &mut CycleOutput) {
    if ext.compressor_model == ComponentModel::Advanced {
        out.t4 *= 1.0 + ADVANCED_COMPRESSOR_T4_SENSITIVITY * (1.0 - eff.eta_comp);
    }
    if ext.turbine_model == ComponentModel::Advanced {
        out.thrust_proxy *= ADVANCED_TURBINE_THRUST_FACTOR;
    }
    if ext.nozzle_model == ComponentModel::Advanced {
        out.thrust_proxy *= ADVANCED_NOZZLE_THRUST_FACTOR;
    }
    if ext.is_degraded {
        out.tsfc_proxy /= ext.eta_comp_factor * ext.eta_turb_factor;
    }
}

pub fn solve_extended(ext: &ExtendedCycleInput) -> (CycleOutput, Diagnostics) {
    let eff = effective_efficiencies(ext);
    let (mut out, diag) = solver::solve(&effective_input(ext));
    apply_model_corrections(ext, &eff, &mut out);
    (out, diag)
}

/// Nominal vs degraded outcome of the same operating point.
#[derive(Clone, Debug, Serialize)]
pub struct ComparisonResult {
    pub nominal: CycleOutput,
    pub degraded: CycleOutput,
    pub nominal_efficiencies: EffectiveEfficiencies,
    pub degraded_efficiencies: EffectiveEfficiencies,
    pub tsfc_change_pct: f64,
    pub thrust_change_pct: f64,
    pub t4_change_k: f64,
    pub iter_change: i32,
}

fn pct_change(nominal: f64, degraded: f64) -> f64 {
    if nominal > 0.0 {
        (degraded - nominal) / nominal * 100.0
    } else {
        0.0
    }
}

pub fn compare_degradation(
    ext: &ExtendedCycleInput,
    eta_comp_factor: f64,
    eta_turb_factor: f64,
    loss_adder: f64,
) -> ComparisonResult {
    let degraded_ext = ext.with_degradation(eta_comp_factor, eta_turb_factor, loss_adder);
    let (nominal, _) = solve_extended(ext);
    let (degraded, _) = solve_extended(&degraded_ext);

    ComparisonResult {
        nominal,
        degraded,
        nominal_efficiencies: effective_efficiencies(ext),
        degraded_efficiencies: effective_efficiencies(&degraded_ext),
        tsfc_change_pct: pct_change(nominal.tsfc_proxy, degraded.tsfc_proxy),
        thrust_change_pct: pct_change(nominal.thrust_proxy, degraded.thrust_proxy),
        t4_change_k: degraded.t4 - nominal.t4,
        iter_change: degraded.iter - nominal.iter,
    }
}
