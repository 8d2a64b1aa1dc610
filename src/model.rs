//! Residual and admissibility model of the scalar cycle solver.
//!
//! The state is the bypass ratio alone. Everything here is a pure function of
//! the bypass ratio and the (immutable) cycle input.

use crate::types::CycleInput;

pub const BPR_MIN: f64 = 0.0;
pub const BPR_MAX: f64 = 2.0;

/// Reference temperature used to normalise T4 in the performance proxies [K].
const T_REF: f64 = 1000.0;
/// Specific-thrust penalty per unit bypass ratio.
const BYPASS_THRUST_PENALTY: f64 = 0.01;
/// Weight of the bypass stream in the fuel-consumption normalisation.
const BYPASS_FLOW_WEIGHT: f64 = 0.8;

/// Altitude/Mach multiplier on the thermal load.
pub fn regime_factor(mach: f64, alt_km: f64) -> f64 {
    (1.0 - 0.02 * alt_km.clamp(0.0, 20.0)) * (1.0 + 0.15 * mach.clamp(0.0, 0.95))
}

/// Turbine inlet temperature proxy [K].
pub fn thermal_proxy(opr: f64, eta_comp: f64, regime: f64) -> f64 {
    900.0 + 55.0 * opr * (1.0 / eta_comp.max(1e-6)) * regime
}

/// Equilibrium bypass-ratio target for a given overall pressure ratio.
pub fn target_bpr(opr: f64) -> f64 {
    0.6 + 0.02 * (opr - 8.0)
}

pub fn residual(bpr: f64, opr: f64) -> f64 {
    (bpr - target_bpr(opr)) + 0.03 * (bpr * bpr - 0.36)
}

/// Projects a trial bypass ratio onto the admissible interval.
pub fn project_bpr(bpr: f64) -> f64 {
    bpr.clamp(BPR_MIN, BPR_MAX)
}

/// Not NaN, not infinite, and strictly below the largest representable
/// magnitude.
pub fn is_finite_value(x: f64) -> bool {
    x.is_finite() && x.abs() < f64::MAX
}

pub fn is_admissible(bpr: f64, t4: f64, t4_max: f64) -> bool {
    is_finite_value(bpr)
        && is_finite_value(t4)
        && (BPR_MIN..=BPR_MAX).contains(&bpr)
        && t4 <= t4_max
}

/// T4 of an input. Independent of the bypass ratio.
pub fn input_t4(inp: &CycleInput) -> f64 {
    thermal_proxy(inp.opr, inp.eta_comp, regime_factor(inp.mach, inp.alt_km))
}

/// Specific-thrust proxy at a converged (bpr, t4).
pub fn thrust_proxy(inp: &CycleInput, bpr: f64, t4: f64) -> f64 {
    inp.eta_nozz * (inp.eta_turb * t4 / T_REF).sqrt() * (1.0 - BYPASS_THRUST_PENALTY * bpr)
}

/// Fuel-consumption proxy at a converged (bpr, t4), given its thrust proxy.
pub fn tsfc_proxy(inp: &CycleInput, bpr: f64, t4: f64, thrust: f64) -> f64 {
    inp.fuel_k * (t4 / T_REF) / (thrust * (1.0 + BYPASS_FLOW_WEIGHT * bpr))
}
