//! Forward-mode sensitivities of the cycle performance proxies.
//!
//! This is a standalone cycle derivation written entirely in [`Dual`]
//! arithmetic: ISA ambient, ram stagnation, compressor and fan work, burner
//! fuel-air ratio, turbine work balance, core and bypass nozzle velocities,
//! then specific thrust and TSFC. Component relations come from
//! [`crate::components`]; the gas constants below are local to this module. The
//! scalar solver uses the closed-form proxies of [`crate::model`] instead, so
//! the two evaluators are not meant to agree bit for bit.
//!
//! One evaluation seeds exactly one parameter. A full Jacobian is six
//! evaluations.

use serde::Serialize;
use tracing::debug;

use crate::components::{
    compressor_temperature_ratio, nozzle_exit_velocity, turbine_pressure_ratio,
};
use crate::dual::Dual;
use crate::types::{AdResult, ComponentModel, CycleInput, JacobianResult, Seed, Status};

const GAMMA_C: f64 = 1.4;
const GAMMA_H: f64 = 1.33;
const CP_C: f64 = 1005.0;
const CP_H: f64 = 1148.0;
const R_AIR: f64 = 287.0;
const LHV: f64 = 43.0e6;
const ETA_BURNER: f64 = 0.99;
const ETA_MECH: f64 = 0.99;
const BURNER_PRESSURE_RECOVERY: f64 = 0.95;
const FAN_PRESSURE_RATIO: f64 = 1.5;
/// Combustor temperature rise at unit fuel parameter [K].
const COMBUSTOR_DELTA_T: f64 = 775.0;

const T_SEA_LEVEL: f64 = 288.15;
const LAPSE_RATE_K_PER_KM: f64 = 6.5;
const T_TROPOPAUSE: f64 = 216.65;

/// Specific thrust [m/s] that maps to a thrust proxy of 1.
const SPECIFIC_THRUST_REF: f64 = 415.0;
/// TSFC [kg/(N s)] that maps to a tsfc proxy of 1.
const TSFC_REF: f64 = 3.45e-5;

/// Nozzle efficiency and fuel parameter used by [`jacobian`].
pub const JACOBIAN_ETA_NOZZ: f64 = 0.95;
pub const JACOBIAN_FUEL_K: f64 = 1.0;

/// Operating point for a forward-mode evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdInput {
    pub mach: f64,
    pub alt_km: f64,
    pub bpr: f64,
    pub opr: f64,
    pub eta_comp: f64,
    pub eta_turb: f64,
    pub eta_nozz: f64,
    pub fuel_k: f64,
    pub t4_max: f64,
}

impl AdInput {
    pub fn from_cycle(inp: &CycleInput) -> Self {
        Self {
            mach: inp.mach,
            alt_km: inp.alt_km,
            bpr: inp.bpr,
            opr: inp.opr,
            eta_comp: inp.eta_comp,
            eta_turb: inp.eta_turb,
            eta_nozz: inp.eta_nozz,
            fuel_k: inp.fuel_k,
            t4_max: inp.t4_max,
        }
    }

    /// Value of the parameter a seed selects.
    pub fn get(&self, seed: Seed) -> f64 {
        match seed {
            Seed::Mach => self.mach,
            Seed::AltKm => self.alt_km,
            Seed::Bpr => self.bpr,
            Seed::Opr => self.opr,
            Seed::EtaComp => self.eta_comp,
            Seed::EtaTurb => self.eta_turb,
        }
    }

    pub fn with(&self, seed: Seed, value: f64) -> Self {
        let mut out = *self;
        match seed {
            Seed::Mach => out.mach = value,
            Seed::AltKm => out.alt_km = value,
            Seed::Bpr => out.bpr = value,
            Seed::Opr => out.opr = value,
            Seed::EtaComp => out.eta_comp = value,
            Seed::EtaTurb => out.eta_turb = value,
        }
        out
    }

    fn dual(&self, param: Seed, seed: Seed) -> Dual {
        let v = self.get(param);
        if param == seed {
            Dual::variable(v)
        } else {
            Dual::constant(v)
        }
    }
}

struct CycleDuals {
    tsfc: Dual,
    thrust: Dual,
    t4: Dual,
}

/// Evaluates the cycle with `seed` as the independent variable.
fn evaluate(inp: &AdInput, seed: Seed) -> Result<CycleDuals, (Status, Dual)> {
    let mach = inp.dual(Seed::Mach, seed);
    let alt = inp.dual(Seed::AltKm, seed);
    let bpr = inp.dual(Seed::Bpr, seed);
    let opr = inp.dual(Seed::Opr, seed);
    let eta_c = inp.dual(Seed::EtaComp, seed);
    let eta_t = inp.dual(Seed::EtaTurb, seed);

    // Ambient and inlet stagnation
    let t0 = (T_SEA_LEVEL - alt * LAPSE_RATE_K_PER_KM).max(Dual::constant(T_TROPOPAUSE));
    let ram = mach.powi(2) * (0.5 * (GAMMA_C - 1.0)) + 1.0;
    let tt2 = t0 * ram;
    let pi_ram = ram.powf(GAMMA_C / (GAMMA_C - 1.0));

    // Compression and combustion
    let tt3 = tt2 * compressor_temperature_ratio(opr, eta_c, ComponentModel::Standard);
    let t4 = tt3 + COMBUSTOR_DELTA_T * inp.fuel_k;
    if t4.val > inp.t4_max {
        debug!(t4 = t4.val, t4_max = inp.t4_max, seed = seed.name(), "thermal ceiling exceeded");
        return Err((Status::ConstraintViolated, t4));
    }
    let far = CP_H * (t4 - tt3) / (ETA_BURNER * LHV - CP_H * t4);

    // Turbine drives the core compressor and the fan
    let tau_f = compressor_temperature_ratio(Dual::constant(FAN_PRESSURE_RATIO), eta_c, ComponentModel::Standard);
    let w_comp = CP_C * (tt3 - tt2);
    let w_fan = bpr * CP_C * tt2 * (tau_f - 1.0);
    let dt_turb = (w_comp + w_fan) / ((far + 1.0) * (CP_H * ETA_MECH));
    let tau_t = 1.0 - dt_turb / t4;
    let pi_t = turbine_pressure_ratio(tau_t, eta_t);
    let tt5 = t4 * tau_t;

    // Exhaust
    let cv = Dual::constant(inp.eta_nozz.sqrt());
    let npr_core = pi_ram * opr * BURNER_PRESSURE_RECOVERY / pi_t;
    let v9 = nozzle_exit_velocity(tt5, npr_core, cv, CP_H, GAMMA_H, ComponentModel::Standard);
    let npr_fan = pi_ram * FAN_PRESSURE_RATIO;
    let v19 = nozzle_exit_velocity(tt2 * tau_f, npr_fan, cv, CP_C, GAMMA_C, ComponentModel::Standard);
    let v0 = mach * (t0 * (GAMMA_C * R_AIR)).sqrt();

    // Per unit total mass flow
    let total_flow = bpr + 1.0;
    let specific_thrust = ((far + 1.0) * v9 - v0 + bpr * (v19 - v0)) / total_flow;
    let tsfc = far / (total_flow * specific_thrust);

    let out = CycleDuals {
        tsfc: tsfc / TSFC_REF,
        thrust: specific_thrust / SPECIFIC_THRUST_REF,
        t4,
    };
    if !(out.tsfc.is_finite() && out.thrust.is_finite() && out.t4.is_finite()) {
        return Err((Status::NonPhysical, t4));
    }
    Ok(out)
}

/// Values and exact derivatives of (tsfc, thrust, t4) with respect to one
/// parameter.
///
/// On a thermal-ceiling violation only the T4 pair is meaningful; tsfc and
/// thrust are reported as zero.
pub fn differentiate(inp: &AdInput, seed: Seed) -> AdResult {
    match evaluate(inp, seed) {
        Ok(d) => AdResult {
            tsfc_val: d.tsfc.val,
            tsfc_der: d.tsfc.der,
            thrust_val: d.thrust.val,
            thrust_der: d.thrust.der,
            t4_val: d.t4.val,
            t4_der: d.t4.der,
            status: Status::Ok,
        },
        Err((status, t4)) => AdResult {
            tsfc_val: 0.0,
            tsfc_der: 0.0,
            thrust_val: 0.0,
            thrust_der: 0.0,
            t4_val: t4.val,
            t4_der: t4.der,
            status,
        },
    }
}

/// Full 6x3 sensitivity matrix by six single-seed evaluations.
///
/// The matrix status is the first non-Ok seed status; rows of failed seeds
/// are left at zero and the rest are still filled. Base values come from the
/// mach-seeded evaluation alone.
pub fn jacobian(
    mach: f64,
    alt_km: f64,
    bpr: f64,
    opr: f64,
    eta_comp: f64,
    eta_turb: f64,
    t4_max: f64,
) -> JacobianResult {
    let inp = AdInput {
        mach,
        alt_km,
        bpr,
        opr,
        eta_comp,
        eta_turb,
        eta_nozz: JACOBIAN_ETA_NOZZ,
        fuel_k: JACOBIAN_FUEL_K,
        t4_max,
    };
    jacobian_at(&inp)
}

/// [`jacobian`] for an arbitrary nozzle efficiency and fuel parameter.
pub fn jacobian_at(inp: &AdInput) -> JacobianResult {
    let mut result = JacobianResult::default();

    for seed in Seed::ALL {
        let r = differentiate(inp, seed);
        if seed == Seed::Mach {
            result.base_tsfc = r.tsfc_val;
            result.base_thrust = r.thrust_val;
            result.base_t4 = r.t4_val;
        }
        if r.status != Status::Ok {
            debug!(seed = seed.name(), status = r.status.name(), "jacobian seed failed");
            if result.status == Status::Ok {
                result.status = r.status;
            }
            continue;
        }
        result.jacobian[seed.row()] = [r.tsfc_der, r.thrust_der, r.t4_der];
    }

    result
}
