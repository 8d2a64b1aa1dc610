//! Component formulations (compressor, turbine, nozzle) and the clamps used
//! when degradation scales their efficiencies.
//!
//! Each relation is generic over [`Scalar`] so the forward-mode evaluator can
//! push dual numbers through exactly the same expressions as the scalar path.

use crate::dual::Scalar;
use crate::types::ComponentModel;

/// Ratio of specific heats for cold-section air.
pub const GAMMA_AIR: f64 = 1.4;
/// Ratio of specific heats for hot-section gas.
pub const GAMMA_GAS: f64 = 1.33;
/// Stage count of the advanced (stage-stacked) compressor.
pub const COMPRESSOR_STAGES: u32 = 8;
/// Work multiplier for a cooled turbine running above its metal limit.
pub const TURBINE_COOLING_EFFECTIVENESS: f64 = 0.98;
/// Conical nozzle divergence half-angle, 15 degrees.
pub const NOZZLE_HALF_ANGLE_RAD: f64 = 0.26;

pub const ETA_MIN: f64 = 0.5;
pub const ETA_MAX: f64 = 1.0;
pub const LOSS_MIN: f64 = 0.0;
pub const LOSS_MAX: f64 = 0.5;

pub fn clamp_efficiency(eta: f64) -> f64 {
    eta.clamp(ETA_MIN, ETA_MAX)
}

/// Clamp for a single (or accumulated) pressure-loss coefficient.
pub fn clamp_loss(loss: f64) -> f64 {
    loss.clamp(LOSS_MIN, LOSS_MAX)
}

/// Clamp for the multiplicative "1 - losses" factor applied to the nozzle.
pub fn clamp_loss_factor(factor: f64) -> f64 {
    factor.clamp(0.5, 1.0)
}

/// Conical divergence thrust factor, `cos(half_angle)`.
pub fn divergence_factor() -> f64 {
    NOZZLE_HALF_ANGLE_RAD.cos()
}

/// Compressor outlet/inlet total temperature ratio.
///
/// `Standard` is the single-step isentropic-efficiency relation. `Advanced`
/// splits the pressure ratio evenly over [`COMPRESSOR_STAGES`] stages and
/// compounds the per-stage rise with `eta` treated as a polytropic
/// efficiency, which gives a slightly hotter outlet for the same overall
/// pressure ratio.
pub fn compressor_temperature_ratio<T: Scalar>(opr: T, eta: T, model: ComponentModel) -> T {
    let k = (GAMMA_AIR - 1.0) / GAMMA_AIR;
    match model {
        ComponentModel::Standard => (opr.powf(k) - 1.0) / eta + 1.0,
        ComponentModel::Advanced => {
            let stage_pr = opr.powf(1.0 / f64::from(COMPRESSOR_STAGES));
            let stage_tau = (stage_pr.powf(k) - 1.0) / eta + 1.0;
            let mut tau = T::lift(1.0);
            for _ in 0..COMPRESSOR_STAGES {
                tau = tau * stage_tau;
            }
            tau
        }
    }
}

/// Turbine outlet/inlet total temperature ratio for an expansion pressure
/// ratio `pr` (inlet/outlet, > 1).
///
/// The advanced model loses a fraction of the extracted work to coolant bleed
/// once `t_in` exceeds `metal_limit`.
pub fn turbine_temperature_ratio<T: Scalar>(
    pr: T,
    eta: T,
    t_in: T,
    metal_limit: f64,
    model: ComponentModel,
) -> T {
    let k = (GAMMA_GAS - 1.0) / GAMMA_GAS;
    let ideal_drop = -(pr.powf(-k)) + 1.0;
    let drop = eta * ideal_drop;
    let drop = match model {
        ComponentModel::Advanced if t_in > metal_limit => drop * TURBINE_COOLING_EFFECTIVENESS,
        _ => drop,
    };
    -drop + 1.0
}

/// Turbine expansion pressure ratio (inlet/outlet) needed to reach the
/// temperature ratio `tau_t` at efficiency `eta`. Inverse of the standard
/// [`turbine_temperature_ratio`].
pub fn turbine_pressure_ratio<T: Scalar>(tau_t: T, eta: T) -> T {
    let k = (GAMMA_GAS - 1.0) / GAMMA_GAS;
    let isentropic_tau = -((-tau_t + 1.0) / eta) + 1.0;
    isentropic_tau.powf(-1.0 / k)
}

/// Nozzle exit velocity [m/s] for total temperature `tt` and nozzle pressure
/// ratio `npr` (total/ambient), scaled by the velocity coefficient `cv`.
pub fn nozzle_exit_velocity<T: Scalar>(
    tt: T,
    npr: T,
    cv: T,
    cp: f64,
    gamma: f64,
    model: ComponentModel,
) -> T {
    let k = (gamma - 1.0) / gamma;
    let ideal = (tt * (2.0 * cp) * (-(npr.powf(-k)) + 1.0)).sqrt();
    let v = cv * ideal;
    match model {
        ComponentModel::Standard => v,
        ComponentModel::Advanced => v * divergence_factor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dual::Dual;

    #[test]
    fn test_compressor_standard() {
        let tau = compressor_temperature_ratio(8.0, 0.82, ComponentModel::Standard);
        let expected = 1.0 + (8.0_f64.powf(0.4 / 1.4) - 1.0) / 0.82;
        assert!((tau - expected).abs() < 1e-12);
        assert!(tau > 1.9 && tau < 2.1);
    }

    #[test]
    fn test_compressor_advanced_runs_hotter() {
        for opr in [2.0, 8.0, 14.0, 30.0] {
            let std = compressor_temperature_ratio(opr, 0.85, ComponentModel::Standard);
            let adv = compressor_temperature_ratio(opr, 0.85, ComponentModel::Advanced);
            assert!(adv > std, "opr={}: advanced {} <= standard {}", opr, adv, std);
            assert!(adv < std * 1.1, "advanced should stay close to standard");
        }
    }

    #[test]
    fn test_compressor_unity_pressure_ratio() {
        let tau = compressor_temperature_ratio(1.0, 0.8, ComponentModel::Advanced);
        assert!((tau - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_turbine_cooling_penalty() {
        let std = turbine_temperature_ratio(3.0, 0.9, 1500.0, 1300.0, ComponentModel::Standard);
        let cool = turbine_temperature_ratio(3.0, 0.9, 1500.0, 1300.0, ComponentModel::Advanced);
        let uncooled = turbine_temperature_ratio(3.0, 0.9, 1200.0, 1300.0, ComponentModel::Advanced);

        // Less work extracted, so the outlet is hotter.
        assert!(cool > std);
        assert!(((1.0 - cool) - 0.98 * (1.0 - std)).abs() < 1e-12);
        assert!((uncooled - std).abs() < 1e-15);
    }

    #[test]
    fn test_turbine_pressure_ratio_inverts_temperature_ratio() {
        let tau = turbine_temperature_ratio(2.7, 0.88, 1200.0, 2000.0, ComponentModel::Standard);
        let pr = turbine_pressure_ratio(tau, 0.88);
        assert!((pr - 2.7).abs() < 1e-10);
    }

    #[test]
    fn test_nozzle_divergence() {
        let std = nozzle_exit_velocity(900.0, 3.0, 0.97, 1148.0, GAMMA_GAS, ComponentModel::Standard);
        let adv = nozzle_exit_velocity(900.0, 3.0, 0.97, 1148.0, GAMMA_GAS, ComponentModel::Advanced);
        assert!(std > 500.0 && std < 900.0);
        assert!((adv / std - 0.26_f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_efficiency(0.2), 0.5);
        assert_eq!(clamp_efficiency(1.3), 1.0);
        assert_eq!(clamp_efficiency(0.8), 0.8);
        assert_eq!(clamp_loss(-0.1), 0.0);
        assert_eq!(clamp_loss(0.7), 0.5);
        assert_eq!(clamp_loss_factor(0.3), 0.5);
    }

    #[test]
    fn test_dual_and_scalar_paths_agree() {
        let v = nozzle_exit_velocity(1000.0, 2.5, 0.95, 1148.0, GAMMA_GAS, ComponentModel::Standard);
        let d = nozzle_exit_velocity(
            Dual::variable(1000.0),
            Dual::constant(2.5),
            Dual::constant(0.95),
            1148.0,
            GAMMA_GAS,
            ComponentModel::Standard,
        );
        assert!((d.val - v).abs() < 1e-9);
        // V ~ sqrt(Tt), so dV/dTt = V / (2 Tt)
        assert!((d.der - v / 2000.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamps_stay_in_range(x in -10.0_f64..10.0) {
            let e = clamp_efficiency(x);
            prop_assert!((ETA_MIN..=ETA_MAX).contains(&e));
            let l = clamp_loss(x);
            prop_assert!((LOSS_MIN..=LOSS_MAX).contains(&l));
        }
    }
}
