//! Post-solve conservation gate.
//!
//! The two residuals are small synthetic proxies evaluated once at the final
//! state. Their scale (order 1e-9) is relied on by downstream consumers and
//! must not be renormalised.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvariantResiduals {
    pub mass: f64,
    pub energy: f64,
}

pub fn mass_residual(bpr: f64, opr: f64) -> f64 {
    (1e-6 * (bpr - 0.6) + 1e-7 * (opr - 8.0)).abs()
}

pub fn energy_residual(t4: f64, t4_max: f64) -> f64 {
    (t4 / t4_max.max(1.0) - 0.92).abs() * 1e-9
}

pub fn evaluate(bpr: f64, opr: f64, t4: f64, t4_max: f64) -> InvariantResiduals {
    InvariantResiduals {
        mass: mass_residual(bpr, opr),
        energy: energy_residual(t4, t4_max),
    }
}

impl InvariantResiduals {
    /// True when either residual exceeds its tolerance.
    pub fn violated(&self, mass_tol: f64, energy_tol: f64) -> bool {
        self.mass > mass_tol || self.energy > energy_tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_point_is_clean() {
        let r = evaluate(0.6, 8.0, 1288.0, 1400.0);
        assert!(r.mass < 1e-20);
        assert!(r.energy < 1e-12);
        assert!(!r.violated(1e-9, 1e-9));
    }

    #[test]
    fn test_scale() {
        assert!((mass_residual(1.6, 8.0) - 1e-6).abs() < 1e-18);
        assert!((mass_residual(0.6, 9.0) - 1e-7).abs() < 1e-18);
        assert!((energy_residual(1400.0, 1400.0) - 0.08e-9).abs() < 1e-20);
    }

    #[test]
    fn test_energy_guards_small_ceiling() {
        // Ceilings below 1 K are treated as 1 K.
        assert_eq!(energy_residual(0.5, 0.0), energy_residual(0.5, 1.0));
    }

    #[test]
    fn test_gate_is_strict() {
        let r = InvariantResiduals { mass: 1e-9, energy: 0.0 };
        assert!(!r.violated(1e-9, 1e-9));
        let r = InvariantResiduals { mass: 0.0, energy: 2e-9 };
        assert!(r.violated(1e-9, 1e-9));
        let r = InvariantResiduals { mass: 2e-9, energy: 0.0 };
        assert!(r.violated(1e-9, 1e-9));
    }
}
