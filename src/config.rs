use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CycleError;
use crate::types::{ComponentModel, CycleInput, ExtendedCycleInput};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Root {
    pub program: Program,
    pub solver: Solver,
    pub invariants: Invariants,
    pub constraints: Constraints,
    pub cycle: Cycle,
    pub sweep: Option<Sweep>,
    pub components: Option<Components>,
    pub losses: Option<Losses>,
    pub degradation: Option<Degradation>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Program {
    pub name: String,
    pub module: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Solver {
    pub max_iter: i32,
    pub tol: f64,
    pub damping: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Invariants {
    pub mass_tol: f64,
    pub energy_tol: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Constraints {
    pub t4_max: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cycle {
    pub mach: f64,
    pub alt_km: f64,
    pub bpr: Option<f64>,
    pub opr: Option<f64>,
    pub eta_comp: f64,
    pub eta_turb: f64,
    pub eta_nozz: f64,
    pub fuel_k: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sweep {
    pub bpr_min: f64,
    pub bpr_max: f64,
    pub bpr_n: usize,
    pub opr_min: f64,
    pub opr_max: f64,
    pub opr_n: usize,
}

impl Sweep {
    fn linspace(min: f64, max: f64, n: usize, i: usize) -> f64 {
        if n > 1 {
            min + (max - min) * (i as f64) / ((n - 1) as f64)
        } else {
            min
        }
    }

    /// Grid points in row-major (bpr outer, opr inner) order.
    pub fn points(&self) -> Vec<(usize, usize, f64, f64)> {
        let mut pts = Vec::with_capacity(self.bpr_n * self.opr_n);
        for i in 0..self.bpr_n {
            let bpr = Self::linspace(self.bpr_min, self.bpr_max, self.bpr_n, i);
            for j in 0..self.opr_n {
                let opr = Self::linspace(self.opr_min, self.opr_max, self.opr_n, j);
                pts.push((i, j, bpr, opr));
            }
        }
        pts
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Components {
    #[serde(default)]
    pub compressor: ComponentModel,
    #[serde(default)]
    pub turbine: ComponentModel,
    #[serde(default)]
    pub nozzle: ComponentModel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Losses {
    /// Inlet pressure loss coefficient (default: 0.02)
    #[serde(default = "default_inlet_loss")]
    pub inlet: f64,
    /// Combustor pressure loss coefficient (default: 0.04)
    #[serde(default = "default_burner_loss")]
    pub burner: f64,
    /// Turbine mechanical loss coefficient (default: 0.02)
    #[serde(default = "default_turbine_loss")]
    pub turbine: f64,
    /// Nozzle velocity loss coefficient (default: 0.01)
    #[serde(default = "default_nozzle_loss")]
    pub nozzle: f64,
}

fn default_inlet_loss() -> f64 { crate::types::DEFAULT_INLET_LOSS }
fn default_burner_loss() -> f64 { crate::types::DEFAULT_BURNER_LOSS }
fn default_turbine_loss() -> f64 { crate::types::DEFAULT_TURBINE_MECH_LOSS }
fn default_nozzle_loss() -> f64 { crate::types::DEFAULT_NOZZLE_LOSS }

impl Default for Losses {
    fn default() -> Self {
        Self {
            inlet: default_inlet_loss(),
            burner: default_burner_loss(),
            turbine: default_turbine_loss(),
            nozzle: default_nozzle_loss(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Degradation {
    /// Compressor efficiency multiplier (1.0 = nominal, <1.0 = degraded)
    #[serde(default = "default_one")]
    pub eta_comp_factor: f64,
    /// Turbine efficiency multiplier (1.0 = nominal, <1.0 = degraded)
    #[serde(default = "default_one")]
    pub eta_turb_factor: f64,
    /// Additional pressure loss coefficient
    #[serde(default)]
    pub loss_adder: f64,
    #[serde(default)]
    pub scenario_name: String,
}

fn default_one() -> f64 { 1.0 }

impl Default for Degradation {
    fn default() -> Self {
        Self {
            eta_comp_factor: 1.0,
            eta_turb_factor: 1.0,
            loss_adder: 0.0,
            scenario_name: "nominal".to_string(),
        }
    }
}

impl Degradation {
    fn named(name: &str, eta_comp_factor: f64, eta_turb_factor: f64, loss_adder: f64) -> Self {
        Self {
            eta_comp_factor,
            eta_turb_factor,
            loss_adder,
            scenario_name: name.to_string(),
        }
    }

    /// 5% compressor efficiency loss, +1% pressure loss
    pub fn light() -> Self {
        Self::named("light", 0.95, 0.97, 0.01)
    }

    /// 10% compressor efficiency loss, +2% pressure loss
    pub fn moderate() -> Self {
        Self::named("moderate", 0.90, 0.94, 0.02)
    }

    /// 15% compressor efficiency loss, +3% pressure loss
    pub fn severe() -> Self {
        Self::named("severe", 0.85, 0.91, 0.03)
    }

    /// Preset by level name; `custom` takes the configured section (or
    /// nominal when absent).
    pub fn for_level(level: &str, configured: Option<&Degradation>) -> Result<Self, CycleError> {
        match level {
            "light" => Ok(Self::light()),
            "moderate" => Ok(Self::moderate()),
            "severe" => Ok(Self::severe()),
            "custom" => Ok(configured.cloned().unwrap_or_default()),
            other => Err(CycleError::UnknownDegradationLevel(other.to_string())),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.eta_comp_factor < 1.0 || self.eta_turb_factor < 1.0 || self.loss_adder > 0.0
    }
}

impl Root {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse config")
    }

    /// Reads, parses and validates a configuration file. Returns the parsed
    /// configuration together with its raw text (hashed into manifests).
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, String)> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg = Self::from_toml(&text)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        cfg.validate()?;
        Ok((cfg, text))
    }

    pub fn validate(&self) -> Result<()> {
        if self.program.name != "CSTNSystems" {
            bail!("program.name must be CSTNSystems");
        }
        if self.solver.max_iter <= 0 || self.solver.max_iter > 10_000 {
            bail!("solver.max_iter must be in [1, 10000]");
        }
        if !(0.0 < self.solver.damping && self.solver.damping <= 1.0) {
            bail!("solver.damping must be in (0, 1]");
        }
        if self.solver.tol <= 0.0 {
            bail!("solver.tol must be positive");
        }
        if self.constraints.t4_max <= 0.0 {
            bail!("constraints.t4_max must be positive");
        }
        if !(0.0..=0.95).contains(&self.cycle.mach) {
            bail!("cycle.mach must be in [0, 0.95]");
        }
        if !(0.0..=20.0).contains(&self.cycle.alt_km) {
            bail!("cycle.alt_km must be in [0, 20]");
        }
        if !(0.0..=1.0).contains(&self.cycle.eta_comp) {
            bail!("cycle.eta_comp must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.cycle.eta_turb) {
            bail!("cycle.eta_turb must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.cycle.eta_nozz) {
            bail!("cycle.eta_nozz must be in [0, 1]");
        }

        if let Some(ref sweep) = self.sweep {
            if sweep.bpr_n == 0 || sweep.opr_n == 0 {
                bail!("sweep.bpr_n and sweep.opr_n must be >= 1");
            }
            if sweep.bpr_min > sweep.bpr_max {
                bail!("sweep.bpr_min must be <= sweep.bpr_max");
            }
            if sweep.opr_min > sweep.opr_max {
                bail!("sweep.opr_min must be <= sweep.opr_max");
            }
        }

        if let Some(ref losses) = self.losses {
            for (name, value) in [
                ("inlet", losses.inlet),
                ("burner", losses.burner),
                ("turbine", losses.turbine),
                ("nozzle", losses.nozzle),
            ] {
                if !(0.0..=0.5).contains(&value) {
                    bail!("losses.{} must be in [0, 0.5]", name);
                }
            }
        }

        if let Some(ref deg) = self.degradation {
            if !(0.5..=1.0).contains(&deg.eta_comp_factor) {
                bail!("degradation.eta_comp_factor must be in [0.5, 1.0]");
            }
            if !(0.5..=1.0).contains(&deg.eta_turb_factor) {
                bail!("degradation.eta_turb_factor must be in [0.5, 1.0]");
            }
            if !(0.0..=0.2).contains(&deg.loss_adder) {
                bail!("degradation.loss_adder must be in [0, 0.2]");
            }
        }

        Ok(())
    }

    /// The configured design point; required by single-point commands.
    pub fn design_point(&self) -> Result<(f64, f64)> {
        let bpr = self.cycle.bpr.context("cycle.bpr required")?;
        let opr = self.cycle.opr.context("cycle.opr required")?;
        Ok((bpr, opr))
    }

    pub fn input(&self, bpr: f64, opr: f64) -> CycleInput {
        CycleInput {
            mach: self.cycle.mach,
            alt_km: self.cycle.alt_km,
            bpr,
            opr,
            eta_comp: self.cycle.eta_comp,
            eta_turb: self.cycle.eta_turb,
            eta_nozz: self.cycle.eta_nozz,
            fuel_k: self.cycle.fuel_k,
            max_iter: self.solver.max_iter,
            tol: self.solver.tol,
            damping: self.solver.damping,
            mass_tol: self.invariants.mass_tol,
            energy_tol: self.invariants.energy_tol,
            t4_max: self.constraints.t4_max,
        }
    }

    /// Extended input with the configured models, losses and degradation.
    pub fn input_ext(&self, bpr: f64, opr: f64) -> ExtendedCycleInput {
        let mut ext = ExtendedCycleInput::from_base(&self.input(bpr, opr));

        if let Some(ref comp) = self.components {
            ext = ext.with_models(comp.compressor, comp.turbine, comp.nozzle);
        }

        if let Some(ref losses) = self.losses {
            ext.inlet_loss = losses.inlet;
            ext.burner_loss = losses.burner;
            ext.turbine_mech_loss = losses.turbine;
            ext.nozzle_loss = losses.nozzle;
        }

        if let Some(ref deg) = self.degradation {
            ext.eta_comp_factor = deg.eta_comp_factor;
            ext.eta_turb_factor = deg.eta_turb_factor;
            ext.loss_adder = deg.loss_adder;
            ext.is_degraded = deg.is_degraded();
        }

        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASELINE: &str = include_str!("../configs/baseline.toml");

    #[test]
    fn test_baseline_config_parses() {
        let cfg = Root::from_toml(BASELINE).unwrap();
        cfg.validate().unwrap();
        let (bpr, opr) = cfg.design_point().unwrap();
        let inp = cfg.input(bpr, opr);
        assert_eq!(inp.mach, 0.65);
        assert_eq!(inp.max_iter, 64);
        assert_eq!(inp.t4_max, 1400.0);
    }

    #[test]
    fn test_rejects_bad_damping() {
        let mut cfg = Root::from_toml(BASELINE).unwrap();
        cfg.solver.damping = 0.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("damping"));
    }

    #[test]
    fn test_rejects_unknown_model() {
        let text = BASELINE.replace("compressor = \"standard\"", "compressor = \"exotic\"");
        assert!(Root::from_toml(&text).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_loss() {
        let mut cfg = Root::from_toml(BASELINE).unwrap();
        cfg.losses = Some(Losses { burner: 0.8, ..Losses::default() });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("losses.burner"));
    }

    #[test]
    fn test_sweep_points() {
        let sweep = Sweep {
            bpr_min: 0.2,
            bpr_max: 1.0,
            bpr_n: 3,
            opr_min: 6.0,
            opr_max: 6.0,
            opr_n: 1,
        };
        let pts = sweep.points();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[0], (0, 0, 0.2, 6.0));
        assert!((pts[1].2 - 0.6).abs() < 1e-12);
        assert_eq!(pts[2].2, 1.0);
    }

    #[test]
    fn test_degradation_levels() {
        assert_eq!(Degradation::for_level("moderate", None).unwrap().eta_comp_factor, 0.90);
        assert!(!Degradation::for_level("custom", None).unwrap().is_degraded());
        assert!(matches!(
            Degradation::for_level("catastrophic", None),
            Err(CycleError::UnknownDegradationLevel(_))
        ));
    }

    #[test]
    fn test_extended_input_from_config() {
        let cfg = Root::from_toml(BASELINE).unwrap();
        let ext = cfg.input_ext(0.6, 8.0);
        assert_eq!(ext.compressor_model, ComponentModel::Standard);
        assert_eq!(ext.burner_loss, 0.04);
        assert!(!ext.is_degraded);
    }
}
