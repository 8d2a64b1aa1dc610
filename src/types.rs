use serde::{Deserialize, Serialize};

use crate::error::CycleError;

pub const MAX_HISTORY: usize = 256;

pub const SCHEMA_VERSION: &str = "1.0.0";
pub const SOLVER_VERSION: &str = "3.0.0";

/// Solve outcome. Every exit path of the core reports one of these; nothing
/// is signalled through panics or `Err`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok = 0,
    MaxIterReached = 1,
    Diverged = 2,
    InvariantViolated = 3,
    ConstraintViolated = 4,
    NonPhysical = 5,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::MaxIterReached => "MAXITER",
            Status::Diverged => "DIVERGED",
            Status::InvariantViolated => "INVARIANT_VIOL",
            Status::ConstraintViolated => "CONSTRAINT_VIOL",
            Status::NonPhysical => "NONPHYSICAL",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl TryFrom<i32> for Status {
    type Error = CycleError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::MaxIterReached),
            2 => Ok(Status::Diverged),
            3 => Ok(Status::InvariantViolated),
            4 => Ok(Status::ConstraintViolated),
            5 => Ok(Status::NonPhysical),
            _ => Err(CycleError::UnknownStatus(code)),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Component formulation selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentModel {
    #[default]
    Standard,
    Advanced,
}

impl ComponentModel {
    pub fn name(self) -> &'static str {
        match self {
            ComponentModel::Standard => "standard",
            ComponentModel::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for ComponentModel {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ComponentModel::Standard),
            "advanced" => Ok(ComponentModel::Advanced),
            other => Err(CycleError::UnknownModel(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleInput {
    pub mach: f64,
    pub alt_km: f64,
    pub bpr: f64,
    pub opr: f64,
    pub eta_comp: f64,
    pub eta_turb: f64,
    pub eta_nozz: f64,
    pub fuel_k: f64,
    pub max_iter: i32,
    pub tol: f64,
    pub damping: f64,
    pub mass_tol: f64,
    pub energy_tol: f64,
    pub t4_max: f64,
}

impl CycleInput {
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

    /// Copy with the parameter selected by `seed` set to `value`.
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
}

/// Base input plus component model selection, loss coefficients and
/// degradation factors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedCycleInput {
    pub base: CycleInput,
    pub compressor_model: ComponentModel,
    pub turbine_model: ComponentModel,
    pub nozzle_model: ComponentModel,
    pub inlet_loss: f64,
    pub burner_loss: f64,
    pub turbine_mech_loss: f64,
    pub nozzle_loss: f64,
    /// Compressor efficiency multiplier (1.0 = nominal)
    pub eta_comp_factor: f64,
    /// Turbine efficiency multiplier (1.0 = nominal)
    pub eta_turb_factor: f64,
    pub loss_adder: f64,
    pub is_degraded: bool,
}

pub const DEFAULT_INLET_LOSS: f64 = 0.02;
pub const DEFAULT_BURNER_LOSS: f64 = 0.04;
pub const DEFAULT_TURBINE_MECH_LOSS: f64 = 0.02;
pub const DEFAULT_NOZZLE_LOSS: f64 = 0.01;

impl ExtendedCycleInput {
    /// Standard models, default losses, no degradation.
    pub fn from_base(inp: &CycleInput) -> Self {
        Self {
            base: *inp,
            compressor_model: ComponentModel::Standard,
            turbine_model: ComponentModel::Standard,
            nozzle_model: ComponentModel::Standard,
            inlet_loss: DEFAULT_INLET_LOSS,
            burner_loss: DEFAULT_BURNER_LOSS,
            turbine_mech_loss: DEFAULT_TURBINE_MECH_LOSS,
            nozzle_loss: DEFAULT_NOZZLE_LOSS,
            eta_comp_factor: 1.0,
            eta_turb_factor: 1.0,
            loss_adder: 0.0,
            is_degraded: false,
        }
    }

    pub fn with_degradation(&self, eta_comp_factor: f64, eta_turb_factor: f64, loss_adder: f64) -> Self {
        Self {
            eta_comp_factor,
            eta_turb_factor,
            loss_adder,
            is_degraded: true,
            ..*self
        }
    }

    pub fn with_models(
        &self,
        compressor: ComponentModel,
        turbine: ComponentModel,
        nozzle: ComponentModel,
    ) -> Self {
        Self {
            compressor_model: compressor,
            turbine_model: turbine,
            nozzle_model: nozzle,
            ..*self
        }
    }
}

impl From<CycleInput> for ExtendedCycleInput {
    fn from(inp: CycleInput) -> Self {
        Self::from_base(&inp)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CycleOutput {
    pub status: Status,
    pub iter: i32,
    pub mass_resid: f64,
    pub energy_resid: f64,
    pub t4: f64,
    pub tsfc_proxy: f64,
    pub thrust_proxy: f64,
    pub final_bpr: f64,
    pub final_residual: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ConvergenceRecord {
    pub iteration: i32,
    pub residual_norm: f64,
    pub bpr: f64,
    pub t4: f64,
    /// Step length accepted on the previous iteration (0 before the first step).
    pub step_size: f64,
    pub admissible: bool,
}

/// Per-solve diagnostics. History is capped at [`MAX_HISTORY`] records;
/// later records are dropped silently.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub history: Vec<ConvergenceRecord>,
    pub last_admissible_bpr: f64,
    pub last_admissible_t4: f64,
    pub line_search_steps: u32,
    pub initial_residual: f64,
    pub best_residual: f64,
}

impl Diagnostics {
    pub fn record(&mut self, rec: ConvergenceRecord) {
        if self.history.len() < MAX_HISTORY {
            self.history.push(rec);
        }
    }
}

/// Parameter selector for forward-mode seeding (1-based, matching the
/// Jacobian row order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seed {
    Mach = 1,
    AltKm = 2,
    Bpr = 3,
    Opr = 4,
    EtaComp = 5,
    EtaTurb = 6,
}

impl Seed {
    pub const ALL: [Seed; 6] = [
        Seed::Mach,
        Seed::AltKm,
        Seed::Bpr,
        Seed::Opr,
        Seed::EtaComp,
        Seed::EtaTurb,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    /// Zero-based Jacobian row.
    pub fn row(self) -> usize {
        self as usize - 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Seed::Mach => "mach",
            Seed::AltKm => "alt_km",
            Seed::Bpr => "bpr",
            Seed::Opr => "opr",
            Seed::EtaComp => "eta_comp",
            Seed::EtaTurb => "eta_turb",
        }
    }
}

impl TryFrom<i32> for Seed {
    type Error = CycleError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        Seed::ALL
            .iter()
            .copied()
            .find(|s| s.index() == index)
            .ok_or(CycleError::UnknownSeed(index))
    }
}

impl std::str::FromStr for Seed {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Seed::ALL
            .iter()
            .copied()
            .find(|seed| seed.name() == s)
            .ok_or_else(|| CycleError::UnknownParameter(s.to_string()))
    }
}

/// Single-seed forward-mode result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdResult {
    pub tsfc_val: f64,
    pub tsfc_der: f64,
    pub thrust_val: f64,
    pub thrust_der: f64,
    pub t4_val: f64,
    pub t4_der: f64,
    pub status: Status,
}

pub const JACOBIAN_PARAMS: [&str; 6] = ["mach", "alt_km", "bpr", "opr", "eta_comp", "eta_turb"];
pub const JACOBIAN_OUTPUTS: [&str; 3] = ["tsfc", "thrust", "t4"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JacobianResult {
    /// Rows follow [`JACOBIAN_PARAMS`], columns follow [`JACOBIAN_OUTPUTS`].
    pub jacobian: [[f64; 3]; 6],
    pub base_tsfc: f64,
    pub base_thrust: f64,
    pub base_t4: f64,
    pub status: Status,
}

impl Default for JacobianResult {
    fn default() -> Self {
        Self {
            jacobian: [[0.0; 3]; 6],
            base_tsfc: 0.0,
            base_thrust: 0.0,
            base_t4: 0.0,
            status: Status::Ok,
        }
    }
}
