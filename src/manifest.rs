//! JSON result bundles and their provenance manifest.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config;
use crate::types::{ConvergenceRecord, CycleOutput, Diagnostics, SCHEMA_VERSION, SOLVER_VERSION};

pub const PROGRAM_ID: &str = "CSTNSystems-MINOTAUR";

#[derive(Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub solver_version: String,
    pub program_id: String,
    pub timestamp_utc: String,
    pub git_commit: Option<String>,
    pub platform: String,
    pub config_hash: String,
    pub config_snapshot: config::Root,
}

#[derive(Serialize)]
pub struct Summary {
    pub status: i32,
    pub status_name: String,
    pub converged: bool,
    pub iterations: i32,
    pub final_residual: f64,
    pub mass_residual: f64,
    pub energy_residual: f64,
    pub t4: f64,
    pub tsfc_proxy: f64,
    pub thrust_proxy: f64,
    pub wall_time_ms: f64,
}

#[derive(Serialize)]
pub struct Convergence {
    pub history: Vec<ConvergenceRecord>,
    pub initial_residual: f64,
    pub best_residual: f64,
    pub line_search_steps: u32,
    pub last_admissible_bpr: f64,
    pub last_admissible_t4: f64,
    pub final_state: FinalState,
}

#[derive(Serialize)]
pub struct FinalState {
    pub bpr: f64,
    pub opr: f64,
    pub t4: f64,
}

#[derive(Serialize)]
pub struct ResultBundle {
    pub manifest: Manifest,
    pub summary: Summary,
    pub convergence: Option<Convergence>,
}

/// Hex SHA-256 of the raw configuration text.
pub fn config_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn create_manifest(cfg: &config::Root, cfg_text: &str) -> Manifest {
    Manifest {
        schema_version: SCHEMA_VERSION.to_string(),
        solver_version: SOLVER_VERSION.to_string(),
        program_id: PROGRAM_ID.to_string(),
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        git_commit: option_env!("MINOTAUR_GIT_COMMIT").map(str::to_string),
        platform: std::env::consts::OS.to_string(),
        config_hash: config_hash(cfg_text),
        config_snapshot: cfg.clone(),
    }
}

pub fn create_summary(out: &CycleOutput, wall_time_ms: f64) -> Summary {
    Summary {
        status: out.status.code(),
        status_name: out.status.name().to_string(),
        converged: out.status.is_ok(),
        iterations: out.iter,
        final_residual: out.final_residual,
        mass_residual: out.mass_resid,
        energy_residual: out.energy_resid,
        t4: out.t4,
        tsfc_proxy: out.tsfc_proxy,
        thrust_proxy: out.thrust_proxy,
        wall_time_ms,
    }
}

pub fn create_convergence(out: &CycleOutput, diag: &Diagnostics, opr: f64) -> Convergence {
    Convergence {
        history: diag.history.clone(),
        initial_residual: diag.initial_residual,
        best_residual: diag.best_residual,
        line_search_steps: diag.line_search_steps,
        last_admissible_bpr: diag.last_admissible_bpr,
        last_admissible_t4: diag.last_admissible_t4,
        final_state: FinalState {
            bpr: out.final_bpr,
            opr,
            t4: out.t4,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_hash_stable() {
        let a = config_hash("[solver]\nmax_iter = 64\n");
        let b = config_hash("[solver]\nmax_iter = 64\n");
        let c = config_hash("[solver]\nmax_iter = 65\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
