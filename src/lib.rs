//! MINOTAUR: deterministic reduced-order turbofan cycle solver.
//!
//! The core (`dual`, `components`, `model`, `invariants`, `solver`, `ad`,
//! `degradation`) is pure computation and reports every outcome through
//! [`Status`]. Configuration, CSV writers and JSON manifests sit on top.

pub mod ad;
pub mod components;
pub mod config;
pub mod degradation;
pub mod dual;
pub mod error;
pub mod invariants;
pub mod io;
pub mod manifest;
pub mod model;
pub mod solver;
pub mod types;

#[cfg(test)]
mod tests;

pub use ad::{differentiate, jacobian, jacobian_at, AdInput};
pub use degradation::{compare_degradation, solve_extended, ComparisonResult};
pub use dual::{Dual, Scalar};
pub use error::CycleError;
pub use solver::solve;
pub use types::{
    AdResult, ComponentModel, ConvergenceRecord, CycleInput, CycleOutput, Diagnostics,
    ExtendedCycleInput, JacobianResult, Seed, Status,
};
