//! Damped-Newton equilibrium solver with Armijo backtracking.
//!
//! The iteration runs on the bypass ratio. Each iteration first records the
//! pre-step state, then checks the exit gates in a fixed order
//! (converged, non-finite, thermal ceiling, divergence) before taking a
//! damped step. Every exit funnels through [`finalize`], which evaluates the
//! performance proxies and the invariant gate. A converged exit whose proxies
//! are not finite is reported as [`Status::NonPhysical`].

use tracing::{debug, trace};

use crate::invariants;
use crate::model;
use crate::types::{ConvergenceRecord, CycleInput, CycleOutput, Diagnostics, Status};

/// Armijo sufficient-decrease constant.
pub const ARMIJO_C: f64 = 1e-4;
/// Backtracking contraction factor.
pub const LINE_SEARCH_RHO: f64 = 0.5;
/// Line-search trials per iteration.
pub const LINE_SEARCH_MAX_TRIALS: u32 = 10;
/// Iterations before the divergence gate is armed.
pub const DIVERGENCE_MIN_ITER: i32 = 10;
/// Growth of |R| over its initial value that counts as divergence.
pub const DIVERGENCE_FACTOR: f64 = 10.0;

#[derive(Clone, Copy, Debug)]
struct State {
    bpr: f64,
    resid: f64,
    t4: f64,
}

#[derive(Clone, Copy, Debug)]
struct LineSearchStep {
    state: State,
    alpha: f64,
    trials: u32,
}

/// Solves for the equilibrium bypass ratio of `inp`.
///
/// Never panics and never returns an error: the outcome is carried by
/// [`CycleOutput::status`]. Identical inputs give bit-identical outputs.
pub fn solve(inp: &CycleInput) -> (CycleOutput, Diagnostics) {
    let t4 = model::input_t4(inp);
    let mut state = State {
        bpr: inp.bpr,
        resid: model::residual(inp.bpr, inp.opr),
        t4,
    };

    let r0 = state.resid.abs();
    let mut diag = Diagnostics {
        initial_residual: r0,
        best_residual: r0,
        ..Diagnostics::default()
    };

    let mut last_alpha = 0.0;
    let mut exit = None;

    for k in 1..=inp.max_iter {
        let r_abs = state.resid.abs();
        let admissible = model::is_admissible(state.bpr, state.t4, inp.t4_max);
        diag.record(ConvergenceRecord {
            iteration: k,
            residual_norm: r_abs,
            bpr: state.bpr,
            t4: state.t4,
            step_size: last_alpha,
            admissible,
        });
        if admissible {
            diag.last_admissible_bpr = state.bpr;
            diag.last_admissible_t4 = state.t4;
        }
        trace!(iter = k, residual = r_abs, bpr = state.bpr, t4 = state.t4, admissible, "newton iterate");

        if r_abs < inp.tol {
            exit = Some((Status::Ok, k));
            break;
        }
        if !model::is_finite_value(state.resid) || !model::is_finite_value(state.t4) {
            exit = Some((Status::NonPhysical, k));
            break;
        }
        if state.t4 > inp.t4_max {
            exit = Some((Status::ConstraintViolated, k));
            break;
        }
        if k > DIVERGENCE_MIN_ITER && r_abs > DIVERGENCE_FACTOR * r0 {
            exit = Some((Status::Diverged, k));
            break;
        }

        let direction = -inp.damping * state.resid;
        let step = line_search(inp, &state, direction);
        diag.line_search_steps += step.trials;

        state = step.state;
        last_alpha = step.alpha;
        diag.best_residual = diag.best_residual.min(state.resid.abs());
    }

    let (status, iter) = exit.unwrap_or((Status::MaxIterReached, inp.max_iter.max(0)));
    (finalize(inp, &state, status, iter), diag)
}

/// Armijo backtracking along `direction`. Trial points are projected onto the
/// admissible bypass interval before evaluation. If no trial satisfies the
/// sufficient-decrease test the last (shortest) trial is taken anyway.
fn line_search(inp: &CycleInput, state: &State, direction: f64) -> LineSearchStep {
    let r_abs = state.resid.abs();
    let mut alpha = 1.0;
    let mut trial = *state;

    for n in 1..=LINE_SEARCH_MAX_TRIALS {
        let bpr = model::project_bpr(state.bpr + alpha * direction);
        trial = State {
            bpr,
            resid: model::residual(bpr, inp.opr),
            t4: state.t4,
        };
        if trial.resid.abs() <= r_abs + ARMIJO_C * alpha * (-r_abs) {
            return LineSearchStep {
                state: trial,
                alpha,
                trials: n,
            };
        }
        if n < LINE_SEARCH_MAX_TRIALS {
            alpha *= LINE_SEARCH_RHO;
        }
    }

    LineSearchStep {
        state: trial,
        alpha,
        trials: LINE_SEARCH_MAX_TRIALS,
    }
}

fn finalize(inp: &CycleInput, state: &State, status: Status, iter: i32) -> CycleOutput {
    let thrust = model::thrust_proxy(inp, state.bpr, state.t4);
    let tsfc = model::tsfc_proxy(inp, state.bpr, state.t4, thrust);

    // A converged iterate whose proxies break down (zero turbine or nozzle
    // efficiency) is not a valid Ok.
    let status = if status == Status::Ok
        && !(model::is_finite_value(thrust) && model::is_finite_value(tsfc))
    {
        Status::NonPhysical
    } else {
        status
    };

    let inv = invariants::evaluate(state.bpr, inp.opr, state.t4, inp.t4_max);
    let status = if status == Status::Ok && inv.violated(inp.mass_tol, inp.energy_tol) {
        Status::InvariantViolated
    } else {
        status
    };

    debug!(
        status = status.name(),
        iter,
        residual = state.resid.abs(),
        bpr = state.bpr,
        t4 = state.t4,
        "solve finished"
    );

    CycleOutput {
        status,
        iter,
        mass_resid: inv.mass,
        energy_resid: inv.energy,
        t4: state.t4,
        tsfc_proxy: tsfc,
        thrust_proxy: thrust,
        final_bpr: state.bpr,
        final_residual: state.resid.abs(),
    }
}
