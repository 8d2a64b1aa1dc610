use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use minotaur_core::config::{self, Degradation};
use minotaur_core::manifest::{self, Manifest, ResultBundle};
use minotaur_core::types::{JACOBIAN_OUTPUTS, JACOBIAN_PARAMS, SCHEMA_VERSION, SOLVER_VERSION};
use minotaur_core::{ad, io, AdInput, CycleOutput, Seed};

#[derive(Parser, Debug)]
#[command(name = "minotaur")]
#[command(author = "CSTNSystems")]
#[command(version)]
#[command(about = "CSTNSystems/MINOTAUR - Deterministic reduced-order turbofan cycle solver")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output path (CSV; JSON files are written next to it)
    #[arg(short, long, global = true)]
    out: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve the configured design point
    Run {
        /// Also write a JSON result bundle with convergence history
        #[arg(long)]
        json: bool,
    },
    /// Solve every point of the [sweep] grid
    Sweep {
        /// Also write a JSON sweep summary
        #[arg(long)]
        json: bool,
    },
    /// Central finite-difference sensitivities of the scalar solver
    Sensitivity {
        /// Relative step size
        #[arg(long, default_value = "1e-6")]
        step: f64,
    },
    /// Compare nominal vs degraded extended solves
    Compare {
        /// Degradation level: light, moderate, severe, or custom
        #[arg(long, default_value = "moderate")]
        level: String,
        /// Also write JSON output
        #[arg(long)]
        json: bool,
    },
    /// Exact 6x3 Jacobian via forward-mode AD
    Jacobian {
        /// Also write JSON output
        #[arg(long)]
        json: bool,
    },
    /// Value and exact derivative of the proxies for one parameter
    Gradient {
        /// mach, alt_km, bpr, opr, eta_comp or eta_turb
        #[arg(long)]
        param: String,
    },
    /// Validate a configuration file
    Validate,
    /// Print version information
    Version,
}

#[derive(Serialize)]
struct SweepSummary {
    manifest: Manifest,
    total_runs: usize,
    converged_runs: usize,
    convergence_rate: f64,
    status_counts: BTreeMap<String, usize>,
    wall_time_ms: f64,
    parameter_ranges: ParameterRanges,
}

#[derive(Serialize)]
struct ParameterRanges {
    bpr: (f64, f64, usize),
    opr: (f64, f64, usize),
}

#[derive(Serialize)]
struct SensitivityOutput {
    manifest: Manifest,
    method: String,
    parameters: Vec<String>,
    outputs: Vec<String>,
    jacobian: Vec<[f64; 4]>,
    step_sizes: BTreeMap<String, f64>,
    base_values: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct JacobianOutput {
    manifest: Manifest,
    method: String,
    parameters: Vec<String>,
    outputs: Vec<String>,
    jacobian: Vec<[f64; 3]>,
    base_values: BTreeMap<String, f64>,
    status: i32,
    status_name: String,
}

#[derive(Serialize)]
struct ComparisonOutput {
    manifest: Manifest,
    level: String,
    degradation: Degradation,
    result: minotaur_core::ComparisonResult,
}

fn json_path(out_path: &str, suffix: &str) -> String {
    match out_path.strip_suffix(".csv") {
        Some(stem) => format!("{}{}.json", stem, suffix),
        None => format!("{}{}.json", out_path, suffix),
    }
}

fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write: {}", path))?;
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<(config::Root, String)> {
    let path = path.context("--config required")?;
    let (cfg, text) = config::Root::load(path)?;
    info!(
        program = %cfg.program.name,
        module = %cfg.program.module,
        version = %cfg.program.version,
        "loaded {}",
        path
    );
    Ok((cfg, text))
}

fn log_outcome(label: &str, out: &CycleOutput) {
    info!(
        "{}: status={} ({}) iter={} residual={:.2e} t4={:.1} tsfc={:.4} thrust={:.4}",
        label,
        out.status.code(),
        out.status.name(),
        out.iter,
        out.final_residual,
        out.t4,
        out.tsfc_proxy,
        out.thrust_proxy
    );
}

fn run_single(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let (bpr, opr) = cfg.design_point()?;
    let inp = cfg.input(bpr, opr);

    let start = Instant::now();
    let (out, diag) = minotaur_core::solve(&inp);
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut w = io::CsvWriter::create(out_path)?;
    w.write_header()?;
    w.write_row("baseline", bpr, opr, cfg.cycle.mach, cfg.cycle.alt_km, &out)?;
    w.flush()?;
    log_outcome("baseline", &out);

    if json_output {
        let path = json_path(out_path, "");
        let bundle = ResultBundle {
            manifest: manifest::create_manifest(cfg, cfg_text),
            summary: manifest::create_summary(&out, wall_time_ms),
            convergence: Some(manifest::create_convergence(&out, &diag, opr)),
        };
        write_json(&path, &bundle)?;
        info!("JSON bundle: {}", path);
    }

    if !out.status.is_ok() {
        warn!(status = out.status.name(), "solver did not converge");
    }
    Ok(())
}

fn run_sweep(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let sweep = cfg.sweep.as_ref().context("[sweep] section required for sweep")?;

    let start = Instant::now();
    // Indexed parallel collect keeps grid order.
    let results: Vec<_> = sweep
        .points()
        .into_par_iter()
        .map(|(i, j, bpr, opr)| {
            let (out, _) = minotaur_core::solve(&cfg.input(bpr, opr));
            (i, j, bpr, opr, out)
        })
        .collect();
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut w = io::CsvWriter::create(out_path)?;
    w.write_header()?;
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    for (i, j, bpr, opr, out) in &results {
        let case = format!("sweep_{:04}_{:04}", i, j);
        w.write_row(&case, *bpr, *opr, cfg.cycle.mach, cfg.cycle.alt_km, out)?;
        *status_counts.entry(out.status.name().to_string()).or_default() += 1;
    }
    w.flush()?;

    let total = results.len();
    let converged = status_counts.get("OK").copied().unwrap_or(0);
    let rate = if total > 0 { converged as f64 / total as f64 } else { 0.0 };
    info!(
        "sweep complete: {}/{} converged ({:.1}%) in {:.1}ms",
        converged,
        total,
        100.0 * rate,
        wall_time_ms
    );

    if json_output {
        let path = json_path(out_path, "_summary");
        let summary = SweepSummary {
            manifest: manifest::create_manifest(cfg, cfg_text),
            total_runs: total,
            converged_runs: converged,
            convergence_rate: rate,
            status_counts,
            wall_time_ms,
            parameter_ranges: ParameterRanges {
                bpr: (sweep.bpr_min, sweep.bpr_max, sweep.bpr_n),
                opr: (sweep.opr_min, sweep.opr_max, sweep.opr_n),
            },
        };
        write_json(&path, &summary)?;
        info!("JSON summary: {}", path);
    }
    Ok(())
}

fn run_sensitivity(cfg: &config::Root, cfg_text: &str, out_path: &str, step: f64) -> Result<()> {
    let (bpr, opr) = cfg.design_point()?;
    let base = cfg.input(bpr, opr);
    let (out_base, _) = minotaur_core::solve(&base);
    if !out_base.status.is_ok() {
        anyhow::bail!(
            "base configuration does not converge (status={})",
            out_base.status.name()
        );
    }

    let mut base_values = BTreeMap::new();
    base_values.insert("tsfc_proxy".to_string(), out_base.tsfc_proxy);
    base_values.insert("thrust_proxy".to_string(), out_base.thrust_proxy);
    base_values.insert("t4".to_string(), out_base.t4);
    base_values.insert("iterations".to_string(), out_base.iter as f64);

    let mut step_sizes = BTreeMap::new();
    let mut rows = Vec::with_capacity(Seed::ALL.len());
    for seed in Seed::ALL {
        let val = base.get(seed);
        let h = val.abs().max(1.0) * step;
        let plus = base.with(seed, val + h);
        let minus = base.with(seed, val - h);
        let (op, _) = minotaur_core::solve(&plus);
        let (om, _) = minotaur_core::solve(&minus);

        let two_h = 2.0 * h;
        rows.push([
            (op.tsfc_proxy - om.tsfc_proxy) / two_h,
            (op.thrust_proxy - om.thrust_proxy) / two_h,
            (op.t4 - om.t4) / two_h,
            (op.iter - om.iter) as f64 / two_h,
        ]);
        step_sizes.insert(seed.name().to_string(), h);
        base_values.insert(seed.name().to_string(), val);
    }

    let mut w = io::create(out_path)?;
    io::write_sensitivities(&mut w, &JACOBIAN_PARAMS, &rows)?;
    w.flush()?;

    let path = json_path(out_path, "");
    let sens = SensitivityOutput {
        manifest: manifest::create_manifest(cfg, cfg_text),
        method: "central finite differences".to_string(),
        parameters: JACOBIAN_PARAMS.iter().map(|s| s.to_string()).collect(),
        outputs: ["tsfc_proxy", "thrust_proxy", "t4", "iterations"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        jacobian: rows,
        step_sizes,
        base_values,
    };
    write_json(&path, &sens)?;

    info!("sensitivity analysis complete: CSV {} JSON {}", out_path, path);
    Ok(())
}

fn run_compare(cfg: &config::Root, cfg_text: &str, out_path: &str, level: &str, json_output: bool) -> Result<()> {
    let (bpr, opr) = cfg.design_point()?;
    let degradation = Degradation::for_level(level, cfg.degradation.as_ref())?;
    let nominal = cfg.input_ext(bpr, opr);

    let cmp = minotaur_core::compare_degradation(
        &nominal,
        degradation.eta_comp_factor,
        degradation.eta_turb_factor,
        degradation.loss_adder,
    );

    let mut w = io::create(out_path)?;
    io::write_comparison(&mut w, level, &cmp)?;
    w.flush()?;

    info!("comparison complete ({} degradation)", level);
    log_outcome("nominal", &cmp.nominal);
    log_outcome("degraded", &cmp.degraded);
    info!(
        "delta: TSFC={:+.2}% Thrust={:+.2}% T4={:+.1}K iter={:+}",
        cmp.tsfc_change_pct, cmp.thrust_change_pct, cmp.t4_change_k, cmp.iter_change
    );
    if !cmp.degraded.status.is_ok() {
        warn!(status = cmp.degraded.status.name(), "degraded case did not converge");
    }

    if json_output {
        let path = json_path(out_path, "");
        let output = ComparisonOutput {
            manifest: manifest::create_manifest(cfg, cfg_text),
            level: level.to_string(),
            degradation,
            result: cmp,
        };
        write_json(&path, &output)?;
        info!("JSON comparison: {}", path);
    }
    Ok(())
}

fn run_jacobian(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let (bpr, opr) = cfg.design_point()?;

    let start = Instant::now();
    let result = minotaur_core::jacobian(
        cfg.cycle.mach,
        cfg.cycle.alt_km,
        bpr,
        opr,
        cfg.cycle.eta_comp,
        cfg.cycle.eta_turb,
        cfg.constraints.t4_max,
    );
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut w = io::create(out_path)?;
    io::write_jacobian(&mut w, &result)?;
    w.flush()?;

    info!(
        "Jacobian via forward-mode AD: tsfc={:.4} thrust={:.4} t4={:.1}K status={} in {:.2}ms",
        result.base_tsfc,
        result.base_thrust,
        result.base_t4,
        result.status.name(),
        wall_time_ms
    );
    if !result.status.is_ok() {
        warn!(status = result.status.name(), "some Jacobian rows were not evaluated");
    }

    if json_output {
        let path = json_path(out_path, "");
        let mut base_values = BTreeMap::new();
        base_values.insert("tsfc".to_string(), result.base_tsfc);
        base_values.insert("thrust".to_string(), result.base_thrust);
        base_values.insert("t4".to_string(), result.base_t4);
        for (name, value) in JACOBIAN_PARAMS.iter().zip([
            cfg.cycle.mach,
            cfg.cycle.alt_km,
            bpr,
            opr,
            cfg.cycle.eta_comp,
            cfg.cycle.eta_turb,
        ]) {
            base_values.insert(name.to_string(), value);
        }

        let output = JacobianOutput {
            manifest: manifest::create_manifest(cfg, cfg_text),
            method: "forward-mode AD (dual numbers)".to_string(),
            parameters: JACOBIAN_PARAMS.iter().map(|s| s.to_string()).collect(),
            outputs: JACOBIAN_OUTPUTS.iter().map(|s| s.to_string()).collect(),
            jacobian: result.jacobian.to_vec(),
            base_values,
            status: result.status.code(),
            status_name: result.status.name().to_string(),
        };
        write_json(&path, &output)?;
        info!("JSON jacobian: {}", path);
    }
    Ok(())
}

fn run_gradient(cfg: &config::Root, param: &str) -> Result<()> {
    let seed: Seed = param.parse()?;
    let (bpr, opr) = cfg.design_point()?;
    let inp = AdInput::from_cycle(&cfg.input(bpr, opr));
    let r = ad::differentiate(&inp, seed);

    println!("parameter: {} = {}", seed.name(), inp.get(seed));
    println!("status:    {} ({})", r.status.code(), r.status.name());
    println!("{:8} {:>14} {:>14}", "output", "value", "derivative");
    println!("{:8} {:>14.6} {:>14.6e}", "tsfc", r.tsfc_val, r.tsfc_der);
    println!("{:8} {:>14.6} {:>14.6e}", "thrust", r.thrust_val, r.thrust_der);
    println!("{:8} {:>14.3} {:>14.6e}", "t4", r.t4_val, r.t4_der);

    if !r.status.is_ok() {
        warn!(status = r.status.name(), "gradient evaluation did not complete");
    }
    Ok(())
}

fn validate_config(cfg: &config::Root) {
    info!(
        "solver: max_iter={}, tol={:.0e}, damping={}",
        cfg.solver.max_iter, cfg.solver.tol, cfg.solver.damping
    );
    info!(
        "cycle: mach={}, alt_km={}, bpr={:?}, opr={:?}",
        cfg.cycle.mach, cfg.cycle.alt_km, cfg.cycle.bpr, cfg.cycle.opr
    );
    if let Some(sweep) = &cfg.sweep {
        info!(
            "sweep: bpr=[{},{}]x{}, opr=[{},{}]x{}",
            sweep.bpr_min, sweep.bpr_max, sweep.bpr_n, sweep.opr_min, sweep.opr_max, sweep.opr_n
        );
    }
    if let Some(comp) = &cfg.components {
        info!(
            "components: compressor={}, turbine={}, nozzle={}",
            comp.compressor.name(),
            comp.turbine.name(),
            comp.nozzle.name()
        );
    }
    if let Some(deg) = &cfg.degradation {
        info!(
            "degradation: eta_comp_factor={}, eta_turb_factor={}, loss_adder={}",
            deg.eta_comp_factor, deg.eta_turb_factor, deg.loss_adder
        );
    }
    info!("config valid");
}

fn print_version() {
    println!("MINOTAUR - CSTNSystems Deterministic Reduced-Order Turbofan Cycle Solver");
    println!();
    println!("  Program ID:      {}", manifest::PROGRAM_ID);
    println!("  Solver Version:  {}", SOLVER_VERSION);
    println!("  Schema Version:  {}", SCHEMA_VERSION);
    println!("  Platform:        {}", std::env::consts::OS);
    println!("  Architecture:    {}", std::env::consts::ARCH);
    println!();
    println!("Component models: standard, advanced");
    println!("Degradation levels: light, moderate, severe, custom");
    println!("Sensitivities: forward-mode AD (6 params x 3 outputs), central finite differences");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg_path = args.config.as_deref();

    match args.command {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Validate => {
            let (cfg, _) = load_config(cfg_path)?;
            validate_config(&cfg);
            Ok(())
        }
        Commands::Gradient { param } => {
            let (cfg, _) = load_config(cfg_path)?;
            run_gradient(&cfg, &param)
        }
        Commands::Run { json } => {
            let (cfg, text) = load_config(cfg_path)?;
            let out = args.out.unwrap_or_else(|| "results/out_baseline.csv".to_string());
            run_single(&cfg, &text, &out, json)
        }
        Commands::Sweep { json } => {
            let (cfg, text) = load_config(cfg_path)?;
            let out = args.out.unwrap_or_else(|| "results/out_sweep.csv".to_string());
            run_sweep(&cfg, &text, &out, json)
        }
        Commands::Sensitivity { step } => {
            let (cfg, text) = load_config(cfg_path)?;
            let out = args.out.unwrap_or_else(|| "results/sensitivities.csv".to_string());
            run_sensitivity(&cfg, &text, &out, step)
        }
        Commands::Compare { level, json } => {
            let (cfg, text) = load_config(cfg_path)?;
            let out = args.out.unwrap_or_else(|| "results/comparison.csv".to_string());
            run_compare(&cfg, &text, &out, &level, json)
        }
        Commands::Jacobian { json } => {
            let (cfg, text) = load_config(cfg_path)?;
            let out = args.out.unwrap_or_else(|| "results/jacobian.csv".to_string());
            run_jacobian(&cfg, &text, &out, json)
        }
    }
}
