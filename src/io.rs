use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::degradation::ComparisonResult;
use crate::types::{CycleOutput, JacobianResult, JACOBIAN_PARAMS};

/// Creates `path` (and its parent directory) for buffered writing.
pub fn create(path: &str) -> Result<BufWriter<File>> {
    if let Some(dir) = Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
    }
    let f = File::create(path).with_context(|| format!("failed to create: {}", path))?;
    Ok(BufWriter::new(f))
}

/// Per-case solver results, one row per operating point.
pub struct CsvWriter<W: Write> {
    w: W,
}

impl CsvWriter<BufWriter<File>> {
    pub fn create(path: &str) -> Result<Self> {
        Ok(Self { w: create(path)? })
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn write_header(&mut self) -> Result<()> {
        writeln!(
            self.w,
            "case,bpr,opr,mach,alt_km,status,converged,iter,mass_resid,energy_resid,final_residual,final_bpr,t4,tsfc_proxy,thrust_proxy"
        )?;
        Ok(())
    }

    pub fn write_row(
        &mut self,
        case: &str,
        bpr: f64,
        opr: f64,
        mach: f64,
        alt_km: f64,
        out: &CycleOutput,
    ) -> Result<()> {
        writeln!(
            self.w,
            "{},{:.6},{:.6},{:.4},{:.4},{},{},{},{:.6e},{:.6e},{:.6e},{:.6},{:.2},{:.6},{:.6}",
            case,
            bpr,
            opr,
            mach,
            alt_km,
            out.status.code(),
            out.status.is_ok(),
            out.iter,
            out.mass_resid,
            out.energy_resid,
            out.final_residual,
            out.final_bpr,
            out.t4,
            out.tsfc_proxy,
            out.thrust_proxy
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

pub fn write_jacobian<W: Write>(w: &mut W, result: &JacobianResult) -> Result<()> {
    writeln!(w, "parameter,d_tsfc,d_thrust,d_t4")?;
    for (param, row) in JACOBIAN_PARAMS.iter().zip(result.jacobian.iter()) {
        writeln!(w, "{},{:.8e},{:.8e},{:.8e}", param, row[0], row[1], row[2])?;
    }
    Ok(())
}

pub fn write_sensitivities<W: Write>(w: &mut W, params: &[&str], rows: &[[f64; 4]]) -> Result<()> {
    writeln!(w, "parameter,tsfc_proxy,thrust_proxy,t4,iterations")?;
    for (param, row) in params.iter().zip(rows.iter()) {
        writeln!(w, "{},{:.6e},{:.6e},{:.6e},{:.6e}", param, row[0], row[1], row[2], row[3])?;
    }
    Ok(())
}

pub fn write_comparison<W: Write>(w: &mut W, level: &str, cmp: &ComparisonResult) -> Result<()> {
    writeln!(w, "scenario,status,converged,iter,t4,tsfc_proxy,thrust_proxy,eta_comp_eff,eta_turb_eff")?;
    for (name, out, eff) in [
        ("nominal".to_string(), &cmp.nominal, &cmp.nominal_efficiencies),
        (format!("degraded_{}", level), &cmp.degraded, &cmp.degraded_efficiencies),
    ] {
        writeln!(
            w,
            "{},{},{},{},{:.2},{:.6},{:.6},{:.4},{:.4}",
            name,
            out.status.code(),
            out.status.is_ok(),
            out.iter,
            out.t4,
            out.tsfc_proxy,
            out.thrust_proxy,
            eff.eta_comp,
            eff.eta_turb
        )?;
    }
    writeln!(w)?;
    writeln!(w, "# Delta metrics")?;
    writeln!(w, "# TSFC change: {:.2}%", cmp.tsfc_change_pct)?;
    writeln!(w, "# Thrust change: {:.2}%", cmp.thrust_change_pct)?;
    writeln!(w, "# T4 change: {:.1} K", cmp.t4_change_k)?;
    writeln!(w, "# Iteration change: {}", cmp.iter_change)?;
    Ok(())
}
