//! Per-strategy results and their CSV rendering.

use std::io::{self, Write};

use quat_kernel::Strategy;
use quat_view::{Layout, Quaternion};

use crate::timing::Cycles;

/// Outcome of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub strategy: Strategy,
    pub exponent: u32,
    pub len: usize,
    pub layout: Layout,
    /// Worker threads used; 1 for single-threaded strategies.
    pub workers: usize,
    pub cycles: Cycles,
    pub result: Quaternion,
}

impl RunReport {
    pub const CSV_HEADER: &'static str = "run_id,strategy,q,cycles";

    /// `run_id,strategy,q,cycles`
    pub fn csv_record(&self, run_id: u32) -> String {
        format!("{run_id},{},{},{}", self.strategy, self.exponent, self.cycles)
    }

    /// `Result: [w, x, y, z]`
    pub fn result_line(&self) -> String {
        format!("Result: {}", self.result)
    }

    /// Cycles spent per quaternion of the batch.
    pub fn cycles_per_quaternion(&self) -> f64 {
        self.cycles.get() as f64 / self.len.max(1) as f64
    }

    /// Write the CSV record followed by the result line.
    pub fn write_to<W: Write>(&self, run_id: u32, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.csv_record(run_id))?;
        writeln!(out, "{}", self.result_line())
    }
}

/// Write every report, optionally preceded by the CSV header.
pub fn write_reports<W: Write>(
    reports: &[RunReport],
    run_id: u32,
    header: bool,
    out: &mut W,
) -> io::Result<()> {
    if header {
        writeln!(out, "{}", RunReport::CSV_HEADER)?;
    }
    for report in reports {
        report.write_to(run_id, out)?;
    }
    out.flush()
}
