//! Benchmark driver: allocate, fill, time, and optionally verify each strategy.

use quat_kernel::{kernel_for, layout_for, Agreement, BatchKernel, ScalarKernel, Strategy};
use quat_view::{Layout, QuatBatch, Quaternion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::report::RunReport;
use crate::timing::measure;

/// Freshly allocated operands `A`, `B` and zeroed output `C`.
pub struct Operands {
    pub a: QuatBatch,
    pub b: QuatBatch,
    pub c: QuatBatch,
}

impl Operands {
    /// Draw `A` then `B` from a generator seeded with `seed`.
    ///
    /// Component draw order does not depend on `layout`, so the same seed gives
    /// the same quaternions in either layout.
    pub fn generate(len: usize, layout: Layout, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = QuatBatch::random(len, layout, &mut rng)?;
        let b = QuatBatch::random(len, layout, &mut rng)?;
        let c = QuatBatch::zeroed(len, layout)?;
        let bytes = 3 * len * std::mem::size_of::<Quaternion>();
        debug!(len, %layout, bytes, "operands allocated");
        Ok(Self { a, b, c })
    }
}

/// `f64` reduction of the product batch and the bound every strategy's
/// result must stay within.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub agreement: Agreement,
}

impl Reference {
    /// The multiply phase is bit-identical across strategies, so the product
    /// batch from the scalar kernel serves every strategy.
    pub fn compute(config: &BenchConfig) -> Result<Self> {
        let mut ops = Operands::generate(config.len, Layout::Interleaved, config.seed)?;
        ScalarKernel.multiply_into(&ops.a, &ops.b, &mut ops.c)?;
        Ok(Self {
            agreement: Agreement::of(&ops.c),
        })
    }

    /// Fail with [`BenchError::Divergence`] if `report` leaves the bound.
    pub fn check(&self, report: &RunReport) -> Result<()> {
        let d = self.agreement.deviation(&report.result);
        if !d.within() {
            return Err(BenchError::Divergence {
                strategy: report.strategy,
                component: d.component,
                deviation: d.deviation,
                bound: d.bound,
            });
        }
        debug!(
            strategy = %report.strategy,
            component = %d.component,
            deviation = d.deviation,
            bound = d.bound,
            "within bound"
        );
        Ok(())
    }
}

/// Run one strategy on freshly generated inputs.
pub fn run_strategy(config: &BenchConfig, strategy: Strategy) -> Result<RunReport> {
    let layout = layout_for(strategy, config.layout);
    let workers = match strategy {
        Strategy::Parallel => config.workers,
        _ => 1,
    };
    let kernel = kernel_for(strategy, workers)?;
    let mut ops = Operands::generate(config.len, layout, config.seed)?;

    let (result, cycles) = measure(|| kernel.run(&ops.a, &ops.b, &mut ops.c));
    let result = result?;

    let report = RunReport {
        strategy,
        exponent: config.exponent,
        len: config.len,
        layout,
        workers,
        cycles,
        result,
    };
    info!(
        %strategy,
        %layout,
        workers,
        cycles = cycles.get(),
        per_quaternion = report.cycles_per_quaternion(),
        "run complete"
    );
    Ok(report)
}

/// Run every configured strategy in order.
///
/// With `verify` set, each result is checked against the `f64` reference and
/// the first divergence aborts the run.
pub fn run(config: &BenchConfig) -> Result<Vec<RunReport>> {
    let reference = if config.verify {
        Some(Reference::compute(config)?)
    } else {
        None
    };

    let mut reports = Vec::with_capacity(config.strategies.len());
    for &strategy in &config.strategies {
        let report = run_strategy(config, strategy)?;
        if let Some(reference) = &reference {
            reference.check(&report)?;
        }
        reports.push(report);
    }
    Ok(reports)
}
