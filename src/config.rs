//! Command-line arguments and the validated run configuration.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use quat_kernel::Strategy;
use quat_view::{batch_len_for_exponent, Layout, QuatError};

use crate::error::Result;

/// Which strategies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    Scalar,
    Planar,
    Interleaved,
    Parallel,
    All,
}

impl StrategyChoice {
    pub fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyChoice::Scalar => vec![Strategy::Scalar],
            StrategyChoice::Planar => vec![Strategy::Planar],
            StrategyChoice::Interleaved => vec![Strategy::Interleaved],
            StrategyChoice::Parallel => vec![Strategy::Parallel],
            StrategyChoice::All => Strategy::ALL.to_vec(),
        }
    }
}

/// Layout for strategies that accept either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Interleaved,
    Planar,
}

impl From<LayoutArg> for Layout {
    fn from(l: LayoutArg) -> Layout {
        match l {
            LayoutArg::Interleaved => Layout::Interleaved,
            LayoutArg::Planar => Layout::Planar,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "quatbench")]
#[command(about = "Batch quaternion Hamilton-product benchmark", long_about = None)]
#[command(version)]
pub struct Args {
    /// Batch-size exponent q; each batch holds 10^q quaternions
    pub exponent: u32,

    /// Run label written as the first CSV column
    #[arg(long, default_value_t = 0)]
    pub run_id: u32,

    /// Strategy to benchmark
    #[arg(short, long, value_enum, default_value_t = StrategyChoice::All)]
    pub strategy: StrategyChoice,

    /// Worker threads for the parallel strategy [default: available parallelism]
    #[arg(short, long, env = "QUATBENCH_THREADS")]
    pub threads: Option<usize>,

    /// Layout for the scalar and parallel strategies (the vector kernels use their own)
    #[arg(long, value_enum, default_value_t = LayoutArg::Interleaved)]
    pub layout: LayoutArg,

    /// Seed for the input generator [default: derived from the wall clock]
    #[arg(long, env = "QUATBENCH_SEED")]
    pub seed: Option<u64>,

    /// Check every reduction against an f64 reference
    #[arg(long)]
    pub verify: bool,

    /// Print a CSV header before the records
    #[arg(long)]
    pub header: bool,

    /// Estimate and log the cycle counter rate
    #[arg(long)]
    pub clock_rate: bool,
}

/// Validated benchmark configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub exponent: u32,
    pub len: usize,
    pub run_id: u32,
    pub strategies: Vec<Strategy>,
    pub workers: usize,
    pub layout: Layout,
    pub seed: u64,
    pub verify: bool,
    pub header: bool,
    pub clock_rate: bool,
}

impl BenchConfig {
    /// Minimal configuration for `exponent`, running every strategy.
    pub fn new(exponent: u32) -> Result<Self> {
        Ok(Self {
            exponent,
            len: batch_len_for_exponent(exponent)?,
            run_id: 0,
            strategies: Strategy::ALL.to_vec(),
            workers: default_workers(),
            layout: Layout::Interleaved,
            seed: 0,
            verify: false,
            header: false,
            clock_rate: false,
        })
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(QuatError::InvalidWorkerCount(workers).into());
        }
        self.workers = workers;
        Ok(self)
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl TryFrom<Args> for BenchConfig {
    type Error = crate::error::BenchError;

    fn try_from(args: Args) -> Result<Self> {
        let mut config = BenchConfig::new(args.exponent)?
            .with_strategies(args.strategy.strategies())
            .with_workers(args.threads.unwrap_or_else(default_workers))?
            .with_layout(args.layout.into())
            .with_seed(args.seed.unwrap_or_else(clock_seed))
            .with_verify(args.verify);
        config.run_id = args.run_id;
        config.header = args.header;
        config.clock_rate = args.clock_rate;
        Ok(config)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("quatbench").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = BenchConfig::try_from(parse(&["3", "--seed", "5"])).unwrap();
        assert_eq!(config.len, 1000);
        assert_eq!(config.strategies, Strategy::ALL.to_vec());
        assert_eq!(config.layout, Layout::Interleaved);
        assert_eq!(config.seed, 5);
        assert!(config.workers >= 1);
        assert!(!config.verify);
    }

    #[test]
    fn test_explicit_options() {
        let args = parse(&[
            "2",
            "--run-id",
            "4",
            "--strategy",
            "parallel",
            "--threads",
            "3",
            "--layout",
            "planar",
            "--verify",
            "--header",
        ]);
        let config = BenchConfig::try_from(args).unwrap();
        assert_eq!(config.run_id, 4);
        assert_eq!(config.strategies, vec![Strategy::Parallel]);
        assert_eq!(config.workers, 3);
        assert_eq!(config.layout, Layout::Planar);
        assert!(config.verify && config.header && !config.clock_rate);
    }

    #[test]
    fn test_invalid_exponent_rejected() {
        for q in ["0", "9"] {
            assert!(matches!(
                BenchConfig::try_from(parse(&[q])),
                Err(BenchError::Quat(QuatError::InvalidBatchSize { .. }))
            ));
        }
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            BenchConfig::try_from(parse(&["1", "--threads", "0"])),
            Err(BenchError::Quat(QuatError::InvalidWorkerCount(0)))
        ));
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        assert!(Args::try_parse_from(["quatbench", "1", "--strategy", "gpu"]).is_err());
        assert!(Args::try_parse_from(["quatbench"]).is_err());
    }
}
