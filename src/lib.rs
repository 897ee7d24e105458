//! Batch quaternion Hamilton-product benchmarks.
//!
//! This crate ties together the storage in [`quat_view`] and the kernels in
//! [`quat_kernel`] into a reproducible benchmark:
//!
//! - [`config`]: command-line arguments and the validated [`BenchConfig`]
//! - [`timing`]: cycle measurement as an explicit [`CycleStamp`] value
//! - [`runner`]: seeded operand generation, timed runs, optional verification
//! - [`report`]: [`RunReport`] and its CSV rendering
//!
//! # Example
//!
//! ```rust
//! use quatbench::{run, BenchConfig, Strategy};
//!
//! let config = BenchConfig::new(2)
//!     .unwrap()
//!     .with_strategies(vec![Strategy::Scalar, Strategy::Planar])
//!     .with_seed(42)
//!     .with_verify(true);
//!
//! let reports = run(&config).unwrap();
//! assert_eq!(reports.len(), 2);
//! assert_eq!(reports[0].len, 100);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod timing;

pub use config::{Args, BenchConfig, LayoutArg, StrategyChoice};
pub use error::{BenchError, Result};
pub use report::{write_reports, RunReport};
pub use runner::{run, run_strategy, Operands, Reference};
pub use timing::{estimate_clock_mhz, measure, start, stop, CycleStamp, Cycles};

pub use quat_kernel::{
    kernel_for, layout_for, BatchKernel, InterleavedKernel, ParallelKernel, PlanarKernel,
    ScalarKernel, Strategy,
};
pub use quat_view::{Layout, QuatBatch, QuatError, Quaternion};
