//! Batch Hamilton-product kernels.
//!
//! Every strategy computes, for batches `A`, `B` of `n` quaternions,
//!
//! 1. the multiply phase `C[i] = A[i] ⊗ B[i]`, and
//! 2. the reduction phase `D = Σ_i C[i] ⊗ C[i]`.
//!
//! | strategy              | layout       | technique                            |
//! |-----------------------|--------------|--------------------------------------|
//! | [`ScalarKernel`]      | either       | straight-line loop, reference order  |
//! | [`PlanarKernel`]      | planar (SoA) | 4 quaternions per vector step        |
//! | [`InterleavedKernel`] | interleaved  | 1 quaternion per register, shuffles  |
//! | [`ParallelKernel`]    | either       | contiguous partitions on `T` workers |
//!
//! The multiply phase of every strategy is bit-identical to the scalar kernel.
//! Reductions accumulate in different orders and each stays within the bound
//! in [`tolerance`] of an `f64` reference.
//!
//! # Example
//!
//! ```rust
//! use quat_kernel::{BatchKernel, ScalarKernel};
//! use quat_view::{Layout, QuatBatch, Quaternion};
//!
//! let a = QuatBatch::from_quaternions(&[Quaternion::IDENTITY], Layout::Planar).unwrap();
//! let b = QuatBatch::from_quaternions(&[Quaternion::new(2.0, 3.0, 4.0, 5.0)], Layout::Planar)
//!     .unwrap();
//! let mut c = QuatBatch::zeroed(1, Layout::Planar).unwrap();
//!
//! let d = ScalarKernel.run(&a, &b, &mut c).unwrap();
//! assert_eq!(d, Quaternion::new(-46.0, 12.0, 16.0, 20.0));
//! ```
//!
//! # Features
//!
//! - `parallel` (default): run [`ParallelKernel`] partitions on a rayon pool.
//!   Without it partitions run sequentially with identical results.

mod interleaved;
mod kernel;
mod parallel;
mod planar;
pub mod scalar;
pub mod simd;
pub mod threading;
pub mod tolerance;

pub use interleaved::InterleavedKernel;
pub use kernel::{BatchKernel, Strategy};
pub use parallel::{combine_partials, ParallelKernel};
pub use planar::PlanarKernel;
pub use scalar::ScalarKernel;
pub use simd::Backend;
pub use threading::{partition, Partition, WorkerPool};
pub use tolerance::{agreement_factor, Agreement, Deviation};

use quat_view::{Layout, Result};

/// Build the kernel for `strategy`, boxed behind the common interface.
///
/// `workers` is only used by [`Strategy::Parallel`].
pub fn kernel_for(
    strategy: Strategy,
    workers: usize,
) -> Result<Box<dyn BatchKernel + Send + Sync>> {
    Ok(match strategy {
        Strategy::Scalar => Box::new(ScalarKernel),
        Strategy::Planar => Box::new(PlanarKernel::new()),
        Strategy::Interleaved => Box::new(InterleavedKernel::new()),
        Strategy::Parallel => Box::new(ParallelKernel::new(workers)?),
    })
}

/// Layout to allocate operands in for `strategy`, given a preference for
/// strategies that accept either.
pub fn layout_for(strategy: Strategy, preferred: Layout) -> Layout {
    strategy.required_layout().unwrap_or(preferred)
}
