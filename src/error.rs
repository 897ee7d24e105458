//! Error type for benchmark runs.

use quat_kernel::Strategy;
use quat_view::{Component, QuatError};

/// Errors that can occur while configuring or running a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Storage or kernel failure.
    #[error(transparent)]
    Quat(#[from] QuatError),

    /// A strategy's reduction left the agreement bound around the `f64`
    /// reference.
    #[error(
        "{strategy} result diverges from the f64 reference in component {component}: \
         deviation {deviation:e} exceeds bound {bound:e}"
    )]
    Divergence {
        strategy: Strategy,
        component: Component,
        deviation: f64,
        bound: f64,
    },
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
