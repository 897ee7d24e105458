//! Aligned quaternion batch storage.
//!
//! This crate owns the data model shared by every kernel strategy:
//!
//! - [`Quaternion`]: plain `(w, x, y, z)` single-precision value type
//! - [`QuatBatch`]: owned batch of `n` quaternions in either [`Layout`], backed by
//!   16-byte aligned buffers
//! - [`BatchView`] / [`BatchViewMut`]: borrowed (sub-)ranges of a batch, used to hand
//!   disjoint partitions to worker threads
//!
//! # Example
//!
//! ```rust
//! use quat_view::{Layout, QuatBatch, Quaternion};
//!
//! let mut batch = QuatBatch::zeroed(4, Layout::Planar).unwrap();
//! batch.set(2, Quaternion::new(2.0, 3.0, 4.0, 5.0)).unwrap();
//! assert_eq!(batch.get(2).unwrap(), Quaternion::new(2.0, 3.0, 4.0, 5.0));
//! assert_eq!(batch.get(0).unwrap(), Quaternion::ZERO);
//! ```

mod aligned;
mod batch;
mod quaternion;
pub mod view;

pub use aligned::AlignedBuf;
pub use batch::{batch_len_for_exponent, random_component, Layout, QuatBatch};
pub use quaternion::{Component, Quaternion};
pub use view::{BatchView, BatchViewMut, Planes, PlanesMut};

// ============================================================================
// Constants
// ============================================================================

/// Number of `f32` lanes in one vector register (SSE width).
pub const LANES: usize = 4;

/// Alignment in bytes of every batch buffer (one full vector register).
pub const ALIGNMENT: usize = LANES * std::mem::size_of::<f32>();

/// Largest accepted batch-size exponent: `n = 10^8` quaternions is 1.6 GB per batch.
pub const MAX_EXPONENT: u32 = 8;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while building or accessing quaternion batches.
#[derive(Debug, thiserror::Error)]
pub enum QuatError {
    /// An aligned buffer could not be allocated.
    #[error("failed to allocate {what}: {bytes} bytes aligned to {align}")]
    AllocationFailure {
        what: &'static str,
        bytes: usize,
        align: usize,
    },

    /// Batch-size exponent is zero or unreasonably large.
    #[error("invalid batch size exponent {exponent} (expected 1..={max})")]
    InvalidBatchSize { exponent: u32, max: u32 },

    /// A layout-specific operation received a batch in another layout.
    #[error("layout mismatch: expected {expected}, found {found}")]
    LayoutMismatch { expected: Layout, found: Layout },

    /// Operand batches have different lengths.
    #[error("batch length mismatch: {expected} vs {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Quaternion index outside the batch.
    #[error("index {index} out of bounds for batch of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Worker count must be at least one.
    #[error("invalid worker count {0} (must be at least 1)")]
    InvalidWorkerCount(usize),

    /// The fixed-size worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Result type for quaternion batch operations.
pub type Result<T> = std::result::Result<T, QuatError>;
