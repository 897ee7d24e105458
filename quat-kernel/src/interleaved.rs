//! Interleaved (AoS) vector kernel.
//!
//! One quaternion fills one register. The product `a ⊗ b` is assembled from
//! four broadcast-multiply steps folded together with `addsub`; between steps
//! the accumulator lanes are permuted so that each lane's running sum sees its
//! terms with the sign and order of [`hamilton`](crate::scalar::hamilton):
//!
//! | step | accumulator lanes | added term       |
//! |------|-------------------|------------------|
//! | 1    | `W X Y Z`         | `a.w * (w x y z)`|
//! | 2    | `W X Y Z`         | `a.x * (x w z y)`|
//! | 3    | `W X Z Y`         | `a.y * (y z x w)`|
//! | 4    | `W Y X Z`         | `a.z * (z x y w)`|
//!
//! The multiply phase is bit-identical to the scalar kernel.
//!
//! The self-reduction uses `q ⊗ q = (w² - x² - y² - z², 2wx, 2wy, 2wz)`: one
//! multiply by the broadcast `2w` gives the vector part and a doubled `w²`, from
//! which the horizontal pair sums of the squares are subtracted in lane 0.
//! Lane 0 is therefore grouped as `2w² - (w² + x²) - (y² + z²)`; it can differ
//! from the scalar `w` by a few ulps of `|q|²`, while `x`, `y`, `z` match
//! exactly.

use quat_view::{Layout, QuatBatch, QuatError, Quaternion, Result, LANES};

use crate::kernel::{ensure_operands, BatchKernel, Strategy};
use crate::simd::{Backend, F32x4};

/// Vector kernel over interleaved batches.
#[derive(Debug, Clone, Copy)]
pub struct InterleavedKernel {
    backend: Backend,
}

impl InterleavedKernel {
    /// Kernel using the best backend available on this CPU.
    pub fn new() -> Self {
        let backend = Backend::detect();
        tracing::debug!(%backend, "interleaved kernel backend selected");
        Self { backend }
    }

    /// Kernel forced onto the portable lane emulation.
    pub fn portable() -> Self {
        Self {
            backend: Backend::Portable,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl Default for InterleavedKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn floats_of(batch: &QuatBatch) -> Result<&[f32]> {
    batch.interleaved_floats().ok_or(QuatError::LayoutMismatch {
        expected: Layout::Interleaved,
        found: batch.layout(),
    })
}

fn floats_mut_of(batch: &mut QuatBatch) -> Result<&mut [f32]> {
    let found = batch.layout();
    batch.interleaved_floats_mut().ok_or(QuatError::LayoutMismatch {
        expected: Layout::Interleaved,
        found,
    })
}

impl BatchKernel for InterleavedKernel {
    fn strategy(&self) -> Strategy {
        Strategy::Interleaved
    }

    fn multiply_into(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<()> {
        ensure_operands(a, b, c, Some(Layout::Interleaved))?;
        let (a, b) = (floats_of(a)?, floats_of(b)?);
        let c = floats_mut_of(c)?;

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: `Sse3` is only selected after runtime detection and every
            // quaternion of an interleaved batch starts on a 16-byte boundary.
            Backend::Sse3 => unsafe { sse3::multiply(a, b, c) },
            _ => portable::multiply(a, b, c),
        }
        Ok(())
    }

    fn self_reduce(&self, c: &QuatBatch) -> Result<Quaternion> {
        let c = floats_of(c)?;
        Ok(match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: as in `multiply_into`.
            Backend::Sse3 => unsafe { sse3::self_reduce(c) },
            _ => portable::self_reduce(c),
        })
    }
}

// ============================================================================
// Portable backend
// ============================================================================

mod portable {
    use super::*;

    pub(super) const B_XWZY: [usize; 4] = [1, 0, 3, 2];
    pub(super) const B_YZXW: [usize; 4] = [2, 3, 1, 0];
    pub(super) const B_ZXYW: [usize; 4] = [3, 1, 2, 0];
    pub(super) const SWAP_23: [usize; 4] = [0, 1, 3, 2];
    pub(super) const ROTATE_123: [usize; 4] = [0, 3, 1, 2];
    pub(super) const SWAP_12: [usize; 4] = [0, 2, 1, 3];

    #[inline(always)]
    pub(super) fn product(a: F32x4, b: F32x4) -> F32x4 {
        let mut c = a.broadcast(0).mul(b);
        c = c.addsub(a.broadcast(1).mul(b.permute(B_XWZY)));
        c = c.permute(SWAP_23);
        c = c.addsub(a.broadcast(2).mul(b.permute(B_YZXW)));
        c = c.permute(ROTATE_123);
        c = c.addsub(a.broadcast(3).mul(b.permute(B_ZXYW)));
        c.permute(SWAP_12)
    }

    #[inline(always)]
    pub(super) fn square(q: F32x4) -> F32x4 {
        let mult = q.add(q).mul(q.broadcast(0));
        let sq = q.mul(q);
        let h = sq.hadd(sq);
        mult.sub_low(h).sub_low(h.movehdup())
    }

    pub(super) fn multiply(a: &[f32], b: &[f32], c: &mut [f32]) {
        for ((c, a), b) in c
            .chunks_exact_mut(LANES)
            .zip(a.chunks_exact(LANES))
            .zip(b.chunks_exact(LANES))
        {
            product(F32x4::load(a), F32x4::load(b)).store(c);
        }
    }

    pub(super) fn self_reduce(c: &[f32]) -> Quaternion {
        let acc = c
            .chunks_exact(LANES)
            .fold(F32x4::ZERO, |acc, q| acc.add(square(F32x4::load(q))));
        Quaternion::from_array(acc.0)
    }
}

// ============================================================================
// SSE3 backend
// ============================================================================

#[cfg(target_arch = "x86_64")]
mod sse3 {
    use std::arch::x86_64::{
        __m128, _mm_add_ps, _mm_addsub_ps, _mm_hadd_ps, _mm_load_ps, _mm_movehdup_ps,
        _mm_mul_ps, _mm_setzero_ps, _mm_shuffle_ps, _mm_store_ps, _mm_storeu_ps, _mm_sub_ss,
    };

    use super::*;

    /// Immediate for `_mm_shuffle_ps`, highest destination lane first.
    pub(super) const fn shuffle_mask(z: i32, y: i32, x: i32, w: i32) -> i32 {
        (z << 6) | (y << 4) | (x << 2) | w
    }

    const BCAST_W: i32 = shuffle_mask(0, 0, 0, 0);
    const BCAST_X: i32 = shuffle_mask(1, 1, 1, 1);
    const BCAST_Y: i32 = shuffle_mask(2, 2, 2, 2);
    const BCAST_Z: i32 = shuffle_mask(3, 3, 3, 3);
    pub(super) const B_XWZY: i32 = shuffle_mask(2, 3, 0, 1);
    pub(super) const B_YZXW: i32 = shuffle_mask(0, 1, 3, 2);
    pub(super) const B_ZXYW: i32 = shuffle_mask(0, 2, 1, 3);
    pub(super) const SWAP_23: i32 = shuffle_mask(2, 3, 1, 0);
    pub(super) const ROTATE_123: i32 = shuffle_mask(2, 1, 3, 0);
    pub(super) const SWAP_12: i32 = shuffle_mask(3, 1, 2, 0);

    #[inline]
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn product(a: __m128, b: __m128) -> __m128 {
        let mut c = _mm_mul_ps(_mm_shuffle_ps::<BCAST_W>(a, a), b);
        c = _mm_addsub_ps(
            c,
            _mm_mul_ps(_mm_shuffle_ps::<BCAST_X>(a, a), _mm_shuffle_ps::<B_XWZY>(b, b)),
        );
        c = _mm_shuffle_ps::<SWAP_23>(c, c);
        c = _mm_addsub_ps(
            c,
            _mm_mul_ps(_mm_shuffle_ps::<BCAST_Y>(a, a), _mm_shuffle_ps::<B_YZXW>(b, b)),
        );
        c = _mm_shuffle_ps::<ROTATE_123>(c, c);
        c = _mm_addsub_ps(
            c,
            _mm_mul_ps(_mm_shuffle_ps::<BCAST_Z>(a, a), _mm_shuffle_ps::<B_ZXYW>(b, b)),
        );
        _mm_shuffle_ps::<SWAP_12>(c, c)
    }

    #[inline]
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn square(q: __m128) -> __m128 {
        let mult = _mm_mul_ps(_mm_add_ps(q, q), _mm_shuffle_ps::<BCAST_W>(q, q));
        let sq = _mm_mul_ps(q, q);
        let h = _mm_hadd_ps(sq, sq);
        _mm_sub_ss(_mm_sub_ss(mult, h), _mm_movehdup_ps(h))
    }

    /// # Safety
    ///
    /// SSE3 must be available and all three slices must start on a 16-byte
    /// boundary with equal lengths that are a multiple of 4.
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn multiply(a: &[f32], b: &[f32], c: &mut [f32]) {
        debug_assert!(a.len() == c.len() && b.len() == c.len());
        for i in (0..c.len()).step_by(LANES) {
            // SAFETY: see function contract
            let (qa, qb) = unsafe {
                (
                    _mm_load_ps(a.as_ptr().add(i)),
                    _mm_load_ps(b.as_ptr().add(i)),
                )
            };
            let q = product(qa, qb);
            // SAFETY: see function contract
            unsafe { _mm_store_ps(c.as_mut_ptr().add(i), q) };
        }
    }

    /// # Safety
    ///
    /// Same contract as [`multiply`].
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn self_reduce(c: &[f32]) -> Quaternion {
        let mut acc = _mm_setzero_ps();
        for i in (0..c.len()).step_by(LANES) {
            // SAFETY: see function contract
            let q = unsafe { _mm_load_ps(c.as_ptr().add(i)) };
            acc = _mm_add_ps(acc, square(q));
        }
        let mut out = [0.0f32; 4];
        // SAFETY: `out` holds four floats
        unsafe { _mm_storeu_ps(out.as_mut_ptr(), acc) };
        Quaternion::from_array(out)
    }
}
