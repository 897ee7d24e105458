//! Four-lane register helpers and runtime backend dispatch.
//!
//! On x86_64 the vector kernels run on SSE3 (`addsub`, `hadd`) when the CPU
//! reports it. Everywhere else they run on [`F32x4`], a portable register that
//! mirrors the same lane operations one-for-one so both paths compute each lane
//! with the same sequence of IEEE operations.

use std::fmt;

/// Which implementation the vector kernels dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `core::arch` SSE3 intrinsics on 16-byte aligned loads.
    Sse3,
    /// Lane-by-lane emulation on `[f32; 4]`.
    Portable,
}

impl Backend {
    /// Best backend for the running CPU.
    #[inline]
    pub fn detect() -> Backend {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("sse3") {
                return Backend::Sse3;
            }
        }
        Backend::Portable
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Sse3 => "sse3",
            Backend::Portable => "portable",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Portable four-lane `f32` register.
///
/// Method names follow the SSE instruction each one stands in for.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C, align(16))]
pub struct F32x4(pub [f32; 4]);

impl F32x4 {
    pub const ZERO: F32x4 = F32x4([0.0; 4]);

    #[inline(always)]
    pub fn splat(v: f32) -> Self {
        F32x4([v; 4])
    }

    /// Load four consecutive floats. Panics if `src` has fewer than four.
    #[inline(always)]
    pub fn load(src: &[f32]) -> Self {
        F32x4([src[0], src[1], src[2], src[3]])
    }

    #[inline(always)]
    pub fn store(self, dst: &mut [f32]) {
        dst[..4].copy_from_slice(&self.0);
    }

    #[inline(always)]
    pub fn add(self, o: Self) -> Self {
        let (a, b) = (self.0, o.0);
        F32x4([a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]])
    }

    #[inline(always)]
    pub fn sub(self, o: Self) -> Self {
        let (a, b) = (self.0, o.0);
        F32x4([a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]])
    }

    #[inline(always)]
    pub fn mul(self, o: Self) -> Self {
        let (a, b) = (self.0, o.0);
        F32x4([a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]])
    }

    /// `addsub`: subtract in even lanes, add in odd lanes.
    #[inline(always)]
    pub fn addsub(self, o: Self) -> Self {
        let (a, b) = (self.0, o.0);
        F32x4([a[0] - b[0], a[1] + b[1], a[2] - b[2], a[3] + b[3]])
    }

    /// `hadd`: `(a0+a1, a2+a3, b0+b1, b2+b3)`.
    #[inline(always)]
    pub fn hadd(self, o: Self) -> Self {
        let (a, b) = (self.0, o.0);
        F32x4([a[0] + a[1], a[2] + a[3], b[0] + b[1], b[2] + b[3]])
    }

    /// `sub_ss`: subtract in lane 0 only, upper lanes pass through from `self`.
    #[inline(always)]
    pub fn sub_low(self, o: Self) -> Self {
        let mut out = self;
        out.0[0] = self.0[0] - o.0[0];
        out
    }

    /// `movehdup`: `(a1, a1, a3, a3)`.
    #[inline(always)]
    pub fn movehdup(self) -> Self {
        let a = self.0;
        F32x4([a[1], a[1], a[3], a[3]])
    }

    /// `shuffle`: lanes 0-1 picked from `self`, lanes 2-3 picked from `o`.
    #[inline(always)]
    pub fn shuffle(self, o: Self, idx: [usize; 4]) -> Self {
        F32x4([self.0[idx[0]], self.0[idx[1]], o.0[idx[2]], o.0[idx[3]]])
    }

    /// Single-source shuffle.
    #[inline(always)]
    pub fn permute(self, idx: [usize; 4]) -> Self {
        self.shuffle(self, idx)
    }

    /// Broadcast lane `i` to every lane.
    #[inline(always)]
    pub fn broadcast(self, i: usize) -> Self {
        F32x4::splat(self.0[i])
    }

    /// Collapse to lane 0 of `hadd(hadd(v, v), v)`, i.e. `(v0+v1)+(v2+v3)`.
    #[inline(always)]
    pub fn reduce_sum(self) -> f32 {
        self.hadd(self).hadd(self).0[0]
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod sse {
    //! Thin helpers over `core::arch::x86_64` shared by the SSE3 kernels.

    use std::arch::x86_64::{__m128, _mm_cvtss_f32, _mm_hadd_ps};

    /// `(v0+v1)+(v2+v3)` via two horizontal adds.
    #[inline]
    #[target_feature(enable = "sse3")]
    pub(crate) unsafe fn reduce_sum(v: __m128) -> f32 {
        _mm_cvtss_f32(_mm_hadd_ps(_mm_hadd_ps(v, v), v))
    }
}
