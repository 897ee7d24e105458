//! Planar (SoA) vector kernel.
//!
//! Four consecutive quaternions are processed per step: one aligned load per
//! component plane gives the `W, X, Y, Z` lanes of four operands at once, and
//! each product component is evaluated lane-wise in the same operation order as
//! [`hamilton`](crate::scalar::hamilton). The multiply phase is therefore
//! bit-identical to the scalar kernel.
//!
//! The reduction keeps four lane accumulators, one per component, and folds
//! each with `hadd(hadd(v, v), v)` at the end. The `n mod 4` trailing
//! quaternions go through the scalar path and are added after the fold.

use quat_view::{
    BatchView, BatchViewMut, Layout, Planes, PlanesMut, QuatBatch, QuatError, Quaternion, Result,
    LANES,
};

use crate::kernel::{ensure_operands, BatchKernel, Strategy};
use crate::scalar;
use crate::simd::{Backend, F32x4};

/// Vector kernel over planar batches.
#[derive(Debug, Clone, Copy)]
pub struct PlanarKernel {
    backend: Backend,
}

impl PlanarKernel {
    /// Kernel using the best backend available on this CPU.
    pub fn new() -> Self {
        let backend = Backend::detect();
        tracing::debug!(%backend, "planar kernel backend selected");
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

impl Default for PlanarKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn planes_of(batch: &QuatBatch) -> Result<Planes<'_>> {
    batch.as_planes().ok_or(QuatError::LayoutMismatch {
        expected: Layout::Planar,
        found: batch.layout(),
    })
}

fn planes_mut_of(batch: &mut QuatBatch) -> Result<PlanesMut<'_>> {
    let found = batch.layout();
    match batch.view_mut() {
        BatchViewMut::Planar(p) => Ok(p),
        BatchViewMut::Interleaved(_) => Err(QuatError::LayoutMismatch {
            expected: Layout::Planar,
            found,
        }),
    }
}

/// Length of the vectorised prefix: the largest multiple of [`LANES`] `<= len`.
#[inline]
fn body_len(len: usize) -> usize {
    len - len % LANES
}

impl BatchKernel for PlanarKernel {
    fn strategy(&self) -> Strategy {
        Strategy::Planar
    }

    fn multiply_into(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<()> {
        ensure_operands(a, b, c, Some(Layout::Planar))?;
        let (a, b) = (planes_of(a)?, planes_of(b)?);
        let c = planes_mut_of(c)?;

        let n = c.len();
        let head = body_len(n);
        let (mut body, tail) = c.split_at_mut(head);
        let (a_body, b_body) = (a.slice(0..head), b.slice(0..head));

        match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: `Sse3` is only selected after runtime detection; every
            // plane starts on a 16-byte boundary and `head` is a multiple of 4.
            Backend::Sse3 => unsafe { sse3::multiply(a_body, b_body, &mut body) },
            _ => portable::multiply(a_body, b_body, &mut body),
        }

        scalar::multiply_view(
            &BatchView::Planar(a.slice(head..n)),
            &BatchView::Planar(b.slice(head..n)),
            &mut BatchViewMut::Planar(tail),
        );
        Ok(())
    }

    fn self_reduce(&self, c: &QuatBatch) -> Result<Quaternion> {
        let c = planes_of(c)?;
        let n = c.len();
        let head = body_len(n);
        let body = c.slice(0..head);

        let lanes = match self.backend {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: as in `multiply_into`.
            Backend::Sse3 => unsafe { sse3::self_reduce(body) },
            _ => portable::self_reduce(body),
        };
        let tail = scalar::self_reduce_view(&BatchView::Planar(c.slice(head..n)));
        Ok(lanes + tail)
    }
}

// ============================================================================
// Portable backend
// ============================================================================

mod portable {
    use super::*;

    /// Lane-wise Hamilton product of four quaternions held as component vectors.
    #[inline(always)]
    fn product(a: [F32x4; 4], b: [F32x4; 4]) -> [F32x4; 4] {
        let [aw, ax, ay, az] = a;
        let [bw, bx, by, bz] = b;
        [
            aw.mul(bw).sub(ax.mul(bx)).sub(ay.mul(by)).sub(az.mul(bz)),
            aw.mul(bx).add(ax.mul(bw)).add(ay.mul(bz)).sub(az.mul(by)),
            aw.mul(by).sub(ax.mul(bz)).add(ay.mul(bw)).add(az.mul(bx)),
            aw.mul(bz).add(ax.mul(by)).sub(ay.mul(bx)).add(az.mul(bw)),
        ]
    }

    #[inline(always)]
    fn load(p: &Planes<'_>, i: usize) -> [F32x4; 4] {
        [
            F32x4::load(&p.w[i..]),
            F32x4::load(&p.x[i..]),
            F32x4::load(&p.y[i..]),
            F32x4::load(&p.z[i..]),
        ]
    }

    pub(super) fn multiply(a: Planes<'_>, b: Planes<'_>, c: &mut PlanesMut<'_>) {
        for i in (0..c.len()).step_by(LANES) {
            let [w, x, y, z] = product(load(&a, i), load(&b, i));
            w.store(&mut c.w[i..]);
            x.store(&mut c.x[i..]);
            y.store(&mut c.y[i..]);
            z.store(&mut c.z[i..]);
        }
    }

    pub(super) fn self_reduce(c: Planes<'_>) -> Quaternion {
        let mut acc = [F32x4::ZERO; 4];
        for i in (0..c.len()).step_by(LANES) {
            let q = load(&c, i);
            for (acc, p) in acc.iter_mut().zip(product(q, q)) {
                *acc = acc.add(p);
            }
        }
        let [w, x, y, z] = acc;
        Quaternion::new(w.reduce_sum(), x.reduce_sum(), y.reduce_sum(), z.reduce_sum())
    }
}

// ============================================================================
// SSE3 backend
// ============================================================================

#[cfg(target_arch = "x86_64")]
mod sse3 {
    use std::arch::x86_64::{
        __m128, _mm_add_ps, _mm_load_ps, _mm_mul_ps, _mm_setzero_ps, _mm_store_ps, _mm_sub_ps,
    };

    use super::*;
    use crate::simd::sse::reduce_sum;

    #[inline]
    #[target_feature(enable = "sse3")]
    unsafe fn product(a: [__m128; 4], b: [__m128; 4]) -> [__m128; 4] {
        let [aw, ax, ay, az] = a;
        let [bw, bx, by, bz] = b;
        let w = _mm_sub_ps(
            _mm_sub_ps(
                _mm_sub_ps(_mm_mul_ps(aw, bw), _mm_mul_ps(ax, bx)),
                _mm_mul_ps(ay, by),
            ),
            _mm_mul_ps(az, bz),
        );
        let x = _mm_sub_ps(
            _mm_add_ps(
                _mm_add_ps(_mm_mul_ps(aw, bx), _mm_mul_ps(ax, bw)),
                _mm_mul_ps(ay, bz),
            ),
            _mm_mul_ps(az, by),
        );
        let y = _mm_add_ps(
            _mm_add_ps(
                _mm_sub_ps(_mm_mul_ps(aw, by), _mm_mul_ps(ax, bz)),
                _mm_mul_ps(ay, bw),
            ),
            _mm_mul_ps(az, bx),
        );
        let z = _mm_add_ps(
            _mm_sub_ps(
                _mm_add_ps(_mm_mul_ps(aw, bz), _mm_mul_ps(ax, by)),
                _mm_mul_ps(ay, bx),
            ),
            _mm_mul_ps(az, bw),
        );
        [w, x, y, z]
    }

    /// Aligned load of lanes `i..i+4` from every plane.
    #[inline]
    #[target_feature(enable = "sse3")]
    unsafe fn load(p: &Planes<'_>, i: usize) -> [__m128; 4] {
        debug_assert!(i + LANES <= p.len());
        // SAFETY: `i + 4 <= len` and each plane is 16-byte aligned at a
        // multiple-of-4 index.
        unsafe {
            [
                _mm_load_ps(p.w.as_ptr().add(i)),
                _mm_load_ps(p.x.as_ptr().add(i)),
                _mm_load_ps(p.y.as_ptr().add(i)),
                _mm_load_ps(p.z.as_ptr().add(i)),
            ]
        }
    }

    /// # Safety
    ///
    /// SSE3 must be available, every plane must be 16-byte aligned and all
    /// lengths equal to a multiple of 4.
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn multiply(a: Planes<'_>, b: Planes<'_>, c: &mut PlanesMut<'_>) {
        debug_assert_eq!(c.len() % LANES, 0);
        for i in (0..c.len()).step_by(LANES) {
            let [w, x, y, z] = product(load(&a, i), load(&b, i));
            // SAFETY: see function contract
            unsafe {
                _mm_store_ps(c.w.as_mut_ptr().add(i), w);
                _mm_store_ps(c.x.as_mut_ptr().add(i), x);
                _mm_store_ps(c.y.as_mut_ptr().add(i), y);
                _mm_store_ps(c.z.as_mut_ptr().add(i), z);
            }
        }
    }

    /// # Safety
    ///
    /// Same contract as [`multiply`].
    #[target_feature(enable = "sse3")]
    pub(super) unsafe fn self_reduce(c: Planes<'_>) -> Quaternion {
        debug_assert_eq!(c.len() % LANES, 0);
        let mut dw = _mm_setzero_ps();
        let mut dx = _mm_setzero_ps();
        let mut dy = _mm_setzero_ps();
        let mut dz = _mm_setzero_ps();
        for i in (0..c.len()).step_by(LANES) {
            let q = load(&c, i);
            let [pw, px, py, pz] = product(q, q);
            dw = _mm_add_ps(dw, pw);
            dx = _mm_add_ps(dx, px);
            dy = _mm_add_ps(dy, py);
            dz = _mm_add_ps(dz, pz);
        }
        Quaternion::new(reduce_sum(dw), reduce_sum(dx), reduce_sum(dy), reduce_sum(dz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKernel;
    use crate::tolerance::Agreement;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn operands(n: usize, seed: u64) -> (QuatBatch, QuatBatch) {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = QuatBatch::random(n, Layout::Planar, &mut rng).unwrap();
        let b = QuatBatch::random(n, Layout::Planar, &mut rng).unwrap();
        (a, b)
    }

    fn kernels() -> Vec<PlanarKernel> {
        let mut ks = vec![PlanarKernel::portable()];
        if Backend::detect() != Backend::Portable {
            ks.push(PlanarKernel::new());
        }
        ks
    }

    #[test]
    fn test_multiply_bit_identical_to_scalar() {
        for n in [1, 3, 4, 10, 1000, 1003] {
            let (a, b) = operands(n, n as u64);
            let mut expected = QuatBatch::zeroed(n, Layout::Planar).unwrap();
            ScalarKernel.multiply_into(&a, &b, &mut expected).unwrap();
            for kernel in kernels() {
                let mut c = QuatBatch::zeroed(n, Layout::Planar).unwrap();
                kernel.multiply_into(&a, &b, &mut c).unwrap();
                assert_eq!(c.to_vec(), expected.to_vec(), "n={n} {}", kernel.backend());
            }
        }
    }

    #[test]
    fn test_reduce_within_bound() {
        for n in [1, 10, 1000, 1003] {
            let (a, b) = operands(n, 100 + n as u64);
            let mut c = QuatBatch::zeroed(n, Layout::Planar).unwrap();
            ScalarKernel.multiply_into(&a, &b, &mut c).unwrap();
            let agreement = Agreement::of(&c);
            for kernel in kernels() {
                let got = kernel.self_reduce(&c).unwrap();
                let d = agreement.deviation(&got);
                assert!(d.within(), "n={n}: {got} {d:?}");
            }
        }
    }

    #[test]
    fn test_backends_agree_exactly() {
        let (a, b) = operands(1001, 5);
        let mut c = QuatBatch::zeroed(1001, Layout::Planar).unwrap();
        let portable = PlanarKernel::portable().run(&a, &b, &mut c).unwrap();
        let native = PlanarKernel::new().run(&a, &b, &mut c).unwrap();
        assert_eq!(portable, native);
    }

    #[test]
    fn test_tail_only_batch() {
        let a = QuatBatch::from_quaternions(&[Quaternion::IDENTITY; 3], Layout::Planar).unwrap();
        let b = QuatBatch::from_quaternions(&[Quaternion::new(2.0, 3.0, 4.0, 5.0); 3], Layout::Planar)
            .unwrap();
        let mut c = QuatBatch::zeroed(3, Layout::Planar).unwrap();
        for kernel in kernels() {
            let r = kernel.run(&a, &b, &mut c).unwrap();
            assert_eq!(r, Quaternion::new(-138.0, 36.0, 48.0, 60.0));
        }
    }

    #[test]
    fn test_rejects_interleaved() {
        let (a, b) = operands(8, 1);
        let mut c = QuatBatch::zeroed(8, Layout::Interleaved).unwrap();
        assert!(matches!(
            PlanarKernel::new().multiply_into(&a, &b, &mut c),
            Err(QuatError::LayoutMismatch {
                expected: Layout::Planar,
                found: Layout::Interleaved
            })
        ));
        assert!(PlanarKernel::new().self_reduce(&c).is_err());
    }
}
