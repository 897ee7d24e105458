//! Reference Hamilton-product kernel.
//!
//! Every other strategy is checked against the operation order used here:
//! each product component is evaluated left to right exactly as written in
//! [`hamilton`], and the self-reduction adds terms in ascending index order.

use quat_view::{BatchView, BatchViewMut, QuatBatch, Quaternion, Result};

use crate::kernel::{ensure_operands, BatchKernel, Strategy};

/// Hamilton product `a ⊗ b`.
#[inline(always)]
pub fn hamilton(a: &Quaternion, b: &Quaternion) -> Quaternion {
    Quaternion::new(
        a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
    )
}

/// `acc += a ⊗ b`, component by component.
#[inline(always)]
pub fn hamilton_accumulate(acc: &mut Quaternion, a: &Quaternion, b: &Quaternion) {
    acc.w += a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z;
    acc.x += a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y;
    acc.y += a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x;
    acc.z += a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w;
}

/// `q ⊗ q` through the identity `(w²-x²-y²-z², 2wx, 2wy, 2wz)`.
#[inline(always)]
pub fn square(q: &Quaternion) -> Quaternion {
    let w2 = q.w + q.w;
    Quaternion::new(
        q.w * q.w - q.x * q.x - q.y * q.y - q.z * q.z,
        w2 * q.x,
        w2 * q.y,
        w2 * q.z,
    )
}

/// `dst[i] = a[i] ⊗ b[i]` for every index of the views.
///
/// All three views must have the same length.
pub fn multiply_view(a: &BatchView<'_>, b: &BatchView<'_>, dst: &mut BatchViewMut<'_>) {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), dst.len());

    if let (BatchView::Interleaved(a), BatchView::Interleaved(b), BatchViewMut::Interleaved(c)) =
        (a, b, &mut *dst)
    {
        for ((c, a), b) in c.iter_mut().zip(a.iter()).zip(b.iter()) {
            *c = hamilton(a, b);
        }
        return;
    }

    for (i, (a, b)) in a.iter().zip(b.iter()).enumerate() {
        dst.set(i, hamilton(&a, &b));
    }
}

/// `Σ_i c[i] ⊗ c[i]` accumulated in index order from zero.
pub fn self_reduce_view(c: &BatchView<'_>) -> Quaternion {
    let mut acc = Quaternion::ZERO;
    match c {
        BatchView::Interleaved(q) => {
            for q in q.iter() {
                hamilton_accumulate(&mut acc, q, q);
            }
        }
        BatchView::Planar(p) => {
            for q in p.iter() {
                hamilton_accumulate(&mut acc, &q, &q);
            }
        }
    }
    acc
}

/// Non-vectorised reference strategy; accepts either layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

impl BatchKernel for ScalarKernel {
    fn strategy(&self) -> Strategy {
        Strategy::Scalar
    }

    fn multiply_into(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<()> {
        ensure_operands(a, b, c, None)?;
        multiply_view(&a.view(), &b.view(), &mut c.view_mut());
        Ok(())
    }

    fn self_reduce(&self, c: &QuatBatch) -> Result<Quaternion> {
        Ok(self_reduce_view(&c.view()))
    }
}
