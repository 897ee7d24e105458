//! Agreement bound between reductions that accumulate in different orders.
//!
//! Every strategy computes the same mathematical sum `D = Σ_i C[i] ⊗ C[i]`,
//! but the vector and parallel kernels group the additions differently, so
//! their `f32` results differ in the last bits. Each result is compared against
//! the same sum accumulated in `f64`.
//!
//! Round-to-nearest accumulation adds an error of at most half an ulp of the
//! running sum at every step, and those errors behave like a random walk. For
//! one component, with `S_k` the running sums of the sequential order (the
//! longest chain any strategy uses) and `t_k = |C[k]|²` the size of each term,
//! the tolerated deviation is
//!
//! ```text
//! (LANES + log2 n) · ε · sqrt(Σ_k S_k² + Σ_k t_k²)
//! ```
//!
//! The second sum covers the rounding inside each self-product. Omitting or
//! repeating a single term moves a component by far more than this at every
//! size where `f32` running sums still resolve individual terms.

use quat_view::{BatchView, Component, QuatBatch, Quaternion, LANES};

/// Margin factor for a batch of `len` quaternions: `(LANES + log2 len) · ε`.
pub fn agreement_factor(len: usize) -> f64 {
    (LANES as f64 + (len.max(1) as f64).log2()) * f32::EPSILON as f64
}

/// `q ⊗ q` evaluated in `f64`.
fn square_f64(q: &Quaternion) -> [f64; 4] {
    let [w, x, y, z] = q.to_array().map(f64::from);
    [w * w - x * x - y * y - z * z, 2.0 * w * x, 2.0 * w * y, 2.0 * w * z]
}

/// Worst component of a reduction compared against an [`Agreement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub component: Component,
    pub deviation: f64,
    pub bound: f64,
}

impl Deviation {
    #[inline]
    pub fn within(&self) -> bool {
        self.deviation <= self.bound
    }
}

/// `f64` reference reduction of one batch and the per-component bound any
/// `f32` reduction of that batch must stay within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agreement {
    expected: [f64; 4],
    bound: [f64; 4],
}

impl Agreement {
    pub fn of(c: &QuatBatch) -> Self {
        Self::of_view(&c.view())
    }

    pub fn of_view(c: &BatchView<'_>) -> Self {
        let mut sum = [0.0f64; 4];
        let mut walk = [0.0f64; 4];
        let mut terms = 0.0f64;
        for q in c.iter() {
            let t = square_f64(&q);
            for ((s, w), t) in sum.iter_mut().zip(&mut walk).zip(t) {
                *s += t;
                *w += *s * *s;
            }
            let norm: f64 = q.to_array().iter().map(|&v| f64::from(v) * f64::from(v)).sum();
            terms += norm * norm;
        }
        let factor = agreement_factor(c.len());
        Self {
            expected: sum,
            bound: walk.map(|w| factor * (w + terms).sqrt()),
        }
    }

    /// Reference value of one component.
    #[inline]
    pub fn expected(&self, c: Component) -> f64 {
        self.expected[c.index()]
    }

    #[inline]
    pub fn bound(&self, c: Component) -> f64 {
        self.bound[c.index()]
    }

    /// The component that exceeds its bound the most (or comes closest).
    pub fn deviation(&self, got: &Quaternion) -> Deviation {
        Component::ALL
            .into_iter()
            .map(|c| Deviation {
                component: c,
                deviation: (f64::from(got[c]) - self.expected(c)).abs(),
                bound: self.bound(c),
            })
            .fold(None::<Deviation>, |worst, d| match worst {
                Some(w) if w.deviation - w.bound >= d.deviation - d.bound => Some(w),
                _ => Some(d),
            })
            .unwrap_or(Deviation {
                component: Component::W,
                deviation: 0.0,
                bound: 0.0,
            })
    }

    #[inline]
    pub fn accepts(&self, got: &Quaternion) -> bool {
        self.deviation(got).within()
    }
}
