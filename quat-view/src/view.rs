//! Borrowed views over a contiguous range of a quaternion batch.
//!
//! A view keeps the physical layout of the batch it came from:
//!
//! - [`BatchView::Interleaved`] borrows `n` packed quaternions
//! - [`BatchView::Planar`] borrows four parallel component planes
//!
//! Mutable views can be split into disjoint sub-ranges, which is how the
//! thread-parallel kernel hands each worker its own slice of the output.

use std::ops::Range;

use crate::batch::Layout;
use crate::quaternion::Quaternion;

// ============================================================================
// Planes
// ============================================================================

/// Four equally long component planes `W, X, Y, Z`.
#[derive(Clone, Copy, Debug)]
pub struct Planes<'a> {
    pub w: &'a [f32],
    pub x: &'a [f32],
    pub y: &'a [f32],
    pub z: &'a [f32],
}

impl<'a> Planes<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.w.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, i: usize) -> Option<Quaternion> {
        Some(Quaternion::new(
            *self.w.get(i)?,
            *self.x.get(i)?,
            *self.y.get(i)?,
            *self.z.get(i)?,
        ))
    }

    pub fn slice(&self, range: Range<usize>) -> Planes<'a> {
        Planes {
            w: &self.w[range.clone()],
            x: &self.x[range.clone()],
            y: &self.y[range.clone()],
            z: &self.z[range],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Quaternion> + 'a {
        let Planes { w, x, y, z } = *self;
        w.iter()
            .zip(x)
            .zip(y)
            .zip(z)
            .map(|(((&w, &x), &y), &z)| Quaternion::new(w, x, y, z))
    }
}

/// Mutable counterpart of [`Planes`].
#[derive(Debug)]
pub struct PlanesMut<'a> {
    pub w: &'a mut [f32],
    pub x: &'a mut [f32],
    pub y: &'a mut [f32],
    pub z: &'a mut [f32],
}

impl<'a> PlanesMut<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.w.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, q: Quaternion) {
        self.w[i] = q.w;
        self.x[i] = q.x;
        self.y[i] = q.y;
        self.z[i] = q.z;
    }

    pub fn as_planes(&self) -> Planes<'_> {
        Planes {
            w: &self.w[..],
            x: &self.x[..],
            y: &self.y[..],
            z: &self.z[..],
        }
    }

    pub fn split_at_mut(self, mid: usize) -> (PlanesMut<'a>, PlanesMut<'a>) {
        let (w0, w1) = self.w.split_at_mut(mid);
        let (x0, x1) = self.x.split_at_mut(mid);
        let (y0, y1) = self.y.split_at_mut(mid);
        let (z0, z1) = self.z.split_at_mut(mid);
        (
            PlanesMut {
                w: w0,
                x: x0,
                y: y0,
                z: z0,
            },
            PlanesMut {
                w: w1,
                x: x1,
                y: y1,
                z: z1,
            },
        )
    }
}

// ============================================================================
// BatchView
// ============================================================================

/// Immutable view over a contiguous range of quaternions.
#[derive(Clone, Copy, Debug)]
pub enum BatchView<'a> {
    Interleaved(&'a [Quaternion]),
    Planar(Planes<'a>),
}

impl<'a> BatchView<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BatchView::Interleaved(q) => q.len(),
            BatchView::Planar(p) => p.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layout(&self) -> Layout {
        match self {
            BatchView::Interleaved(_) => Layout::Interleaved,
            BatchView::Planar(_) => Layout::Planar,
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<Quaternion> {
        match self {
            BatchView::Interleaved(q) => q.get(i).copied(),
            BatchView::Planar(p) => p.get(i),
        }
    }

    /// Sub-view over `range`. Panics if the range exceeds the view.
    pub fn slice(&self, range: Range<usize>) -> BatchView<'a> {
        match self {
            BatchView::Interleaved(q) => BatchView::Interleaved(&q[range]),
            BatchView::Planar(p) => BatchView::Planar(p.slice(range)),
        }
    }

    /// Quaternions in index order, regardless of layout.
    pub fn iter(&self) -> Box<dyn Iterator<Item = Quaternion> + 'a> {
        match *self {
            BatchView::Interleaved(q) => Box::new(q.iter().copied()),
            BatchView::Planar(p) => Box::new(p.iter()),
        }
    }
}

// ============================================================================
// BatchViewMut
// ============================================================================

/// Mutable view over a contiguous range of quaternions.
#[derive(Debug)]
pub enum BatchViewMut<'a> {
    Interleaved(&'a mut [Quaternion]),
    Planar(PlanesMut<'a>),
}

impl<'a> BatchViewMut<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BatchViewMut::Interleaved(q) => q.len(),
            BatchViewMut::Planar(p) => p.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layout(&self) -> Layout {
        match self {
            BatchViewMut::Interleaved(_) => Layout::Interleaved,
            BatchViewMut::Planar(_) => Layout::Planar,
        }
    }

    /// Write quaternion `i`. Panics if `i` is outside the view.
    #[inline(always)]
    pub fn set(&mut self, i: usize, q: Quaternion) {
        match self {
            BatchViewMut::Interleaved(dst) => dst[i] = q,
            BatchViewMut::Planar(p) => p.set(i, q),
        }
    }

    pub fn as_view(&self) -> BatchView<'_> {
        match self {
            BatchViewMut::Interleaved(q) => BatchView::Interleaved(&q[..]),
            BatchViewMut::Planar(p) => BatchView::Planar(p.as_planes()),
        }
    }

    pub fn split_at_mut(self, mid: usize) -> (BatchViewMut<'a>, BatchViewMut<'a>) {
        match self {
            BatchViewMut::Interleaved(q) => {
                let (lo, hi) = q.split_at_mut(mid);
                (BatchViewMut::Interleaved(lo), BatchViewMut::Interleaved(hi))
            }
            BatchViewMut::Planar(p) => {
                let (lo, hi) = p.split_at_mut(mid);
                (BatchViewMut::Planar(lo), BatchViewMut::Planar(hi))
            }
        }
    }

    /// Split into one disjoint view per range.
    ///
    /// `ranges` must be ascending, contiguous, and start at 0; together they must
    /// cover the whole view. Panics otherwise.
    pub fn split_ranges(self, ranges: &[Range<usize>]) -> Vec<BatchViewMut<'a>> {
        let mut parts = Vec::with_capacity(ranges.len());
        let mut rest = self;
        let mut cursor = 0usize;
        for range in ranges {
            assert_eq!(range.start, cursor, "ranges must be contiguous");
            let (head, tail) = rest.split_at_mut(range.end - range.start);
            parts.push(head);
            rest = tail;
            cursor = range.end;
        }
        assert!(rest.is_empty(), "ranges must cover the whole view");
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quats(n: usize) -> Vec<Quaternion> {
        (0..n)
            .map(|i| {
                let f = i as f32;
                Quaternion::new(f, f + 0.25, f + 0.5, f + 0.75)
            })
            .collect()
    }

    #[test]
    fn test_planes_iter_matches_get() {
        let w = [1.0, 2.0, 3.0];
        let x = [4.0, 5.0, 6.0];
        let y = [7.0, 8.0, 9.0];
        let z = [10.0, 11.0, 12.0];
        let planes = Planes {
            w: &w,
            x: &x,
            y: &y,
            z: &z,
        };
        let collected: Vec<_> = planes.iter().collect();
        assert_eq!(collected.len(), 3);
        for (i, q) in collected.iter().enumerate() {
            assert_eq!(Some(*q), planes.get(i));
        }
        assert_eq!(planes.get(3), None);
        assert_eq!(planes.slice(1..3).get(0), Some(Quaternion::new(2.0, 5.0, 8.0, 11.0)));
    }

    #[test]
    fn test_split_ranges_interleaved_disjoint() {
        let mut data = vec![Quaternion::ZERO; 10];
        let view = BatchViewMut::Interleaved(&mut data);
        let parts = view.split_ranges(&[0..3, 3..3, 3..7, 7..10]);
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![3, 0, 4, 3]
        );
        for (k, mut part) in parts.into_iter().enumerate() {
            for i in 0..part.len() {
                part.set(i, Quaternion::new(k as f32, 0.0, 0.0, 0.0));
            }
        }
        let ws: Vec<f32> = data.iter().map(|q| q.w).collect();
        assert_eq!(ws, vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_split_ranges_planar() {
        let mut w = vec![0.0f32; 5];
        let mut x = vec![0.0f32; 5];
        let mut y = vec![0.0f32; 5];
        let mut z = vec![0.0f32; 5];
        let view = BatchViewMut::Planar(PlanesMut {
            w: &mut w,
            x: &mut x,
            y: &mut y,
            z: &mut z,
        });
        let mut parts = view.split_ranges(&[0..2, 2..5]);
        parts[1].set(0, Quaternion::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(parts[1].as_view().get(0), Some(Quaternion::new(1.0, 2.0, 3.0, 4.0)));
        drop(parts);
        assert_eq!((w[2], x[2], y[2], z[2]), (1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "cover the whole view")]
    fn test_split_ranges_must_cover() {
        let mut data = vec![Quaternion::ZERO; 4];
        BatchViewMut::Interleaved(&mut data).split_ranges(&[0..2]);
    }

    #[test]
    fn test_view_iter_and_slice() {
        let data = quats(6);
        let view = BatchView::Interleaved(&data);
        assert_eq!(view.layout(), Layout::Interleaved);
        let sub = view.slice(2..5);
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.iter().collect::<Vec<_>>(), data[2..5].to_vec());
    }
}
