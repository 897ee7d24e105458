//! Owned quaternion batches in interleaved or planar layout.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::aligned::AlignedBuf;
use crate::quaternion::{Component, Quaternion};
use crate::view::{BatchView, BatchViewMut, Planes, PlanesMut};
use crate::{QuatError, Result, ALIGNMENT, MAX_EXPONENT};

// ============================================================================
// Layout
// ============================================================================

/// Physical arrangement of a batch in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// One buffer of `4n` floats, quaternion `i` at offsets `4i..4i+3` (AoS).
    #[default]
    Interleaved,
    /// Four buffers `W, X, Y, Z` of `n` floats each (SoA).
    Planar,
}

impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Interleaved => "interleaved",
            Layout::Planar => "planar",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interleaved" | "aos" => Ok(Layout::Interleaved),
            "planar" | "soa" => Ok(Layout::Planar),
            other => Err(format!("unknown layout '{other}'")),
        }
    }
}

// ============================================================================
// Batch size
// ============================================================================

/// Batch length `n = 10^q` for a benchmark exponent `q`.
///
/// Rejects `q == 0` and `q > MAX_EXPONENT` before anything is allocated.
pub fn batch_len_for_exponent(exponent: u32) -> Result<usize> {
    if exponent == 0 || exponent > MAX_EXPONENT {
        return Err(QuatError::InvalidBatchSize {
            exponent,
            max: MAX_EXPONENT,
        });
    }
    10usize
        .checked_pow(exponent)
        .ok_or(QuatError::InvalidBatchSize {
            exponent,
            max: MAX_EXPONENT,
        })
}

/// Draw one component from `[-2, -1] ∪ [1, 2]`.
///
/// Magnitude is uniform in `[1, 2]`, sign is a fair coin.
#[inline]
pub fn random_component<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let magnitude: f32 = rng.gen_range(1.0..=2.0);
    if rng.gen::<bool>() {
        -magnitude
    } else {
        magnitude
    }
}

// ============================================================================
// QuatBatch
// ============================================================================

enum Storage {
    Interleaved(AlignedBuf),
    Planar([AlignedBuf; 4]),
}

/// Owned batch of `n` quaternions.
///
/// The length is fixed at construction and every buffer starts on an
/// [`ALIGNMENT`]-byte boundary. Buffers are released when the batch is dropped.
/// Indexing is by quaternion index; the physical layout stays an
/// implementation detail chosen at construction.
pub struct QuatBatch {
    len: usize,
    storage: Storage,
}

impl QuatBatch {
    /// Allocate a zero-filled batch of `len` quaternions.
    pub fn zeroed(len: usize, layout: Layout) -> Result<Self> {
        if len == 0 {
            return Err(QuatError::InvalidBatchSize {
                exponent: 0,
                max: MAX_EXPONENT,
            });
        }
        let storage = match layout {
            Layout::Interleaved => {
                let floats = len.checked_mul(4).ok_or(QuatError::AllocationFailure {
                    what: "interleaved buffer",
                    bytes: usize::MAX,
                    align: ALIGNMENT,
                })?;
                Storage::Interleaved(AlignedBuf::zeroed(
                    floats,
                    ALIGNMENT,
                    "interleaved buffer",
                )?)
            }
            Layout::Planar => Storage::Planar([
                AlignedBuf::zeroed(len, ALIGNMENT, "planar component 'w'")?,
                AlignedBuf::zeroed(len, ALIGNMENT, "planar component 'x'")?,
                AlignedBuf::zeroed(len, ALIGNMENT, "planar component 'y'")?,
                AlignedBuf::zeroed(len, ALIGNMENT, "planar component 'z'")?,
            ]),
        };
        Ok(Self { len, storage })
    }

    /// Allocate a batch and fill it with random components.
    pub fn random<R: Rng + ?Sized>(len: usize, layout: Layout, rng: &mut R) -> Result<Self> {
        let mut batch = Self::zeroed(len, layout)?;
        batch.fill_random(rng);
        Ok(batch)
    }

    /// Build a batch from explicit quaternions.
    pub fn from_quaternions(quats: &[Quaternion], layout: Layout) -> Result<Self> {
        let mut batch = Self::zeroed(quats.len(), layout)?;
        {
            let mut view = batch.view_mut();
            for (i, &q) in quats.iter().enumerate() {
                view.set(i, q);
            }
        }
        Ok(batch)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layout(&self) -> Layout {
        match self.storage {
            Storage::Interleaved(_) => Layout::Interleaved,
            Storage::Planar(_) => Layout::Planar,
        }
    }

    /// Overwrite every component with a value from `[-2, -1] ∪ [1, 2]`.
    ///
    /// Components are drawn in the order `q0.w, q0.x, q0.y, q0.z, q1.w, …` for
    /// both layouts, so the same generator state yields the same quaternions.
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match &mut self.storage {
            Storage::Interleaved(buf) => {
                for v in buf.iter_mut() {
                    *v = random_component(rng);
                }
            }
            Storage::Planar(planes) => {
                let [w, x, y, z] = planes;
                for i in 0..self.len {
                    w[i] = random_component(rng);
                    x[i] = random_component(rng);
                    y[i] = random_component(rng);
                    z[i] = random_component(rng);
                }
            }
        }
    }

    /// Overwrite every component with `0.0`.
    pub fn fill_zero(&mut self) {
        match &mut self.storage {
            Storage::Interleaved(buf) => buf.fill(0.0),
            Storage::Planar(planes) => planes.iter_mut().for_each(|p| p.fill(0.0)),
        }
    }

    /// Quaternion at `index`.
    pub fn get(&self, index: usize) -> Result<Quaternion> {
        self.view().get(index).ok_or(QuatError::IndexOutOfBounds {
            index,
            len: self.len,
        })
    }

    /// Single component of quaternion `index`.
    pub fn component(&self, index: usize, c: Component) -> Result<f32> {
        if index >= self.len {
            return Err(QuatError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(match &self.storage {
            Storage::Interleaved(buf) => buf[4 * index + c.index()],
            Storage::Planar(planes) => planes[c.index()][index],
        })
    }

    /// Overwrite quaternion `index`.
    pub fn set(&mut self, index: usize, q: Quaternion) -> Result<()> {
        if index >= self.len {
            return Err(QuatError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        self.view_mut().set(index, q);
        Ok(())
    }

    pub fn view(&self) -> BatchView<'_> {
        match &self.storage {
            Storage::Interleaved(buf) => BatchView::Interleaved(bytemuck::cast_slice(&buf[..])),
            Storage::Planar([w, x, y, z]) => BatchView::Planar(Planes { w, x, y, z }),
        }
    }

    pub fn view_mut(&mut self) -> BatchViewMut<'_> {
        match &mut self.storage {
            Storage::Interleaved(buf) => {
                BatchViewMut::Interleaved(bytemuck::cast_slice_mut(&mut buf[..]))
            }
            Storage::Planar([w, x, y, z]) => BatchViewMut::Planar(PlanesMut { w, x, y, z }),
        }
    }

    /// Packed quaternions, if the batch is interleaved.
    pub fn as_interleaved(&self) -> Option<&[Quaternion]> {
        match self.view() {
            BatchView::Interleaved(q) => Some(q),
            BatchView::Planar(_) => None,
        }
    }

    /// Component planes, if the batch is planar.
    pub fn as_planes(&self) -> Option<Planes<'_>> {
        match self.view() {
            BatchView::Planar(p) => Some(p),
            BatchView::Interleaved(_) => None,
        }
    }

    /// Raw interleaved floats (`4n`), if the batch is interleaved.
    pub fn interleaved_floats(&self) -> Option<&[f32]> {
        match &self.storage {
            Storage::Interleaved(buf) => Some(&buf[..]),
            Storage::Planar(_) => None,
        }
    }

    /// Mutable raw interleaved floats (`4n`), if the batch is interleaved.
    pub fn interleaved_floats_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.storage {
            Storage::Interleaved(buf) => Some(&mut buf[..]),
            Storage::Planar(_) => None,
        }
    }

    /// Base address of each buffer owned by the batch.
    pub fn buffer_addresses(&self) -> Vec<usize> {
        match &self.storage {
            Storage::Interleaved(buf) => vec![buf.as_ptr() as usize],
            Storage::Planar(planes) => planes.iter().map(|p| p.as_ptr() as usize).collect(),
        }
    }

    /// Copy of this batch in another layout.
    pub fn to_layout(&self, layout: Layout) -> Result<QuatBatch> {
        let mut out = QuatBatch::zeroed(self.len, layout)?;
        {
            let mut dst = out.view_mut();
            for (i, q) in self.view().iter().enumerate() {
                dst.set(i, q);
            }
        }
        Ok(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = Quaternion> + '_ {
        self.view().iter()
    }

    pub fn to_vec(&self) -> Vec<Quaternion> {
        self.iter().collect()
    }
}

impl fmt::Debug for QuatBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuatBatch")
            .field("len", &self.len)
            .field("layout", &self.layout())
            .finish()
    }
}
