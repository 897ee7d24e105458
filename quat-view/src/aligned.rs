//! Owned `f32` buffer with a guaranteed start alignment.

use std::alloc::{self, Layout as AllocLayout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{QuatError, Result};

/// Heap buffer of `f32` whose first element sits on an `align`-byte boundary.
///
/// Memory is zero-initialised on allocation and released on drop.
pub struct AlignedBuf {
    ptr: NonNull<f32>,
    len: usize,
    layout: AllocLayout,
}

// Safety: AlignedBuf uniquely owns its allocation.
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocate `len` zeroed floats aligned to `align` bytes.
    ///
    /// `what` names the buffer in the error returned when the allocator refuses
    /// the request.
    pub fn zeroed(len: usize, align: usize, what: &'static str) -> Result<Self> {
        let failure = |bytes| QuatError::AllocationFailure { what, bytes, align };

        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or(failure(usize::MAX))?;
        let layout = AllocLayout::from_size_align(bytes, align).map_err(|_| failure(bytes))?;

        if bytes == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len: 0,
                layout,
            });
        }

        // Safety: layout has nonzero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw as *mut f32).ok_or(failure(bytes))?;

        tracing::debug!(what, bytes, align, "allocated aligned buffer");
        Ok(Self { ptr, len, layout })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment in bytes the buffer was allocated with.
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.ptr.as_ptr()
    }
}

impl Deref for AlignedBuf {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        // Safety: ptr is valid for len initialised floats (or dangling with len 0)
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut [f32] {
        // Safety: unique ownership, see Deref
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        if self.layout.size() == 0 {
            return;
        }
        // Safety: allocated in `zeroed` with this exact layout
        unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
    }
}

impl fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlignedBuf(len={}, align={})", self.len, self.align())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ALIGNMENT;

    #[test]
    fn test_zeroed_is_aligned_and_zero() {
        for len in [1usize, 3, 4, 17, 1000] {
            let buf = AlignedBuf::zeroed(len, ALIGNMENT, "test").unwrap();
            assert_eq!(buf.len(), len);
            assert_eq!(buf.as_ptr() as usize % ALIGNMENT, 0);
            assert!(buf.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AlignedBuf::zeroed(0, ALIGNMENT, "empty").unwrap();
        assert!(buf.is_empty());
        assert_eq!(&buf[..], &[] as &[f32]);
    }

    #[test]
    fn test_write_through_deref_mut() {
        let mut buf = AlignedBuf::zeroed(8, 64, "test").unwrap();
        buf[7] = 2.5;
        assert_eq!(buf[7], 2.5);
        assert_eq!(buf.as_ptr() as usize % 64, 0);
    }

    #[test]
    fn test_oversized_request_fails_cleanly() {
        let err = AlignedBuf::zeroed(usize::MAX / 2, ALIGNMENT, "huge").unwrap_err();
        match err {
            QuatError::AllocationFailure { what, align, .. } => {
                assert_eq!(what, "huge");
                assert_eq!(align, ALIGNMENT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_alignment_rejected() {
        assert!(AlignedBuf::zeroed(4, 3, "odd").is_err());
    }
}
