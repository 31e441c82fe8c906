//! Aligned float buffers for scratch space shared between workflow stages.
//!
//! Every buffer starts on a [`BUFFER_ALIGNMENT`] boundary so vectorized loads
//! and stores never straddle a cache line, and two buffers never share one.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Alignment, in bytes, of every buffer handed out by [`allocate_float_buffer`].
pub const BUFFER_ALIGNMENT: usize = 64;

/// Allocates a zeroed block of `length` floats aligned to [`BUFFER_ALIGNMENT`].
///
/// Returns `None` when the request cannot be satisfied, either because the
/// system allocator is exhausted or because the byte size is not
/// representable. Callers decide how to degrade; nothing here aborts.
/// A zero length always succeeds with an empty handle.
pub fn allocate_float_buffer(length: usize) -> Option<AlignedBuffer> {
    if length == 0 {
        return Some(AlignedBuffer::empty());
    }

    let Some(layout) = AlignedBuffer::layout(length) else {
        log::warn!("Refusing aligned allocation of {} floats: size overflows", length);
        return None;
    };

    // SAFETY: layout has a non-zero size since length > 0.
    let raw = unsafe { alloc_zeroed(layout) };
    match NonNull::new(raw as *mut f32) {
        Some(ptr) => Some(AlignedBuffer { ptr, len: length }),
        None => {
            log::warn!(
                "System allocator could not provide {} bytes aligned to {}",
                layout.size(),
                BUFFER_ALIGNMENT
            );
            None
        }
    }
}

/// Owning handle over a 64-byte aligned run of `f32`s.
///
/// The region is released exactly once, when the handle is dropped.
pub struct AlignedBuffer {
    ptr: NonNull<f32>,
    len: usize,
}

// Safety: AlignedBuffer exclusively owns its region.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    fn empty() -> Self {
        // SAFETY: BUFFER_ALIGNMENT is non-zero, so the pointer is non-null.
        // It is never dereferenced or deallocated while len == 0.
        let ptr = unsafe {
            NonNull::new_unchecked(std::ptr::without_provenance_mut::<f32>(BUFFER_ALIGNMENT))
        };
        Self { ptr, len: 0 }
    }

    fn layout(length: usize) -> Option<Layout> {
        let bytes = length.checked_mul(std::mem::size_of::<f32>())?;
        Layout::from_size_align(bytes, BUFFER_ALIGNMENT).ok()
    }

    /// Number of float slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer (for SIMD).
    #[inline]
    pub fn as_ptr(&self) -> *const f32 {
        self.ptr.as_ptr()
    }

    /// Raw mutable pointer (for SIMD).
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut f32 {
        self.ptr.as_ptr()
    }

    /// Fills with zeros.
    pub fn zero(&mut self) {
        self.fill(0.0);
    }
}

impl Deref for AlignedBuffer {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &[f32] {
        // SAFETY: ptr is aligned and non-null, and valid for len floats.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [f32] {
        // SAFETY: as in deref, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Some(layout) = Self::layout(self.len) {
            // SAFETY: the region was allocated with this exact layout.
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, layout) };
        }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Two equally sized aligned buffers that stages alternate between.
///
/// One holds the current stage's input while the other receives its output,
/// then they trade places. Reusing a `Scratch` across executions keeps the
/// hot path free of allocation.
#[derive(Debug)]
pub struct Scratch {
    pub(crate) ping: AlignedBuffer,
    pub(crate) pong: AlignedBuffer,
}

impl Scratch {
    /// Allocates both halves with `length` slots each.
    pub fn new(length: usize) -> Option<Self> {
        Some(Self {
            ping: allocate_float_buffer(length)?,
            pong: allocate_float_buffer(length)?,
        })
    }

    /// Slots available in each half.
    pub fn capacity(&self) -> usize {
        self.ping.len().min(self.pong.len())
    }

    /// The output half becomes the next input half.
    pub(crate) fn swap(&mut self) {
        std::mem::swap(&mut self.ping, &mut self.pong);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_aligned(buf: &AlignedBuffer) -> bool {
        buf.as_ptr() as usize % BUFFER_ALIGNMENT == 0
    }

    #[test]
    fn test_allocation_is_aligned_and_sized() {
        for len in [1, 3, 16, 17, 1000, 4097] {
            let buf = allocate_float_buffer(len).unwrap();
            assert_eq!(buf.len(), len);
            assert!(is_aligned(&buf), "buffer of {} floats not aligned", len);
        }
    }

    #[test]
    fn test_allocation_is_zeroed() {
        let buf = allocate_float_buffer(128).unwrap();
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_length_allocation() {
        let buf = allocate_float_buffer(0).unwrap();
        assert!(buf.is_empty());
        assert!(is_aligned(&buf));
        assert_eq!(&buf[..], &[] as &[f32]);
    }

    #[test]
    fn test_overflowing_allocation_returns_none() {
        assert!(allocate_float_buffer(usize::MAX).is_none());
        // Fits in usize bytes but exceeds isize::MAX
        assert!(allocate_float_buffer(usize::MAX / 4).is_none());
    }

    #[test]
    fn test_read_write_and_zero() {
        let mut buf = allocate_float_buffer(10).unwrap();
        for (i, v) in buf.iter_mut().enumerate() {
            *v = i as f32;
        }
        assert_eq!(buf[9], 9.0);
        buf.zero();
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_adjacent_buffers_do_not_share_cache_lines() {
        let a = allocate_float_buffer(1).unwrap();
        let b = allocate_float_buffer(1).unwrap();
        let (a, b) = (a.as_ptr() as usize, b.as_ptr() as usize);
        assert!(a.abs_diff(b) >= BUFFER_ALIGNMENT);
    }

    #[test]
    fn test_scratch_halves() {
        let scratch = Scratch::new(20).unwrap();
        assert_eq!(scratch.capacity(), 20);
        assert!(is_aligned(&scratch.ping));
        assert!(is_aligned(&scratch.pong));
        assert_ne!(scratch.ping.as_ptr(), scratch.pong.as_ptr());
    }

    #[test]
    fn test_scratch_swap() {
        let mut scratch = Scratch::new(4).unwrap();
        scratch.ping[0] = 1.0;
        scratch.swap();
        assert_eq!(scratch.pong[0], 1.0);
        assert_eq!(scratch.ping[0], 0.0);
    }
}
