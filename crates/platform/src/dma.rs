//! DMA abstraction layer
//!
//! A [`DmaRegion`] is the CPU's handle on memory that a DMA engine reads or
//! writes in the background. It deliberately stores a raw pointer instead
//! of a `&mut [T]`: the hardware mutates the memory behind the compiler's
//! back, so a long-lived unique reference would be a lie. CPU access is
//! only granted inside [`read_with`](DmaRegion::read_with) and
//! [`write_with`](DmaRegion::write_with), which bracket the access with the
//! cache maintenance the access needs.

use core::marker::PhantomData;
use core::ops::Range;
use core::ptr::NonNull;

use crate::cache::CacheMaintenance;

/// One half of a circular, double-buffered DMA transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    /// Elements `0..len/2`; reported by the half-transfer interrupt.
    First,
    /// Elements `len/2..len`; reported by the transfer-complete interrupt.
    Second,
}

impl Half {
    /// The half DMA is working on while this one is handed to the CPU.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Borrowed view of a DMA-capable buffer.
///
/// Created from a [`DmaBuffer`](crate::dma_safety::DmaBuffer) via
/// [`region`](crate::dma_safety::DmaBuffer::region), which is only
/// available for DMA-accessible memory regions.
pub struct DmaRegion<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _borrow: PhantomData<&'a mut [T]>,
}

// SAFETY: a DmaRegion is an exclusive borrow of its buffer (it is created
// from `&'a mut [T]`), so moving it to another context is as sound as
// moving the `&mut [T]` itself.
unsafe impl<T: Send> Send for DmaRegion<'_, T> {}

impl<'a, T: Copy> DmaRegion<'a, T> {
    pub(crate) fn from_slice(slice: &'a mut [T]) -> Self {
        Self {
            len: slice.len(),
            ptr: NonNull::from(slice).cast(),
            _borrow: PhantomData,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the region holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the region in bytes.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: len came from a live slice, so len * size_of::<T>() <= isize::MAX
    pub fn byte_len(&self) -> usize {
        self.len * core::mem::size_of::<T>()
    }

    /// Start address, for programming a DMA stream.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Start address, for programming a peripheral-to-memory DMA stream.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Start address as an integer (cache maintenance and alignment checks).
    #[must_use]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Number of elements in one half.
    #[must_use]
    pub fn half_len(&self) -> usize {
        self.len / 2
    }

    /// Element range covered by `half`.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: half_len * 2 <= len
    pub fn half_range(&self, half: Half) -> Range<usize> {
        let n = self.half_len();
        match half {
            Half::First => 0..n,
            Half::Second => n..n * 2,
        }
    }

    /// `true` if the region and both halves start on cache-line boundaries
    /// and span whole cache lines.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: line is a non-zero constant
    pub fn halves_cache_aligned(&self, line: usize) -> bool {
        let half_bytes = self.half_len() * core::mem::size_of::<T>();
        self.len % 2 == 0 && self.addr() % line == 0 && half_bytes % line == 0
    }

    /// Invalidate `range`, then hand it to `f` for reading.
    ///
    /// Use for memory the DMA engine has just written: the invalidation
    /// makes the CPU fetch the DMA's data instead of stale cache lines.
    /// Returns `None` if `range` is out of bounds.
    pub fn read_with<C, R>(
        &mut self,
        range: Range<usize>,
        cache: &mut C,
        f: impl FnOnce(&[T]) -> R,
    ) -> Option<R>
    where
        C: CacheMaintenance + ?Sized,
    {
        let (addr, bytes) = self.byte_span(&range)?;
        cache.invalidate(addr, bytes);
        // SAFETY: `range` is within `0..len` (checked by byte_span), the
        // pointer came from a live `&'a mut [T]`, and `&mut self` keeps the
        // CPU side exclusive for the duration of `f`. The DMA engine is
        // writing the other half of the buffer.
        let slice = unsafe {
            core::slice::from_raw_parts(self.ptr.as_ptr().add(range.start), range.len())
        };
        Some(f(slice))
    }

    /// Hand `range` to `f` for writing, then clean it to memory.
    ///
    /// Use for memory the DMA engine will read: the clean pushes the CPU's
    /// writes out of the cache before the hardware fetches them.
    /// Returns `None` if `range` is out of bounds.
    pub fn write_with<C, R>(
        &mut self,
        range: Range<usize>,
        cache: &mut C,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> Option<R>
    where
        C: CacheMaintenance + ?Sized,
    {
        let (addr, bytes) = self.byte_span(&range)?;
        // SAFETY: as in `read_with`; the DMA engine is draining a different
        // slot of the buffer while `f` runs.
        let slice = unsafe {
            core::slice::from_raw_parts_mut(self.ptr.as_ptr().add(range.start), range.len())
        };
        let out = f(slice);
        cache.clean(addr, bytes);
        Some(out)
    }

    /// Overwrite the whole region with `value` and clean it.
    pub fn fill<C>(&mut self, value: T, cache: &mut C)
    where
        C: CacheMaintenance + ?Sized,
    {
        let all = 0..self.len;
        let _ = self.write_with(all, cache, |s| s.fill(value));
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: range.end <= len, so the products fit (see byte_len)
    fn byte_span(&self, range: &Range<usize>) -> Option<(usize, usize)> {
        if range.start > range.end || range.end > self.len {
            return None;
        }
        let size = core::mem::size_of::<T>();
        Some((self.addr() + range.start * size, range.len() * size))
    }
}
