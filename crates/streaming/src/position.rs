//! Playback write cursor.

use core::ops::Range;

/// Cursor into the playback buffer, advanced one chunk per processed half
/// and wrapping at the buffer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamPosition {
    offset: usize,
    chunk: usize,
    len: usize,
}

impl StreamPosition {
    /// Cursor at 0 over a `len`-sample buffer written `chunk` samples at a
    /// time.
    ///
    /// Returns `None` unless `len` is a non-zero whole multiple of `chunk`.
    #[must_use]
    pub fn new(len: usize, chunk: usize) -> Option<Self> {
        if chunk == 0 || len < chunk || len % chunk != 0 {
            return None;
        }
        Some(Self {
            offset: 0,
            chunk,
            len,
        })
    }

    /// Sample index of the next slot.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Samples per slot.
    #[must_use]
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Playback buffer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of slots in the buffer.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: chunk != 0 (checked in new)
    pub fn slots(&self) -> usize {
        self.len / self.chunk
    }

    /// Sample range of the next slot.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset + chunk <= len
    pub fn slot(&self) -> Range<usize> {
        self.offset..self.offset + self.chunk
    }

    /// Move to the following slot, wrapping to 0 at the end of the buffer.
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset + chunk <= len
    pub fn advance(&mut self) {
        let next = self.offset + self.chunk;
        self.offset = if next >= self.len { 0 } else { next };
    }

    /// Back to slot 0.
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
