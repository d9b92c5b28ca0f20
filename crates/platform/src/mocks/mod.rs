//! Mock implementations for testing
//!
//! [`MockStreamPlatform`] stands in for the SAI/DMA board layer and can
//! play the role of the DMA engine: it writes PDM words into the capture
//! buffer and reads PCM back out of the playback buffer through the same
//! raw pointers real hardware would be programmed with.
//!
//! [`MockCache`] records every maintenance operation so tests can check
//! that reads were invalidated and writes were cleaned.

use crate::audio_stream::StreamPlatform;
use crate::cache::CacheMaintenance;

/// Failure injected into [`MockStreamPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStreamError {
    /// The platform refused to start the playback transfer.
    PlaybackRefused,
}

/// Mock DMA stream platform
#[derive(Debug, Default)]
pub struct MockStreamPlatform {
    capture: Option<(*mut u16, usize)>,
    playback: Option<(*const i16, usize)>,
    capture_starts: usize,
    playback_starts: usize,
    end_calls: usize,
    playback_position: Option<usize>,
    refuse_playback: bool,
}

impl MockStreamPlatform {
    /// Create new mock platform with no transfers running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `begin_playback_stream` fail.
    pub fn refuse_playback(&mut self, refuse: bool) {
        self.refuse_playback = refuse;
    }

    /// Set the index the playback DMA reports it will read next.
    pub fn set_playback_position(&mut self, position: Option<usize>) {
        self.playback_position = position;
    }

    /// Number of successful `begin_capture_stream` calls.
    pub fn capture_starts(&self) -> usize {
        self.capture_starts
    }

    /// Number of successful `begin_playback_stream` calls.
    pub fn playback_starts(&self) -> usize {
        self.playback_starts
    }

    /// Number of `end_stream` calls.
    pub fn end_calls(&self) -> usize {
        self.end_calls
    }

    /// `true` while a capture transfer is running.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// `true` while a playback transfer is running.
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// Length of the running capture transfer.
    pub fn capture_len(&self) -> Option<usize> {
        self.capture.map(|(_, len)| len)
    }

    /// Act as the capture DMA: copy `words` into the capture buffer at `offset`.
    ///
    /// Returns `false` (and writes nothing) if no capture is running or the
    /// write would overrun the buffer.
    pub fn dma_write_capture(&self, offset: usize, words: &[u16]) -> bool {
        let Some((ptr, len)) = self.capture else {
            return false;
        };
        match offset.checked_add(words.len()) {
            Some(end) if end <= len => {}
            _ => return false,
        }
        // SAFETY: `ptr..ptr+len` was handed to begin_capture_stream, whose
        // contract keeps it valid until end_stream; the range is checked
        // above. Tests call this between handler invocations, exactly
        // when real DMA would be writing.
        unsafe {
            core::ptr::copy_nonoverlapping(words.as_ptr(), ptr.add(offset), words.len());
        }
        true
    }

    /// Act as the playback DMA: copy the whole playback buffer out.
    pub fn dma_read_playback(&self) -> Option<Vec<i16>> {
        let (ptr, len) = self.playback?;
        // SAFETY: see dma_write_capture; the read happens between handler
        // invocations while no CPU-side slice is alive.
        let samples = unsafe { core::slice::from_raw_parts(ptr, len) };
        Some(samples.to_vec())
    }
}

impl StreamPlatform for MockStreamPlatform {
    type Error = MockStreamError;

    unsafe fn begin_capture_stream(&mut self, buffer: *mut u16, len: usize) -> Result<(), Self::Error> {
        self.capture = Some((buffer, len));
        self.capture_starts = self.capture_starts.saturating_add(1);
        Ok(())
    }

    unsafe fn begin_playback_stream(
        &mut self,
        buffer: *const i16,
        len: usize,
    ) -> Result<(), Self::Error> {
        if self.refuse_playback {
            return Err(MockStreamError::PlaybackRefused);
        }
        self.playback = Some((buffer, len));
        self.playback_starts = self.playback_starts.saturating_add(1);
        Ok(())
    }

    fn end_stream(&mut self) {
        self.capture = None;
        self.playback = None;
        self.end_calls = self.end_calls.saturating_add(1);
    }

    fn playback_position(&self) -> Option<usize> {
        self.playback_position
    }
}

/// One recorded cache maintenance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    /// `invalidate(addr, len)`
    Invalidate {
        /// Start address.
        addr: usize,
        /// Length in bytes.
        len: usize,
    },
    /// `clean(addr, len)`
    Clean {
        /// Start address.
        addr: usize,
        /// Length in bytes.
        len: usize,
    },
}

/// Mock cache that records operations in order.
#[derive(Debug, Default)]
pub struct MockCache {
    ops: Vec<CacheOp>,
}

impl MockCache {
    /// Create new mock cache
    pub fn new() -> Self {
        Self::default()
    }

    /// All operations so far, oldest first.
    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    /// Forget recorded operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl CacheMaintenance for MockCache {
    fn invalidate(&mut self, addr: usize, len: usize) {
        self.ops.push(CacheOp::Invalidate { addr, len });
    }

    fn clean(&mut self, addr: usize, len: usize) {
        self.ops.push(CacheOp::Clean { addr, len });
    }
}
