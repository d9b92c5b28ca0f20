//! Audio stream primitives the hardware platform provides.
//!
//! The streaming core never touches SAI or DMA registers. It asks the
//! platform to start and stop two circular transfers and receives the two
//! [`Notification`]s the capture DMA raises.

use crate::dma::Half;

/// Circular capture/playback DMA control.
///
/// Implemented by the board layer (SAI4 PDM RX on BDMA + SAI TX on DMA1 on
/// the reference board) and by [`MockStreamPlatform`](crate::mocks::MockStreamPlatform)
/// in tests.
pub trait StreamPlatform {
    /// Error type
    type Error: core::fmt::Debug;

    /// Start the circular PDM capture transfer into `buffer[..len]`.
    ///
    /// The transfer must raise [`Notification::HalfTransfer`] after each
    /// first-half fill and [`Notification::TransferComplete`] after each
    /// second-half fill.
    ///
    /// # Safety
    ///
    /// `buffer` must stay valid and DMA-reachable until
    /// [`end_stream`](Self::end_stream) returns.
    unsafe fn begin_capture_stream(&mut self, buffer: *mut u16, len: usize)
        -> Result<(), Self::Error>;

    /// Start the circular PCM playback transfer from `buffer[..len]`.
    ///
    /// # Safety
    ///
    /// `buffer` must stay valid and DMA-reachable until
    /// [`end_stream`](Self::end_stream) returns.
    unsafe fn begin_playback_stream(&mut self, buffer: *const i16, len: usize)
        -> Result<(), Self::Error>;

    /// Halt both transfers. Must be safe to call when nothing is running.
    fn end_stream(&mut self);

    /// Sample index the playback DMA will read next, if the platform can
    /// report it (e.g. from the stream's NDTR register).
    ///
    /// Platforms returning `None` disable underrun detection.
    fn playback_position(&self) -> Option<usize> {
        None
    }
}

/// The two events the capture DMA raises. Nothing else enters the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// The first half of the capture buffer has been filled.
    HalfTransfer,
    /// The second half of the capture buffer has been filled; DMA wrapped.
    TransferComplete,
}

impl Notification {
    /// The capture half that is now safe to read.
    #[must_use]
    pub fn completed_half(self) -> Half {
        match self {
            Self::HalfTransfer => Half::First,
            Self::TransferComplete => Half::Second,
        }
    }
}
