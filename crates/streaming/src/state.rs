//! Controller lifecycle states and fault records.

use platform::Half;

/// Streaming controller state.
///
/// ```text
/// Idle ──arm──► Armed ──start──► Streaming ──stop──► Idle
///                                    │
///                                    └─fault─► Faulted ──stop──► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// No buffers bound, no notifications expected.
    Idle,
    /// Buffers bound and zeroed, filters configured, DMA not started.
    Armed,
    /// Both transfers running; notifications are processed.
    Streaming,
    /// A timing violation was detected. Only `stop` leaves this state.
    Faulted(FaultKind),
}

impl StreamState {
    /// `true` while the platform's DMA transfers are (or may be) running.
    #[must_use]
    pub fn dma_running(self) -> bool {
        matches!(self, Self::Streaming | Self::Faulted(_))
    }
}

/// Why the stream faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Playback DMA was already reading the slot about to be written.
    Underrun,
    /// A capture notification arrived out of order: a half completed again
    /// before the other half was handled.
    Overrun,
    /// The filter bank rejected a capture half, or its playback slot could
    /// not be written. Not reachable once `arm` has validated the buffer
    /// layout.
    Filter,
}

/// Snapshot of the stream when it faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamFault {
    /// Fault classification.
    pub kind: FaultKind,
    /// Capture half whose notification triggered the fault.
    pub half: Half,
    /// Playback slot start at the time of the fault.
    pub position: usize,
    /// Halves successfully processed before the fault.
    pub halves_processed: u64,
}
