//! Streaming controller errors.

use pdm::FilterError;
use thiserror::Error;

/// Why `arm` rejected the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutIssue {
    /// Each capture half must hold exactly one raw frame.
    #[error("capture buffer has {got} words, expected {expected}")]
    CaptureLength {
        /// `2 × raw words per frame`.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
    /// Playback length must be a non-zero multiple of the PCM chunk.
    #[error("playback buffer of {got} samples is not a multiple of the {chunk}-sample chunk")]
    PlaybackLength {
        /// Interleaved samples per half.
        chunk: usize,
        /// Supplied length.
        got: usize,
    },
    /// Capture halves must start on, and span whole, cache lines.
    #[error("capture halves are not cache-line aligned")]
    CacheAlignment,
}

/// Streaming controller errors. `E` is the platform's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError<E> {
    /// `arm` outside Idle.
    #[error("stream already armed")]
    AlreadyArmed,
    /// `arm` or `start` while streaming.
    #[error("stream already running")]
    AlreadyStreaming,
    /// `start` without a successful `arm` since the last `stop`.
    #[error("stream not armed")]
    NotArmed,
    /// Buffer geometry does not match the capture configuration.
    #[error("invalid buffer layout: {0}")]
    InvalidBufferLayout(LayoutIssue),
    /// The platform refused to start a transfer.
    #[error("platform refused transfer: {0:?}")]
    Platform(E),
    /// The filter bank rejected the configuration.
    #[error(transparent)]
    Filter(#[from] FilterError),
}
