//! Double-buffered PDM capture → PCM playback controller.
//!
//! The capture DMA fills one half of the capture buffer while the CPU
//! decimates the other. Each completed half becomes one chunk of
//! interleaved PCM written into the playback buffer at the current
//! [`StreamPosition`]; the playback DMA drains that buffer on its own
//! schedule.
//!
//! Per half, in order:
//!
//! 1. check ordering (`HalfTransfer` and `TransferComplete` must alternate)
//! 2. check the playback DMA is not inside the slot about to be written
//! 3. invalidate the capture half, decimate every channel
//! 4. write the playback slot, clean it
//! 5. advance the position, publish [`StreamEvent::HalfReady`]
//!
//! The handlers take `&mut self`, so a controller shared with an interrupt
//! lives behind a `critical_section::Mutex<RefCell<..>>` or an RTIC
//! resource; either gives the handler exclusivity relative to itself.

use pdm::PdmFilterBank;
use platform::dma_safety::CACHE_LINE_BYTES;
use platform::{
    CacheMaintenance, DmaRegion, Half, Notification, PdmCaptureConfig, SampleRateHz,
    StreamPlatform, MAX_CHANNELS,
};

use crate::error::{LayoutIssue, StreamError};
use crate::events::{try_send_event, EventSender, StreamEvent};
use crate::position::StreamPosition;
use crate::state::{FaultKind, StreamFault, StreamState};

/// Largest PCM chunk a valid configuration produces (1 ms at 192 kHz, four
/// channels).
#[allow(clippy::arithmetic_side_effects)] // const: 192 × 4
#[allow(clippy::cast_possible_truncation)] // 192 fits any usize
pub const MAX_CHUNK_SAMPLES: usize = (SampleRateHz::MAX_HZ / 1000) as usize * MAX_CHANNELS;

/// Capture and playback regions bound to a controller.
///
/// Both are `'static`: the DMA engine keeps using them until `end_stream`,
/// which the controller guarantees to call before handing them back.
pub struct StreamBuffers {
    /// Raw PDM words written by the capture DMA.
    pub capture: DmaRegion<'static, u16>,
    /// Interleaved PCM read by the playback DMA.
    pub playback: DmaRegion<'static, i16>,
}

/// Streaming state machine, driven by capture DMA notifications.
pub struct StreamController<P: StreamPlatform, C: CacheMaintenance> {
    platform: P,
    cache: C,
    state: StreamState,
    buffers: Option<StreamBuffers>,
    filter: Option<PdmFilterBank>,
    position: Option<StreamPosition>,
    half_ready: Option<Half>,
    halves_processed: u64,
    fault: Option<StreamFault>,
    events: Option<EventSender<'static>>,
    dropped_events: u32,
    scratch: [i16; MAX_CHUNK_SAMPLES],
}

impl<P: StreamPlatform, C: CacheMaintenance> StreamController<P, C> {
    /// Idle controller driving `platform`, keeping `cache` coherent.
    pub fn new(platform: P, cache: C) -> Self {
        Self {
            platform,
            cache,
            state: StreamState::Idle,
            buffers: None,
            filter: None,
            position: None,
            half_ready: None,
            halves_processed: 0,
            fault: None,
            events: None,
            dropped_events: 0,
            scratch: [0; MAX_CHUNK_SAMPLES],
        }
    }

    /// Publish [`StreamEvent`]s through `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventSender<'static>) -> Self {
        self.events = Some(events);
        self
    }

    /// Bind buffers and build the filter bank: Idle → Armed.
    ///
    /// Both buffers are zeroed (and cleaned) so playback starts from
    /// silence.
    ///
    /// # Errors
    ///
    /// - [`StreamError::AlreadyArmed`] in Armed or Faulted,
    ///   [`StreamError::AlreadyStreaming`] in Streaming
    /// - [`StreamError::InvalidBufferLayout`] if the geometry does not
    ///   match `config`
    /// - [`StreamError::Filter`] if the filter bank rejects `config`
    ///
    /// The controller stays Idle on error.
    pub fn arm(
        &mut self,
        mut capture: DmaRegion<'static, u16>,
        mut playback: DmaRegion<'static, i16>,
        config: &PdmCaptureConfig,
    ) -> Result<(), StreamError<P::Error>> {
        match self.state {
            StreamState::Idle => {}
            StreamState::Streaming => return Err(StreamError::AlreadyStreaming),
            StreamState::Armed | StreamState::Faulted(_) => return Err(StreamError::AlreadyArmed),
        }

        let position = validate_layout(&capture, &playback, config)
            .map_err(StreamError::InvalidBufferLayout)?;
        let filter = PdmFilterBank::from_config(config)?;

        capture.fill(0, &mut self.cache);
        playback.fill(0, &mut self.cache);

        self.buffers = Some(StreamBuffers { capture, playback });
        self.filter = Some(filter);
        self.position = Some(position);
        self.half_ready = None;
        self.halves_processed = 0;
        self.fault = None;
        self.state = StreamState::Armed;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "stream: armed, {} ch @ {} Hz, chunk {} of {}",
            config.channels().get(),
            config.output_rate().get(),
            position.chunk(),
            position.len()
        );
        Ok(())
    }

    /// Start capture, then playback DMA: Armed → Streaming.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotArmed`] in Idle or Faulted; no DMA call is made
    /// - [`StreamError::AlreadyStreaming`] in Streaming
    /// - [`StreamError::Platform`] if either transfer is refused; a
    ///   started capture is ended again and the controller stays Armed
    pub fn start(&mut self) -> Result<(), StreamError<P::Error>> {
        match self.state {
            StreamState::Armed => {}
            StreamState::Streaming => return Err(StreamError::AlreadyStreaming),
            StreamState::Idle | StreamState::Faulted(_) => return Err(StreamError::NotArmed),
        }
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(StreamError::NotArmed);
        };

        // SAFETY: the regions are 'static and stay bound to the controller
        // until `stop`/`drop`, both of which call `end_stream` first.
        let capture = unsafe {
            self.platform
                .begin_capture_stream(buffers.capture.as_mut_ptr(), buffers.capture.len())
        };
        capture.map_err(StreamError::Platform)?;

        // SAFETY: as above.
        let playback = unsafe {
            self.platform
                .begin_playback_stream(buffers.playback.as_ptr(), buffers.playback.len())
        };
        if let Err(e) = playback {
            self.platform.end_stream();
            #[cfg(feature = "defmt")]
            defmt::error!("stream: playback start refused, capture ended");
            return Err(StreamError::Platform(e));
        }

        self.state = StreamState::Streaming;
        #[cfg(feature = "defmt")]
        defmt::info!("stream: started");
        Ok(())
    }

    /// Handle the capture half-transfer interrupt (first half filled).
    pub fn on_capture_half_complete(&mut self) {
        self.on_half(Half::First);
    }

    /// Handle the capture transfer-complete interrupt (second half filled).
    pub fn on_capture_full_complete(&mut self) {
        self.on_half(Half::Second);
    }

    /// Dispatch a capture [`Notification`].
    pub fn on_notification(&mut self, notification: Notification) {
        self.on_half(notification.completed_half());
    }

    /// End DMA (if running), drop filter state and return the buffers:
    /// any state → Idle.
    ///
    /// Idempotent; returns `None` when nothing was bound.
    pub fn stop(&mut self) -> Option<StreamBuffers> {
        if self.state.dma_running() {
            self.platform.end_stream();
        }
        #[cfg(feature = "defmt")]
        if self.state != StreamState::Idle {
            defmt::info!("stream: stopped after {} halves", self.halves_processed);
        }
        self.state = StreamState::Idle;
        self.filter = None;
        self.position = None;
        self.half_ready = None;
        self.buffers.take()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Playback cursor; `None` unless armed.
    pub fn position(&self) -> Option<StreamPosition> {
        self.position
    }

    /// Details of the fault that moved the stream to Faulted, kept until
    /// the next `arm`.
    pub fn fault(&self) -> Option<StreamFault> {
        self.fault
    }

    /// Most recently processed capture half; `None` before the first one.
    pub fn half_ready(&self) -> Option<Half> {
        self.half_ready
    }

    /// Halves decimated since `arm`.
    pub fn halves_processed(&self) -> u64 {
        self.halves_processed
    }

    /// Events that could not be published because the channel was full.
    pub fn dropped_events(&self) -> u32 {
        self.dropped_events
    }

    /// The platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The platform, mutably (e.g. to inspect or reconfigure a board driver
    /// while Idle).
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// The cache maintenance implementation.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn on_half(&mut self, half: Half) {
        if self.state != StreamState::Streaming {
            #[cfg(feature = "defmt")]
            defmt::trace!("stream: {} ignored in {}", half, self.state);
            return;
        }

        let in_order = match half {
            Half::First => self.half_ready != Some(Half::First),
            Half::Second => self.half_ready == Some(Half::First),
        };
        if !in_order {
            self.enter_fault(FaultKind::Overrun, half);
            return;
        }

        let (Some(buffers), Some(filter), Some(position)) =
            (self.buffers.as_mut(), self.filter.as_mut(), self.position.as_mut())
        else {
            return;
        };

        let slot = position.slot();
        if self
            .platform
            .playback_position()
            .is_some_and(|read| slot.contains(&read))
        {
            self.enter_fault(FaultKind::Underrun, half);
            return;
        }

        let chunk = slot.len();
        let Some(scratch) = self.scratch.get_mut(..chunk) else {
            self.enter_fault(FaultKind::Filter, half);
            return;
        };

        let capture_range = buffers.capture.half_range(half);
        let decimated = buffers
            .capture
            .read_with(capture_range, &mut self.cache, |raw| {
                filter.process_interleaved(raw, scratch)
            });
        if !matches!(decimated, Some(Ok(n)) if n == chunk) {
            self.enter_fault(FaultKind::Filter, half);
            return;
        }

        let scratch = &*scratch;
        let written = buffers
            .playback
            .write_with(slot.clone(), &mut self.cache, |pcm| {
                for (dst, src) in pcm.iter_mut().zip(scratch) {
                    *dst = *src;
                }
            });
        if written.is_none() {
            self.enter_fault(FaultKind::Filter, half);
            return;
        }

        position.advance();
        self.half_ready = Some(half);
        self.halves_processed = self.halves_processed.saturating_add(1);

        #[cfg(feature = "defmt")]
        defmt::trace!("stream: {} -> pcm[{}..{}]", half, slot.start, slot.end);
        self.publish(StreamEvent::HalfReady {
            half,
            position: slot.start,
        });
    }

    fn enter_fault(&mut self, kind: FaultKind, half: Half) {
        self.state = StreamState::Faulted(kind);
        self.fault = Some(StreamFault {
            kind,
            half,
            position: self.position.map_or(0, |p| p.offset()),
            halves_processed: self.halves_processed,
        });
        // DMA keeps running until stop(); make it drain silence.
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.playback.fill(0, &mut self.cache);
        }
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "stream: {} on {} after {} halves",
            kind,
            half,
            self.halves_processed
        );
        self.publish(StreamEvent::Faulted(kind));
    }

    fn publish(&mut self, event: StreamEvent) {
        let Some(tx) = self.events.as_ref() else {
            return;
        };
        if !try_send_event(tx, event) {
            self.dropped_events = self.dropped_events.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("stream: event channel full, dropped {}", event);
        }
    }
}

impl<P: StreamPlatform, C: CacheMaintenance> Drop for StreamController<P, C> {
    fn drop(&mut self) {
        if self.state.dma_running() {
            self.platform.end_stream();
        }
    }
}

/// Check the regions against `config` and build the playback cursor.
fn validate_layout(
    capture: &DmaRegion<'_, u16>,
    playback: &DmaRegion<'_, i16>,
    config: &PdmCaptureConfig,
) -> Result<StreamPosition, LayoutIssue> {
    let expected = config.capture_buffer_words();
    if capture.len() != expected {
        return Err(LayoutIssue::CaptureLength {
            expected,
            got: capture.len(),
        });
    }
    if !capture.halves_cache_aligned(CACHE_LINE_BYTES) {
        return Err(LayoutIssue::CacheAlignment);
    }
    let chunk = config.pcm_chunk_samples();
    StreamPosition::new(playback.len(), chunk).ok_or(LayoutIssue::PlaybackLength {
        chunk,
        got: playback.len(),
    })
}
