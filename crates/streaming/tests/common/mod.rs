//! Shared fixtures: leaked DMA buffers and a mock-backed controller.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::arithmetic_side_effects)]

use platform::dma_safety::{AxiSramRegion, DmaBuffer, Sram4Region};
use platform::mocks::{MockCache, MockStreamPlatform};
use platform::{DmaRegion, PdmCaptureConfig};
use streaming::{StreamController, StreamEvents};

pub type MockController = StreamController<MockStreamPlatform, MockCache>;

/// Reference geometry: 256-word capture, 256-sample playback, chunk 32.
pub const CAPTURE_WORDS: usize = 256;
pub const PLAYBACK_SAMPLES: usize = 256;
pub const CHUNK: usize = 32;
pub const HALF_WORDS: usize = CAPTURE_WORDS / 2;

pub fn leak_capture<const N: usize>() -> DmaRegion<'static, u16> {
    let buf: &'static mut DmaBuffer<Sram4Region, [u16; N]> =
        Box::leak(Box::new(DmaBuffer::new([0; N])));
    buf.region()
}

pub fn leak_playback<const N: usize>() -> DmaRegion<'static, i16> {
    let buf: &'static mut DmaBuffer<AxiSramRegion, [i16; N]> =
        Box::leak(Box::new(DmaBuffer::new([0; N])));
    buf.region()
}

pub fn leak_events() -> &'static StreamEvents {
    Box::leak(Box::new(StreamEvents::new()))
}

pub fn controller() -> MockController {
    StreamController::new(MockStreamPlatform::new(), MockCache::new())
}

/// Controller armed with the reference configuration.
pub fn armed() -> MockController {
    let mut c = controller();
    c.arm(
        leak_capture::<CAPTURE_WORDS>(),
        leak_playback::<PLAYBACK_SAMPLES>(),
        &PdmCaptureConfig::reference(),
    )
    .unwrap();
    c
}

/// Controller armed and started with the reference configuration.
pub fn streaming() -> MockController {
    let mut c = armed();
    c.start().unwrap();
    c
}

/// Deterministic, non-trivial PDM words for half number `n`.
pub fn pdm_half(n: usize) -> Vec<u16> {
    (0..HALF_WORDS)
        .map(|i| ((i + n * HALF_WORDS) as u16).wrapping_mul(0x9E37) ^ 0x5A5A)
        .collect()
}

/// Act as the capture DMA filling half `n` (even → first, odd → second),
/// then deliver the matching notification.
pub fn feed_half(c: &mut MockController, n: usize) {
    let offset = if n % 2 == 0 { 0 } else { HALF_WORDS };
    assert!(c.platform().dma_write_capture(offset, &pdm_half(n)));
    if n % 2 == 0 {
        c.on_capture_half_complete();
    } else {
        c.on_capture_full_complete();
    }
}
