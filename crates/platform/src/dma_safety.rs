//! DMA safety marker traits, DMA-capable buffer containers and sizing
//! constants for STM32H7.
//!
//! ## DMA Accessibility on STM32H743/H745
//!
//! | Memory Region | Base Address | Size   | DMA1/2 | MDMA | BDMA | Use case |
//! |---------------|-------------|--------|--------|------|------|----------|
//! | AXI SRAM      | 0x2400_0000 | 512 KB | YES    | YES  | NO   | PCM playback (SAI1/SAI2 TX) |
//! | SRAM4 (D3)    | 0x3800_0000 | 64 KB  | NO     | NO   | YES  | PDM capture (SAI4 RX) |
//! | DTCM          | 0x2000_0000 | 128 KB | NO     | NO   | NO   | CPU-only: stack, ISR scratch |
//!
//! ## Usage
//! ```rust
//! use platform::dma_safety::{AxiSramRegion, DmaBuffer, Sram4Region};
//! use platform::dma_safety::{CAPTURE_BUFFER_WORDS, PLAYBACK_BUFFER_SAMPLES};
//!
//! // BDMA-accessible PDM capture buffer (SAI4 block A):
//! #[link_section = ".sram4"]
//! static mut PDM_BUF: DmaBuffer<Sram4Region, [u16; CAPTURE_BUFFER_WORDS]> =
//!     DmaBuffer::new([0; CAPTURE_BUFFER_WORDS]);
//!
//! // DMA1-accessible PCM playback buffer:
//! #[link_section = ".axisram"]
//! static mut PCM_BUF: DmaBuffer<AxiSramRegion, [i16; PLAYBACK_BUFFER_SAMPLES]> =
//!     DmaBuffer::new([0; PLAYBACK_BUFFER_SAMPLES]);
//! ```

use core::marker::PhantomData;

use crate::dma::DmaRegion;

// ── Memory region addresses ──────────────────────────────────────────────────

/// Base address of AXI SRAM (DMA1/2/MDMA accessible, D1 domain).
pub const AXI_SRAM_BASE: u32 = 0x2400_0000;

/// Size of AXI SRAM in bytes (512 KB).
pub const AXI_SRAM_SIZE_BYTES: usize = 512 * 1024;

/// Base address of SRAM4 (BDMA-only, D3 domain).
pub const SRAM4_BASE: u32 = 0x3800_0000;

/// Size of SRAM4 in bytes (64 KB).
pub const SRAM4_SIZE_BYTES: usize = 64 * 1024;

/// True: DTCM is NOT DMA-accessible. Place no DMA buffers here.
pub const DTCM_NOT_DMA_ACCESSIBLE: bool = true;

/// Cortex-M7 L1 data-cache line size in bytes.
///
/// Every DMA half must start on, and span a whole number of, cache lines;
/// otherwise invalidating one half discards CPU writes to its neighbour.
pub const CACHE_LINE_BYTES: usize = 32;

// ── Loopback buffer geometry ─────────────────────────────────────────────────

/// PDM capture buffer length in 16-bit words (two halves of 128 words).
///
/// One half holds 1 ms of stereo PDM at 1.024 MHz:
/// 16 samples × 64 bits ÷ 8 = 128 bytes per mic, × 2 mics = 256 bytes.
pub const CAPTURE_BUFFER_WORDS: usize = 256;

/// PCM playback buffer length in samples.
pub const PLAYBACK_BUFFER_SAMPLES: usize = 256;

/// Interleaved PCM samples produced per capture half (16 per channel × 2).
pub const PCM_CHUNK_SAMPLES: usize = 32;

// ── Marker traits ────────────────────────────────────────────────────────────

/// Marker trait: memory region accessible by DMA1, DMA2, and MDMA.
///
/// # Safety
/// Only implement for zero-sized types representing memory regions
/// that are physically accessible by a DMA controller. Implementing this
/// trait for DTCM causes silent DMA data corruption or bus faults.
pub unsafe trait DmaAccessible: Sized {}

/// Marker trait: memory region accessible by BDMA (D3 domain).
///
/// # Safety
/// BDMA can only access D3 SRAM4 (0x3800_0000, 64 KB).
///
/// Peripherals requiring BDMA: SAI4 (PDM interface), SPI6, LPUART1, I2C4.
pub unsafe trait BdmaAccessible: DmaAccessible {}

// ── Region zero-sized types ──────────────────────────────────────────────────

/// Zero-sized type representing AXI SRAM (DMA1/DMA2/MDMA accessible).
///
/// Buffers placed here via `#[link_section = ".axisram"]`.
#[derive(Debug, Clone, Copy)]
pub struct AxiSramRegion;

// SAFETY: AXI SRAM at 0x2400_0000 is in D1 domain, accessible by all
// DMA controllers (DMA1, DMA2, MDMA) per the STM32H7 reference manual.
unsafe impl DmaAccessible for AxiSramRegion {}

/// Zero-sized type representing SRAM4 (BDMA-only, D3 domain).
///
/// Buffers placed here via `#[link_section = ".sram4"]`. The SAI4 PDM
/// capture stream must live here.
#[derive(Debug, Clone, Copy)]
pub struct Sram4Region;

// SAFETY: SRAM4 at 0x3800_0000 is in D3 domain, accessible by BDMA.
unsafe impl DmaAccessible for Sram4Region {}
// SAFETY: SRAM4 is the only region BDMA can reach.
unsafe impl BdmaAccessible for Sram4Region {}

/// Zero-sized type representing DTCM (CPU-only, NOT DMA-accessible).
#[derive(Debug, Clone, Copy)]
pub struct DtcmRegion;
// DtcmRegion intentionally does NOT implement DmaAccessible or BdmaAccessible.

// ── Alignment markers ────────────────────────────────────────────────────────

/// Zero-sized alignment marker for one Cortex-M7 cache line (32 bytes).
#[derive(Debug, Clone, Copy)]
#[repr(align(32))]
pub struct CacheLineAligned;

/// Zero-sized alignment marker for 64 bytes (two cache lines, MDMA bursts).
#[derive(Debug, Clone, Copy)]
#[repr(align(64))]
pub struct Align64;

// ── DmaBuffer ────────────────────────────────────────────────────────────────

/// A DMA-capable memory block placed in region `R` and aligned to `A`.
///
/// The zero-length `[A; 0]` field carries `A`'s alignment without
/// occupying space, so `DmaBuffer<_, [u16; 256]>` is exactly 512 bytes
/// on a 32-byte boundary.
///
/// The region parameter is a promise about the linker section the static
/// lives in; it cannot be checked at compile time, so always pair the type
/// with the matching `#[link_section]`.
#[repr(C)]
pub struct DmaBuffer<R, T, A = CacheLineAligned> {
    _align: [A; 0],
    data: T,
    _region: PhantomData<R>,
}

impl<R, T, A> DmaBuffer<R, T, A> {
    /// Wrap `data`. `const` so buffers can be initialised in `static`s.
    pub const fn new(data: T) -> Self {
        Self {
            _align: [],
            data,
            _region: PhantomData,
        }
    }

    /// CPU view of the buffer. Only meaningful while no transfer is running.
    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<R: DmaAccessible, T: Copy, const N: usize, A> DmaBuffer<R, [T; N], A> {
    /// Hand the buffer to a DMA user for the duration of the borrow.
    pub fn region(&mut self) -> DmaRegion<'_, T> {
        DmaRegion::from_slice(&mut self.data)
    }
}
