//! Hardware Abstraction Layer (HAL) for the PDM mic-to-PCM loopback
//!
//! This crate provides the types and trait seams the streaming core needs
//! from the board, enabling development and testing without physical
//! hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (interrupt handlers, event consumer)
//!         ↓
//! Streaming core (streaming crate - state machine, recovery)
//!         ↓
//! PDM filter bank (pdm crate - CIC, DC blocker, gain)
//!         ↓
//! Platform HAL (this crate - config, DMA regions, cache, stream traits)
//!         ↓
//! Hardware Layer (SAI4 + BDMA capture, SAI + DMA1 playback)
//! ```
//!
//! # Modules
//!
//! - [`audio_types`] - validated newtypes (rate, channels, decimation, gain)
//! - [`audio_config`] - [`PdmCaptureConfig`] and its derived geometry
//! - [`dma_safety`] - region marker traits and [`DmaBuffer`]
//! - [`dma`] - [`DmaRegion`] scoped, cache-bracketed access
//! - [`cache`] - [`CacheMaintenance`] for the Cortex-M7 D-cache
//! - [`audio_stream`] - [`StreamPlatform`] and [`Notification`]
//!
//! # Features
//!
//! - `std`: Enable standard library support and [`mocks`]
//! - `hardware`: Cortex-M7 cache maintenance through `cortex-m`
//! - `defmt`: Enable defmt formatting of public types
//!
//! # Example
//!
//! ```
//! use platform::PdmCaptureConfig;
//!
//! let config = PdmCaptureConfig::reference();
//! assert_eq!(config.pcm_chunk_samples(), 32);
//! assert_eq!(config.capture_buffer_words(), 256);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio_config;
pub mod audio_stream;
pub mod audio_types;
pub mod cache;
pub mod dma;
pub mod dma_safety;
#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export configuration types
pub use audio_config::{ConfigError, PdmCaptureConfig, PdmCaptureConfigBuilder};
pub use audio_types::{
    BitOrder, ChannelCount, DecimationFactor, Endianness, HighPassCoefficient, MicGainDb,
    OutOfRangeError, SampleRateHz, MAX_CHANNELS,
};

// Re-export stream and DMA types
pub use audio_stream::{Notification, StreamPlatform};
#[cfg(feature = "hardware")]
pub use cache::CortexM7DataCache;
pub use cache::{CacheMaintenance, NoCache};
pub use dma::{DmaRegion, Half};
pub use dma_safety::{AxiSramRegion, DmaBuffer, Sram4Region};
