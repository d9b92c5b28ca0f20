//! PDM→PCM decimation for MEMS microphones
//!
//! Pure computation: no I/O, no allocation, deterministic given the input
//! block and the carried filter state. One [`PdmFilterBank`] serves every
//! microphone on a capture stream.
//!
//! ```
//! use pdm::PdmFilterBank;
//! use platform::PdmCaptureConfig;
//!
//! let mut bank = PdmFilterBank::from_config(&PdmCaptureConfig::reference()).unwrap();
//! let raw = [0xAAAA_u16; 128]; // 1 ms of PDM silence, two mics
//! let mut pcm = [0i16; 32];
//! assert_eq!(bank.process_interleaved(&raw, &mut pcm), Ok(32));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod bank;
pub mod filter;

pub use bank::{FilterError, PdmFilterBank};
pub use filter::{ChannelFilter, ChannelSettings, CIC_ORDER};
