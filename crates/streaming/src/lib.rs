//! Real-time PDM microphone → PCM playback streaming core
//!
//! Drives a double-buffered capture DMA and a circular playback DMA through
//! the [`platform::StreamPlatform`] seam, decimating each completed capture
//! half with a [`pdm::PdmFilterBank`] and writing the result one chunk ahead
//! of the playback DMA.
//!
//! # Wiring
//!
//! ```text
//! BDMA HT/TC IRQ ──► StreamController::on_notification ──► StreamEvents ──► app task
//!                          │                                               │
//!                          ├─ invalidate capture half                      └─ StreamRecovery
//!                          ├─ decimate (pdm)
//!                          └─ write + clean playback slot
//! ```
//!
//! # Features
//!
//! - `std`: host builds (forwards to `platform/std`)
//! - `defmt`: logging and `defmt::Format` on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)] // state queries: callers decide

pub mod controller;
pub mod error;
pub mod events;
pub mod position;
pub mod recovery;
pub mod state;

pub use controller::{StreamBuffers, StreamController, MAX_CHUNK_SAMPLES};
pub use error::{LayoutIssue, StreamError};
pub use events::{EventReceiver, EventSender, StreamEvent, StreamEvents, EVENT_DEPTH};
pub use position::StreamPosition;
pub use recovery::StreamRecovery;
pub use state::{FaultKind, StreamFault, StreamState};
