//! Handler → application event handoff.
//!
//! The notification handler runs in interrupt context and must never block.
//! It publishes through [`try_send_event`]; if the application has fallen
//! behind, the event is dropped and the controller counts the drop.
//!
//! CriticalSectionRawMutex masks interrupts only for the duration of one
//! queue push or pop (tens of nanoseconds), far below the 1 ms half period.
//!
//! ```
//! use streaming::events::{StreamEvent, StreamEvents};
//!
//! static EVENTS: StreamEvents = StreamEvents::new();
//!
//! // Interrupt side: hand EVENTS.sender() to the controller.
//! // Application side:
//! if let Ok(event) = EVENTS.receiver().try_receive() {
//!     if let StreamEvent::Faulted(_kind) = event { /* stop + re-arm */ }
//! }
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use platform::Half;

use crate::state::FaultKind;

/// Events buffered between handler and application.
pub const EVENT_DEPTH: usize = 4;

/// What the notification handler reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamEvent {
    /// A capture half was decimated into the playback slot at `position`.
    HalfReady {
        /// Capture half that was consumed.
        half: Half,
        /// First playback sample written.
        position: usize,
    },
    /// The stream entered the Faulted state.
    Faulted(FaultKind),
}

/// Channel carrying [`StreamEvent`]s out of interrupt context.
pub type StreamEvents = Channel<CriticalSectionRawMutex, StreamEvent, EVENT_DEPTH>;

/// Handler side of [`StreamEvents`].
pub type EventSender<'c> = Sender<'c, CriticalSectionRawMutex, StreamEvent, EVENT_DEPTH>;

/// Application side of [`StreamEvents`].
pub type EventReceiver<'c> = Receiver<'c, CriticalSectionRawMutex, StreamEvent, EVENT_DEPTH>;

/// Non-blocking publish. Returns `false` if the channel was full and the
/// event was dropped.
pub fn try_send_event(tx: &EventSender<'_>, event: StreamEvent) -> bool {
    tx.try_send(event).is_ok()
}
