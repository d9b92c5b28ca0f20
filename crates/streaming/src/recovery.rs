//! Application-side stream fault bookkeeping.
//!
//! Once the controller faults it ignores every further notification, and
//! DMA keeps draining silence. Nothing restarts on its own: the
//! application task that owns the controller must
//!
//! 1. notice the fault ([`StreamEvent::Faulted`] on the event channel),
//! 2. call `stop()` to end DMA and reclaim the buffers,
//! 3. `arm()` + `start()` again with the same buffers.
//!
//! [`StreamRecovery`] tracks where the application is in that sequence.
//!
//! ```rust,ignore
//! let mut recovery = StreamRecovery::new();
//!
//! loop {
//!     recovery.on_event(&events.receive().await);
//!     if recovery.needs_rearm() {
//!         let buffers = controller.stop();
//!         // re-arm with the returned buffers, then:
//!         recovery.on_rearmed();
//!     }
//! }
//! ```

use crate::events::StreamEvent;
use crate::state::FaultKind;

/// Stream recovery state machine.
///
/// `fault_count` saturates at [`u8::MAX`] so a fault storm cannot wrap it
/// before the application reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamRecovery {
    /// Stream is running or has not faulted since the last re-arm.
    Healthy,
    /// The controller faulted; stop and re-arm, then call
    /// [`on_rearmed`][StreamRecovery::on_rearmed].
    NeedsRearm {
        /// Faults reported since the last re-arm.
        fault_count: u8,
        /// Most recent fault.
        last: FaultKind,
    },
}

impl StreamRecovery {
    /// Start out healthy.
    pub fn new() -> Self {
        Self::Healthy
    }

    /// `true` if the controller must be stopped and re-armed.
    pub fn needs_rearm(&self) -> bool {
        matches!(self, Self::NeedsRearm { .. })
    }

    /// Feed every event received from the handler.
    ///
    /// `HalfReady` leaves the state unchanged; `Faulted` moves to
    /// `NeedsRearm` or bumps its count.
    pub fn on_event(&mut self, event: &StreamEvent) {
        if let StreamEvent::Faulted(kind) = *event {
            *self = Self::NeedsRearm {
                fault_count: self.fault_count().saturating_add(1),
                last: kind,
            };
        }
    }

    /// Call after `stop` + `arm` + `start` succeeded.
    pub fn on_rearmed(&mut self) {
        *self = Self::Healthy;
    }

    /// Faults since the last re-arm, or 0 if healthy.
    pub fn fault_count(&self) -> u8 {
        match self {
            Self::NeedsRearm { fault_count, .. } => *fault_count,
            Self::Healthy => 0,
        }
    }

    /// Most recent fault, if any since the last re-arm.
    pub fn last_fault(&self) -> Option<FaultKind> {
        match self {
            Self::NeedsRearm { last, .. } => Some(*last),
            Self::Healthy => None,
        }
    }
}

impl Default for StreamRecovery {
    fn default() -> Self {
        Self::new()
    }
}
