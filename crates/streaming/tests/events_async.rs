//! Application-side event consumption with an async receiver.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

mod common;

use common::*;
use platform::{Half, PdmCaptureConfig};
use streaming::{FaultKind, StreamEvent, StreamRecovery, StreamState};

#[tokio::test]
async fn receiver_sees_halves_in_order() {
    let events = leak_events();
    let mut c = streaming().with_events(events.sender());
    for n in 0..3 {
        feed_half(&mut c, n);
    }

    let rx = events.receiver();
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(rx.receive().await);
    }
    assert_eq!(
        seen,
        [
            StreamEvent::HalfReady { half: Half::First, position: 0 },
            StreamEvent::HalfReady { half: Half::Second, position: CHUNK },
            StreamEvent::HalfReady { half: Half::First, position: 2 * CHUNK },
        ]
    );
}

#[tokio::test]
async fn consumer_that_keeps_up_loses_nothing() {
    const HALVES: usize = 20;
    let events = leak_events();
    let mut c = streaming().with_events(events.sender());
    let rx = events.receiver();

    let producer = async {
        for n in 0..HALVES {
            feed_half(&mut c, n);
            tokio::task::yield_now().await;
        }
    };
    let consumer = async {
        let mut positions = Vec::new();
        for _ in 0..HALVES {
            if let StreamEvent::HalfReady { position, .. } = rx.receive().await {
                positions.push(position);
            }
        }
        positions
    };
    let ((), positions) = tokio::join!(producer, consumer);

    let expected: Vec<usize> = (0..HALVES).map(|n| (n * CHUNK) % PLAYBACK_SAMPLES).collect();
    assert_eq!(positions, expected);
    assert_eq!(c.dropped_events(), 0);
}

#[tokio::test]
async fn fault_event_drives_recovery_through_rearm() {
    let events = leak_events();
    let mut c = streaming().with_events(events.sender());
    let rx = events.receiver();
    let mut recovery = StreamRecovery::new();

    feed_half(&mut c, 0);
    c.platform_mut().set_playback_position(Some(CHUNK));
    feed_half(&mut c, 1);
    assert_eq!(c.state(), StreamState::Faulted(FaultKind::Underrun));

    recovery.on_event(&rx.receive().await);
    assert!(!recovery.needs_rearm());
    recovery.on_event(&rx.receive().await);
    assert!(recovery.needs_rearm());
    assert_eq!(recovery.last_fault(), Some(FaultKind::Underrun));

    let buffers = c.stop().unwrap();
    c.platform_mut().set_playback_position(None);
    c.arm(buffers.capture, buffers.playback, &PdmCaptureConfig::reference())
        .unwrap();
    c.start().unwrap();
    recovery.on_rearmed();

    feed_half(&mut c, 0);
    recovery.on_event(&rx.receive().await);
    assert_eq!(recovery, StreamRecovery::Healthy);
    assert_eq!(c.platform().capture_starts(), 2);
}
