//! Session liveness integration tests
//!
//! Monitor timings are shortened so hang and idle detection run in
//! milliseconds instead of wall-clock seconds.

use std::sync::Arc;
use std::time::Duration;

use avatar_gateway::session::liveness::{LivenessEvent, LivenessMonitor};
use avatar_gateway::session::SessionState;

mod common;

use common::FakeTransport;

const TICK: Duration = Duration::from_millis(20);

#[tokio::test]
async fn test_stalled_video_emits_event_and_deactivates() {
    let state = SessionState::new();
    state.set_active(true);

    let transport = Arc::new(FakeTransport::frozen_at(Duration::from_secs(3)));
    let monitor = LivenessMonitor::new(state.clone(), transport, false)
        .with_timings(TICK, Duration::from_secs(60));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("expected a liveness event")
        .unwrap();

    assert_eq!(event, LivenessEvent::Stalled);
    assert!(!state.is_active());
}

#[tokio::test]
async fn test_advancing_video_is_healthy() {
    let state = SessionState::new();
    state.set_active(true);
    state.set_speaking(true); // suppress idle detection entirely

    let positions: Vec<Duration> = (0..50).map(|i| Duration::from_millis(i * 100)).collect();
    let transport = Arc::new(FakeTransport::with_positions(&positions));
    let monitor = LivenessMonitor::new(state.clone(), transport, true)
        .with_timings(TICK, Duration::from_secs(60));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let result = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(result.is_err(), "no event expected while video advances");
    assert!(state.is_active());
}

#[tokio::test]
async fn test_inactive_session_is_not_sampled() {
    let state = SessionState::new();

    let transport = Arc::new(FakeTransport::frozen_at(Duration::from_secs(1)));
    let monitor = LivenessMonitor::new(state.clone(), transport, false)
        .with_timings(TICK, Duration::from_secs(60));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let result = tokio::time::timeout(Duration::from_millis(150), events.recv()).await;
    assert!(result.is_err(), "inactive sessions produce no events");
}

#[tokio::test]
async fn test_prolonged_silence_emits_idle() {
    let state = SessionState::new();
    state.set_active(true);
    state.mark_spoke();

    // Position advances, so only the idle rule can fire
    let positions: Vec<Duration> = (0..50).map(|i| Duration::from_millis(i * 100)).collect();
    let transport = Arc::new(FakeTransport::with_positions(&positions));
    let monitor = LivenessMonitor::new(state.clone(), transport, true)
        .with_timings(TICK, Duration::from_millis(50));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("expected an idle event")
        .unwrap();

    assert_eq!(event, LivenessEvent::Idle);
}

#[tokio::test]
async fn test_idle_requires_fallback_mode() {
    let state = SessionState::new();
    state.set_active(true);
    state.mark_spoke();

    let positions: Vec<Duration> = (0..50).map(|i| Duration::from_millis(i * 100)).collect();
    let transport = Arc::new(FakeTransport::with_positions(&positions));
    let monitor = LivenessMonitor::new(state.clone(), transport, false)
        .with_timings(TICK, Duration::from_millis(50));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let result = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(result.is_err(), "idle fallback disabled, no event expected");
}

#[tokio::test]
async fn test_speaking_session_never_goes_idle() {
    let state = SessionState::new();
    state.set_active(true);
    state.mark_spoke();
    state.set_speaking(true);

    let positions: Vec<Duration> = (0..50).map(|i| Duration::from_millis(i * 100)).collect();
    let transport = Arc::new(FakeTransport::with_positions(&positions));
    let monitor = LivenessMonitor::new(state.clone(), transport, true)
        .with_timings(TICK, Duration::from_millis(50));
    let (mut events, _shutdown, _handle) = monitor.spawn();

    let result = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(result.is_err(), "speaking sessions are not idle");
}

#[tokio::test]
async fn test_shutdown_stops_the_monitor() {
    let state = SessionState::new();
    state.set_active(true);

    let transport = Arc::new(FakeTransport::frozen_at(Duration::from_secs(3)));
    let monitor = LivenessMonitor::new(state, transport, false)
        .with_timings(TICK, Duration::from_secs(60));
    let (mut events, shutdown, handle) = monitor.spawn();

    shutdown.send(()).await.unwrap();
    handle.await.unwrap();

    // Drain anything already buffered; the channel then closes for good
    while events.recv().await.is_some() {}
}
