//! Session liveness monitoring
//!
//! Periodic sampling that catches stalled video playback and prolonged
//! silence, so the session can reconnect or fall back to the idle loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::media::MediaTransport;
use crate::session::SessionState;

/// Interval between liveness samples
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Silence threshold before the idle fallback fires
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Liveness finding delivered to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// Video position did not advance across two samples; session marked
    /// inactive
    Stalled,

    /// No speech activity past the idle threshold
    Idle,
}

/// Periodic hang and idle detector
pub struct LivenessMonitor {
    state: SessionState,
    transport: Arc<dyn MediaTransport>,
    idle_fallback: bool,
    interval: Duration,
    idle_timeout: Duration,
}

impl LivenessMonitor {
    /// Create a monitor with the default timings
    #[must_use]
    pub fn new(
        state: SessionState,
        transport: Arc<dyn MediaTransport>,
        idle_fallback: bool,
    ) -> Self {
        Self {
            state,
            transport,
            idle_fallback,
            interval: SAMPLE_INTERVAL,
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// Override sample interval and idle threshold
    #[must_use]
    pub fn with_timings(mut self, interval: Duration, idle_timeout: Duration) -> Self {
        self.interval = interval;
        self.idle_timeout = idle_timeout;
        self
    }

    /// Spawn the monitor loop
    ///
    /// Returns the event receiver, a shutdown sender, and the task handle.
    #[must_use]
    pub fn spawn(self) -> (mpsc::Receiver<LivenessEvent>, mpsc::Sender<()>, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so samples are spaced
            ticker.tick().await;

            let mut last_position: Option<Duration> = None;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        if self.check_hang(&mut last_position) {
                            let _ = event_tx.send(LivenessEvent::Stalled).await;
                        }
                        if self.check_idle() {
                            let _ = event_tx.send(LivenessEvent::Idle).await;
                        }
                    }
                }
            }
        });

        (event_rx, shutdown_tx, handle)
    }

    /// Compare the current video position against the previous sample
    fn check_hang(&self, last_position: &mut Option<Duration>) -> bool {
        if !self.state.is_active() {
            *last_position = None;
            return false;
        }

        let position = self.transport.playback_position();
        let stalled = position.is_some() && position == *last_position;
        *last_position = position;

        if stalled {
            self.state.set_active(false);
            tracing::warn!(position = ?position, "video playback stalled");
        }
        stalled
    }

    /// Check for prolonged silence while the session is otherwise healthy
    fn check_idle(&self) -> bool {
        if !self.idle_fallback || !self.state.is_active() || self.state.is_speaking() {
            return false;
        }

        match self.state.last_speak_elapsed() {
            Some(elapsed) if elapsed > self.idle_timeout => {
                tracing::info!(elapsed = ?elapsed, "no speech activity, session idle");
                true
            }
            _ => false,
        }
    }
}
