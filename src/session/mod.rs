//! Avatar session lifecycle
//!
//! Ties the relay, media transport, speech queue, chat orchestrator, and
//! liveness monitor to one session; all shared flags live in `SessionState`
//! and die with the session.

pub mod liveness;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::ChatOrchestrator;
use crate::config::Config;
use crate::media::{ConnectionState, MediaEvent, MediaTransport, TrackKind};
use crate::relay::RelayClient;
use crate::speech::{SpeechQueue, Synthesizer};
use crate::Result;

use liveness::{LivenessEvent, LivenessMonitor};

/// Delay between the video track starting and the session counting as active
pub const ACTIVATION_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct StateInner {
    active: AtomicBool,
    speaking: AtomicBool,
    last_speak: Mutex<Option<Instant>>,
}

/// Shared session flags: active, speaking, and last speech activity
///
/// Clones share the same state. Writers are the session, the speech queue,
/// and the liveness monitor; there are no others.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<StateInner>,
}

impl SessionState {
    /// Fresh state: inactive, silent, no speech recorded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Mark the session active or inactive
    pub fn set_active(&self, active: bool) {
        self.inner.active.store(active, Ordering::SeqCst);
    }

    /// Whether an utterance is in flight
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.inner.speaking.load(Ordering::SeqCst)
    }

    /// Mark synthesis as in flight or idle
    pub fn set_speaking(&self, speaking: bool) {
        self.inner.speaking.store(speaking, Ordering::SeqCst);
    }

    /// Record speech activity now
    pub fn mark_spoke(&self) {
        *self.inner.last_speak.lock().unwrap() = Some(Instant::now());
    }

    /// Time since the last recorded speech activity, if any
    #[must_use]
    pub fn last_speak_elapsed(&self) -> Option<Duration> {
        self.inner.last_speak.lock().unwrap().map(|t| t.elapsed())
    }
}

/// One avatar session: lifecycle, wiring, and the console front end
pub struct AvatarSession {
    id: Uuid,
    config: Config,
    state: SessionState,
    queue: SpeechQueue,
    orchestrator: ChatOrchestrator,
    transport: Option<Arc<dyn MediaTransport>>,
    monitor_shutdown: Option<mpsc::Sender<()>>,
    liveness_hold: Option<mpsc::Sender<LivenessEvent>>,
}

impl AvatarSession {
    /// Assemble a session; `transport` is `None` for chat-only operation
    #[must_use]
    pub fn new(
        config: Config,
        synthesizer: Arc<dyn Synthesizer>,
        transport: Option<Arc<dyn MediaTransport>>,
        display: mpsc::UnboundedSender<String>,
    ) -> Self {
        let state = SessionState::new();
        let queue = SpeechQueue::new(synthesizer, state.clone());
        let orchestrator = ChatOrchestrator::new(&config, queue.clone(), state.clone(), display);

        Self {
            id: Uuid::new_v4(),
            config,
            state,
            queue,
            orchestrator,
            transport,
            monitor_shutdown: None,
            liveness_hold: None,
        }
    }

    /// Session identifier for log correlation
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shared session flags
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Connect the avatar media path and start liveness monitoring
    ///
    /// Returns the liveness event receiver. Without a transport the session
    /// runs chat-only: it is immediately active and the receiver never fires.
    ///
    /// # Errors
    ///
    /// Returns error if the relay token fetch or media negotiation fails
    pub async fn connect(&mut self) -> Result<mpsc::Receiver<LivenessEvent>> {
        self.shutdown_monitor().await;

        let Some(transport) = self.transport.clone() else {
            tracing::info!(session = %self.id, "no media transport attached, running chat-only");
            self.state.set_active(true);
            // Keep the sender so the receiver stays open without firing
            let (hold_tx, hold_rx) = mpsc::channel(1);
            self.liveness_hold = Some(hold_tx);
            return Ok(hold_rx);
        };

        let relay = RelayClient::new(&self.config.speech);
        let ice = relay.fetch_ice_server().await?;
        let mut media_events = transport.connect(&ice).await?;
        tracing::info!(session = %self.id, "media negotiation started");

        let state = self.state.clone();
        let idle_fallback = self.config.session.idle_fallback;
        tokio::spawn(async move {
            while let Some(event) = media_events.recv().await {
                match event {
                    MediaEvent::TrackOpened(TrackKind::Video) => {
                        tracing::info!("video track connected");
                        let state = state.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(ACTIVATION_DELAY).await;
                            state.set_active(true);
                            if idle_fallback {
                                // Start the silence clock once the avatar is live
                                state.mark_spoke();
                            }
                        });
                    }
                    MediaEvent::TrackOpened(TrackKind::Audio) => {
                        tracing::info!("audio track connected");
                    }
                    MediaEvent::StateChanged(connection_state) => {
                        tracing::info!(state = ?connection_state, "media connection state changed");
                        if connection_state == ConnectionState::Disconnected && idle_fallback {
                            tracing::info!("transport lost, showing local idle loop");
                        }
                    }
                }
            }
        });

        let monitor =
            LivenessMonitor::new(self.state.clone(), transport, self.config.session.idle_fallback);
        let (events, shutdown, _handle) = monitor.spawn();
        self.monitor_shutdown = Some(shutdown);
        Ok(events)
    }

    /// Tear the session down: stop speech, close media, go inactive
    pub async fn disconnect(&mut self) {
        self.queue.stop().await;
        self.shutdown_monitor().await;
        if let Some(transport) = &self.transport {
            transport.close().await;
        }
        self.state.set_active(false);
        tracing::info!(session = %self.id, "session disconnected");
    }

    async fn shutdown_monitor(&mut self) {
        self.liveness_hold = None;
        if let Some(shutdown) = self.monitor_shutdown.take() {
            let _ = shutdown.send(()).await;
        }
    }

    /// Run the interactive console front end until EOF or `/quit`
    ///
    /// Lines are user queries; `/clear` resets the transcript, `/stop` cuts
    /// off speech. Liveness events drive reconnect and idle teardown.
    ///
    /// # Errors
    ///
    /// Returns error if the initial connect fails
    pub async fn run_console(&mut self) -> Result<()> {
        let mut liveness = self.connect().await?;
        let mut liveness_open = true;

        tracing::info!(
            session = %self.id,
            grounded = self.config.grounding.is_some(),
            continuous = self.config.session.continuous_conversation,
            "session ready, type a message (/clear, /stop, /quit)"
        );

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            tokio::select! {
                event = liveness.recv(), if liveness_open => {
                    match event {
                        Some(LivenessEvent::Stalled) => {
                            if self.config.session.auto_reconnect {
                                tracing::warn!("video stream disconnected, reconnecting");
                                match self.connect().await {
                                    Ok(receiver) => {
                                        liveness = receiver;
                                        liveness_open = true;
                                    }
                                    Err(e) => tracing::error!(error = %e, "reconnect failed"),
                                }
                            }
                        }
                        Some(LivenessEvent::Idle) => {
                            self.disconnect().await;
                        }
                        None => liveness_open = false,
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match line.trim() {
                        "" => {}
                        "/quit" => break,
                        "/clear" => self.orchestrator.clear_history(),
                        "/stop" => self.queue.stop().await,
                        query => {
                            if let Err(e) = self.orchestrator.handle_user_query(query).await {
                                tracing::error!(error = %e, "chat turn failed");
                            }
                            println!();
                        }
                    }
                }
            }
        }

        self.disconnect().await;
        Ok(())
    }

    /// Chat orchestrator for this session
    pub fn orchestrator(&mut self) -> &mut ChatOrchestrator {
        &mut self.orchestrator
    }

    /// Speech queue for this session
    #[must_use]
    pub fn queue(&self) -> &SpeechQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_inactive_and_silent() {
        let state = SessionState::new();
        assert!(!state.is_active());
        assert!(!state.is_speaking());
        assert!(state.last_speak_elapsed().is_none());
    }

    #[test]
    fn test_clones_share_flags() {
        let state = SessionState::new();
        let clone = state.clone();
        state.set_active(true);
        clone.set_speaking(true);
        assert!(clone.is_active());
        assert!(state.is_speaking());
    }

    #[test]
    fn test_mark_spoke_starts_the_clock() {
        let state = SessionState::new();
        state.mark_spoke();
        assert!(state.last_speak_elapsed().unwrap() < Duration::from_secs(1));
    }
}
