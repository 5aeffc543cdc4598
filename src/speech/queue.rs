//! Utterance queue with single-flight synthesis
//!
//! Only one utterance synthesizes at a time; overflow waits in arrival order.
//! Completion of one utterance, successful or not, starts the next.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::session::SessionState;
use crate::speech::Synthesizer;

/// One unit of text submitted for synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,

    /// Trailing silence appended after the text
    pub ending_silence_ms: u64,
}

impl Utterance {
    /// Utterance with no trailing silence
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ending_silence_ms: 0,
        }
    }

    /// Utterance holding the floor for `ending_silence_ms` after the text
    #[must_use]
    pub fn with_ending_silence(text: impl Into<String>, ending_silence_ms: u64) -> Self {
        Self {
            text: text.into(),
            ending_silence_ms,
        }
    }
}

struct QueueInner {
    synthesizer: Arc<dyn Synthesizer>,
    state: SessionState,
    pending: Mutex<VecDeque<Utterance>>,
    idle: Notify,
}

/// Serializes utterances into the synthesizer
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct SpeechQueue {
    inner: Arc<QueueInner>,
}

impl SpeechQueue {
    /// Create a queue draining into `synthesizer`, mirroring speaking state
    /// and last-speak time into `state`
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>, state: SessionState) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                synthesizer,
                state,
                pending: Mutex::new(VecDeque::new()),
                idle: Notify::new(),
            }),
        }
    }

    /// Submit an utterance: synthesize now if idle, otherwise defer in FIFO
    /// order behind the in-flight one
    pub fn enqueue(&self, utterance: Utterance) {
        {
            let mut pending = self.inner.pending.lock().unwrap();
            if self.inner.state.is_speaking() {
                pending.push_back(utterance);
                tracing::debug!(queued = pending.len(), "synthesis busy, utterance deferred");
                return;
            }
            self.inner.state.set_speaking(true);
        }

        let queue = self.clone();
        tokio::spawn(async move {
            queue.drain(utterance).await;
        });
    }

    /// Synthesize `first` and whatever accumulates behind it, then go idle
    async fn drain(self, first: Utterance) {
        let mut current = first;
        loop {
            self.inner.state.mark_spoke();
            match self.inner.synthesizer.speak(&current).await {
                Ok(()) => {
                    self.inner.state.mark_spoke();
                    tracing::debug!(text = %current.text, "utterance spoken");
                }
                Err(e) => {
                    tracing::error!(error = %e, text = %current.text, "synthesis failed");
                }
            }

            // Popping and going idle must be one atomic step against enqueue
            let next = {
                let mut pending = self.inner.pending.lock().unwrap();
                match pending.pop_front() {
                    Some(next) => Some(next),
                    None => {
                        self.inner.state.set_speaking(false);
                        None
                    }
                }
            };

            match next {
                Some(next) => current = next,
                None => {
                    self.inner.idle.notify_waiters();
                    break;
                }
            }
        }
    }

    /// Clear pending utterances and cancel in-flight synthesis
    ///
    /// Cancellation is cooperative: the drain task observes the cleared queue
    /// after the current synthesis call returns and marks itself idle.
    pub async fn stop(&self) {
        self.inner.pending.lock().unwrap().clear();
        self.inner.synthesizer.stop().await;
        tracing::debug!("speech queue stopped");
    }

    /// Whether an utterance is currently in flight
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.inner.state.is_speaking()
    }

    /// Wait until the queue has fully drained
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_speaking() {
                return;
            }
            notified.await;
        }
    }
}
