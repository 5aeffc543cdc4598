//! Shared test fakes

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use avatar_gateway::config::{ChatConfig, Config, GroundingConfig, SessionConfig, SpeechConfig};
use avatar_gateway::media::{IceServer, MediaEvent, MediaTransport};
use avatar_gateway::speech::{Synthesizer, Utterance};
use avatar_gateway::Result;

/// Synthesizer that records what it was asked to speak
#[derive(Default)]
pub struct RecordingSynthesizer {
    /// Texts spoken, in completion order
    pub spoken: Mutex<Vec<String>>,
    /// Simulated synthesis duration
    pub delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Highest number of concurrent speak calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.spoken.lock().unwrap().push(utterance.text.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {}
}

/// Media transport with a scripted playback position
pub struct FakeTransport {
    positions: Mutex<VecDeque<Duration>>,
    last: Mutex<Option<Duration>>,
}

impl FakeTransport {
    /// Transport whose position follows `positions`, then repeats the last one
    pub fn with_positions(positions: &[Duration]) -> Self {
        Self {
            positions: Mutex::new(positions.iter().copied().collect()),
            last: Mutex::new(positions.last().copied()),
        }
    }

    /// Transport whose position never advances
    pub fn frozen_at(position: Duration) -> Self {
        Self::with_positions(&[position])
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(&self, _ice: &IceServer) -> Result<mpsc::Receiver<MediaEvent>> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    fn playback_position(&self) -> Option<Duration> {
        let mut positions = self.positions.lock().unwrap();
        match positions.pop_front() {
            Some(position) => {
                *self.last.lock().unwrap() = Some(position);
                Some(position)
            }
            None => *self.last.lock().unwrap(),
        }
    }

    async fn close(&self) {}
}

/// Minimal valid configuration for orchestrator tests
pub fn test_config(grounded: bool) -> Config {
    Config {
        speech: SpeechConfig {
            subscription_key: "test-key".to_string(),
            region: "westus2".to_string(),
            endpoint: None,
            voice: "en-US-JennyNeural".to_string(),
        },
        chat: ChatConfig {
            endpoint: "https://chat.test.invalid".to_string(),
            api_key: "test-key".to_string(),
            deployment: "test-deployment".to_string(),
            system_prompt: "You are helpful.".to_string(),
        },
        grounding: grounded.then(|| GroundingConfig {
            endpoint: "https://search.test.invalid".to_string(),
            api_key: "test-key".to_string(),
            index_name: "test-index".to_string(),
            quick_replies: false,
        }),
        session: SessionConfig::default(),
    }
}
