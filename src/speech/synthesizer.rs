//! Speech synthesis backends

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::SpeechConfig;
use crate::speech::markup;
use crate::speech::queue::Utterance;
use crate::{Error, Result};

/// Requested synthesis output format
const OUTPUT_FORMAT: &str = "audio-24khz-96kbitrate-mono-mp3";

/// Synthesizes utterances; implementations must tolerate `stop` racing an
/// in-flight `speak`
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize one utterance, resolving when it has been fully rendered
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or is cancelled
    async fn speak(&self, utterance: &Utterance) -> Result<()>;

    /// Cancel in-flight synthesis
    async fn stop(&self);
}

/// Synthesizes speech through the speech service REST endpoint
pub struct RestSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    subscription_key: String,
    voice: String,
    cancel: Notify,
}

impl RestSynthesizer {
    /// Create a synthesizer from the speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if the subscription key is missing
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        if config.subscription_key.is_empty() {
            return Err(Error::Config(
                "speech subscription key required for synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.synthesis_url(),
            subscription_key: config.subscription_key.clone(),
            voice: config.voice.clone(),
            cancel: Notify::new(),
        })
    }
}

#[async_trait]
impl Synthesizer for RestSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        let ssml = markup::ssml_document(&self.voice, &utterance.text, utterance.ending_silence_ms);

        // The whole request, status check included, must stay cancellable
        let synthesize = async {
            let response = self
                .client
                .post(&self.endpoint)
                .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
                .header("Content-Type", "application/ssml+xml")
                .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
                .body(ssml)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Synthesis(format!("speech API error {status}: {body}")));
            }

            let audio = response.bytes().await?;
            Ok::<_, Error>(audio)
        };

        let audio = tokio::select! {
            () = self.cancel.notified() => {
                return Err(Error::Synthesis("synthesis cancelled".to_string()));
            }
            result = synthesize => result?,
        };

        tracing::debug!(
            bytes = audio.len(),
            text = %utterance.text,
            "synthesis complete"
        );
        Ok(())
    }

    async fn stop(&self) {
        self.cancel.notify_waiters();
    }
}

/// Discards utterances; used when speech output is disabled
pub struct SilentSynthesizer;

#[async_trait]
impl Synthesizer for SilentSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        tracing::debug!(text = %utterance.text, "speech disabled, dropping utterance");
        Ok(())
    }

    async fn stop(&self) {}
}
