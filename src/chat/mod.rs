//! Chat orchestration
//!
//! Owns the transcript, issues streaming completion requests, and routes the
//! reply through the segmenter into the speech queue and the display surface.

pub mod segment;
pub mod stream;
pub mod transcript;

use futures::{Stream, StreamExt};
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::{ChatConfig, Config, GroundingConfig};
use crate::session::SessionState;
use crate::speech::{SpeechQueue, Utterance};
use crate::{Error, Result};

pub use segment::{SegmentStep, SentenceSegmenter};
pub use stream::{CompletionMode, FrameBuffer, StreamToken};
pub use transcript::{Role, Transcript, Turn};

/// Completion API version
const API_VERSION: &str = "2023-06-01-preview";

/// Filler phrases masking grounded-query latency
pub const QUICK_REPLIES: &[&str] =
    &["Let me take a look.", "Let me check.", "One moment, please."];

/// Floor-holding silence appended to a quick reply
const QUICK_REPLY_SILENCE_MS: u64 = 2000;

/// Retrieval data source attached to grounded requests; at most one per
/// session
#[derive(Debug, Clone, Serialize)]
pub struct DataSource {
    /// Data source kind discriminator
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-specific parameters
    pub parameters: DataSourceParameters,
}

/// Search index parameters for a retrieval data source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceParameters {
    pub endpoint: String,
    pub key: String,
    pub index_name: String,
    pub semantic_configuration: String,
    pub query_type: String,
    pub fields_mapping: FieldsMapping,
    pub in_scope: bool,
    pub role_information: String,
}

/// Maps index fields onto the retrieval schema
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsMapping {
    pub content_fields_separator: String,
    pub content_fields: Vec<String>,
    pub filepath_field: Option<String>,
    pub title_field: Option<String>,
    pub url_field: Option<String>,
}

impl DataSource {
    /// Build a search data source; the system prompt rides along as role
    /// information since grounded transcripts carry no system turn
    #[must_use]
    pub fn search_index(config: &GroundingConfig, role_information: &str) -> Self {
        Self {
            kind: "AzureCognitiveSearch".to_string(),
            parameters: DataSourceParameters {
                endpoint: config.endpoint.clone(),
                key: config.api_key.clone(),
                index_name: config.index_name.clone(),
                semantic_configuration: String::new(),
                query_type: "simple".to_string(),
                fields_mapping: FieldsMapping {
                    content_fields_separator: "\n".to_string(),
                    content_fields: vec!["content".to_string()],
                    filepath_field: None,
                    title_field: Some("title".to_string()),
                    url_field: None,
                },
                in_scope: true,
                role_information: role_information.to_string(),
            },
        }
    }
}

/// Streaming completion request body
#[derive(Serialize)]
struct CompletionRequest<'a> {
    #[serde(rename = "dataSources", skip_serializing_if = "Option::is_none")]
    data_sources: Option<Vec<&'a DataSource>>,
    messages: &'a [Turn],
    stream: bool,
}

/// HTTP client for the chat completion endpoint
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    deployment: String,
}

impl ChatClient {
    /// Create a client from the chat configuration
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
        }
    }

    /// Completion URL; grounded requests go through the extensions route
    fn completions_url(&self, grounded: bool) -> String {
        if grounded {
            format!(
                "{}/openai/deployments/{}/extensions/chat/completions?api-version={API_VERSION}",
                self.endpoint, self.deployment
            )
        } else {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
                self.endpoint, self.deployment
            )
        }
    }

    /// Issue a streaming completion request with the full turn history
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the endpoint rejects it
    pub async fn stream_completion(
        &self,
        turns: &[Turn],
        data_source: Option<&DataSource>,
    ) -> Result<reqwest::Response> {
        let body = CompletionRequest {
            data_sources: data_source.map(|ds| vec![ds]),
            messages: turns,
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url(data_source.is_some()))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("chat API error {status}: {body}")));
        }

        Ok(response)
    }
}

/// Orchestrator turn phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No request in flight
    Idle,
    /// Request sent, first frame not yet received
    AwaitingResponse,
    /// Reply frames arriving
    Streaming,
}

/// Drives one conversation: transcript, completion requests, segmentation,
/// and speech routing
pub struct ChatOrchestrator {
    client: ChatClient,
    transcript: Transcript,
    system_prompt: String,
    data_source: Option<DataSource>,
    quick_replies_enabled: bool,
    queue: SpeechQueue,
    state: SessionState,
    display: mpsc::UnboundedSender<String>,
    phase: TurnPhase,
}

impl ChatOrchestrator {
    /// Create an orchestrator; grounded sessions start with an empty
    /// transcript since the prompt lives in the data source
    #[must_use]
    pub fn new(
        config: &Config,
        queue: SpeechQueue,
        state: SessionState,
        display: mpsc::UnboundedSender<String>,
    ) -> Self {
        let data_source = config
            .grounding
            .as_ref()
            .map(|g| DataSource::search_index(g, &config.chat.system_prompt));
        let quick_replies_enabled = config.grounding.as_ref().is_some_and(|g| g.quick_replies);
        let system_prompt = config.chat.system_prompt.clone();
        let transcript = if data_source.is_some() {
            Transcript::new(None)
        } else {
            Transcript::new(Some(system_prompt.as_str()))
        };

        Self {
            client: ChatClient::new(&config.chat),
            transcript,
            system_prompt,
            data_source,
            quick_replies_enabled,
            queue,
            state,
            display,
            phase: TurnPhase::Idle,
        }
    }

    /// Resolved payload mode for this session
    #[must_use]
    pub fn mode(&self) -> CompletionMode {
        if self.data_source.is_some() {
            CompletionMode::Grounded
        } else {
            CompletionMode::Plain
        }
    }

    /// Current turn phase
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Conversation so far
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Reset the transcript to its initial state
    pub fn clear_history(&mut self) {
        if self.data_source.is_some() {
            self.transcript.reset(None);
        } else {
            self.transcript.reset(Some(self.system_prompt.as_str()));
        }
        tracing::info!("transcript cleared");
    }

    /// Handle one user query end to end
    ///
    /// In-flight speech is cancelled, the query is appended, and the
    /// streaming reply is segmented into the speech queue and display
    /// surface. Mid-stream failures keep whatever partial content was
    /// gathered.
    ///
    /// # Errors
    ///
    /// Returns error if the completion request itself fails; the appended
    /// user turn is not rolled back
    pub async fn handle_user_query(&mut self, query: &str) -> Result<()> {
        self.transcript.push(Role::User, query);

        if self.state.is_speaking() {
            self.queue.stop().await;
        }

        if self.data_source.is_some() && self.quick_replies_enabled {
            let reply = QUICK_REPLIES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(QUICK_REPLIES[0]);
            self.queue
                .enqueue(Utterance::with_ending_silence(reply, QUICK_REPLY_SILENCE_MS));
        }

        self.phase = TurnPhase::AwaitingResponse;
        tracing::debug!(
            turns = self.transcript.len(),
            grounded = self.data_source.is_some(),
            "requesting completion"
        );

        let response = match self
            .client
            .stream_completion(self.transcript.turns(), self.data_source.as_ref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.phase = TurnPhase::Idle;
                return Err(e);
            }
        };

        self.phase = TurnPhase::Streaming;
        self.consume_stream(response.bytes_stream()).await;
        self.phase = TurnPhase::Idle;
        Ok(())
    }

    /// Drain a streaming reply body into speech, display, and the transcript
    ///
    /// Read and parse failures are logged and non-fatal: the turn is
    /// finalized with whatever content arrived before the failure.
    pub async fn consume_stream<S, B, E>(&mut self, body: S)
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mode = self.mode();
        let mut frames = FrameBuffer::new();
        let mut segmenter = SentenceSegmenter::new(mode == CompletionMode::Grounded);
        let mut assistant_reply = String::new();
        let mut tool_content = String::new();

        futures::pin_mut!(body);
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::error!(error = %e, "response stream read failed");
                    break;
                }
            };

            for frame in frames.push(chunk.as_ref()) {
                match stream::parse_frame(&frame, mode) {
                    Ok(Some(StreamToken::Assistant(token))) => {
                        let step = segmenter.push(&token);
                        if !step.display.is_empty() {
                            assistant_reply.push_str(&step.display);
                            let _ = self.display.send(step.display);
                        }
                        for utterance in step.utterances {
                            self.queue.enqueue(Utterance::new(utterance));
                        }
                    }
                    Ok(Some(StreamToken::Tool(content))) => {
                        tool_content.push_str(&content);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, frame = %frame, "failed to parse stream frame");
                    }
                }
            }
        }

        if !frames.is_empty() {
            tracing::warn!("stream ended with an incomplete frame");
        }

        if let Some(rest) = segmenter.flush() {
            self.queue.enqueue(Utterance::new(rest));
        }

        if mode == CompletionMode::Grounded && !tool_content.is_empty() {
            self.transcript.push(Role::Tool, tool_content);
        }
        self.transcript.push(Role::Assistant, assistant_reply);
    }
}
