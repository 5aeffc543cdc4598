//! Configuration management for the avatar gateway

pub mod file;

use url::Url;

use crate::{Error, Result};

/// Avatar gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech service configuration (synthesis + relay tokens)
    pub speech: SpeechConfig,

    /// Chat completion configuration
    pub chat: ChatConfig,

    /// Retrieval grounding; at most one data source per session
    pub grounding: Option<GroundingConfig>,

    /// Session behavior toggles
    pub session: SessionConfig,
}

/// Speech service configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speech resource subscription key
    pub subscription_key: String,

    /// Speech resource region
    pub region: String,

    /// Private endpoint override; replaces the region-derived hosts
    pub endpoint: Option<String>,

    /// Synthesis voice name
    pub voice: String,
}

impl SpeechConfig {
    /// Synthesis endpoint URL for SSML submission
    #[must_use]
    pub fn synthesis_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/cognitiveservices/v1", endpoint.trim_end_matches('/')),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.region
            ),
        }
    }

    /// Relay token endpoint URL for media negotiation
    #[must_use]
    pub fn relay_token_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/cognitiveservices/avatar/relay/token/v1",
                endpoint.trim_end_matches('/')
            ),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/avatar/relay/token/v1",
                self.region
            ),
        }
    }
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Endpoint base URL
    pub endpoint: String,

    /// API key
    pub api_key: String,

    /// Deployment (model) name
    pub deployment: String,

    /// System prompt seeding each conversation
    pub system_prompt: String,
}

/// Retrieval grounding configuration
#[derive(Debug, Clone)]
pub struct GroundingConfig {
    /// Search service endpoint
    pub endpoint: String,

    /// Search service API key
    pub api_key: String,

    /// Search index name
    pub index_name: String,

    /// Speak a filler phrase while a grounded query is in flight
    pub quick_replies: bool,
}

/// Session behavior toggles
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Reconnect automatically when video playback stalls
    pub auto_reconnect: bool,

    /// Tear down to a local idle loop after prolonged silence
    pub idle_fallback: bool,

    /// Keep the microphone listening after each recognized query
    pub continuous_conversation: bool,
}

/// Default system prompt when none is configured
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an AI assistant that helps people find information.";

impl Config {
    /// Load configuration from the TOML file and environment (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required field is missing or malformed; no
    /// side effects have happened at that point.
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let speech = SpeechConfig {
            subscription_key: std::env::var("AVATAR_SPEECH_KEY")
                .ok()
                .or(fc.speech.subscription_key.clone())
                .unwrap_or_default(),
            region: std::env::var("AVATAR_SPEECH_REGION")
                .ok()
                .or(fc.speech.region.clone())
                .unwrap_or_else(|| "westus2".to_string()),
            endpoint: std::env::var("AVATAR_SPEECH_ENDPOINT")
                .ok()
                .or(fc.speech.endpoint.clone()),
            voice: std::env::var("AVATAR_TTS_VOICE")
                .ok()
                .or(fc.speech.voice.clone())
                .unwrap_or_else(|| "en-US-JennyNeural".to_string()),
        };

        let chat = ChatConfig {
            endpoint: std::env::var("AVATAR_CHAT_ENDPOINT")
                .ok()
                .or(fc.chat.endpoint.clone())
                .unwrap_or_default(),
            api_key: std::env::var("AVATAR_CHAT_KEY")
                .ok()
                .or(fc.chat.api_key.clone())
                .unwrap_or_default(),
            deployment: std::env::var("AVATAR_CHAT_DEPLOYMENT")
                .ok()
                .or(fc.chat.deployment.clone())
                .unwrap_or_default(),
            system_prompt: std::env::var("AVATAR_SYSTEM_PROMPT")
                .ok()
                .or(fc.chat.system_prompt.clone())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let grounding = Self::load_grounding(&fc)?;

        let session = SessionConfig {
            auto_reconnect: env_flag("AVATAR_AUTO_RECONNECT")
                .or(fc.session.auto_reconnect)
                .unwrap_or(false),
            idle_fallback: env_flag("AVATAR_IDLE_FALLBACK")
                .or(fc.session.idle_fallback)
                .unwrap_or(false),
            continuous_conversation: env_flag("AVATAR_CONTINUOUS_CONVERSATION")
                .or(fc.session.continuous_conversation)
                .unwrap_or(true),
        };

        let config = Self {
            speech,
            chat,
            grounding,
            session,
        };
        config.validate()?;
        Ok(config)
    }

    /// Assemble the grounding section; all three identifying fields must be
    /// present together or absent together
    fn load_grounding(fc: &file::AvatarConfigFile) -> Result<Option<GroundingConfig>> {
        let endpoint = std::env::var("AVATAR_SEARCH_ENDPOINT")
            .ok()
            .or_else(|| fc.grounding.endpoint.clone());
        let api_key = std::env::var("AVATAR_SEARCH_KEY")
            .ok()
            .or_else(|| fc.grounding.api_key.clone());
        let index_name = std::env::var("AVATAR_SEARCH_INDEX")
            .ok()
            .or_else(|| fc.grounding.index_name.clone());

        match (endpoint, api_key, index_name) {
            (Some(endpoint), Some(api_key), Some(index_name)) => Ok(Some(GroundingConfig {
                endpoint,
                api_key,
                index_name,
                quick_replies: env_flag("AVATAR_QUICK_REPLIES")
                    .or(fc.grounding.quick_replies)
                    .unwrap_or(false),
            })),
            (None, None, None) => Ok(None),
            _ => Err(Error::Config(
                "grounding requires endpoint, api_key, and index_name together".to_string(),
            )),
        }
    }

    /// Validate required fields before any network side effect
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first missing or malformed field.
    pub fn validate(&self) -> Result<()> {
        if self.speech.subscription_key.is_empty() {
            return Err(Error::Config(
                "speech.subscription_key is required".to_string(),
            ));
        }
        if let Some(endpoint) = &self.speech.endpoint {
            Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("speech.endpoint is not a valid URL: {e}")))?;
        }

        if self.chat.endpoint.is_empty() || self.chat.api_key.is_empty() || self.chat.deployment.is_empty() {
            return Err(Error::Config(
                "chat.endpoint, chat.api_key, and chat.deployment are required".to_string(),
            ));
        }
        Url::parse(&self.chat.endpoint)
            .map_err(|e| Error::Config(format!("chat.endpoint is not a valid URL: {e}")))?;

        if let Some(grounding) = &self.grounding {
            if grounding.endpoint.is_empty()
                || grounding.api_key.is_empty()
                || grounding.index_name.is_empty()
            {
                return Err(Error::Config(
                    "grounding.endpoint, grounding.api_key, and grounding.index_name are required"
                        .to_string(),
                ));
            }
            Url::parse(&grounding.endpoint)
                .map_err(|e| Error::Config(format!("grounding.endpoint is not a valid URL: {e}")))?;
        }

        Ok(())
    }
}

/// Read a boolean env var ("1"/"true" = on)
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}
