//! TOML configuration file loading
//!
//! Supports `~/.config/avatar-gateway/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AvatarConfigFile {
    /// Speech service configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Chat completion configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Retrieval grounding configuration
    #[serde(default)]
    pub grounding: GroundingFileConfig,

    /// Session behavior toggles
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Speech resource subscription key
    pub subscription_key: Option<String>,

    /// Speech resource region (e.g. "westus2")
    pub region: Option<String>,

    /// Private endpoint override (replaces region-derived hosts)
    pub endpoint: Option<String>,

    /// Synthesis voice name (e.g. "en-US-JennyNeural")
    pub voice: Option<String>,
}

/// Chat completion configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Chat completion endpoint base URL
    pub endpoint: Option<String>,

    /// Chat completion API key
    pub api_key: Option<String>,

    /// Deployment (model) name
    pub deployment: Option<String>,

    /// System prompt seeding each conversation
    pub system_prompt: Option<String>,
}

/// Retrieval grounding configuration
#[derive(Debug, Default, Deserialize)]
pub struct GroundingFileConfig {
    /// Search service endpoint
    pub endpoint: Option<String>,

    /// Search service API key
    pub api_key: Option<String>,

    /// Search index name
    pub index_name: Option<String>,

    /// Speak a filler phrase while a grounded query is in flight
    pub quick_replies: Option<bool>,
}

/// Session behavior toggles
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Reconnect automatically when video playback stalls
    pub auto_reconnect: Option<bool>,

    /// Tear down to a local idle loop after prolonged silence
    pub idle_fallback: Option<bool>,

    /// Keep the microphone listening after each recognized query
    pub continuous_conversation: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AvatarConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AvatarConfigFile {
    let Some(path) = config_file_path() else {
        return AvatarConfigFile::default();
    };

    if !path.exists() {
        return AvatarConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AvatarConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AvatarConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/avatar-gateway/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("avatar-gateway").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let parsed: AvatarConfigFile = toml::from_str(
            r#"
            [speech]
            region = "westeurope"

            [session]
            auto_reconnect = true
            "#,
        )
        .unwrap();

        assert_eq!(parsed.speech.region.as_deref(), Some("westeurope"));
        assert!(parsed.speech.subscription_key.is_none());
        assert_eq!(parsed.session.auto_reconnect, Some(true));
        assert!(parsed.grounding.endpoint.is_none());
    }

    #[test]
    fn test_empty_file_parses() {
        let parsed: AvatarConfigFile = toml::from_str("").unwrap();
        assert!(parsed.chat.endpoint.is_none());
    }
}
