//! Media relay token negotiation
//!
//! Before the peer connection can be set up, the speech service hands out
//! short-lived relay credentials over a token endpoint.

use serde::Deserialize;

use crate::config::SpeechConfig;
use crate::media::IceServer;
use crate::{Error, Result};

/// Relay token response
#[derive(Debug, Clone, Deserialize)]
pub struct RelayToken {
    /// Relay server URLs
    #[serde(rename = "Urls")]
    pub urls: Vec<String>,

    /// Relay username
    #[serde(rename = "Username")]
    pub username: String,

    /// Relay credential
    #[serde(rename = "Password")]
    pub password: String,
}

/// Fetches relay tokens from the speech service
pub struct RelayClient {
    client: reqwest::Client,
    token_url: String,
    subscription_key: String,
}

impl RelayClient {
    /// Create a relay client from the speech configuration
    #[must_use]
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: config.relay_token_url(),
            subscription_key: config.subscription_key.clone(),
        }
    }

    /// Fetch a relay token and shape it into an ICE server entry
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token carries no URLs
    pub async fn fetch_ice_server(&self) -> Result<IceServer> {
        tracing::debug!(url = %self.token_url, "fetching relay token");

        let response = self
            .client
            .get(&self.token_url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Relay(format!("relay token error {status}: {body}")));
        }

        let token: RelayToken = response.json().await?;
        let url = token
            .urls
            .first()
            .cloned()
            .ok_or_else(|| Error::Relay("relay token contained no URLs".to_string()))?;

        tracing::info!(relay = %url, "relay token acquired");
        Ok(IceServer {
            urls: vec![url],
            username: token.username,
            credential: token.password,
        })
    }
}
