//! Client configuration loaded from TOML.

use compact_str::CompactString;
use pcore::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};

/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://playkit.ai";

/// Resolves the bearer token attached to every request.
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// The current token, if one is available.
    fn token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.is_empty())
    }
}

/// Connection identity and defaults shared by every client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// Game identifier used in every endpoint path.
    pub game_id: String,
    /// Developer token (supports `${ENV_VAR}` expansion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_token: Option<String>,
    /// Player token (supports `${ENV_VAR}` expansion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_token: Option<String>,
    /// Use the player token even when a developer token is set.
    pub ignore_developer_token: bool,
    /// Default model per service.
    pub models: ModelDefaults,
    /// Overrides token resolution when set.
    #[serde(skip)]
    pub token_provider: Option<Arc<dyn TokenProvider>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            game_id: String::new(),
            developer_token: None,
            player_token: None,
            ignore_developer_token: false,
            models: ModelDefaults::default(),
            token_provider: None,
        }
    }
}

/// Default model names, used when a client is created without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefaults {
    pub chat: CompactString,
    pub image: CompactString,
    pub transcription: CompactString,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            chat: "gpt-4o-mini".into(),
            image: "gpt-image-1".into(),
            transcription: "whisper-1".into(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a game.
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            ..Self::default()
        }
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the developer token.
    pub fn developer_token(mut self, token: impl Into<String>) -> Self {
        self.developer_token = Some(token.into());
        self
    }

    /// Set the player token.
    pub fn player_token(mut self, token: impl Into<String>) -> Self {
        self.player_token = Some(token.into());
        self
    }

    /// Resolve tokens through a custom provider.
    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Parse a TOML string, expanding `${VAR}` environment references.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Load configuration from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Drop empty tokens and trailing slashes left by env expansion.
    fn normalized(mut self) -> Self {
        self.developer_token = self.developer_token.filter(|t| !t.is_empty());
        self.player_token = self.player_token.filter(|t| !t.is_empty());
        self.base_url = self.base_url.trim_end_matches('/').to_owned();
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_owned();
        }
        self
    }

    /// Check that the endpoint identity is configured.
    pub fn validate(&self) -> Result<()> {
        if self.game_id.trim().is_empty() {
            return Err(Error::Config("game_id is not configured".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url is not configured".into()));
        }
        Ok(())
    }

    /// The bearer token: the developer token unless ignored, else the
    /// player token.
    pub fn token(&self) -> Option<String> {
        if let Some(provider) = &self.token_provider {
            return provider.token();
        }
        let developer = self
            .developer_token
            .as_ref()
            .filter(|t| !t.is_empty() && !self.ignore_developer_token);
        developer
            .or(self.player_token.as_ref().filter(|t| !t.is_empty()))
            .cloned()
    }

    /// The bearer token, or a configuration error.
    pub fn bearer(&self) -> Result<String> {
        self.token()
            .ok_or_else(|| Error::Config("no authentication token available".into()))
    }

    /// Whether requests can be issued with this configuration.
    pub fn is_ready(&self) -> bool {
        self.validate().is_ok() && self.token().is_some()
    }

    /// `{base_url}/ai/{game_id}/v1/{path}`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/ai/{}/v1/{path}",
            self.base_url.trim_end_matches('/'),
            self.game_id
        )
    }

    /// The chat endpoint.
    pub fn chat_url(&self) -> String {
        self.endpoint("chat")
    }

    /// The image generation endpoint.
    pub fn image_url(&self) -> String {
        self.endpoint("image")
    }

    /// The speech-to-text endpoint.
    pub fn transcription_url(&self) -> String {
        self.endpoint("audio/transcriptions")
    }
}

/// Replace `${VAR}` references with environment variable values.
///
/// Unset variables expand to an empty string; an unterminated `${` is
/// kept as written.
pub fn expand_env_vars(input: &str) -> String {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let name = &rest[start + 2..];
        let Some(end) = name.find('}') else {
            expanded.push_str(&rest[start..]);
            return expanded;
        };
        expanded.push_str(&std::env::var(&name[..end]).unwrap_or_default());
        rest = &name[end + 1..];
    }
    expanded.push_str(rest);
    expanded
}
