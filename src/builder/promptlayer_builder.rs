use secrecy::SecretString;

use crate::error::PromptLayerError;

use super::state::BuilderState;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PROMPTLAYER_API_KEY";
/// Environment variable overriding the API root.
pub const BASE_URL_ENV: &str = "PROMPTLAYER_BASE_URL";

/// Builder for configuring and instantiating a prompt runner.
///
/// The resulting runner is an explicit handle owned by the caller; nothing
/// is registered globally.
#[derive(Default)]
pub struct PromptLayerBuilder {
    pub(super) state: BuilderState,
}

impl PromptLayerBuilder {
    /// Creates a new empty builder instance with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder from `PROMPTLAYER_API_KEY` and `PROMPTLAYER_BASE_URL`.
    pub fn from_env() -> Result<Self, PromptLayerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, PromptLayerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PromptLayerError::Config(format!("{API_KEY_ENV} is not set")))?;
        let mut builder = Self::new().api_key(api_key);
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            builder = builder.base_url(url);
        }
        Ok(builder)
    }

    /// Sets the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.state.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Sets the base URL for API requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.state.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.state.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Uses a preconfigured HTTP client instead of building one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.state.http_client = Some(client);
        self
    }
}
