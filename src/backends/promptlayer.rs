//! PromptLayer REST client for running prompt templates.
//!
//! The service compiles the named template with the supplied input
//! variables, calls the model configured on it, logs the request and returns
//! the compiled message list together with a `request_id`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    error::PromptLayerError,
    run::{PromptRunner, RunRequest, RunResponse},
};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.promptlayer.com";

const API_KEY_HEADER: &str = "X-API-KEY";

/// Configuration for the PromptLayer client.
#[derive(Debug)]
pub struct PromptLayerConfig {
    /// API key for authentication with PromptLayer.
    pub api_key: SecretString,
    /// API root, e.g. `https://api.promptlayer.com`.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// Client for PromptLayer's run endpoint.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
/// It keeps no conversational state; every call is independent.
#[derive(Debug, Clone)]
pub struct PromptLayer {
    /// Shared configuration wrapped in Arc for cheap cloning.
    pub config: Arc<PromptLayerConfig>,
    /// HTTP client for making requests.
    pub client: Client,
}

impl PromptLayer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, PromptLayerError> {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        Self::with_client(builder.build()?, api_key, base_url, timeout_seconds)
    }

    /// Creates a new PromptLayer client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, PromptLayerError> {
        let raw = base_url.unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(raw)
            .map_err(|err| PromptLayerError::Config(format!("invalid base url {raw}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PromptLayerError::Config(format!(
                "base url {raw} cannot carry a path"
            )));
        }
        Ok(Self {
            config: Arc::new(PromptLayerConfig {
                api_key: SecretString::new(api_key.into()),
                base_url,
                timeout_seconds,
            }),
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn timeout_seconds(&self) -> Option<u64> {
        self.config.timeout_seconds
    }

    /// `{base}/prompt-templates/{name}/run`, with the name percent-encoded.
    pub fn run_url(&self, prompt_name: &str) -> Result<Url, PromptLayerError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PromptLayerError::Config("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["prompt-templates", prompt_name, "run"]);
        Ok(url)
    }
}

#[async_trait]
impl PromptRunner for PromptLayer {
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(PromptLayerError::AuthError(
                "Missing PromptLayer API key".to_string(),
            ));
        }
        if request.prompt_name.trim().is_empty() {
            return Err(PromptLayerError::InvalidRequest(
                "prompt_name must not be empty".to_string(),
            ));
        }

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(request) {
                log::trace!("PromptLayer request payload: {}", json);
            }
        }

        let url = self.run_url(&request.prompt_name)?;
        let mut req = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(request);

        if let Some(timeout) = self.config.timeout_seconds {
            req = req.timeout(Duration::from_secs(timeout));
        }

        let resp = req.send().await?;
        let status = resp.status();
        log::debug!(
            "PromptLayer HTTP status for {}: {}",
            request.prompt_name,
            status
        );

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_error(status, body));
        }

        let parsed: RunResponse = serde_json::from_str(&body).map_err(|err| {
            PromptLayerError::malformed(format!("failed to decode run response: {err}"), body.clone())
        })?;
        log::debug!(
            "PromptLayer run {} finished, request_id={}",
            request.prompt_name,
            parsed.request_id.as_deref().unwrap_or("-")
        );
        Ok(parsed)
    }
}

fn status_error(status: StatusCode, body: String) -> PromptLayerError {
    let message = error_message(&body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PromptLayerError::AuthError(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            PromptLayerError::InvalidRequest(message)
        }
        _ => PromptLayerError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

// Prefer the service's `message`/`detail` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
