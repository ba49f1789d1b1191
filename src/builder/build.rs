use secrecy::ExposeSecret;

use crate::{
    backends::promptlayer::PromptLayer,
    error::PromptLayerError,
    resilient::{ResilienceConfig, ResilientRunner},
    run::PromptRunner,
};

use super::promptlayer_builder::PromptLayerBuilder;
use super::state::BuilderState;

impl PromptLayerBuilder {
    /// Builds the runner, wrapped for retries when resilience is enabled.
    pub fn build(self) -> Result<Box<dyn PromptRunner>, PromptLayerError> {
        self.state.build()
    }

    /// Builds the bare HTTP client without any wrapper.
    pub fn build_client(mut self) -> Result<PromptLayer, PromptLayerError> {
        self.state.build_client()
    }
}

impl BuilderState {
    fn build(mut self) -> Result<Box<dyn PromptRunner>, PromptLayerError> {
        let resilience = self.resilience_config()?;
        let client = self.build_client()?;
        let runner: Box<dyn PromptRunner> = Box::new(client);
        Ok(match resilience {
            Some(cfg) => Box::new(ResilientRunner::new(runner, cfg)),
            None => runner,
        })
    }

    fn build_client(&mut self) -> Result<PromptLayer, PromptLayerError> {
        let api_key = self
            .api_key
            .take()
            .ok_or_else(|| PromptLayerError::AuthError("No API key provided".to_string()))?;
        log::debug!(
            "building PromptLayer client base_url={} timeout={:?} resilient={}",
            self.base_url.as_deref().unwrap_or("<default>"),
            self.timeout_seconds,
            self.resilient_enable.unwrap_or(false)
        );
        let api_key = api_key.expose_secret().clone();
        match self.http_client.take() {
            Some(client) => PromptLayer::with_client(
                client,
                api_key,
                self.base_url.as_deref(),
                self.timeout_seconds,
            ),
            None => PromptLayer::new(api_key, self.base_url.as_deref(), self.timeout_seconds),
        }
    }

    fn resilience_config(&self) -> Result<Option<ResilienceConfig>, PromptLayerError> {
        if !self.resilient_enable.unwrap_or(false) {
            return Ok(None);
        }
        let mut cfg = ResilienceConfig::default();
        if let Some(attempts) = self.resilient_attempts {
            if attempts == 0 {
                return Err(PromptLayerError::InvalidRequest(
                    "resilient_attempts must be greater than 0".to_string(),
                ));
            }
            cfg.max_attempts = attempts;
        }
        if let Some(base) = self.resilient_base_delay_ms {
            cfg.base_delay_ms = base;
        }
        if let Some(maxd) = self.resilient_max_delay_ms {
            cfg.max_delay_ms = maxd;
        }
        if let Some(jitter) = self.resilient_jitter {
            cfg.jitter = jitter;
        }
        Ok(Some(cfg))
    }
}
