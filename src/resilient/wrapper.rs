use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    error::PromptLayerError,
    run::{PromptRunner, RunRequest, RunResponse},
};

use super::config::ResilienceConfig;

/// Runner wrapper that retries transient failures using exponential backoff.
///
/// Only transport failures and 5xx/429 responses are retried; a response
/// that arrived but could not be understood is surfaced immediately since
/// repeating the run would invoke the model again.
pub struct ResilientRunner {
    inner: Box<dyn PromptRunner>,
    cfg: ResilienceConfig,
}

impl ResilientRunner {
    /// Creates a new resilient wrapper around an existing runner.
    pub fn new(inner: Box<dyn PromptRunner>, cfg: ResilienceConfig) -> Self {
        Self { inner, cfg }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.cfg
    }

    fn is_retryable(err: &PromptLayerError) -> bool {
        match err {
            PromptLayerError::HttpError(_) => true,
            PromptLayerError::ApiError { status, .. } => *status >= 500 || *status == 429,
            PromptLayerError::AuthError(_)
            | PromptLayerError::InvalidRequest(_)
            | PromptLayerError::ResponseFormatError { .. }
            | PromptLayerError::JsonError(_)
            | PromptLayerError::UnmatchedToolCall { .. }
            | PromptLayerError::Config(_)
            | PromptLayerError::RetryExceeded { .. }
            | PromptLayerError::Generic(_) => false,
        }
    }

    fn backoff_delay(&self, attempt_index: usize) -> Duration {
        let mut delay = self
            .cfg
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16));
        delay = delay.min(self.cfg.max_delay_ms);
        if self.cfg.jitter {
            let span = (delay / 2).max(1);
            let jitter = ((attempt_index as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1))
                % span;
            delay = delay.saturating_sub(jitter);
        }
        Duration::from_millis(delay)
    }
}

#[async_trait]
impl PromptRunner for ResilientRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError> {
        let mut last_err: Option<PromptLayerError> = None;

        for attempt in 0..self.cfg.max_attempts {
            match self.inner.run(request).await {
                Ok(response) => return Ok(response),
                Err(err) if !Self::is_retryable(&err) => return Err(err),
                Err(err) => {
                    log::warn!(
                        "run {} failed on attempt {}: {err}",
                        request.prompt_name,
                        attempt + 1
                    );
                    if attempt + 1 < self.cfg.max_attempts {
                        sleep(self.backoff_delay(attempt)).await;
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(PromptLayerError::RetryExceeded {
            attempts: self.cfg.max_attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
