//! The stateless "run prompt" boundary.
//!
//! A [`PromptRunner`] compiles a hosted template with the given input
//! variables, invokes the configured model and hands back the resulting
//! message list. It must not remember anything between calls.

#[path = "run/request.rs"]
mod request;

#[path = "run/response.rs"]
mod response;

use async_trait::async_trait;

use crate::error::PromptLayerError;

pub use request::RunRequest;
pub use response::{PromptBlueprint, PromptTemplate, RunResponse};

/// Anything able to execute a [`RunRequest`].
#[async_trait]
pub trait PromptRunner: Send + Sync {
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError>;
}

#[async_trait]
impl<T: PromptRunner + ?Sized> PromptRunner for Box<T> {
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError> {
        (**self).run(request).await
    }
}

#[async_trait]
impl<T: PromptRunner + ?Sized> PromptRunner for std::sync::Arc<T> {
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError> {
        (**self).run(request).await
    }
}
