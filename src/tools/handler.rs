use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolError;

/// A single executable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with its decoded JSON arguments.
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Adapts a synchronous closure into a [`ToolHandler`].
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(Value) -> Result<Value, ToolError> + Send + Sync,
{
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        (self.0)(arguments)
    }
}

/// A tool that always answers with the same output; handy for mocks and demos.
#[derive(Debug, Clone)]
pub struct StaticTool {
    output: Value,
}

impl StaticTool {
    pub fn new(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for StaticTool {
    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(self.output.clone())
    }
}
