use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use crate::{chat::Message, FunctionCall, ToolCall};

use super::error::ToolError;
use super::handler::{FnTool, ToolHandler};
use super::ToolDispatcher;

/// Name-indexed set of tools with an optional per-call timeout.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
    timeout_ms: u64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous tool of that name.
    pub fn register(mut self, name: impl Into<String>, handler: impl ToolHandler + 'static) -> Self {
        self.insert(name, Arc::new(handler));
        self
    }

    /// Registers a synchronous closure as a tool.
    pub fn register_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(name, FnTool(f))
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(name.into(), handler);
    }

    /// Per-call timeout in milliseconds; `0` disables it.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Get the list of tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Looks up and runs a tool with raw JSON-encoded arguments.
    ///
    /// A panicking handler is reported as [`ToolError::Execution`].
    pub async fn execute(&self, name: &str, args_json: &str) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args = parse_args(args_json)?;
        let call = AssertUnwindSafe(tool.call(args)).catch_unwind();
        let outcome = if self.timeout_ms == 0 {
            call.await
        } else {
            tokio::time::timeout(Duration::from_millis(self.timeout_ms), call)
                .await
                .map_err(|_| ToolError::Timeout(self.timeout_ms))?
        };
        outcome.unwrap_or_else(|payload| {
            Err(ToolError::Execution(format!(
                "tool panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }

    async fn render(&self, name: &str, args_json: &str) -> String {
        match self.execute(name, args_json).await {
            Ok(output) => render_output(output),
            Err(err) => {
                log::warn!("tool {name} failed: {err}");
                format!("error: {err}")
            }
        }
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(&self, call: &ToolCall) -> Message {
        log::debug!("dispatching tool {} (id: {})", call.function.name, call.id);
        let output = self
            .render(&call.function.name, &call.function.arguments)
            .await;
        Message::tool_result(call.id.clone(), output)
    }

    async fn dispatch_function(&self, call: &FunctionCall) -> Message {
        log::debug!("dispatching function {}", call.name);
        let output = self.render(&call.name, &call.arguments).await;
        Message::function_result(call.name.clone(), output)
    }
}

fn parse_args(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(|err| ToolError::InvalidArgs(err.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn render_output(output: Value) -> String {
    match output {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
