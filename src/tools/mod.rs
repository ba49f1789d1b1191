//! Tool dispatch: turns assistant tool-call descriptors into result messages.

mod error;
mod handler;
mod registry;

use async_trait::async_trait;
use futures::future::join_all;

use crate::{chat::Message, FunctionCall, ToolCall};

pub use error::ToolError;
pub use handler::{FnTool, StaticTool, ToolHandler};
pub use registry::ToolRegistry;

/// Maps a tool-call descriptor to exactly one result message.
///
/// Implementations must not fail: unknown tools and execution errors are
/// reported inside the returned message so the conversation can continue.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Result for a `tool_calls` entry: `role = tool`, `tool_call_id` copied from `call.id`.
    async fn dispatch(&self, call: &ToolCall) -> Message;

    /// Result for a legacy `function_call`: `role = function`, `name` set.
    async fn dispatch_function(&self, call: &FunctionCall) -> Message;
}

/// Dispatches every call and returns the results in descriptor order.
///
/// With `parallel` the calls run concurrently; ordering is the same either way.
pub async fn dispatch_all(
    dispatcher: &dyn ToolDispatcher,
    calls: &[ToolCall],
    parallel: bool,
) -> Vec<Message> {
    if parallel {
        return join_all(calls.iter().map(|call| dispatcher.dispatch(call))).await;
    }
    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        results.push(dispatcher.dispatch(call).await);
    }
    results
}
