//! PromptLayer chat client.
//!
//! Runs hosted prompt templates through a stateless "run prompt" call and
//! drives multi-turn, tool-calling conversations on top of it by re-sending
//! the accumulated `chat_history` and `ai_in_progress` buffers every call.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use promptlayer_chat::builder::PromptLayerBuilder;
//! use promptlayer_chat::conversation::{Conversation, ConversationConfig, TurnOutcome};
//! use promptlayer_chat::tools::ToolRegistry;
//!
//! # async fn demo() -> Result<(), promptlayer_chat::error::PromptLayerError> {
//! let runner = PromptLayerBuilder::from_env()?.resilient(true).build()?;
//! let config = ConversationConfig::new("multi-turn-assistant");
//! let mut conversation = Conversation::new(Arc::from(runner), Arc::new(ToolRegistry::new()), config);
//!
//! if let TurnOutcome::Replied(reply) = conversation.send("Hello!").await? {
//!     println!("{}", reply.text());
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod backends;
pub mod builder;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod resilient;
pub mod run;
pub mod tools;

pub use backends::promptlayer::PromptLayer;
pub use error::PromptLayerError;
pub use run::{PromptRunner, RunRequest, RunResponse};

/// A tool invocation requested by the assistant.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct ToolCall {
    /// Identifier correlating the call with its result, unique within a turn.
    pub id: String,
    /// Call type, always `"function"` for current templates.
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// The function to execute.
    pub function: FunctionCall,
}

/// Name and JSON-encoded arguments of a function call.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "arguments_as_string")]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall::new(name, arguments),
        }
    }
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

fn default_call_type() -> String {
    "function".to_string()
}

// Some providers hand back decoded argument objects instead of a JSON string.
fn arguments_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(raw)) => Ok(raw),
        Some(other) => Ok(other.to_string()),
    }
}
