use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{FunctionCall, ToolCall};

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Template-level instructions; only seen in returned template message lists
    System,
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
    /// Result of a `tool_calls` entry
    Tool,
    /// Result of a legacy `function_call`
    Function,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
        };
        write!(f, "{name}")
    }
}

/// A typed piece of message content, e.g. `{"type": "text", "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fields of non-text parts (image urls, media references) kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            part_type: "text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.part_type == "text"
    }
}

/// A single message exchanged with a prompt template.
///
/// Content is always held as a list of parts; plain-string content coming
/// from the service is normalized into one text part on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, deserialize_with = "content_parts")]
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a new builder for a user message
    pub fn user() -> MessageBuilder {
        MessageBuilder::new(Role::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> MessageBuilder {
        MessageBuilder::new(Role::Assistant)
    }

    /// Shorthand for a user message holding a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user().text(text).build()
    }

    /// A `role = tool` result correlated to `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        MessageBuilder::new(Role::Tool)
            .text(output)
            .tool_call_id(tool_call_id)
            .build()
    }

    /// A `role = function` result for a legacy function call.
    pub fn function_result(name: impl Into<String>, output: impl Into<String>) -> Self {
        MessageBuilder::new(Role::Function)
            .text(output)
            .name(name)
            .build()
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|part| part.is_text())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls carried by this message, empty when there are none.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// True when the message carries a `function_call` named `sentinel`.
    pub fn is_end_signal(&self, sentinel: &str) -> bool {
        self.function_call
            .as_ref()
            .is_some_and(|call| call.name == sentinel)
    }

    /// True when the caller must execute something before the model can answer.
    pub fn requests_tools(&self, sentinel: &str) -> bool {
        self.has_tool_calls()
            || (self.function_call.is_some() && !self.is_end_signal(sentinel))
    }
}

/// Builder for Message
#[derive(Debug)]
pub struct MessageBuilder {
    role: Role,
    content: Vec<ContentPart>,
    tool_calls: Option<Vec<ToolCall>>,
    function_call: Option<FunctionCall>,
    tool_call_id: Option<String>,
    name: Option<String>,
}

impl MessageBuilder {
    /// Create a new MessageBuilder with specified role
    pub fn new(role: Role) -> Self {
        Self {
            role,
            content: Vec::new(),
            tool_calls: None,
            function_call: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Append a text part
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content.push(ContentPart::text(text));
        self
    }

    /// Append an arbitrary content part
    pub fn part(mut self, part: ContentPart) -> Self {
        self.content.push(part);
        self
    }

    /// Attach tool calls
    pub fn tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    /// Attach a legacy function call
    pub fn function_call(mut self, call: FunctionCall) -> Self {
        self.function_call = Some(call);
        self
    }

    pub fn tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the Message
    pub fn build(self) -> Message {
        Message {
            role: self.role,
            content: self.content,
            tool_calls: self.tool_calls,
            function_call: self.function_call,
            tool_call_id: self.tool_call_id,
            name: self.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

fn content_parts<'de, D>(deserializer: D) -> Result<Vec<ContentPart>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawContent>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawContent::Text(text)) if text.is_empty() => Vec::new(),
        Some(RawContent::Text(text)) => vec![ContentPart::text(text)],
        Some(RawContent::Parts(parts)) => parts,
    })
}
