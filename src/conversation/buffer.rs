use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    chat::{Message, Role},
    error::PromptLayerError,
};

/// Finalized user/assistant exchanges, re-sent as `chat_history` on every call.
///
/// Append-only: messages are never edited or removed once committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a history from previously finalized messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Commits a finished turn: the question, every in-progress message,
    /// then the final reply. Leaves `in_progress` empty.
    pub fn commit_turn(
        &mut self,
        question: &str,
        in_progress: &mut InProgressBuffer,
        reply: Message,
    ) {
        self.messages.push(Message::user_text(question));
        self.messages.extend(in_progress.take());
        self.messages.push(reply);
    }
}

impl<'a> IntoIterator for &'a ChatHistory {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Tool interactions of the current turn, re-sent as `ai_in_progress`.
///
/// Holds `[assistant(tool_calls), tool result, ..., assistant(tool_calls), ...]`
/// and tracks which call ids of the latest assistant message still await a
/// result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InProgressBuffer {
    messages: Vec<Message>,
    pending_calls: Vec<String>,
    pending_function: Option<String>,
}

impl InProgressBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call ids emitted by the latest assistant message without a result yet.
    pub fn pending_calls(&self) -> &[String] {
        &self.pending_calls
    }

    /// True when every call of the latest assistant message has its result.
    pub fn is_settled(&self) -> bool {
        self.pending_calls.is_empty() && self.pending_function.is_none()
    }

    /// Records an assistant message that requested tools.
    pub fn push_assistant(&mut self, message: Message) -> Result<(), PromptLayerError> {
        if message.role != Role::Assistant {
            return Err(PromptLayerError::InvalidRequest(format!(
                "expected an assistant message, got {}",
                message.role
            )));
        }
        if !self.is_settled() {
            return Err(PromptLayerError::InvalidRequest(format!(
                "tool calls still awaiting results: {:?}",
                self.pending_calls
            )));
        }

        let mut seen = HashSet::new();
        for call in message.tool_calls() {
            if !seen.insert(call.id.as_str()) {
                return Err(PromptLayerError::InvalidRequest(format!(
                    "duplicate tool call id {}",
                    call.id
                )));
            }
        }

        self.pending_calls = message.tool_calls().iter().map(|c| c.id.clone()).collect();
        self.pending_function = match (&message.function_call, message.has_tool_calls()) {
            (Some(call), false) => Some(call.name.clone()),
            _ => None,
        };
        self.messages.push(message);
        Ok(())
    }

    /// Records a tool or function result; it must answer a pending call.
    pub fn push_result(&mut self, message: Message) -> Result<(), PromptLayerError> {
        match message.role {
            Role::Tool => {
                let id = message.tool_call_id.clone().unwrap_or_default();
                let Some(pos) = self.pending_calls.iter().position(|pending| *pending == id) else {
                    return Err(PromptLayerError::UnmatchedToolCall { tool_call_id: id });
                };
                self.pending_calls.remove(pos);
            }
            Role::Function => {
                let name = message.name.clone().unwrap_or_default();
                if self.pending_function.as_deref() != Some(name.as_str()) {
                    return Err(PromptLayerError::UnmatchedToolCall { tool_call_id: name });
                }
                self.pending_function = None;
            }
            other => {
                return Err(PromptLayerError::InvalidRequest(format!(
                    "expected a tool or function result, got {other}"
                )));
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// Drains the buffer, leaving it empty with nothing pending.
    pub fn take(&mut self) -> Vec<Message> {
        self.pending_calls.clear();
        self.pending_function = None;
        std::mem::take(&mut self.messages)
    }

    pub fn clear(&mut self) {
        self.take();
    }
}
