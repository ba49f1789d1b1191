use std::fmt;

use crate::{chat::Message, error::PromptLayerError};

/// Where a conversation's turn loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// A remote call is outstanding.
    AwaitingModel,
    /// Tool calls from the latest assistant message are being dispatched.
    ToolExecuting,
    /// The last turn was committed; waiting for the next question.
    AwaitingUser,
    /// Ended by the template, the turn limit or the input source.
    Terminated,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::ToolExecuting => "tool_executing",
            TurnState::AwaitingUser => "awaiting_user",
            TurnState::Terminated => "terminated",
        };
        write!(f, "{name}")
    }
}

/// Result of a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant answered; the exchange was committed to history.
    Replied(Message),
    /// The template issued the end sentinel; history was left untouched.
    Ended(Message),
}

impl TurnOutcome {
    pub fn message(&self) -> &Message {
        match self {
            TurnOutcome::Replied(message) | TurnOutcome::Ended(message) => message,
        }
    }
}

/// How a full conversation loop finished.
#[derive(Debug)]
pub enum ConversationOutcome {
    /// The template signalled the end of the dialogue.
    Ended { message: Message },
    /// The input source had no further questions.
    InputExhausted { last_message: Option<Message> },
    /// `max_turns` completed exchanges were reached.
    TurnLimitReached {
        turns: usize,
        last_message: Option<Message>,
    },
    /// A turn failed; history holds every exchange committed before it.
    Failed {
        error: PromptLayerError,
        last_message: Option<Message>,
    },
}

impl ConversationOutcome {
    /// The last assistant message seen, if any.
    pub fn last_message(&self) -> Option<&Message> {
        match self {
            ConversationOutcome::Ended { message } => Some(message),
            ConversationOutcome::InputExhausted { last_message }
            | ConversationOutcome::TurnLimitReached { last_message, .. }
            | ConversationOutcome::Failed { last_message, .. } => last_message.as_ref(),
        }
    }

    /// True for endings requested by the template or the user.
    pub fn is_clean_end(&self) -> bool {
        matches!(
            self,
            ConversationOutcome::Ended { .. } | ConversationOutcome::InputExhausted { .. }
        )
    }
}
