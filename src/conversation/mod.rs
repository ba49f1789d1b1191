//! Client-side conversation state for stateless template runs.
//!
//! A [`Conversation`] owns two buffers: the committed [`ChatHistory`] and
//! the per-turn [`InProgressBuffer`] of tool interactions. Both are re-sent
//! with every call so the remote template can see the whole dialogue.

mod buffer;
mod config;
mod input;
mod state;
mod turn;

#[cfg(test)]
mod proptests;

pub use buffer::{ChatHistory, InProgressBuffer};
pub use config::{ConversationConfig, DEFAULT_END_SENTINEL};
pub use input::{NoFurtherInput, ScriptedInput, UserInput};
pub use state::{ConversationOutcome, TurnOutcome, TurnState};
pub use turn::Conversation;
