use std::collections::VecDeque;

use async_trait::async_trait;

/// Source of follow-up questions between turns.
///
/// Returning `None` (or a blank line) ends the conversation.
#[async_trait]
pub trait UserInput: Send {
    async fn next_question(&mut self) -> Option<String>;
}

/// Replays a fixed list of questions, then reports no more input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    questions: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.questions.len()
    }
}

#[async_trait]
impl UserInput for ScriptedInput {
    async fn next_question(&mut self) -> Option<String> {
        self.questions.pop_front()
    }
}

/// Ends the conversation after the first exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFurtherInput;

#[async_trait]
impl UserInput for NoFurtherInput {
    async fn next_question(&mut self) -> Option<String> {
        None
    }
}
