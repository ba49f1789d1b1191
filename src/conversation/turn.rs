use std::sync::Arc;

use serde_json::Value;

use crate::{
    chat::Message,
    error::PromptLayerError,
    run::{PromptRunner, RunRequest},
    tools::{dispatch_all, ToolDispatcher},
};

use super::buffer::{ChatHistory, InProgressBuffer};
use super::config::ConversationConfig;
use super::input::UserInput;
use super::state::{ConversationOutcome, TurnOutcome, TurnState};

/// Client-side state of one multi-turn conversation.
///
/// The remote template is stateless, so every call re-sends the question,
/// the committed [`ChatHistory`] and the current [`InProgressBuffer`]. The
/// buffers are owned exclusively by this value; independent conversations
/// can share the same runner and dispatcher.
pub struct Conversation {
    runner: Arc<dyn PromptRunner>,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: ConversationConfig,
    history: ChatHistory,
    in_progress: InProgressBuffer,
    state: TurnState,
    completed_turns: usize,
}

impl Conversation {
    pub fn new(
        runner: Arc<dyn PromptRunner>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: ConversationConfig,
    ) -> Self {
        Self::with_history(runner, dispatcher, config, ChatHistory::new())
    }

    /// Resumes a conversation from previously committed messages.
    pub fn with_history(
        runner: Arc<dyn PromptRunner>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: ConversationConfig,
        history: ChatHistory,
    ) -> Self {
        Self {
            runner,
            dispatcher,
            config,
            history,
            in_progress: InProgressBuffer::new(),
            state: TurnState::AwaitingUser,
            completed_turns: 0,
        }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn in_progress(&self) -> &InProgressBuffer {
        &self.in_progress
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Exchanges committed by this instance (prior history not counted).
    pub fn completed_turns(&self) -> usize {
        self.completed_turns
    }

    pub fn into_history(self) -> ChatHistory {
        self.history
    }

    /// Runs one user turn, dispatching tools until the assistant answers.
    ///
    /// On error the turn is abandoned: history keeps only previously
    /// committed exchanges and the in-progress buffer is cleared.
    pub async fn send(&mut self, question: &str) -> Result<TurnOutcome, PromptLayerError> {
        if self.state == TurnState::Terminated {
            return Err(PromptLayerError::InvalidRequest(
                "conversation has already terminated".to_string(),
            ));
        }
        self.in_progress.clear();

        match self.drive_turn(question).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                log::warn!(
                    "turn aborted for {} after {} in-progress messages: {err}",
                    self.config.template_name,
                    self.in_progress.len()
                );
                self.in_progress.clear();
                self.state = TurnState::AwaitingUser;
                Err(err)
            }
        }
    }

    async fn drive_turn(&mut self, question: &str) -> Result<TurnOutcome, PromptLayerError> {
        let sentinel = self.config.end_sentinel.clone();
        loop {
            self.state = TurnState::AwaitingModel;
            let request = self.build_request(question)?;
            let response = self.runner.run(&request).await?;
            let message = response.last_message()?;
            log::debug!(
                "{} responded (request_id={}, tool_calls={})",
                self.config.template_name,
                response.request_id.as_deref().unwrap_or("-"),
                message.tool_calls().len()
            );

            if message.is_end_signal(&sentinel) {
                self.in_progress.clear();
                self.state = TurnState::Terminated;
                return Ok(TurnOutcome::Ended(message));
            }

            if !message.requests_tools(&sentinel) {
                self.history
                    .commit_turn(question, &mut self.in_progress, message.clone());
                self.completed_turns += 1;
                self.state = TurnState::AwaitingUser;
                return Ok(TurnOutcome::Replied(message));
            }

            self.state = TurnState::ToolExecuting;
            self.execute_tools(message).await?;
        }
    }

    async fn execute_tools(&mut self, message: Message) -> Result<(), PromptLayerError> {
        let calls = message.tool_calls().to_vec();
        let function_call = message.function_call.clone();
        self.in_progress.push_assistant(message)?;

        let results = if !calls.is_empty() {
            dispatch_all(
                self.dispatcher.as_ref(),
                &calls,
                self.config.parallel_tool_calls,
            )
            .await
        } else if let Some(call) = function_call {
            vec![self.dispatcher.dispatch_function(&call).await]
        } else {
            Vec::new()
        };

        for result in results {
            self.in_progress.push_result(result)?;
        }
        if !self.in_progress.is_settled() {
            return Err(PromptLayerError::InvalidRequest(format!(
                "dispatcher left tool calls unanswered: {:?}",
                self.in_progress.pending_calls()
            )));
        }
        Ok(())
    }

    fn build_request(&self, question: &str) -> Result<RunRequest, PromptLayerError> {
        let mut request = RunRequest::new(self.config.template_name.clone());
        for (key, value) in &self.config.input_variables {
            request = request.input_value(key.clone(), value.clone());
        }
        request = request
            .input("user_question", question)?
            .input("chat_history", self.history.messages())?
            .input("ai_in_progress", self.in_progress.messages())?
            .tags(self.config.tags.iter().cloned());
        if let Some(context) = &self.config.user_context {
            request = request.input_value("user_context", Value::Object(context.clone()));
        }
        if let Some(version) = self.config.prompt_version {
            request = request.prompt_version(version);
        }
        if let Some(label) = &self.config.prompt_release_label {
            request = request.prompt_release_label(label.clone());
        }
        for (key, value) in &self.config.metadata {
            request = request.metadata(key.clone(), value.clone());
        }
        Ok(request)
    }

    /// Runs turns until the template ends the dialogue, `input` runs dry,
    /// the turn limit is hit or a turn fails.
    pub async fn run<I>(
        &mut self,
        first_question: impl Into<String>,
        input: &mut I,
    ) -> ConversationOutcome
    where
        I: UserInput + ?Sized,
    {
        let mut last_message: Option<Message> = None;
        let mut question = first_question.into();

        if self.turn_limit_reached() {
            self.state = TurnState::Terminated;
            return ConversationOutcome::TurnLimitReached {
                turns: self.completed_turns,
                last_message,
            };
        }

        loop {
            match self.send(&question).await {
                Ok(TurnOutcome::Ended(message)) => return ConversationOutcome::Ended { message },
                Ok(TurnOutcome::Replied(message)) => last_message = Some(message),
                Err(error) => return ConversationOutcome::Failed { error, last_message },
            }

            match self.next_question(input).await {
                Some(next) => question = next,
                None if self.turn_limit_reached() => {
                    return ConversationOutcome::TurnLimitReached {
                        turns: self.completed_turns,
                        last_message,
                    }
                }
                None => return ConversationOutcome::InputExhausted { last_message },
            }
        }
    }

    /// Asks `input` for the next question unless the conversation is over.
    ///
    /// Returns `None` and moves to [`TurnState::Terminated`] when the turn
    /// limit is reached (without consulting `input`) or when `input` yields
    /// nothing or a blank line.
    pub async fn next_question<I>(&mut self, input: &mut I) -> Option<String>
    where
        I: UserInput + ?Sized,
    {
        if self.state == TurnState::Terminated || self.turn_limit_reached() {
            self.state = TurnState::Terminated;
            return None;
        }
        match input.next_question().await {
            Some(question) if !question.trim().is_empty() => Some(question),
            _ => {
                self.state = TurnState::Terminated;
                None
            }
        }
    }

    /// True once `max_turns` exchanges have been committed.
    pub fn turn_limit_reached(&self) -> bool {
        self.config
            .max_turns
            .is_some_and(|max| self.completed_turns >= max)
    }
}

#[cfg(test)]
pub(super) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::chat::Role;
    use crate::conversation::input::{NoFurtherInput, ScriptedInput};
    use crate::run::RunResponse;
    use crate::tools::{StaticTool, ToolRegistry};
    use crate::{FunctionCall, ToolCall};

    /// Replays queued responses and records every request it receives.
    #[derive(Default)]
    pub(in crate::conversation) struct ScriptedRunner {
        responses: Mutex<VecDeque<Result<RunResponse, PromptLayerError>>>,
        requests: Mutex<Vec<RunRequest>>,
    }

    impl ScriptedRunner {
        pub(in crate::conversation) fn new<I>(responses: I) -> Self
        where
            I: IntoIterator<Item = Result<RunResponse, PromptLayerError>>,
        {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::default(),
            }
        }

        pub(in crate::conversation) fn requests(&self) -> Vec<RunRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PromptRunner for ScriptedRunner {
        async fn run(&self, request: &RunRequest) -> Result<RunResponse, PromptLayerError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PromptLayerError::Generic("script exhausted".into())))
        }
    }

    pub(in crate::conversation) fn respond(message: Message) -> Result<RunResponse, PromptLayerError> {
        Ok(serde_json::from_value(json!({
            "request_id": "req-1",
            "prompt_blueprint": {"prompt_template": {"messages": [
                {"role": "system", "content": "You are a support agent."},
                message
            ]}}
        }))
        .unwrap())
    }

    pub(in crate::conversation) fn reply(text: &str) -> Result<RunResponse, PromptLayerError> {
        respond(Message::assistant().text(text).build())
    }

    fn call_tools(calls: &[(&str, &str)]) -> Result<RunResponse, PromptLayerError> {
        respond(
            Message::assistant()
                .tool_calls(
                    calls
                        .iter()
                        .map(|(id, name)| ToolCall::new(*id, *name, "{}"))
                        .collect(),
                )
                .build(),
        )
    }

    fn end_signal() -> Result<RunResponse, PromptLayerError> {
        respond(
            Message::assistant()
                .function_call(FunctionCall::new(DEFAULT_END, "{}"))
                .build(),
        )
    }

    const DEFAULT_END: &str = crate::conversation::config::DEFAULT_END_SENTINEL;

    fn tools() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::new()
                .register("search_kb", StaticTool::new("Reset it from the settings page."))
                .register("create_ticket", StaticTool::new(json!({"ticket_id": "TICKET-12345"}))),
        )
    }

    fn conversation(runner: &Arc<ScriptedRunner>, config: ConversationConfig) -> Conversation {
        Conversation::new(runner.clone(), tools(), config)
    }

    fn sent(request: &RunRequest, key: &str) -> Vec<Message> {
        serde_json::from_value(request.input_variables[key].clone()).unwrap()
    }

    #[tokio::test]
    async fn plain_turns_alternate_user_and_assistant() {
        let runner = Arc::new(ScriptedRunner::new([reply("r1"), reply("r2"), reply("r3")]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));

        for q in ["q1", "q2", "q3"] {
            let outcome = conv.send(q).await.expect("turn");
            assert!(matches!(outcome, TurnOutcome::Replied(_)));
            assert!(conv.in_progress().is_empty());
            assert_eq!(conv.state(), TurnState::AwaitingUser);
        }

        let texts: Vec<String> = conv.history().iter().map(Message::text).collect();
        assert_eq!(texts, ["q1", "r1", "q2", "r2", "q3", "r3"]);
        assert_eq!(conv.completed_turns(), 3);

        let requests = runner.requests();
        assert_eq!(requests[2].input_variables["user_question"], "q3");
        assert_eq!(sent(&requests[2], "chat_history").len(), 4);
        assert!(sent(&requests[2], "ai_in_progress").is_empty());
    }

    #[tokio::test]
    async fn tool_round_is_resent_then_committed() {
        let runner = Arc::new(ScriptedRunner::new([
            call_tools(&[("a", "search_kb"), ("b", "create_ticket")]),
            reply("Ticket TICKET-12345 created."),
            reply("You're welcome."),
        ]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));

        let outcome = conv.send("I can't log in").await.expect("turn");
        assert_eq!(outcome.message().text(), "Ticket TICKET-12345 created.");

        let requests = runner.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].input_variables["user_question"], "I can't log in");
        assert!(sent(&requests[1], "chat_history").is_empty());

        let in_progress = sent(&requests[1], "ai_in_progress");
        let ids: Vec<_> = in_progress[1..]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap_or_default())
            .collect();
        assert_eq!(in_progress[0].role, Role::Assistant);
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(in_progress[2].text(), r#"{"ticket_id":"TICKET-12345"}"#);

        let roles: Vec<Role> = conv.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );

        conv.send("thanks").await.expect("second turn");
        assert_eq!(sent(&runner.requests()[2], "chat_history").len(), 5);
        assert!(sent(&runner.requests()[2], "ai_in_progress").is_empty());
    }

    #[tokio::test]
    async fn legacy_function_calls_are_dispatched() {
        let runner = Arc::new(ScriptedRunner::new([
            respond(
                Message::assistant()
                    .function_call(FunctionCall::new("search_kb", r#"{"query":"password"}"#))
                    .build(),
            ),
            reply("Found it."),
        ]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));

        conv.send("reset password?").await.expect("turn");
        let in_progress = sent(&runner.requests()[1], "ai_in_progress");
        assert_eq!(in_progress[1].role, Role::Function);
        assert_eq!(in_progress[1].name.as_deref(), Some("search_kb"));
    }

    #[tokio::test]
    async fn end_signal_leaves_history_untouched() {
        let runner = Arc::new(ScriptedRunner::new([
            reply("r1"),
            call_tools(&[("a", "search_kb")]),
            end_signal(),
        ]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));
        conv.send("q1").await.expect("first");
        let before = conv.history().clone();

        let outcome = conv.send("bye").await.expect("second");
        assert!(matches!(outcome, TurnOutcome::Ended(ref m) if m.is_end_signal(DEFAULT_END)));
        assert_eq!(conv.history(), &before);
        assert!(conv.in_progress().is_empty());
        assert_eq!(conv.state(), TurnState::Terminated);
        assert!(conv.send("still there?").await.is_err());
    }

    #[tokio::test]
    async fn remote_failure_aborts_only_the_current_turn() {
        let runner = Arc::new(ScriptedRunner::new([
            reply("r1"),
            call_tools(&[("a", "search_kb")]),
            Err(PromptLayerError::HttpError("connection reset".into())),
            reply("r2"),
        ]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));
        conv.send("q1").await.expect("first");

        let err = conv.send("q2").await.unwrap_err();
        assert!(matches!(err, PromptLayerError::HttpError(_)));
        assert_eq!(conv.history().len(), 2);
        assert!(conv.in_progress().is_empty());
        assert_eq!(conv.state(), TurnState::AwaitingUser);

        conv.send("q2 again").await.expect("retry by caller");
        assert_eq!(conv.history().len(), 4);
    }

    #[tokio::test]
    async fn run_stops_at_turn_limit() {
        let runner = Arc::new(ScriptedRunner::new([reply("r1"), reply("r2"), reply("r3")]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant").max_turns(1));
        let mut input = ScriptedInput::new(["q2", "q3"]);

        let outcome = conv.run("q1", &mut input).await;
        match outcome {
            ConversationOutcome::TurnLimitReached { turns, last_message } => {
                assert_eq!(turns, 1);
                assert_eq!(last_message.map(|m| m.text()), Some("r1".to_string()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(conv.history().len(), 2);
        assert_eq!(runner.requests().len(), 1);
        assert_eq!(input.remaining(), 2);
        assert_eq!(conv.state(), TurnState::Terminated);
    }

    #[tokio::test]
    async fn run_ends_on_sentinel() {
        let runner = Arc::new(ScriptedRunner::new([reply("r1"), end_signal()]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));
        let mut input = ScriptedInput::new(["that's all"]);

        let outcome = conv.run("q1", &mut input).await;
        assert!(matches!(outcome, ConversationOutcome::Ended { .. }));
        assert!(outcome.is_clean_end());
        assert_eq!(conv.history().len(), 2);
    }

    /// Answers every call with a fixed, caller-chosen message.
    struct Misbehaving(Message);

    #[async_trait]
    impl ToolDispatcher for Misbehaving {
        async fn dispatch(&self, _call: &ToolCall) -> Message {
            self.0.clone()
        }

        async fn dispatch_function(&self, _call: &FunctionCall) -> Message {
            self.0.clone()
        }
    }

    #[rstest::rstest]
    #[case::foreign_id(Message::tool_result("not-a", "42"))]
    #[case::wrong_role(Message::assistant().text("I ran it").build())]
    #[tokio::test]
    async fn dispatcher_contract_violation_aborts_the_turn(#[case] result: Message) {
        let runner = Arc::new(ScriptedRunner::new([
            reply("r1"),
            call_tools(&[("a", "search_kb")]),
        ]));
        let mut conv = Conversation::new(
            runner.clone(),
            Arc::new(Misbehaving(result.clone())),
            ConversationConfig::new("assistant"),
        );
        conv.send("q1").await.expect("first");
        let before = conv.history().clone();

        let err = conv.send("q2").await.unwrap_err();
        match result.role {
            Role::Tool => assert!(matches!(
                err,
                PromptLayerError::UnmatchedToolCall { ref tool_call_id } if tool_call_id == "not-a"
            )),
            _ => assert!(matches!(err, PromptLayerError::InvalidRequest(_))),
        }
        assert_eq!(conv.history(), &before);
        assert!(conv.in_progress().is_empty());
        assert_eq!(conv.state(), TurnState::AwaitingUser);
        assert_eq!(runner.requests().len(), 2);
    }

    #[tokio::test]
    async fn panicking_tool_does_not_take_down_the_task() {
        let runner = Arc::new(ScriptedRunner::new([
            call_tools(&[("a", "explode")]),
            reply("Sorry, that tool is broken."),
        ]));
        let registry = ToolRegistry::new().register_fn("explode", |_| panic!("tool bug"));
        let mut conv = Conversation::new(
            runner.clone(),
            Arc::new(registry),
            ConversationConfig::new("assistant"),
        );

        let handle = tokio::spawn(async move {
            let outcome = conv.send("q").await;
            (conv, outcome)
        });
        let (conv, outcome) = handle.await.expect("task must not panic");
        assert_eq!(outcome.expect("turn").message().text(), "Sorry, that tool is broken.");

        let in_progress = sent(&runner.requests()[1], "ai_in_progress");
        assert_eq!(in_progress[1].tool_call_id.as_deref(), Some("a"));
        assert!(in_progress[1].text().contains("tool panicked: tool bug"));
        assert_eq!(conv.history().len(), 4);
    }

    #[tokio::test]
    async fn non_assistant_reply_is_not_committed() {
        let runner = Arc::new(ScriptedRunner::new([respond(Message::user_text(
            "echoed question",
        ))]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));

        let err = conv.send("q").await.unwrap_err();
        assert!(matches!(err, PromptLayerError::ResponseFormatError { .. }));
        assert!(conv.history().is_empty());
        assert_eq!(conv.state(), TurnState::AwaitingUser);
    }

    #[tokio::test]
    async fn next_question_honours_limit_and_blank_lines() {
        let runner = Arc::new(ScriptedRunner::new([reply("r1")]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant").max_turns(1));
        let mut input = ScriptedInput::new(["q2"]);

        assert_eq!(conv.next_question(&mut input).await.as_deref(), Some("q2"));
        conv.send("q1").await.expect("turn");
        assert!(conv.turn_limit_reached());
        let mut more = ScriptedInput::new(["q3"]);
        assert_eq!(conv.next_question(&mut more).await, None);
        assert_eq!(more.remaining(), 1);
        assert_eq!(conv.state(), TurnState::Terminated);

        let runner = Arc::new(ScriptedRunner::new([]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));
        let mut blank = ScriptedInput::new(["   "]);
        assert_eq!(conv.next_question(&mut blank).await, None);
        assert_eq!(conv.state(), TurnState::Terminated);
    }

    #[tokio::test]
    async fn run_reports_exhausted_input() {
        let runner = Arc::new(ScriptedRunner::new([reply("r1")]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));

        let outcome = conv.run("q1", &mut NoFurtherInput).await;
        assert!(matches!(outcome, ConversationOutcome::InputExhausted { .. }));
        assert_eq!(outcome.last_message().map(Message::text).as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn malformed_response_fails_the_run() {
        let runner = Arc::new(ScriptedRunner::new([
            reply("r1"),
            Ok(serde_json::from_value(json!({"request_id": "req-2"})).unwrap()),
        ]));
        let mut conv = conversation(&runner, ConversationConfig::new("assistant"));
        let mut input = ScriptedInput::new(["q2"]);

        match conv.run("q1", &mut input).await {
            ConversationOutcome::Failed { error, last_message } => {
                assert!(matches!(error, PromptLayerError::ResponseFormatError { .. }));
                assert_eq!(last_message.map(|m| m.text()), Some("r1".to_string()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(conv.history().len(), 2);
    }

    #[tokio::test]
    async fn request_carries_context_tags_and_extra_inputs() {
        let runner = Arc::new(ScriptedRunner::new([reply("hi")]));
        let mut context = serde_json::Map::new();
        context.insert("user_id".into(), json!("user_123"));
        let config = ConversationConfig::new("multi-turn-assistant-with-tools")
            .tags(["support", "multi-turn"])
            .user_context(context)
            .input_variable("locale", json!("en-US"));
        let mut conv = conversation(&runner, config);

        conv.send("hello").await.expect("turn");
        let request = &runner.requests()[0];
        assert_eq!(request.prompt_name, "multi-turn-assistant-with-tools");
        assert_eq!(request.tags, ["support", "multi-turn"]);
        assert_eq!(request.input_variables["user_context"]["user_id"], "user_123");
        assert_eq!(request.input_variables["locale"], "en-US");
    }

    #[tokio::test]
    async fn resumed_history_is_sent_first() {
        let runner = Arc::new(ScriptedRunner::new([reply("r2")]));
        let prior = ChatHistory::from_messages(vec![
            Message::user_text("q1"),
            Message::assistant().text("r1").build(),
        ]);
        let mut conv = Conversation::with_history(
            runner.clone(),
            tools(),
            ConversationConfig::new("assistant"),
            prior,
        );

        conv.send("q2").await.expect("turn");
        assert_eq!(sent(&runner.requests()[0], "chat_history").len(), 2);
        assert_eq!(conv.completed_turns(), 1);
        assert_eq!(conv.into_history().len(), 4);
    }
}
