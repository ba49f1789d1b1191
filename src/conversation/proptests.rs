//! Property-based tests for the turn loop
//!
//! Scripted runners replay arbitrary turn shapes; the buffers must stay
//! consistent whatever the template sends back.

use std::sync::Arc;

use proptest::prelude::*;

use super::turn::tests::{reply, respond, ScriptedRunner};
use super::*;
use crate::chat::{Message, Role};
use crate::tools::{StaticTool, ToolRegistry};
use crate::ToolCall;

// ============================================================================
// Helpers
// ============================================================================

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn registry() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new().register("lookup", StaticTool::new("ok")))
}

/// One scripted turn: a question plus how many tool calls the model makes first.
#[derive(Debug, Clone)]
struct TurnShape {
    question: String,
    tool_calls: usize,
}

fn arb_turn() -> impl Strategy<Value = TurnShape> {
    ("[a-zA-Z ?]{1,30}", 0usize..4).prop_map(|(question, tool_calls)| TurnShape {
        question,
        tool_calls,
    })
}

fn script(turns: &[TurnShape]) -> ScriptedRunner {
    let mut responses = Vec::new();
    for (turn, shape) in turns.iter().enumerate() {
        if shape.tool_calls > 0 {
            let calls = (0..shape.tool_calls)
                .map(|i| ToolCall::new(format!("call_{turn}_{i}"), "lookup", "{}"))
                .collect();
            responses.push(respond(Message::assistant().tool_calls(calls).build()));
        }
        responses.push(reply(&format!("answer {turn}")));
    }
    ScriptedRunner::new(responses)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_plain_turns_double_history(questions in prop::collection::vec("[a-z]{1,12}", 0..8)) {
        let turns: Vec<TurnShape> = questions
            .iter()
            .map(|q| TurnShape { question: q.clone(), tool_calls: 0 })
            .collect();
        let runner = Arc::new(script(&turns));
        let history = block_on(async {
            let mut conv = Conversation::new(runner.clone(), registry(), ConversationConfig::new("t"));
            for turn in &turns {
                conv.send(&turn.question).await.unwrap();
            }
            conv.into_history()
        });

        prop_assert_eq!(history.len(), 2 * questions.len());
        for (i, message) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            prop_assert_eq!(message.role, expected);
        }
        for (i, question) in questions.iter().enumerate() {
            prop_assert_eq!(&history.messages()[2 * i].text(), question);
        }
    }

    #[test]
    fn prop_tool_turns_commit_every_result_once(turns in prop::collection::vec(arb_turn(), 1..6)) {
        let runner = Arc::new(script(&turns));
        let (history, leftover) = block_on(async {
            let mut conv = Conversation::new(runner.clone(), registry(), ConversationConfig::new("t"));
            for turn in &turns {
                conv.send(&turn.question).await.unwrap();
                assert!(conv.in_progress().is_empty());
            }
            let leftover = conv.in_progress().len();
            (conv.into_history(), leftover)
        });

        let expected: usize = turns
            .iter()
            .map(|t| if t.tool_calls > 0 { 3 + t.tool_calls } else { 2 })
            .sum();
        prop_assert_eq!(history.len(), expected);
        prop_assert_eq!(leftover, 0);

        let tool_ids: Vec<String> = history
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        let call_ids: Vec<String> = history
            .iter()
            .flat_map(|m| m.tool_calls().iter().map(|c| c.id.clone()))
            .collect();
        prop_assert_eq!(tool_ids, call_ids);
    }

    #[test]
    fn prop_turn_limit_bounds_requests(
        limit in 0usize..5,
        questions in prop::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        let turns: Vec<TurnShape> = questions
            .iter()
            .map(|q| TurnShape { question: q.clone(), tool_calls: 0 })
            .collect();
        let runner = Arc::new(script(&turns));
        let (outcome, history) = block_on(async {
            let mut conv = Conversation::new(
                runner.clone(),
                registry(),
                ConversationConfig::new("t").max_turns(limit),
            );
            let mut input = ScriptedInput::new(questions[1..].to_vec());
            let outcome = conv.run(questions[0].clone(), &mut input).await;
            (outcome, conv.into_history())
        });

        let completed = limit.min(questions.len());
        prop_assert_eq!(history.len(), 2 * completed);
        prop_assert_eq!(runner.requests().len(), completed);
        if limit <= questions.len() {
            let limited = matches!(outcome, ConversationOutcome::TurnLimitReached { .. });
            prop_assert!(limited);
        } else {
            let exhausted = matches!(outcome, ConversationOutcome::InputExhausted { .. });
            prop_assert!(exhausted);
        }
    }
}
