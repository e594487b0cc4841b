//! Property-based tests for routing and transitions

use super::decision::{route, should_dispatch, RoutingDecision, UnknownToolPolicy};
use super::state::{ConversationState, Message, ToolCall};
use super::transition::{transition, Event, Node};
use crate::system_prompt::build_prompt;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

const REGISTERED: &[&str] = &["get_weather", "get_time"];

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn registered() -> BTreeSet<String> {
    REGISTERED.iter().map(|s| (*s).to_string()).collect()
}

fn arb_tool_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("get_weather".to_string()),
        Just("get_time".to_string()),
        "[a-z_]{1,12}",
    ]
}

fn arb_calls() -> impl Strategy<Value = Vec<ToolCall>> {
    prop::collection::vec(arb_tool_name(), 0..6).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ToolCall::new(format!("call_{i}"), name, json!({})))
            .collect()
    })
}

fn arb_policy() -> impl Strategy<Value = UnknownToolPolicy> {
    prop_oneof![Just(UnknownToolPolicy::Ignore), Just(UnknownToolPolicy::Reject)]
}

// ============================================================================
// Routing Properties
// ============================================================================

proptest! {
    /// Dispatched calls are exactly the registered ones, in order
    #[test]
    fn dispatch_only_registered(calls in arb_calls()) {
        let tools = registered();
        let message = Message::assistant_with_tools("", calls.clone());
        let expected: Vec<ToolCall> = calls.into_iter().filter(|c| tools.contains(&c.name)).collect();

        let decision = route(message.clone(), &tools, UnknownToolPolicy::Ignore).unwrap();
        prop_assert_eq!(decision.dispatches(), should_dispatch(&message, &tools));
        match decision {
            RoutingDecision::DispatchTools { calls, .. } => prop_assert_eq!(calls, expected),
            RoutingDecision::Terminate { .. } => prop_assert!(expected.is_empty()),
        }
    }

    /// Reject fails exactly when some call names an unregistered tool
    #[test]
    fn reject_fails_iff_unknown_present(calls in arb_calls()) {
        let tools = registered();
        let has_unknown = calls.iter().any(|c| !tools.contains(&c.name));
        let result = route(Message::assistant_with_tools("", calls), &tools, UnknownToolPolicy::Reject);
        prop_assert_eq!(result.is_err(), has_unknown);
    }

    /// The message handed to routing is recorded untouched
    #[test]
    fn routing_preserves_message(calls in arb_calls(), text in "[a-zA-Z ]{0,20}", policy in arb_policy()) {
        let message = Message::assistant_with_tools(text, calls);
        if let Ok(decision) = route(message.clone(), &registered(), policy) {
            prop_assert_eq!(decision.message(), &message);
        }
    }
}

// ============================================================================
// Transition Properties
// ============================================================================

proptest! {
    /// Chat appends exactly the assistant message and never skips the tool node
    #[test]
    fn chat_appends_one_message(calls in arb_calls()) {
        let message = Message::assistant_with_tools("", calls);
        let decision = route(message.clone(), &registered(), UnknownToolPolicy::Ignore).unwrap();
        let dispatched = decision.dispatches();

        let result = transition(&Node::Chat, Event::ChatCompleted(decision)).unwrap();
        prop_assert_eq!(result.append, vec![message]);
        if dispatched {
            prop_assert!(matches!(result.next, Node::Tools { .. }), "expected tools node");
        } else {
            prop_assert_eq!(result.next, Node::Terminal);
        }
    }

    /// The tool node always returns to chat with one result per call
    #[test]
    fn tools_return_to_chat(n in 1usize..6) {
        let calls: Vec<ToolCall> = (0..n)
            .map(|i| ToolCall::new(format!("c{i}"), "get_weather", json!({})))
            .collect();
        let results: Vec<Message> = calls.iter().map(|c| Message::tool_result(&c.id, "ok")).collect();

        let result = transition(&Node::Tools { calls }, Event::ToolsCompleted { results: results.clone() }).unwrap();
        prop_assert_eq!(result.next, Node::Chat);
        prop_assert_eq!(result.append, results);
    }

    /// Missing or extra results are refused
    #[test]
    fn tools_reject_mismatched_results(n in 1usize..6, m in 0usize..6) {
        prop_assume!(n != m);
        let calls: Vec<ToolCall> = (0..n)
            .map(|i| ToolCall::new(format!("c{i}"), "get_weather", json!({})))
            .collect();
        let results: Vec<Message> = (0..m).map(|i| Message::tool_result(format!("c{i}"), "ok")).collect();

        let result = transition(&Node::Tools { calls }, Event::ToolsCompleted { results });
        prop_assert!(result.is_err());
    }

    /// Terminal is absorbing
    #[test]
    fn terminal_rejects_all(calls in arb_calls()) {
        let decision = RoutingDecision::Terminate { message: Message::assistant_with_tools("", calls) };
        prop_assert!(transition(&Node::Terminal, Event::ChatCompleted(decision)).is_err());
    }
}

// ============================================================================
// Prompt Properties
// ============================================================================

proptest! {
    /// Every user turn appears in the prompt, in order, after the preamble
    #[test]
    fn prompt_contains_user_turns_in_order(
        turns in prop::collection::vec("[a-zA-Z0-9 ?]{1,30}", 1..6),
        proverbs in prop::collection::vec("[a-zA-Z ]{1,20}", 0..4),
    ) {
        let messages: Vec<Message> = turns.iter().map(Message::user).collect();
        let state = ConversationState::new(messages, proverbs.clone(), Vec::new()).unwrap();
        let prompt = build_prompt(&state);

        prop_assert!(prompt.starts_with("You are a helpful assistant."));
        for proverb in &proverbs {
            prop_assert!(prompt.contains(proverb.as_str()));
        }

        let mut offset = crate::system_prompt::build_system_prompt(&proverbs).len();
        for turn in &turns {
            let tail = prompt.get(offset..).unwrap_or_default();
            let found = tail.find(turn.as_str());
            prop_assert!(found.is_some(), "turn {:?} missing after offset {}", turn, offset);
            offset += found.unwrap_or_default() + turn.len();
        }
    }

    /// Assistant turns are never replayed into the prompt
    #[test]
    fn prompt_omits_assistant_turns(reply in "[A-Z]{12}") {
        let state = ConversationState::new(
            vec![Message::user("hi"), Message::assistant(reply.clone()), Message::user("again")],
            vec![],
            Vec::new(),
        )
        .unwrap();
        prop_assert!(!build_prompt(&state).contains(reply.as_str()));
    }
}
