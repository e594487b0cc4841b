//! Pure graph transition function
//!
//! The run graph has two working nodes: chat and tools. `transition` maps the
//! current node plus what that node produced to the next node and the
//! messages to append. It performs no I/O.

use super::decision::RoutingDecision;
use super::state::{Message, ToolCall};
use thiserror::Error;

/// Position in the run graph
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Invoke the model on the conversation
    Chat,
    /// Execute these calls, in order
    Tools { calls: Vec<ToolCall> },
    /// Run finished
    Terminal,
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Chat => "chat",
            Node::Tools { .. } => "tools",
            Node::Terminal => "terminal",
        }
    }
}

/// Output of a completed node
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ChatCompleted(RoutingDecision),
    ToolsCompleted { results: Vec<Message> },
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub next: Node,
    pub append: Vec<Message>,
}

impl TransitionResult {
    fn new(next: Node) -> Self {
        Self {
            next,
            append: vec![],
        }
    }

    fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.append.extend(messages);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(node: &Node, event: Event) -> Result<TransitionResult, TransitionError> {
    match (node, event) {
        (Node::Chat, Event::ChatCompleted(RoutingDecision::Terminate { message })) => {
            Ok(TransitionResult::new(Node::Terminal).with_messages([message]))
        }

        (Node::Chat, Event::ChatCompleted(RoutingDecision::DispatchTools { message, calls })) => {
            if calls.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "dispatch with no tool calls".to_string(),
                ));
            }
            Ok(TransitionResult::new(Node::Tools { calls }).with_messages([message]))
        }

        (Node::Tools { calls }, Event::ToolsCompleted { results }) => {
            let answered: Vec<Option<&str>> =
                results.iter().map(|m| m.tool_call_id.as_deref()).collect();
            let expected: Vec<Option<&str>> = calls.iter().map(|c| Some(c.id.as_str())).collect();
            if answered != expected {
                return Err(TransitionError::InvalidTransition(format!(
                    "tool results {answered:?} do not answer calls {expected:?}"
                )));
            }
            Ok(TransitionResult::new(Node::Chat).with_messages(results))
        }

        (node, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {event:?}",
            node.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_call(id: &str) -> ToolCall {
        ToolCall::new(id, "get_weather", json!({"location": "Paris"}))
    }

    #[test]
    fn test_chat_terminates() {
        let reply = Message::assistant("Hello there");
        let result = transition(
            &Node::Chat,
            Event::ChatCompleted(RoutingDecision::Terminate {
                message: reply.clone(),
            }),
        )
        .unwrap();
        assert_eq!(result.next, Node::Terminal);
        assert_eq!(result.append, vec![reply]);
    }

    #[test]
    fn test_chat_dispatches_then_returns_to_chat() {
        let calls = vec![weather_call("c1")];
        let result = transition(
            &Node::Chat,
            Event::ChatCompleted(RoutingDecision::DispatchTools {
                message: Message::assistant_with_tools("", calls.clone()),
                calls: calls.clone(),
            }),
        )
        .unwrap();
        assert_eq!(result.next, Node::Tools { calls: calls.clone() });

        let results = vec![Message::tool_result("c1", "70 degrees")];
        let back = transition(&result.next, Event::ToolsCompleted { results: results.clone() }).unwrap();
        assert_eq!(back.next, Node::Chat);
        assert_eq!(back.append, results);
    }

    #[test]
    fn test_tool_results_must_match_calls() {
        let node = Node::Tools {
            calls: vec![weather_call("c1"), weather_call("c2")],
        };
        let swapped = vec![
            Message::tool_result("c2", "b"),
            Message::tool_result("c1", "a"),
        ];
        assert!(transition(&node, Event::ToolsCompleted { results: swapped }).is_err());
    }

    #[test]
    fn test_terminal_accepts_nothing() {
        let err = transition(
            &Node::Terminal,
            Event::ToolsCompleted { results: vec![] },
        )
        .unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }

    #[test]
    fn test_chat_rejects_tool_results() {
        assert!(transition(&Node::Chat, Event::ToolsCompleted { results: vec![] }).is_err());
    }
}
