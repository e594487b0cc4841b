//! Tool-dispatch decision
//!
//! Turns the chat node's message into a [`RoutingDecision`]. Only calls that
//! name an available tool are dispatched; what happens to the others is set
//! by [`UnknownToolPolicy`].

use super::state::{Message, ToolCall};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the orchestrator does after a chat node run
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// Append the message and stop
    Terminate { message: Message },
    /// Append the message, then execute `calls` in order
    DispatchTools {
        message: Message,
        calls: Vec<ToolCall>,
    },
}

impl RoutingDecision {
    pub fn message(&self) -> &Message {
        match self {
            RoutingDecision::Terminate { message }
            | RoutingDecision::DispatchTools { message, .. } => message,
        }
    }

    pub fn dispatches(&self) -> bool {
        matches!(self, RoutingDecision::DispatchTools { .. })
    }
}

/// Handling of tool calls that name no registered tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownToolPolicy {
    /// Drop the call and log a warning; the run continues
    #[default]
    Ignore,
    /// Fail the run with [`UnknownToolError`]
    Reject,
}

impl fmt::Display for UnknownToolPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnknownToolPolicy::Ignore => "ignore",
            UnknownToolPolicy::Reject => "reject",
        })
    }
}

impl FromStr for UnknownToolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" | "drop" => Ok(UnknownToolPolicy::Ignore),
            "reject" | "fail" => Ok(UnknownToolPolicy::Reject),
            other => Err(format!("unknown policy `{other}` (expected ignore or reject)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model requested unknown tool `{name}`")]
pub struct UnknownToolError {
    pub name: String,
    pub call_id: String,
}

/// Whether any call in `message` names an available tool
pub fn should_dispatch(message: &Message, tools: &BTreeSet<String>) -> bool {
    message.tool_calls.iter().any(|c| tools.contains(&c.name))
}

/// Decide the next step for the chat node's output
pub fn route(
    message: Message,
    tools: &BTreeSet<String>,
    policy: UnknownToolPolicy,
) -> Result<RoutingDecision, UnknownToolError> {
    for call in message.tool_calls.iter().filter(|c| !tools.contains(&c.name)) {
        match policy {
            UnknownToolPolicy::Ignore => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "Dropping call to unknown tool");
            }
            UnknownToolPolicy::Reject => {
                return Err(UnknownToolError {
                    name: call.name.clone(),
                    call_id: call.id.clone(),
                });
            }
        }
    }

    if !should_dispatch(&message, tools) {
        return Ok(RoutingDecision::Terminate { message });
    }

    let calls = message
        .tool_calls
        .iter()
        .filter(|c| tools.contains(&c.name))
        .cloned()
        .collect();
    Ok(RoutingDecision::DispatchTools { message, calls })
}
