//! Conversation state types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool-result messages: the call being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if signature
fn is_false(b: &bool) -> bool {
    !*b
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn tool_error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::tool_result(tool_call_id, content)
        }
    }
}

/// Why a conversation was refused at the start of a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("conversation has no messages")]
    Empty,
    #[error("message {index}: tool result has no tool_call_id")]
    MissingCallId { index: usize },
    #[error("message {index}: tool result references unknown call `{id}`")]
    UnknownCallId { index: usize, id: String },
    #[error("message {index}: call `{id}` already has a result")]
    DuplicateResult { index: usize, id: String },
}

/// Mutable record threaded through one run.
///
/// Owned by exactly one run; `messages` only grows while the run executes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    pub proverbs: Vec<String>,
    /// Tools available for this run
    pub tools: BTreeSet<String>,
}

impl ConversationState {
    /// Build a state from caller input, checking the message invariants
    pub fn new(
        messages: Vec<Message>,
        proverbs: Vec<String>,
        tools: impl IntoIterator<Item = String>,
    ) -> Result<Self, StateError> {
        validate_messages(&messages)?;
        Ok(Self {
            messages,
            proverbs,
            tools: tools.into_iter().collect(),
        })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append messages produced by a node
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Ids of every tool call issued so far
    pub fn call_ids(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|m| &m.tool_calls)
            .map(|c| c.id.as_str())
    }

    /// Name of the tool a call id was issued for
    pub fn tool_name_for(&self, call_id: &str) -> Option<&str> {
        self.messages
            .iter()
            .flat_map(|m| &m.tool_calls)
            .find(|c| c.id == call_id)
            .map(|c| c.name.as_str())
    }

    pub fn into_parts(self) -> (Vec<Message>, Vec<String>) {
        (self.messages, self.proverbs)
    }
}

/// Check that every tool result answers an earlier, not yet answered call
pub fn validate_messages(messages: &[Message]) -> Result<(), StateError> {
    if messages.is_empty() {
        return Err(StateError::Empty);
    }

    let mut issued: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for (index, message) in messages.iter().enumerate() {
        if message.role == Role::Tool {
            let id = message
                .tool_call_id
                .as_deref()
                .ok_or(StateError::MissingCallId { index })?;
            if !issued.contains(id) {
                return Err(StateError::UnknownCallId {
                    index,
                    id: id.to_string(),
                });
            }
            if !answered.insert(id) {
                return Err(StateError::DuplicateResult {
                    index,
                    id: id.to_string(),
                });
            }
        }
        issued.extend(message.tool_calls.iter().map(|c| c.id.as_str()));
    }

    Ok(())
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub messages: Vec<Message>,
    pub proverbs: Vec<String>,
    /// Number of chat node invocations
    pub iterations: u32,
}
