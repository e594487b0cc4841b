//! Prompt construction
//!
//! The whole conversation is rendered into a single prompt: a preamble that
//! carries the current proverbs, followed by user turns and tool results in
//! conversation order. Assistant turns are not replayed.

use crate::agent::{ConversationState, Role};

/// Preamble sent ahead of the conversation
pub fn build_system_prompt(proverbs: &[String]) -> String {
    format!("You are a helpful assistant. The current proverbs are {proverbs:?}.")
}

/// Render the full prompt for one chat node invocation
pub fn build_prompt(state: &ConversationState) -> String {
    let mut prompt = build_system_prompt(&state.proverbs);

    for message in state.messages() {
        let line = match message.role {
            Role::User => message.content.clone(),
            Role::Tool => {
                let name = message
                    .tool_call_id
                    .as_deref()
                    .and_then(|id| state.tool_name_for(id))
                    .unwrap_or("unknown");
                if message.is_error {
                    format!("[tool {name} error] {}", message.content)
                } else {
                    format!("[tool {name}] {}", message.content)
                }
            }
            Role::Assistant => continue,
        };
        prompt.push_str("\n\n");
        prompt.push_str(&line);
    }

    prompt
}
